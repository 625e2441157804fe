
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::path::Path;

use super::{Config, ConfigError, IndexBackend, IndexConfig, OllamaConfig, validate_index_name};
use crate::index::Metric;
use crate::ollama::OllamaClient;

const BACKENDS: [(&str, IndexBackend); 2] = [
    ("lancedb (local)", IndexBackend::LanceDb),
    ("pinecone (managed)", IndexBackend::Pinecone),
];

const METRICS: [Metric; 3] = [Metric::Cosine, Metric::Euclidean, Metric::DotProduct];

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Semantic Search Configuration").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir);

    eprintln!("{}", style("Vector Index").bold().yellow());
    configure_index(&mut config.index)?;

    eprintln!();
    eprintln!("{}", style("Ollama Configuration").bold().yellow());
    eprintln!("Configure your Ollama instance for embeddings and answers.");
    eprintln!();

    configure_ollama(&mut config.ollama)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    match OllamaClient::new(&config.ollama).and_then(|client| client.health_check()) {
        Ok(()) => eprintln!("{}", style("✓ Ollama connection successful!").green()),
        Err(e) => {
            eprintln!(
                "{}",
                style("⚠ Warning: Could not verify Ollama").yellow()
            );
            eprintln!("  {e:#}");
            eprintln!("You can continue, but make sure Ollama is running before ingesting.");
        }
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Index Settings:").bold().yellow());
    eprintln!("  Backend: {}", style(format!("{:?}", config.index.backend)).cyan());
    eprintln!("  Name: {}", style(&config.index.name).cyan());
    eprintln!("  Dimension: {}", style(config.index.dimension).cyan());
    eprintln!("  Metric: {}", style(config.index.metric.as_str()).cyan());
    eprintln!(
        "  Ready Delay: {}s",
        style(config.index.ready_delay_secs).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Ollama Settings:").bold().yellow());
    match config.ollama_url() {
        Ok(url) => eprintln!("  URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  URL: {} ({})", style("Invalid").red(), e),
    }
    eprintln!(
        "  Embedding Model: {}",
        style(&config.ollama.embedding_model).cyan()
    );
    eprintln!(
        "  Generation Model: {}",
        style(&config.ollama.generation_model).cyan()
    );
    eprintln!("  Batch Size: {}", style(config.ollama.batch_size).cyan());

    eprintln!();
    eprintln!("{}", style("Pipeline Settings:").bold().yellow());
    eprintln!("  Chunk Size: {}", style(config.chunking.chunk_size).cyan());
    eprintln!(
        "  Chunk Overlap: {}",
        style(config.chunking.chunk_overlap).cyan()
    );
    eprintln!(
        "  Documents: {}",
        style(config.ingest.documents_dir.display()).cyan()
    );
    eprintln!(
        "  Upsert Batch Size: {}",
        style(config.ingest.upsert_batch_size).cyan()
    );
    eprintln!("  Top K: {}", style(config.query.top_k).cyan());

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Config {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No usable configuration found. Using defaults.").yellow()
            );
            Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            }
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            config
        },
    )
}

fn configure_index(index: &mut IndexConfig) -> Result<()> {
    let labels: Vec<&str> = BACKENDS.iter().map(|(label, _)| *label).collect();
    let default_backend = BACKENDS
        .iter()
        .position(|(_, backend)| *backend == index.backend)
        .unwrap_or(0);

    let backend_index = Select::new()
        .with_prompt("Vector index backend")
        .default(default_backend)
        .items(&labels)
        .interact()?;

    let name: String = Input::new()
        .with_prompt("Index name")
        .default(index.name.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            validate_index_name(input)
        })
        .interact_text()?;

    let dimension: u32 = Input::new()
        .with_prompt("Vector dimension (must match the embedding model)")
        .default(index.dimension)
        .validate_with(|input: &u32| -> Result<(), ConfigError> {
            super::validate_dimension(*input)
        })
        .interact_text()?;

    let metric_names: Vec<&str> = METRICS.iter().map(|m| m.as_str()).collect();
    let default_metric = METRICS
        .iter()
        .position(|m| *m == index.metric)
        .unwrap_or(0);
    let metric_index = Select::new()
        .with_prompt("Similarity metric")
        .default(default_metric)
        .items(&metric_names)
        .interact()?;

    index.backend = BACKENDS[backend_index].1;
    index.name = name;
    index.dimension = dimension;
    index.metric = METRICS[metric_index];

    Ok(())
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = OllamaConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..OllamaConfig::default()
            };
            temp_config.ollama_url()?;
            Ok(())
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let embedding_model: String = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.embedding_model.clone())
        .validate_with(non_empty_model)
        .interact_text()?;

    let generation_model: String = Input::new()
        .with_prompt("Answer generation model")
        .default(ollama.generation_model.clone())
        .validate_with(non_empty_model)
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Texts per embedding request")
        .default(ollama.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 1000 {
                Err("Batch size must be 1000 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    ollama.set_protocol(protocol)?;
    ollama.set_host(host)?;
    ollama.set_port(port)?;
    ollama.set_embedding_model(embedding_model)?;
    ollama.set_generation_model(generation_model)?;
    ollama.set_batch_size(batch_size)?;

    Ok(())
}

fn non_empty_model(input: &String) -> Result<(), &'static str> {
    if input.trim().is_empty() {
        Err("Model name cannot be empty")
    } else {
        Ok(())
    }
}
