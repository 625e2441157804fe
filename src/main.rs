use anyhow::Result;
use clap::{Parser, Subcommand};
use semantic_search::commands::{ask, run_setup, serve};
use semantic_search::config::{get_config_dir, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "semantic-search")]
#[command(about = "Question answering over local documents backed by a vector index")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and local index data
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the vector index and Ollama settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Create the index if needed and ingest the documents directory
    Setup {
        /// Directory to ingest instead of the configured one
        #[arg(long)]
        documents: Option<PathBuf>,
    },
    /// Answer a question from the indexed documents
    Ask {
        /// The question to answer
        question: String,
    },
    /// Serve the setup and read routes as JSON lines on stdio
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir()?,
    };

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Setup { documents } => {
            run_setup(&config_dir, documents).await?;
        }
        Commands::Ask { question } => {
            ask(&config_dir, &question).await?;
        }
        Commands::Serve => {
            serve(&config_dir).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn setup_command() {
        let cli = Cli::try_parse_from(["semantic-search", "setup"]).expect("should parse");
        assert!(matches!(cli.command, Commands::Setup { documents: None }));
        assert_eq!(cli.config_dir, None);
    }

    #[test]
    fn setup_with_documents() {
        let cli = Cli::try_parse_from(["semantic-search", "setup", "--documents", "./docs"])
            .expect("should parse");

        if let Commands::Setup { documents } = cli.command {
            assert_eq!(documents, Some(PathBuf::from("./docs")));
        } else {
            panic!("expected setup command");
        }
    }

    #[test]
    fn ask_command_with_question() {
        let cli = Cli::try_parse_from(["semantic-search", "ask", "What color is the sky?"])
            .expect("should parse");

        if let Commands::Ask { question } = cli.command {
            assert_eq!(question, "What color is the sky?");
        } else {
            panic!("expected ask command");
        }
    }

    #[test]
    fn ask_requires_question() {
        let cli = Cli::try_parse_from(["semantic-search", "ask"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn global_config_dir() {
        let cli = Cli::try_parse_from(["semantic-search", "serve", "--config-dir", "/tmp/search"])
            .expect("should parse");

        assert!(matches!(cli.command, Commands::Serve));
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/search")));
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["semantic-search", "config", "--show"]).expect("should parse");

        if let Commands::Config { show } = cli.command {
            assert!(show);
        } else {
            panic!("expected config command");
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["semantic-search", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["semantic-search", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
