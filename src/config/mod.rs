// Configuration management module
// TOML-backed settings plus the interactive editor

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, IndexBackend, IndexConfig, IngestConfig, LanceDbConfig, OllamaConfig,
    PineconeConfig, QueryConfig, validate_dimension, validate_index_name,
};

/// Get the default configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::default_dir()
}
