use super::*;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.index.backend, IndexBackend::LanceDb);
    assert_eq!(config.index.name, "semantic-search");
    assert_eq!(config.index.dimension, 768);
    assert_eq!(config.index.metric, Metric::Cosine);
    assert_eq!(config.index.ready_delay(), Duration::from_secs(60));
    assert_eq!(config.chunking.chunk_size, 1000);
    assert_eq!(config.ingest.upsert_batch_size, 100);
    assert_eq!(config.query.top_k, 10);
    assert_eq!(config.ollama.retry_attempts, 1);
    assert!(config.validate().is_ok());
}

#[test]
fn config_validation() {
    let config = Config::default();

    let mut invalid_config = config.clone();
    invalid_config.ollama.protocol = "ftp".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.port = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.generation_model = String::new();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.index.dimension = 0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidDimension(0))
    ));

    let mut invalid_config = config.clone();
    invalid_config.index.name = "My_Index".to_string();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidIndexName(_))
    ));

    let mut invalid_config = config.clone();
    invalid_config.chunking.chunk_overlap = invalid_config.chunking.chunk_size;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidChunkOverlap(_, _))
    ));

    let mut invalid_config = config.clone();
    invalid_config.ingest.upsert_batch_size = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.query.top_k = 0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidTopK(0))
    ));
}

#[test]
fn index_name_rules() {
    assert!(validate_index_name("semantic-search").is_ok());
    assert!(validate_index_name("docs2").is_ok());

    assert!(validate_index_name("").is_err());
    assert!(validate_index_name("-leading").is_err());
    assert!(validate_index_name("trailing-").is_err());
    assert!(validate_index_name("has space").is_err());
    assert!(validate_index_name("UPPER").is_err());
    assert!(validate_index_name(&"a".repeat(46)).is_err());
}

#[test]
fn ollama_url_generation() {
    let config = Config::default();
    let url = config
        .ollama_url()
        .expect("should generate ollama_url successfully");
    assert_eq!(url.as_str(), "http://localhost:11434/");
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn backend_and_metric_names() {
    let parsed: Config = toml::from_str(
        r#"
            [index]
            backend = "pinecone"
            metric = "dotproduct"
        "#,
    )
    .expect("should parse toml correctly");

    assert_eq!(parsed.index.backend, IndexBackend::Pinecone);
    assert_eq!(parsed.index.metric, Metric::DotProduct);
    assert_eq!(parsed.index.name, "semantic-search");
}

#[test]
fn setter_validation() {
    let mut config = OllamaConfig::default();

    assert!(config.set_protocol("https".to_string()).is_ok());
    assert!(config.set_host("example.com".to_string()).is_ok());
    assert!(config.set_port(8080).is_ok());
    assert!(config.set_embedding_model("new-model".to_string()).is_ok());
    assert!(config.set_generation_model("chat-model".to_string()).is_ok());
    assert!(config.set_batch_size(128).is_ok());

    assert!(config.set_protocol("ftp".to_string()).is_err());
    assert!(config.set_port(0).is_err());
    assert!(config.set_embedding_model(String::new()).is_err());
    assert!(config.set_batch_size(0).is_err());
    assert!(config.set_batch_size(1001).is_err());
}

#[test]
fn load_missing_config() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = Config::load(temp_dir.path()).expect("missing file yields defaults");

    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert_eq!(config.index, IndexConfig::default());
    assert_eq!(
        config.vector_database_path(),
        temp_dir.path().join("vectors")
    );
}

#[test]
fn save_and_reload() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let mut config = Config::load(temp_dir.path()).expect("defaults load");
    config.index.name = "team-notes".to_string();
    config.index.ready_delay_secs = 5;
    config.query.top_k = 4;
    config.save().expect("config saves");

    let reloaded = Config::load(temp_dir.path()).expect("config reloads");
    assert_eq!(reloaded, config);
}

#[test]
fn load_rejects_invalid_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[index]\ndimension = 0\n",
    )
    .expect("write config");

    assert!(Config::load(temp_dir.path()).is_err());
}

#[test]
fn api_key_resolution() {
    let mut pinecone = PineconeConfig::default();

    assert!(matches!(
        pinecone.resolve_api_key(None),
        Err(ConfigError::MissingApiKey)
    ));
    assert!(pinecone.resolve_api_key(Some("  ".to_string())).is_err());
    assert_eq!(
        pinecone
            .resolve_api_key(Some("from-env".to_string()))
            .expect("env key used"),
        "from-env"
    );

    pinecone.api_key = "from-file".to_string();
    assert_eq!(
        pinecone
            .resolve_api_key(Some("from-env".to_string()))
            .expect("file key used"),
        "from-file"
    );
}
