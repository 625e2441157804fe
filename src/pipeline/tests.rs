use super::*;
use crate::SearchError;
use crate::testing::{FakeEmbedder, FakeGenerator, FakeIndexClient};
use std::fs;
use tempfile::TempDir;

fn service(temp_dir: &TempDir, client: &Arc<FakeIndexClient>) -> SearchService {
    let mut config = Config::default();
    config.index.name = "notes".to_string();
    config.index.ready_delay_secs = 0;
    config.ingest.documents_dir = temp_dir.path().to_path_buf();

    SearchService::from_config(
        &config,
        Arc::clone(client) as Arc<dyn VectorIndexClient>,
        Arc::new(FakeEmbedder::default()),
        Arc::new(FakeGenerator::default()),
    )
}

#[tokio::test]
async fn setup_creates_index_and_ingests() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(temp_dir.path().join("sky.txt"), "The sky is blue.").expect("write");
    fs::write(temp_dir.path().join("grass.md"), "The grass is green.").expect("write");
    let client = Arc::new(FakeIndexClient::default());

    let summary = service(&temp_dir, &client)
        .setup()
        .await
        .expect("setup succeeds");

    assert_eq!(
        summary,
        SetupSummary {
            index: "notes".to_string(),
            created: true,
            documents: 2,
            chunks: 2,
            upserts: 2,
        }
    );
    assert_eq!(client.created(), vec![("notes".to_string(), 768, Metric::Cosine)]);
}

#[tokio::test]
async fn repeated_setup_reuses_index() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(temp_dir.path().join("sky.txt"), "The sky is blue.").expect("write");
    let client = Arc::new(FakeIndexClient::default());
    let search = service(&temp_dir, &client);

    search.setup().await.expect("first setup");
    let second = search.setup().await.expect("second setup");

    assert!(!second.created);
    assert_eq!(client.created().len(), 1);
    assert_eq!(client.upsert_sizes(), vec![1, 1]);
}

#[tokio::test]
async fn missing_documents_fail_setup() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let client = Arc::new(FakeIndexClient::default());

    let result = service(&temp_dir, &client)
        .setup_from(&temp_dir.path().join("absent"))
        .await;

    assert!(matches!(result, Err(SearchError::DocumentLoad(_))));
    assert!(client.upserts().is_empty());
}

#[tokio::test]
async fn ask_without_matches_is_none() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let client = Arc::new(FakeIndexClient::with_index("notes"));

    let answer = service(&temp_dir, &client)
        .ask("Is anything here?")
        .await
        .expect("query succeeds");

    assert_eq!(answer, None);
}
