use super::*;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, method, path},
};

fn config_for(server: &MockServer) -> OllamaConfig {
    let url = Url::parse(&server.uri()).expect("mock server uri should parse");
    OllamaConfig {
        host: url.host_str().expect("mock server has a host").to_string(),
        port: url.port().expect("mock server has a port"),
        embedding_model: "embed-model".to_string(),
        generation_model: "chat-model".to_string(),
        batch_size: 2,
        ..OllamaConfig::default()
    }
}

#[test]
fn client_configuration() {
    let config = OllamaConfig {
        protocol: "http".to_string(),
        host: "test-host".to_string(),
        port: 1234,
        embedding_model: "test-embed".to_string(),
        generation_model: "test-chat".to_string(),
        batch_size: 128,
        ..OllamaConfig::default()
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    assert_eq!(client.embedding_model, "test-embed");
    assert_eq!(client.generation_model, "test-chat");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, 1);
}

#[test]
fn client_builder_methods() {
    let client = OllamaClient::new(&OllamaConfig::default())
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(5);

    assert_eq!(client.retry_attempts, 5);
    assert_eq!(client.with_retry_attempts(0).retry_attempts, 1);
}

#[test]
fn prompt_places_context_before_question() {
    let prompt = build_prompt("What color is the sky?", "The sky is blue.");

    let context_at = prompt.find("The sky is blue.").expect("context in prompt");
    let question_at = prompt
        .find("Question: What color is the sky?")
        .expect("question in prompt");
    assert!(context_at < question_at);
    assert!(prompt.ends_with("Helpful Answer:"));
}

#[tokio::test]
async fn embeds_in_configured_batches() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"model": "embed-model", "input": ["a", "b"]})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[1.0, 0.0], [0.0, 1.0]]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"input": ["c"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[0.5, 0.5]]})))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("client");
    let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let vectors = client.embed_batch(&texts).await.expect("embeddings");

    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]]);
}

#[tokio::test]
async fn embed_one_returns_single_vector() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[0.25, 0.75]]})))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("client");
    let vector = client.embed_one("question").await.expect("embedding");

    assert_eq!(vector, vec![0.25, 0.75]);
}

#[tokio::test]
async fn count_mismatch_is_an_embedding_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[1.0]]})))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("client");
    let texts = vec!["a".to_string(), "b".to_string()];
    let error = client.embed_batch(&texts).await.expect_err("mismatch");

    assert!(matches!(error, SearchError::Embedding(_)));
    assert!(error.to_string().contains("Mismatch"));
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server))
        .expect("client")
        .with_retry_attempts(3);
    let result = client.embed_batch(&["a".to_string()]).await;

    assert!(matches!(result, Err(SearchError::Embedding(_))));
}

#[tokio::test]
async fn generates_answer_from_context() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({"model": "chat-model", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "chat-model",
            "response": "  Blue.  ",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("client");
    let answer = client
        .generate("What color is the sky?", "The sky is blue.")
        .await
        .expect("answer");

    assert_eq!(answer, "Blue.");
}

#[tokio::test]
async fn generation_failure_is_a_generation_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("client");
    let result = client.generate("q", "c").await;

    assert!(matches!(result, Err(SearchError::Generation(_))));
}

#[tokio::test]
async fn health_check_requires_both_models() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "embed-model", "size": 1, "digest": "abc"}]
        })))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("client");
    assert!(client.ping().is_ok());

    let error = client.health_check().expect_err("generation model missing");
    assert!(format!("{error:#}").contains("chat-model"));
}
