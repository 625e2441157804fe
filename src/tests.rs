use super::*;

#[test]
fn status_codes() {
    assert_eq!(SearchError::BadRequest("no question".to_string()).status_code(), 400);
    assert_eq!(SearchError::Embedding("quota".to_string()).status_code(), 500);
    assert_eq!(SearchError::IndexService("not ready".to_string()).status_code(), 500);
    assert_eq!(
        SearchError::ingestion("a.txt", 3, SearchError::BadRequest("x".to_string())).status_code(),
        500
    );
}

#[test]
fn ingestion_error_names_document_and_chunk() {
    let error = SearchError::ingestion(
        "docs/a.txt",
        100,
        SearchError::IndexService("write rejected".to_string()),
    );

    let message = error.to_string();
    assert!(message.contains("docs/a.txt"));
    assert!(message.contains("chunk 100"));
    assert!(message.contains("write rejected"));

    let source = std::error::Error::source(&error).expect("has a source");
    assert!(source.to_string().contains("write rejected"));
}
