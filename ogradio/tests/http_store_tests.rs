//! HttpBlobStore against a mock bucket

use futures::TryStreamExt;
use ogradio::{BlobStore, HttpBlobStore, StoreError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_get_object() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bucket/01-First.flac"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"abc123\"")
                .insert_header("content-type", "audio/flac")
                .set_body_bytes(b"fLaC-audio".to_vec()),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = HttpBlobStore::new(&format!("{}/bucket", mock_server.uri())).unwrap();
    let object = store.get("01-First.flac").await.unwrap().unwrap();

    assert_eq!(object.size, 10);
    assert_eq!(object.etag, "\"abc123\"");
    assert_eq!(object.content_type.as_deref(), Some("audio/flac"));

    let chunks: Vec<bytes::Bytes> = object.body.try_collect().await.unwrap();
    assert_eq!(chunks.concat(), b"fLaC-audio");
}

#[tokio::test]
async fn test_keys_are_percent_encoded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/03%20Third.flac"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"t\"")
                .set_body_bytes(b"third".to_vec()),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = HttpBlobStore::new(&mock_server.uri()).unwrap();
    assert!(store.get("03 Third.flac").await.unwrap().is_some());
}

#[tokio::test]
async fn test_missing_object() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let store = HttpBlobStore::new(&mock_server.uri()).unwrap();
    assert!(store.get("missing.flac").await.unwrap().is_none());
}

#[tokio::test]
async fn test_upstream_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let store = HttpBlobStore::new(&mock_server.uri()).unwrap();
    assert!(matches!(
        store.get("a.flac").await,
        Err(StoreError::Upstream(503))
    ));
}

#[tokio::test]
async fn test_missing_etag() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"data".to_vec()))
        .mount(&mock_server)
        .await;

    let store = HttpBlobStore::new(&mock_server.uri()).unwrap();
    assert!(matches!(
        store.get("a.flac").await,
        Err(StoreError::MissingMetadata("etag"))
    ));
}

#[tokio::test]
async fn test_unreachable_bucket() {
    // nothing listens on the discard port
    let store = HttpBlobStore::new("http://127.0.0.1:9/bucket").unwrap();
    assert!(matches!(store.get("a.flac").await, Err(StoreError::Http(_))));
}
