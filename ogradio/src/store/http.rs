use super::{BlobStore, StoredObject, check_key};
use crate::error::StoreError;
use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::{StatusCode, header};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default timeout for a whole object download
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 300;

const USER_AGENT: &str = concat!("ogradio/", env!("CARGO_PKG_VERSION"));

/// Store backed by a public bucket endpoint
///
/// Objects are fetched with `GET {base_url}/{key}`; the bucket must report
/// an `ETag` and a `Content-Length` for every object.
#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpBlobStore {
    pub fn new(base_url: &str) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Self::with_client(client, base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, StoreError> {
        let mut base_url = Url::parse(base_url)?;
        // join() replaces the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            client,
            base_url,
            timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        })
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn object_url(&self, key: &str) -> Result<Url, StoreError> {
        Ok(self.base_url.join(&urlencoding::encode(key))?)
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StoreError> {
        check_key(key)?;
        let url = self.object_url(key)?;
        debug!(%url, "Fetching object");

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => return Err(StoreError::Upstream(status.as_u16())),
            _ => {}
        }

        let headers = response.headers();
        let etag = headers
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(StoreError::MissingMetadata("etag"))?;
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let size = response
            .content_length()
            .ok_or(StoreError::MissingMetadata("content-length"))?;

        let body = response.bytes_stream().map_err(std::io::Error::other);

        Ok(Some(StoredObject {
            size,
            etag,
            content_type,
            body: Box::pin(body),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_url() {
        let store = HttpBlobStore::new("https://bucket.example.com/radio").unwrap();
        assert_eq!(
            store.object_url("01 Intro.flac").unwrap().as_str(),
            "https://bucket.example.com/radio/01%20Intro.flac"
        );

        let store = HttpBlobStore::new("https://bucket.example.com/").unwrap();
        assert_eq!(
            store.object_url("a.flac").unwrap().as_str(),
            "https://bucket.example.com/a.flac"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpBlobStore::new("not a url"),
            Err(StoreError::InvalidUrl(_))
        ));
    }
}
