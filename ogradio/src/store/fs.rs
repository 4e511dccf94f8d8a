use super::{BlobStore, StoredObject, check_key, content_etag};
use crate::error::StoreError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Store backed by a local directory, one file per key
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StoreError> {
        check_key(key)?;
        let path = self.root.join(key);

        let content = match tokio::fs::read(&path).await {
            Ok(content) => Bytes::from(content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Object not found");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let etag = content_etag(&content);
        let content_type = guess_content_type(key).map(str::to_string);
        Ok(Some(StoredObject {
            size: content.len() as u64,
            etag,
            content_type,
            body: Box::pin(stream::once(async move { Ok(content) })),
        }))
    }
}

fn guess_content_type(key: &str) -> Option<&'static str> {
    let extension = Path::new(key).extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "flac" => Some("audio/flac"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
