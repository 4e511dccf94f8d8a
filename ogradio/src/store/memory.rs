use super::{BlobStore, StoredObject, check_key, content_etag};
use crate::error::StoreError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Clone)]
struct MemoryObject {
    content: Bytes,
    etag: String,
    content_type: Option<String>,
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, MemoryObject>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores (or replaces) an object; its tag is derived from the content
    pub fn insert(&self, key: impl Into<String>, content: impl Into<Bytes>) {
        self.insert_with_type(key, content, None::<String>);
    }

    pub fn insert_with_type(
        &self,
        key: impl Into<String>,
        content: impl Into<Bytes>,
        content_type: Option<impl Into<String>>,
    ) {
        let content = content.into();
        let object = MemoryObject {
            etag: content_etag(&content),
            content,
            content_type: content_type.map(Into::into),
        };
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), object);
    }

    pub fn remove(&self, key: &str) -> bool {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StoreError> {
        check_key(key)?;
        let object = self
            .objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned();

        Ok(object.map(|object| {
            let content = object.content;
            StoredObject {
                size: content.len() as u64,
                etag: object.etag,
                content_type: object.content_type,
                body: Box::pin(stream::once(async move { Ok(content) })),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_get_remove() {
        let store = MemoryBlobStore::new();
        assert!(store.is_empty());

        store.insert("a.flac", &b"abc"[..]);
        let object = store.get("a.flac").await.unwrap().unwrap();
        assert_eq!(object.size, 3);
        assert_eq!(object.etag, content_etag(b"abc"));
        assert!(object.content_type.is_none());

        assert!(store.remove("a.flac"));
        assert!(store.get("a.flac").await.unwrap().is_none());
    }
}
