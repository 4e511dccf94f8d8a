//! Backing object stores for the audio files
//!
//! A store is addressed by flat keys (the playlist filenames). It reports
//! the object size and an integrity tag up front and hands the content
//! over as a byte stream; reading that stream is the caller's job.

mod fs;
mod http;
mod memory;

pub use fs::FsBlobStore;
pub use http::HttpBlobStore;
pub use memory::MemoryBlobStore;

use crate::error::StoreError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::io;
use std::str::FromStr;

/// Object content, streamed
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// An object found in a store
pub struct StoredObject {
    /// Size in bytes, as reported by the store
    pub size: u64,
    /// Integrity tag, usable verbatim as an HTTP `ETag`
    pub etag: String,
    /// Content type recorded by the store, if any
    pub content_type: Option<String>,
    pub body: ByteStream,
}

impl std::fmt::Debug for StoredObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredObject")
            .field("size", &self.size)
            .field("etag", &self.etag)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Read-only blob store
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetches an object. `Ok(None)` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StoreError>;
}

/// Available store backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// Local directory
    Fs,
    /// Public bucket over HTTP
    Http,
    /// In-process map, empty at startup
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fs" | "file" | "local" => Ok(Self::Fs),
            "http" | "https" | "bucket" => Ok(Self::Http),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(format!("Unknown store kind: {}", other)),
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Fs => "fs",
            Self::Http => "http",
            Self::Memory => "memory",
        })
    }
}

/// Quoted entity tag derived from the content: first 16 bytes of its
/// SHA-256, hex encoded.
pub fn content_etag(content: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(content);
    format!("\"{}\"", hex::encode(&digest[..16]))
}

/// Flat keys only: no separators, no parent references.
pub(crate) fn check_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key.contains("..") || key.contains('/') || key.contains('\\') {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_etag() {
        let etag = content_etag(b"hello");
        assert_eq!(etag, "\"2cf24dba5fb0a30e26e83b2ac5b9e29e\"");
        assert_ne!(etag, content_etag(b"hello!"));
    }

    #[test]
    fn test_check_key() {
        assert!(check_key("01-Track.flac").is_ok());
        assert!(check_key("").is_err());
        assert!(check_key("../secret").is_err());
        assert!(check_key("a/b.flac").is_err());
        assert!(check_key("a\\b.flac").is_err());
    }

    #[test]
    fn test_store_kind_from_str() {
        assert_eq!("fs".parse::<StoreKind>().unwrap(), StoreKind::Fs);
        assert_eq!("HTTP".parse::<StoreKind>().unwrap(), StoreKind::Http);
        assert_eq!(" memory ".parse::<StoreKind>().unwrap(), StoreKind::Memory);
        assert!("s3".parse::<StoreKind>().is_err());
        assert_eq!(StoreKind::Http.to_string(), "http");
    }
}
