//! Cache-aside streaming of the audio files
//!
//! ```text
//! Validating -> Rejected
//! Validating -> CacheLookup -> HitServed
//! Validating -> CacheLookup -> StoreFetch -> Served | NotFound | Internal
//! ```
//!
//! Concurrent first requests for the same file are not coalesced: each of
//! them may fetch from the store and populate the cache. Objects are
//! immutable, so the redundant writes store identical content.

use crate::edge_cache::{CacheKey, CachedResponse, EdgeCache};
use crate::error::{GatewayError, StoreError};
use crate::playlist::Playlist;
use crate::store::{BlobStore, StoredObject};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use bytes::{Bytes, BytesMut};
use futures::TryStreamExt;
use std::sync::Arc;
use tracing::{debug, error, info};

/// `Cache-Control` of audio and cover responses
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

pub use ogserver::cors::ALLOWED_METHODS;

/// Every playlist file is served as FLAC, whatever the store recorded
pub const AUDIO_CONTENT_TYPE: &str = "audio/flac";

/// Upper bound of the buffer reserved from the size a store reports
const MAX_PREALLOCATION: usize = 8 * 1024 * 1024;

/// How the `Content-Type` of a fetched object is chosen
#[derive(Debug, Clone, Copy)]
enum ContentType<'a> {
    /// Always this value
    Fixed(&'a str),
    /// The store's value, else this one
    StoreOr(&'a str),
}

impl ContentType<'_> {
    fn resolve(self, reported: Option<&str>) -> String {
        match self {
            Self::Fixed(value) => value.to_string(),
            Self::StoreOr(default) => reported.unwrap_or(default).to_string(),
        }
    }
}

/// Where a served response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
}

impl CacheOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
        }
    }
}

/// A response ready to be served
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub outcome: CacheOutcome,
    pub response: CachedResponse,
}

/// Streaming gateway: playlist catalog, edge cache and blob store
#[derive(Clone)]
pub struct StreamGateway {
    playlist: Arc<Playlist>,
    cache: Arc<dyn EdgeCache>,
    store: Arc<dyn BlobStore>,
}

impl StreamGateway {
    pub fn new(
        playlist: Arc<Playlist>,
        cache: Arc<dyn EdgeCache>,
        store: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            playlist,
            cache,
            store,
        }
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    /// Checks a raw path segment and resolves it to a playlist filename.
    ///
    /// Safety checks run on the segment as received, before percent-decoding,
    /// so an encoded traversal cannot slip through once decoded: the
    /// decoded name must still be an exact playlist filename.
    pub fn validate_identifier(&self, raw: &str) -> Result<String, GatewayError> {
        if raw.is_empty() || raw.contains("..") {
            return Err(GatewayError::InvalidIdentifier(raw.to_string()));
        }

        let decoded = urlencoding::decode(raw)
            .map_err(|_| GatewayError::InvalidIdentifier(raw.to_string()))?;

        if self.playlist.contains(&decoded) {
            Ok(decoded.into_owned())
        } else {
            Err(GatewayError::NotFound(decoded.into_owned()))
        }
    }

    /// Serves the audio file named by `raw_identifier`
    pub async fn handle_stream(
        &self,
        raw_identifier: &str,
        cache_key: CacheKey,
    ) -> Result<GatewayResponse, GatewayError> {
        let filename = self.validate_identifier(raw_identifier)?;

        match self
            .cache_aside(&filename, cache_key, ContentType::Fixed(AUDIO_CONTENT_TYPE))
            .await?
        {
            Some(response) => Ok(response),
            None => {
                error!(
                    filename = %filename,
                    "Catalog/storage drift: playlist file is absent from the store"
                );
                Err(GatewayError::MissingObject(filename))
            }
        }
    }

    /// Serves a station asset that is not part of the playlist (the cover)
    pub async fn handle_asset(
        &self,
        object_key: &str,
        cache_key: CacheKey,
        default_content_type: &str,
    ) -> Result<GatewayResponse, GatewayError> {
        self.cache_aside(object_key, cache_key, ContentType::StoreOr(default_content_type))
            .await?
            .ok_or_else(|| GatewayError::AssetNotFound(object_key.to_string()))
    }

    /// Cache lookup, then store fetch and cache population on a miss.
    ///
    /// `Ok(None)` when the store does not have the object.
    async fn cache_aside(
        &self,
        object_key: &str,
        cache_key: CacheKey,
        content_type: ContentType<'_>,
    ) -> Result<Option<GatewayResponse>, GatewayError> {
        if let Some(mut response) = self.cache.get(&cache_key).await {
            debug!(key = %cache_key, "Cache HIT");
            apply_cors(&mut response.headers);
            return Ok(Some(GatewayResponse {
                outcome: CacheOutcome::Hit,
                response,
            }));
        }

        debug!(key = %cache_key, "Cache MISS");
        let internal = |source: StoreError| {
            error!(identifier = %object_key, error = %source, "Store fetch failed");
            GatewayError::Internal {
                identifier: object_key.to_string(),
                source,
            }
        };

        let Some(object) = self.store.get(object_key).await.map_err(internal)? else {
            return Ok(None);
        };

        let etag = object.etag.clone();
        let content_type = content_type.resolve(object.content_type.as_deref());
        let body = read_body(object).await.map_err(internal)?;

        let headers = success_headers(&content_type, body.len(), &etag).map_err(internal)?;
        let response = CachedResponse {
            status: StatusCode::OK,
            headers,
            body,
        };

        // the cached copy and the returned copy share the same buffer
        self.cache.put(cache_key, response.clone()).await;
        info!(identifier = %object_key, size = response.body.len(), "Object cached");

        Ok(Some(GatewayResponse {
            outcome: CacheOutcome::Miss,
            response,
        }))
    }
}

/// Reads the whole object, checking it against the size the store reported
async fn read_body(object: StoredObject) -> Result<Bytes, StoreError> {
    let expected = object.size;
    let capacity = usize::try_from(expected)
        .unwrap_or(usize::MAX)
        .min(MAX_PREALLOCATION);
    let buffer = object
        .body
        .try_fold(BytesMut::with_capacity(capacity), |mut buffer, chunk| async move {
            buffer.extend_from_slice(&chunk);
            Ok(buffer)
        })
        .await?;

    let actual = buffer.len() as u64;
    if actual != expected {
        return Err(StoreError::SizeMismatch { expected, actual });
    }
    Ok(buffer.freeze())
}

fn success_headers(content_type: &str, size: usize, etag: &str) -> Result<HeaderMap, StoreError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .map_err(|_| StoreError::MissingMetadata("content-type"))?,
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    headers.insert(
        header::ETAG,
        HeaderValue::from_str(etag).map_err(|_| StoreError::MissingMetadata("etag"))?,
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(IMMUTABLE_CACHE_CONTROL),
    );
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    apply_cors(&mut headers);
    Ok(headers)
}

/// Cross-origin headers present on every audio response
pub fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge_cache::MemoryEdgeCache;
    use crate::models::Track;
    use crate::store::MemoryBlobStore;

    fn gateway() -> (StreamGateway, Arc<MemoryBlobStore>) {
        let playlist = Playlist::new(vec![
            Track {
                id: 1,
                title: "One".into(),
                artist: "A".into(),
                filename: "01-One.flac".into(),
                duration: 10,
            },
            Track {
                id: 2,
                title: "Two".into(),
                artist: "A".into(),
                filename: "02 Two.flac".into(),
                duration: 20,
            },
        ])
        .unwrap();
        let store = Arc::new(MemoryBlobStore::new());
        let gateway = StreamGateway::new(
            Arc::new(playlist),
            Arc::new(MemoryEdgeCache::new()),
            store.clone(),
        );
        (gateway, store)
    }

    fn key(path: &str) -> CacheKey {
        CacheKey::from_parts("http", "localhost", path)
    }

    #[test]
    fn test_validate_identifier() {
        let (gateway, _) = gateway();

        assert!(matches!(
            gateway.validate_identifier(""),
            Err(GatewayError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            gateway.validate_identifier("../../etc/passwd"),
            Err(GatewayError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            gateway.validate_identifier("nonexistent.flac"),
            Err(GatewayError::NotFound(_))
        ));
        assert_eq!(gateway.validate_identifier("01-One.flac").unwrap(), "01-One.flac");
        assert_eq!(
            gateway.validate_identifier("02%20Two.flac").unwrap(),
            "02 Two.flac"
        );
        // encoded dots decode to a traversal that is not a playlist entry
        assert!(matches!(
            gateway.validate_identifier("%2E%2E%2Fsecret"),
            Err(GatewayError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let (gateway, store) = gateway();
        store.insert("01-One.flac", &b"fLaC0123"[..]);

        let first = gateway
            .handle_stream("01-One.flac", key("/api/audio/01-One.flac"))
            .await
            .unwrap();
        assert_eq!(first.outcome, CacheOutcome::Miss);
        let headers = &first.response.headers;
        assert_eq!(headers[header::CONTENT_TYPE], "audio/flac");
        assert_eq!(headers[header::CONTENT_LENGTH], "8");
        assert_eq!(headers[header::CACHE_CONTROL], IMMUTABLE_CACHE_CONTROL);
        assert_eq!(headers[header::ACCEPT_RANGES], "bytes");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        store.remove("01-One.flac");
        let second = gateway
            .handle_stream("01-One.flac", key("/api/audio/01-One.flac"))
            .await
            .unwrap();
        assert_eq!(second.outcome, CacheOutcome::Hit);
        assert_eq!(second.response.body, first.response.body);
        assert_eq!(
            second.response.headers[header::ACCESS_CONTROL_ALLOW_METHODS],
            ALLOWED_METHODS
        );
    }

    #[tokio::test]
    async fn test_missing_object() {
        let (gateway, _) = gateway();
        let err = gateway
            .handle_stream("01-One.flac", key("/api/audio/01-One.flac"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::MissingObject(ref f) if f == "01-One.flac"));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_asset_not_in_playlist() {
        let (gateway, store) = gateway();
        assert!(matches!(
            gateway
                .handle_asset("cover.jpg", key("/api/cover"), "image/jpeg")
                .await,
            Err(GatewayError::AssetNotFound(_))
        ));

        store.insert("cover.jpg", &b"\xff\xd8\xff"[..]);
        let cover = gateway
            .handle_asset("cover.jpg", key("/api/cover"), "image/jpeg")
            .await
            .unwrap();
        assert_eq!(cover.response.headers[header::CONTENT_TYPE], "image/jpeg");
    }

    #[tokio::test]
    async fn test_audio_content_type_ignores_store() {
        let (gateway, store) = gateway();
        store.insert_with_type("01-One.flac", &b"fLaC"[..], Some("application/octet-stream"));
        store.insert_with_type("cover.png", &b"\x89PNG"[..], Some("image/png"));

        let audio = gateway
            .handle_stream("01-One.flac", key("/api/audio/01-One.flac"))
            .await
            .unwrap();
        assert_eq!(audio.response.headers[header::CONTENT_TYPE], AUDIO_CONTENT_TYPE);

        let cover = gateway
            .handle_asset("cover.png", key("/api/cover"), "image/jpeg")
            .await
            .unwrap();
        assert_eq!(cover.response.headers[header::CONTENT_TYPE], "image/png");
    }
}
