//! Edge cache: complete HTTP responses keyed by normalized request URL
//!
//! The in-memory implementation is a moka cache weighted by body size.
//! Each entry lives as long as the `max-age` of its own `Cache-Control`
//! header; responses marked `no-store` are never kept.

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use bytes::Bytes;
use moka::Expiry;
use moka::future::Cache as MokaCache;
use std::fmt;
use std::time::{Duration, Instant};

/// Normalized request URL: lower-cased scheme and host, then the path.
///
/// Query string and fragment never take part in the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_parts(scheme: &str, host: &str, path: &str) -> Self {
        Self(format!(
            "{}://{}{}",
            scheme.to_ascii_lowercase(),
            host.to_ascii_lowercase(),
            path
        ))
    }

    /// Key of an incoming request.
    ///
    /// Absolute-form URIs carry their own scheme and authority; otherwise
    /// the scheme comes from `X-Forwarded-Proto` (default `http`) and the
    /// host from the `Host` header.
    pub fn from_request(uri: &Uri, headers: &HeaderMap) -> Self {
        let scheme = uri
            .scheme_str()
            .or_else(|| {
                headers
                    .get("x-forwarded-proto")
                    .and_then(|v| v.to_str().ok())
            })
            .unwrap_or("http");
        let host = uri
            .authority()
            .map(|a| a.as_str())
            .or_else(|| headers.get(header::HOST).and_then(|v| v.to_str().ok()))
            .unwrap_or("localhost");
        Self::from_parts(scheme, host, uri.path())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A complete response as stored in the edge cache
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CachedResponse {
    /// `max-age` directive of the `Cache-Control` header, in seconds
    pub fn max_age(&self) -> Option<u64> {
        self.cache_control_directives().find_map(|directive| {
            let (name, value) = directive.split_once('=')?;
            if name.trim().eq_ignore_ascii_case("max-age") {
                value.trim().trim_matches('"').parse().ok()
            } else {
                None
            }
        })
    }

    /// The response forbids storage
    pub fn is_no_store(&self) -> bool {
        self.cache_control_directives()
            .any(|directive| directive.eq_ignore_ascii_case("no-store"))
    }

    fn cache_control_directives(&self) -> impl Iterator<Item = &str> {
        self.headers
            .get_all(header::CACHE_CONTROL)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(str::trim)
    }
}

/// Shared response cache in front of the origin
#[async_trait]
pub trait EdgeCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Option<CachedResponse>;

    /// Stores a response. Implementations may decline to keep it.
    async fn put(&self, key: CacheKey, response: CachedResponse);
}

struct MaxAgeExpiry;

impl Expiry<CacheKey, CachedResponse> for MaxAgeExpiry {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &CachedResponse,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.max_age().map(Duration::from_secs)
    }
}

/// Default edge cache capacity, in MiB of body bytes
pub const DEFAULT_CAPACITY_MB: u64 = 512;

/// In-memory edge cache
#[derive(Clone)]
pub struct MemoryEdgeCache {
    entries: MokaCache<CacheKey, CachedResponse>,
}

impl MemoryEdgeCache {
    pub fn new() -> Self {
        Self::with_capacity_mb(DEFAULT_CAPACITY_MB)
    }

    /// Cache holding at most `capacity_mb` MiB of response bodies
    pub fn with_capacity_mb(capacity_mb: u64) -> Self {
        Self::with_capacity_bytes(capacity_mb.saturating_mul(1024 * 1024))
    }

    pub fn with_capacity_bytes(capacity: u64) -> Self {
        let entries = MokaCache::builder()
            .max_capacity(capacity)
            .weigher(|_key: &CacheKey, value: &CachedResponse| -> u32 {
                u32::try_from(value.body.len()).unwrap_or(u32::MAX).max(1)
            })
            .expire_after(MaxAgeExpiry)
            .build();
        Self { entries }
    }

    pub async fn invalidate(&self, key: &CacheKey) {
        self.entries.invalidate(key).await;
    }

    /// Approximate number of entries
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Applies pending evictions and refreshes the counters
    pub async fn run_pending_tasks(&self) {
        self.entries.run_pending_tasks().await;
    }
}

impl Default for MemoryEdgeCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EdgeCache for MemoryEdgeCache {
    async fn get(&self, key: &CacheKey) -> Option<CachedResponse> {
        self.entries.get(key).await
    }

    async fn put(&self, key: CacheKey, response: CachedResponse) {
        if response.is_no_store() || response.max_age() == Some(0) {
            tracing::debug!(key = %key, "Response not cacheable, skipped");
            return;
        }
        self.entries.insert(key, response).await;
    }
}
