//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use ogradio::{
    BlobStore, CacheKey, CachedResponse, EdgeCache, FixedClock, MemoryBlobStore,
    MemoryEdgeCache, Playlist, RadioStation, StoreError, StoredObject, StreamGateway, Track,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Blob store wrapper counting `get` calls
pub struct CountingStore<S> {
    pub inner: S,
    pub fetches: AtomicUsize,
}

impl<S> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: BlobStore> BlobStore for CountingStore<S> {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }
}

/// Blob store that always fails
pub struct FailingStore;

#[async_trait]
impl BlobStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<StoredObject>, StoreError> {
        Err(StoreError::Upstream(503))
    }
}

/// Edge cache wrapper counting `put` calls
pub struct CountingCache {
    pub inner: MemoryEdgeCache,
    pub puts: AtomicUsize,
}

impl CountingCache {
    pub fn new() -> Self {
        Self {
            inner: MemoryEdgeCache::new(),
            puts: AtomicUsize::new(0),
        }
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EdgeCache for CountingCache {
    async fn get(&self, key: &CacheKey) -> Option<CachedResponse> {
        self.inner.get(key).await
    }

    async fn put(&self, key: CacheKey, response: CachedResponse) {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, response).await;
    }
}

pub fn track(id: u32, filename: &str, duration: u32) -> Track {
    Track {
        id,
        title: format!("Track {}", id),
        artist: "Test Artist".into(),
        filename: filename.into(),
        duration,
    }
}

/// Three tracks of 10, 20 and 5 seconds
pub fn sample_playlist() -> Arc<Playlist> {
    Arc::new(
        Playlist::new(vec![
            track(1, "01-First.flac", 10),
            track(2, "02-Second.flac", 20),
            track(3, "03 Third.flac", 5),
        ])
        .unwrap(),
    )
}

pub fn audio_bytes() -> Vec<u8> {
    (0..=255u8).cycle().take(4096).collect()
}

pub struct Fixture {
    pub station: RadioStation,
    pub store: Arc<CountingStore<MemoryBlobStore>>,
    pub cache: Arc<CountingCache>,
}

/// Station over the sample playlist, frozen at `now_ms`, with the first
/// track and a cover in the store
pub fn fixture(now_ms: i64) -> Fixture {
    let playlist = sample_playlist();

    let memory = MemoryBlobStore::new();
    memory.insert("01-First.flac", audio_bytes());
    memory.insert("03 Third.flac", &b"third"[..]);
    memory.insert("cover.jpg", &b"\xff\xd8\xffcover"[..]);

    let store = Arc::new(CountingStore::new(memory));
    let cache = Arc::new(CountingCache::new());

    let station = RadioStation {
        gateway: StreamGateway::new(playlist.clone(), cache.clone(), store.clone()),
        playlist,
        clock: Arc::new(FixedClock(now_ms)),
        state_max_age: 5,
        cover_key: "cover.jpg".into(),
    };

    Fixture {
        station,
        store,
        cache,
    }
}
