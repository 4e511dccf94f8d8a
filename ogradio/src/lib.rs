//! Always-on radio station over a fixed playlist
//!
//! This crate provides the station logic of OG Radio: a virtual radio that
//! loops over an ordered playlist forever, and a streaming gateway that
//! serves the audio files through an edge cache.
//!
//! # Features
//!
//! - **Shared playback position**: the current track and the offset inside it
//!   are a pure function of wall-clock time ([`phase::compute_state`]). No
//!   playback state is stored anywhere; every listener hears the same thing.
//! - **Cache-aside streaming**: audio files are served from an [`EdgeCache`]
//!   and fetched from a [`BlobStore`] on a miss ([`StreamGateway`]).
//! - **Range and conditional requests** over the cached body.
//! - **Blob stores**: local directory, public HTTP bucket, in-memory.
//! - **Server extension**: [`RadioServerExt`] mounts the REST API on an
//!   `ogserver::Server`; [`RadioConfigExt`] reads the station settings from
//!   `ogconfig`.
//!
//! # Example
//!
//! ```no_run
//! use ogradio::{Playlist, compute_state};
//!
//! # fn main() -> anyhow::Result<()> {
//! let playlist = Playlist::builtin()?;
//! let now = chrono::Utc::now().timestamp_millis();
//!
//! let state = compute_state(now, &playlist);
//! println!(
//!     "Now playing: {} - {} ({}s in)",
//!     state.track.artist, state.track.title, state.elapsed
//! );
//! # Ok(())
//! # }
//! ```

pub mod api_rest;
pub mod config_ext;
pub mod edge_cache;
pub mod error;
pub mod gateway;
pub mod models;
pub mod phase;
pub mod playlist;
pub mod range;
pub mod server_ext;
pub mod store;

pub use api_rest::{RadioApiDoc, RadioStation, create_router};
pub use config_ext::RadioConfigExt;
pub use edge_cache::{CacheKey, CachedResponse, EdgeCache, MemoryEdgeCache};
pub use error::{GatewayError, PlaylistError, StoreError};
pub use gateway::{CacheOutcome, GatewayResponse, StreamGateway};
pub use models::{RadioState, ScheduledTrack, Track};
pub use phase::{Clock, FixedClock, SystemClock, compute_state, upcoming};
pub use playlist::Playlist;
pub use server_ext::RadioServerExt;
pub use store::{
    BlobStore, ByteStream, FsBlobStore, HttpBlobStore, MemoryBlobStore, StoreKind, StoredObject,
};
