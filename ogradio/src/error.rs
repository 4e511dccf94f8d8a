//! Error types for the radio station

use axum::http::StatusCode;

/// Playlist configuration errors.
///
/// These are startup-time failures: a playlist that does not validate must
/// stop the process before any request is served.
#[derive(Debug, thiserror::Error)]
pub enum PlaylistError {
    /// The playlist has no track at all
    #[error("Playlist is empty")]
    Empty,

    /// Track ids must be positive
    #[error("Track at position {0} has id 0")]
    ZeroId(usize),

    /// Track durations must be positive
    #[error("Track {0} has a zero duration")]
    ZeroDuration(u32),

    /// Two tracks share the same id
    #[error("Duplicate track id: {0}")]
    DuplicateId(u32),

    /// Two tracks share the same object-store key
    #[error("Duplicate filename: {0}")]
    DuplicateFilename(String),

    /// Filename is empty or would escape the store namespace
    #[error("Unsafe filename for track {id}: {filename:?}")]
    UnsafeFilename { id: u32, filename: String },

    /// The playlist file could not be parsed
    #[error("Invalid playlist definition: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The playlist file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures reported by a blob store.
///
/// An absent object is not an error: stores return `Ok(None)` for it.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Local storage failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport failure talking to a remote store
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote store answered with an unexpected status
    #[error("Store returned status {0}")]
    Upstream(u16),

    /// Remote store did not report a required object attribute
    #[error("Store response is missing the {0} attribute")]
    MissingMetadata(&'static str),

    /// Key rejected by the store itself
    #[error("Invalid object key: {0:?}")]
    InvalidKey(String),

    /// Fewer or more bytes than the reported object size
    #[error("Object size mismatch: expected {expected} bytes, read {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// Invalid store endpoint
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Outcome of a streaming request that did not produce audio.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Empty or unsafe identifier, rejected before any I/O
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Identifier is not part of the catalog
    #[error("Unknown track: {0}")]
    NotFound(String),

    /// The playlist lists this file but the backing store does not have it.
    ///
    /// Reported to the client as a 404, logged as catalog/storage drift.
    #[error("Object {0} is listed in the playlist but absent from the store")]
    MissingObject(String),

    /// A station asset (the cover) is absent from the store
    #[error("Asset {0} is absent from the store")]
    AssetNotFound(String),

    /// The backing store failed; nothing was cached
    #[error("Failed to fetch {identifier}: {source}")]
    Internal {
        identifier: String,
        #[source]
        source: StoreError,
    },
}

impl GatewayError {
    /// HTTP status this error is reported with
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) | Self::MissingObject(_) | Self::AssetNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message; never exposes store internals
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier(_) => "Invalid filename",
            Self::NotFound(_) => "Track not found",
            Self::MissingObject(_) => "File not found",
            Self::AssetNotFound(_) => "Cover not found",
            Self::Internal { .. } => "Failed to fetch audio",
        }
    }
}
