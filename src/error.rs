//! Error types for fetching, decoding and reference-table loading.
//!
//! Lookup misses and merge skips are not errors: lookups resolve to a
//! sentinel and a skipped merge yields an empty collection.

use std::path::PathBuf;

/// Failure to retrieve the raw bytes of a feed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The remote source is not a valid URL
    #[error("invalid feed URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// HTTP request failed (connect, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote endpoint answered with a non-success status
    #[error("feed endpoint {url} returned status {status}")]
    Status { url: String, status: u16 },

    /// Local feed file could not be read
    #[error("failed to read feed file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Bytes that are not a valid GTFS-RT `FeedMessage`.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid GTFS-RT payload: {0}")]
    Protobuf(#[from] prost::DecodeError),

    /// prost leaves proto2 `required` fields unchecked, so an empty body
    /// decodes cleanly unless the header is verified
    #[error("GTFS-RT payload has no header version")]
    MissingHeader,
}

/// Everything that can make a feed unavailable for a merge cycle.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl FeedError {
    /// Short machine-readable category, used in cycle statistics.
    pub fn kind(&self) -> &'static str {
        match self {
            FeedError::Fetch(_) => "fetch_error",
            FeedError::Decode(_) => "decode_error",
        }
    }
}

/// A static reference table could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ReferenceLoadError {
    #[error("failed to open reference table {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed reference table {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}
