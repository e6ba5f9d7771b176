//! Protobuf decoding of GTFS Realtime feeds into canonical entities.

use chrono::Utc;
use prost::Message;
use tracing::debug;

use crate::entity::FeedEntity;
use crate::error::DecodeError;
use crate::gtfs_rt::FeedMessage;
use crate::stats::FeedSummary;

/// Decodes a protobuf-encoded GTFS-RT [`FeedMessage`] from raw bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid protobuf for a `FeedMessage`,
/// or if the required header version is missing.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage, DecodeError> {
    let feed = FeedMessage::decode(bytes)?;
    if feed.header.gtfs_realtime_version.is_empty() {
        return Err(DecodeError::MissingHeader);
    }
    Ok(feed)
}

/// Decodes `bytes` and projects the vehicle-position and trip-update
/// entities. Either the whole message decodes or an error is returned, so
/// a caller never sees a partial feed.
#[tracing::instrument(skip_all, fields(len = bytes.len()))]
pub fn decode_entities(bytes: &[u8]) -> Result<Vec<FeedEntity>, DecodeError> {
    let feed = parse_feed(bytes)?;
    let summary = FeedSummary::from_feed(&feed);
    debug!(?summary, age_secs = summary.age_secs(Utc::now()), "Feed decoded");

    Ok(feed
        .entity
        .into_iter()
        .filter(|e| e.vehicle.is_some() || e.trip_update.is_some())
        .map(FeedEntity::from)
        .collect())
}
