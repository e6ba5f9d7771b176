use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::gtfs_rt::FeedMessage;

/// Entity counts and header metadata of one decoded feed.
#[derive(Debug, Default, Serialize)]
pub struct FeedSummary {
    pub gtfs_realtime_version: String,
    pub header_timestamp: Option<DateTime<Utc>>,
    pub total_entities: usize,

    // entity types
    pub vehicles: usize,
    pub trip_updates: usize,
    pub alerts: usize,
    pub other: usize,

    // vehicle fields the merge depends on
    pub with_trip_id: usize,
    pub with_vehicle_label: usize,
    pub with_current_stop_sequence: usize,
}

impl FeedSummary {
    pub fn from_feed(feed: &FeedMessage) -> Self {
        let mut s = FeedSummary {
            gtfs_realtime_version: feed.header.gtfs_realtime_version.clone(),
            header_timestamp: feed
                .header
                .timestamp
                .and_then(|t| i64::try_from(t).ok())
                .and_then(|t| DateTime::from_timestamp(t, 0)),
            total_entities: feed.entity.len(),
            ..Default::default()
        };

        for e in &feed.entity {
            if let Some(v) = &e.vehicle {
                s.vehicles += 1;

                if v.trip.as_ref().is_some_and(|t| t.trip_id.is_some()) {
                    s.with_trip_id += 1;
                }

                if v.vehicle.as_ref().is_some_and(|d| d.label.is_some()) {
                    s.with_vehicle_label += 1;
                }

                if v.current_stop_sequence.is_some() {
                    s.with_current_stop_sequence += 1;
                }
            }

            if e.trip_update.is_some() {
                s.trip_updates += 1;
            }

            if e.alert.is_some() {
                s.alerts += 1;
            }

            if e.shape.is_some() || e.stop.is_some() || e.trip_modifications.is_some() {
                s.other += 1;
            }
        }

        s
    }

    /// Seconds between the feed header timestamp and `now`.
    pub fn age_secs(&self, now: DateTime<Utc>) -> Option<i64> {
        self.header_timestamp.map(|t| (now - t).num_seconds())
    }
}

/// Why a merge cycle produced nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeSkip {
    VehicleFeedUnavailable,
    TripFeedUnavailable,
    BothFeedsUnavailable,
}

/// Outcome counters of one fetch-and-merge cycle.
///
/// Failures never reach the client, so this is where they are surfaced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleStats {
    pub timestamp: DateTime<Utc>,
    pub vehicle_entities: usize,
    pub trip_entities: usize,
    pub records: usize,

    // correlation
    pub unmatched_vehicles: usize,
    pub dropped_entities: usize,
    pub skipped: Option<MergeSkip>,

    // lookups resolved to the sentinel
    pub route_name_misses: usize,
    pub destination_misses: usize,
    pub stop_name_misses: usize,
    pub default_icons: usize,

    // error tracking
    pub vehicle_feed_error: Option<String>,
    pub trip_feed_error: Option<String>,
}

impl Default for CycleStats {
    fn default() -> Self {
        Self {
            timestamp: Utc::now(),
            vehicle_entities: 0,
            trip_entities: 0,
            records: 0,
            unmatched_vehicles: 0,
            dropped_entities: 0,
            skipped: None,
            route_name_misses: 0,
            destination_misses: 0,
            stop_name_misses: 0,
            default_icons: 0,
            vehicle_feed_error: None,
            trip_feed_error: None,
        }
    }
}

impl CycleStats {
    pub fn lookup_misses(&self) -> usize {
        self.route_name_misses + self.destination_misses + self.stop_name_misses
    }

    /// Records which side failed, as reported by
    /// [`FeedError::kind`](crate::error::FeedError::kind).
    pub fn with_feed_errors(
        mut self,
        vehicle_error: Option<&str>,
        trip_error: Option<&str>,
    ) -> Self {
        self.vehicle_feed_error = vehicle_error.map(str::to_string);
        self.trip_feed_error = trip_error.map(str::to_string);
        self
    }
}
