//! One fetch-decode-merge cycle over the two configured feeds.

use std::sync::Arc;

use tracing::{error, info};

use crate::entity::FeedEntity;
use crate::error::FeedError;
use crate::fetch::{FeedFetcher, FeedSource};
use crate::merge::{Correlation, EnrichedRecord, Merged, merge};
use crate::parser::decode_entities;
use crate::reference::ReferenceTables;

/// Fetches and merges the vehicle-position and trip-update feeds.
///
/// Nothing is cached between cycles; the reference tables are shared and
/// never written.
pub struct FeedService {
    fetcher: FeedFetcher,
    vehicle_source: FeedSource,
    trip_source: FeedSource,
    tables: Arc<ReferenceTables>,
    correlation: Correlation,
}

impl FeedService {
    pub fn new(
        fetcher: FeedFetcher,
        vehicle_source: FeedSource,
        trip_source: FeedSource,
        tables: Arc<ReferenceTables>,
        correlation: Correlation,
    ) -> Self {
        Self {
            fetcher,
            vehicle_source,
            trip_source,
            tables,
            correlation,
        }
    }

    async fn load(&self, source: &FeedSource) -> Result<Vec<FeedEntity>, FeedError> {
        let bytes = self.fetcher.fetch(source).await?;
        Ok(decode_entities(&bytes)?)
    }

    /// Runs a cycle and returns the records together with its statistics.
    /// Feed failures are logged here and never returned.
    #[tracing::instrument(skip(self), fields(correlation = ?self.correlation))]
    pub async fn run_cycle(&self) -> Merged {
        let (vehicles, trips) = tokio::join!(
            self.load(&self.vehicle_source),
            self.load(&self.trip_source)
        );

        let vehicle_error = vehicles.as_ref().err().map(FeedError::kind);
        let trip_error = trips.as_ref().err().map(FeedError::kind);
        let vehicles = ok_or_log(vehicles, &self.vehicle_source);
        let trips = ok_or_log(trips, &self.trip_source);

        let mut merged = merge(vehicles, trips, &self.tables, self.correlation);
        merged.stats = merged.stats.with_feed_errors(vehicle_error, trip_error);

        let stats = &merged.stats;
        info!(
            vehicles = stats.vehicle_entities,
            trip_updates = stats.trip_entities,
            records = stats.records,
            unmatched = stats.unmatched_vehicles,
            dropped = stats.dropped_entities,
            lookup_misses = stats.lookup_misses(),
            default_icons = stats.default_icons,
            skipped = ?stats.skipped,
            "Merge cycle complete"
        );
        merged
    }

    /// The records of one cycle; empty when either feed is unavailable.
    pub async fn collect(&self) -> Vec<EnrichedRecord> {
        self.run_cycle().await.records
    }
}

fn ok_or_log(
    result: Result<Vec<FeedEntity>, FeedError>,
    source: &FeedSource,
) -> Option<Vec<FeedEntity>> {
    result
        .map_err(|e| error!(error = %e, kind = e.kind(), source = %source, "Feed unavailable"))
        .ok()
}
