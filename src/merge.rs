//! Correlation of vehicle positions with trip updates, and enrichment of
//! the pairs with reference-table attributes.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::entity::{FeedEntity, TripUpdate, VehiclePosition};
use crate::reference::{NOT_FOUND, ReferenceTables};
use crate::stats::{CycleStats, MergeSkip};

/// How vehicle-feed entities are paired with trip-feed entities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Correlation {
    /// Join on trip id, then on vehicle id.
    #[default]
    Keyed,
    /// Pair entities at the same index; surplus entities are dropped.
    Positional,
}

/// A vehicle position merged with its trip update and display attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRecord {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_deleted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<VehiclePosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_update: Option<TripUpdate>,
    pub icon: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_stop_name: Option<String>,
}

#[derive(Debug)]
pub struct Merged {
    pub records: Vec<EnrichedRecord>,
    pub stats: CycleStats,
}

/// Merges the two feeds. `None` on either side means that feed could not
/// be fetched or decoded, and the result is empty.
#[tracing::instrument(skip_all, fields(correlation = ?correlation))]
pub fn merge(
    vehicles: Option<Vec<FeedEntity>>,
    trips: Option<Vec<FeedEntity>>,
    tables: &ReferenceTables,
    correlation: Correlation,
) -> Merged {
    let mut stats = CycleStats {
        vehicle_entities: vehicles.as_ref().map_or(0, Vec::len),
        trip_entities: trips.as_ref().map_or(0, Vec::len),
        ..Default::default()
    };

    let (vehicles, trips) = match (vehicles, trips) {
        (Some(v), Some(t)) => (v, t),
        (v, t) => {
            let skip = match (v.is_none(), t.is_none()) {
                (true, true) => MergeSkip::BothFeedsUnavailable,
                (true, false) => MergeSkip::VehicleFeedUnavailable,
                _ => MergeSkip::TripFeedUnavailable,
            };
            warn!(?skip, "Merge skipped, upstream feed unavailable");
            stats.skipped = Some(skip);
            return Merged {
                records: Vec::new(),
                stats,
            };
        }
    };

    let pairs = match correlation {
        Correlation::Keyed => pair_keyed(vehicles, &trips, &mut stats),
        Correlation::Positional => pair_positional(vehicles, trips, &mut stats),
    };

    let mut merger = Merger { tables, stats };
    let records: Vec<_> = pairs
        .into_iter()
        .map(|(entity, trip_update)| merger.enrich(entity, trip_update))
        .collect();

    merger.stats.records = records.len();
    Merged {
        records,
        stats: merger.stats,
    }
}

fn pair_keyed(
    vehicles: Vec<FeedEntity>,
    trips: &[FeedEntity],
    stats: &mut CycleStats,
) -> Vec<(FeedEntity, Option<TripUpdate>)> {
    let mut by_trip_id: HashMap<&str, &TripUpdate> = HashMap::new();
    let mut by_vehicle_id: HashMap<&str, &TripUpdate> = HashMap::new();
    for update in trips.iter().filter_map(|e| e.trip_update.as_ref()) {
        if let Some(id) = update.trip.trip_id.as_deref().filter(|id| !id.is_empty()) {
            by_trip_id.entry(id).or_insert(update);
        }
        let vehicle_id = update.vehicle.as_ref().and_then(|d| d.id.as_deref());
        if let Some(id) = vehicle_id.filter(|id| !id.is_empty()) {
            by_vehicle_id.entry(id).or_insert(update);
        }
    }

    vehicles
        .into_iter()
        .map(|entity| {
            let update = entity
                .trip_id()
                .and_then(|id| by_trip_id.get(id))
                .or_else(|| entity.vehicle_id().and_then(|id| by_vehicle_id.get(id)))
                .map(|update| (*update).clone());

            if update.is_none() {
                stats.unmatched_vehicles += 1;
                debug!(entity_id = %entity.id, "No trip update for vehicle");
            }
            (entity, update)
        })
        .collect()
}

fn pair_positional(
    vehicles: Vec<FeedEntity>,
    trips: Vec<FeedEntity>,
    stats: &mut CycleStats,
) -> Vec<(FeedEntity, Option<TripUpdate>)> {
    if vehicles.len() != trips.len() {
        stats.dropped_entities = vehicles.len().abs_diff(trips.len());
        warn!(
            vehicles = vehicles.len(),
            trip_updates = trips.len(),
            dropped = stats.dropped_entities,
            "Feed lengths differ, surplus entities dropped"
        );
    }

    vehicles
        .into_iter()
        .zip(trips)
        .map(|(vehicle, trip)| (vehicle, trip.trip_update))
        .collect()
}

fn count_miss(value: String, misses: &mut usize) -> String {
    if value == NOT_FOUND {
        *misses += 1;
    }
    value
}

struct Merger<'a> {
    tables: &'a ReferenceTables,
    stats: CycleStats,
}

impl Merger<'_> {
    fn enrich(&mut self, entity: FeedEntity, trip_update: Option<TripUpdate>) -> EnrichedRecord {
        let tables = self.tables;
        let trip_update = trip_update.map(|update| self.enrich_trip(update));

        let label = entity
            .vehicle
            .as_ref()
            .and_then(|v| v.vehicle.as_ref())
            .and_then(|d| d.label.as_deref())
            .unwrap_or("");
        let icon = tables.vehicle_icon(label);
        if icon.is_default {
            self.stats.default_icons += 1;
        }
        let icon = icon.url.to_string();

        let next_stop_name = self.next_stop_name(entity.vehicle.as_ref(), trip_update.as_ref());

        EnrichedRecord {
            id: entity.id,
            is_deleted: entity.is_deleted,
            vehicle: entity.vehicle,
            trip_update,
            icon,
            next_stop_name,
        }
    }

    fn enrich_trip(&mut self, mut update: TripUpdate) -> TripUpdate {
        let tables = self.tables;
        let route_id = update.trip.route_id.clone().unwrap_or_default();

        update.trip.route_short_name = Some(count_miss(
            tables.route_short_name(&route_id),
            &mut self.stats.route_name_misses,
        ));
        update.trip.destination_stop_name = Some(count_miss(
            tables.destination_stop_name(&route_id),
            &mut self.stats.destination_misses,
        ));

        for stop in &mut update.stop_time_update {
            let name = count_miss(
                tables.stop_name(stop.stop_id.as_deref().unwrap_or("")),
                &mut self.stats.stop_name_misses,
            );
            stop.stop_name = Some(name);
        }

        update
    }

    /// Name of the stop the vehicle is heading to or standing at: the trip
    /// stop matching its current stop sequence, else its own stop id.
    fn next_stop_name(
        &self,
        vehicle: Option<&VehiclePosition>,
        trip_update: Option<&TripUpdate>,
    ) -> Option<String> {
        let vehicle = vehicle?;

        let from_trip = vehicle.current_stop_sequence.and_then(|seq| {
            trip_update?
                .stop_time_update
                .iter()
                .find(|stop| stop.stop_sequence == Some(seq))?
                .stop_name
                .clone()
        });

        from_trip.or_else(|| Some(self.tables.stop_name(vehicle.stop_id.as_deref()?)))
    }
}
