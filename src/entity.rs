//! Canonical object shape of decoded feed entities.
//!
//! Field names are camelCase, 64-bit integers are decimal strings, enums are
//! their symbolic names and unset fields are omitted, so the JSON output is
//! the same one a protobuf-to-object conversion with string longs and string
//! enums would produce. Only vehicle positions and trip updates are carried.

use serde::Serialize;

use crate::gtfs_rt as pb;

/// Renders an optional proto enum as its symbolic name, or the raw number
/// when the producer sent a value this schema does not know.
macro_rules! enum_name {
    ($ty:ty, $value:expr) => {
        $value.map(|v| match <$ty>::try_from(v) {
            Ok(e) => e.as_str_name().to_string(),
            Err(_) => v.to_string(),
        })
    };
}

fn long(value: Option<impl ToString>) -> Option<String> {
    value.map(|v| v.to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntity {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_deleted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_update: Option<TripUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<VehiclePosition>,
}

impl FeedEntity {
    /// Trip id carried by this entity's vehicle position or trip update.
    pub fn trip_id(&self) -> Option<&str> {
        let trip = match (&self.vehicle, &self.trip_update) {
            (Some(v), _) => v.trip.as_ref(),
            (None, Some(t)) => Some(&t.trip),
            (None, None) => None,
        };
        trip.and_then(|t| t.trip_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Vehicle id carried by this entity's vehicle position or trip update.
    pub fn vehicle_id(&self) -> Option<&str> {
        let descriptor = match (&self.vehicle, &self.trip_update) {
            (Some(v), _) => v.vehicle.as_ref(),
            (None, Some(t)) => t.vehicle.as_ref(),
            (None, None) => None,
        };
        descriptor
            .and_then(|d| d.id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

impl From<pb::FeedEntity> for FeedEntity {
    fn from(e: pb::FeedEntity) -> Self {
        Self {
            id: e.id,
            is_deleted: e.is_deleted,
            trip_update: e.trip_update.map(TripUpdate::from),
            vehicle: e.vehicle.map(VehiclePosition::from),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehiclePosition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip: Option<TripDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<VehicleDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_stop_sequence: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub congestion_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupancy_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupancy_percentage: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub multi_carriage_details: Vec<CarriageDetails>,
}

impl From<pb::VehiclePosition> for VehiclePosition {
    fn from(v: pb::VehiclePosition) -> Self {
        use pb::vehicle_position::{CongestionLevel, OccupancyStatus, VehicleStopStatus};

        Self {
            trip: v.trip.map(TripDescriptor::from),
            vehicle: v.vehicle.map(VehicleDescriptor::from),
            position: v.position.map(Position::from),
            current_stop_sequence: v.current_stop_sequence,
            stop_id: v.stop_id,
            current_status: enum_name!(VehicleStopStatus, v.current_status),
            timestamp: long(v.timestamp),
            congestion_level: enum_name!(CongestionLevel, v.congestion_level),
            occupancy_status: enum_name!(OccupancyStatus, v.occupancy_status),
            occupancy_percentage: v.occupancy_percentage,
            multi_carriage_details: v
                .multi_carriage_details
                .into_iter()
                .map(CarriageDetails::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarriageDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupancy_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupancy_percentage: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carriage_sequence: Option<u32>,
}

impl From<pb::vehicle_position::CarriageDetails> for CarriageDetails {
    fn from(c: pb::vehicle_position::CarriageDetails) -> Self {
        Self {
            id: c.id,
            label: c.label,
            occupancy_status: enum_name!(
                pb::vehicle_position::OccupancyStatus,
                c.occupancy_status
            ),
            occupancy_percentage: c.occupancy_percentage,
            carriage_sequence: c.carriage_sequence,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub latitude: f32,
    pub longitude: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearing: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odometer: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
}

impl From<pb::Position> for Position {
    fn from(p: pb::Position) -> Self {
        Self {
            latitude: p.latitude,
            longitude: p.longitude,
            bearing: p.bearing,
            odometer: p.odometer,
            speed: p.speed,
        }
    }
}

/// Trip descriptor, plus the display attributes added during enrichment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_relationship: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_trip: Option<ModifiedTripSelector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_short_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_stop_name: Option<String>,
}

impl From<pb::TripDescriptor> for TripDescriptor {
    fn from(t: pb::TripDescriptor) -> Self {
        Self {
            trip_id: t.trip_id,
            route_id: t.route_id,
            direction_id: t.direction_id,
            start_time: t.start_time,
            start_date: t.start_date,
            schedule_relationship: enum_name!(
                pb::trip_descriptor::ScheduleRelationship,
                t.schedule_relationship
            ),
            modified_trip: t.modified_trip.map(|m| ModifiedTripSelector {
                modifications_id: m.modifications_id,
                affected_trip_id: m.affected_trip_id,
                start_time: m.start_time,
                start_date: m.start_date,
            }),
            route_short_name: None,
            destination_stop_name: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifiedTripSelector {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifications_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_trip_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_plate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wheelchair_accessible: Option<String>,
}

impl From<pb::VehicleDescriptor> for VehicleDescriptor {
    fn from(d: pb::VehicleDescriptor) -> Self {
        Self {
            id: d.id,
            label: d.label,
            license_plate: d.license_plate,
            wheelchair_accessible: enum_name!(
                pb::vehicle_descriptor::WheelchairAccessible,
                d.wheelchair_accessible
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripUpdate {
    pub trip: TripDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<VehicleDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop_time_update: Vec<StopTimeUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_properties: Option<TripProperties>,
}

impl From<pb::TripUpdate> for TripUpdate {
    fn from(t: pb::TripUpdate) -> Self {
        Self {
            trip: TripDescriptor::from(t.trip),
            vehicle: t.vehicle.map(VehicleDescriptor::from),
            stop_time_update: t
                .stop_time_update
                .into_iter()
                .map(StopTimeUpdate::from)
                .collect(),
            timestamp: long(t.timestamp),
            delay: t.delay,
            trip_properties: t.trip_properties.map(|p| TripProperties {
                trip_id: p.trip_id,
                start_date: p.start_date,
                start_time: p.start_time,
                shape_id: p.shape_id,
                trip_headsign: p.trip_headsign,
                trip_short_name: p.trip_short_name,
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_headsign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_short_name: Option<String>,
}

/// Stop-time update, plus the stop name added during enrichment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopTimeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequence: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival: Option<StopTimeEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure: Option<StopTimeEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_occupancy_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_relationship: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_time_properties: Option<StopTimeProperties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_name: Option<String>,
}

impl From<pb::trip_update::StopTimeUpdate> for StopTimeUpdate {
    fn from(s: pb::trip_update::StopTimeUpdate) -> Self {
        use pb::trip_update::stop_time_update::{
            ScheduleRelationship, stop_time_properties::DropOffPickupType,
        };

        Self {
            stop_sequence: s.stop_sequence,
            stop_id: s.stop_id,
            arrival: s.arrival.map(StopTimeEvent::from),
            departure: s.departure.map(StopTimeEvent::from),
            departure_occupancy_status: enum_name!(
                pb::vehicle_position::OccupancyStatus,
                s.departure_occupancy_status
            ),
            schedule_relationship: enum_name!(ScheduleRelationship, s.schedule_relationship),
            stop_time_properties: s.stop_time_properties.map(|p| StopTimeProperties {
                assigned_stop_id: p.assigned_stop_id,
                stop_headsign: p.stop_headsign,
                pickup_type: enum_name!(DropOffPickupType, p.pickup_type),
                drop_off_type: enum_name!(DropOffPickupType, p.drop_off_type),
            }),
            stop_name: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopTimeProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_stop_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_headsign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drop_off_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopTimeEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uncertainty: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<String>,
}

impl From<pb::trip_update::StopTimeEvent> for StopTimeEvent {
    fn from(e: pb::trip_update::StopTimeEvent) -> Self {
        Self {
            delay: e.delay,
            time: long(e.time),
            uncertainty: e.uncertainty,
            scheduled_time: long(e.scheduled_time),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_longs_and_enums_render_as_strings() {
        let vehicle = VehiclePosition::from(pb::VehiclePosition {
            current_status: Some(pb::vehicle_position::VehicleStopStatus::StoppedAt as i32),
            timestamp: Some(1_700_000_000),
            current_stop_sequence: Some(4),
            ..Default::default()
        });

        let value = serde_json::to_value(&vehicle).unwrap();
        assert_eq!(
            value,
            json!({
                "currentStatus": "STOPPED_AT",
                "timestamp": "1700000000",
                "currentStopSequence": 4,
            })
        );
    }

    #[test]
    fn test_unknown_enum_value_renders_as_number() {
        let descriptor = TripDescriptor::from(pb::TripDescriptor {
            schedule_relationship: Some(42),
            ..Default::default()
        });
        assert_eq!(descriptor.schedule_relationship.as_deref(), Some("42"));
    }

    #[test]
    fn test_stop_time_update_shape() {
        let update = StopTimeUpdate::from(pb::trip_update::StopTimeUpdate {
            stop_sequence: Some(2),
            stop_id: Some("S2".to_string()),
            arrival: Some(pb::trip_update::StopTimeEvent {
                delay: Some(60),
                time: Some(1_700_000_120),
                ..Default::default()
            }),
            ..Default::default()
        });

        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(
            value,
            json!({
                "stopSequence": 2,
                "stopId": "S2",
                "arrival": { "delay": 60, "time": "1700000120" },
            })
        );
    }

    #[test]
    fn test_identity_accessors() {
        let entity = FeedEntity::from(pb::FeedEntity {
            id: "t1".to_string(),
            trip_update: Some(pb::TripUpdate {
                trip: pb::TripDescriptor {
                    trip_id: Some("trip-9".to_string()),
                    ..Default::default()
                },
                vehicle: Some(pb::VehicleDescriptor {
                    id: Some("bus-3".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        });

        assert_eq!(entity.trip_id(), Some("trip-9"));
        assert_eq!(entity.vehicle_id(), Some("bus-3"));
    }

    #[test]
    fn test_empty_identifiers_are_ignored() {
        let entity = FeedEntity {
            id: "v1".to_string(),
            vehicle: Some(VehiclePosition {
                trip: Some(TripDescriptor {
                    trip_id: Some(String::new()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(entity.trip_id(), None);
        assert_eq!(entity.vehicle_id(), None);
    }
}
