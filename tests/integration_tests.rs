use std::path::Path;
use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use gtfs_rt_merge::fetch::{BasicClient, FeedFetcher, FeedSource};
use gtfs_rt_merge::gtfs_rt::{
    FeedEntity, FeedHeader, FeedMessage, Position, TripDescriptor, TripUpdate, VehicleDescriptor,
    VehiclePosition, trip_update::StopTimeUpdate,
};
use gtfs_rt_merge::merge::Correlation;
use gtfs_rt_merge::reference::{NOT_FOUND, ReferencePaths, ReferenceTables};
use gtfs_rt_merge::service::FeedService;
use gtfs_rt_merge::stats::MergeSkip;
use gtfs_rt_merge::web::{AppState, create_router};
use prost::Message;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn header() -> FeedHeader {
    FeedHeader {
        gtfs_realtime_version: "2.0".to_string(),
        timestamp: Some(1_700_000_000),
        incrementality: None,
        feed_version: None,
    }
}

fn vehicle_feed() -> Vec<u8> {
    let vehicle = |id: &str, trip_id: &str, label: &str, seq: u32| FeedEntity {
        id: id.to_string(),
        vehicle: Some(VehiclePosition {
            trip: Some(TripDescriptor {
                trip_id: Some(trip_id.to_string()),
                ..Default::default()
            }),
            vehicle: Some(VehicleDescriptor {
                id: Some(format!("bus-{id}")),
                label: Some(label.to_string()),
                ..Default::default()
            }),
            position: Some(Position {
                latitude: 34.66,
                longitude: 133.92,
                bearing: None,
                odometer: None,
                speed: None,
            }),
            current_stop_sequence: Some(seq),
            timestamp: Some(1_700_000_000),
            ..Default::default()
        }),
        ..Default::default()
    };

    FeedMessage {
        header: header(),
        entity: vec![
            vehicle("v1", "trip-1", "201", 2),
            vehicle("v2", "trip-2", "305", 1),
        ],
    }
    .encode_to_vec()
}

fn trip_feed() -> Vec<u8> {
    let trip = |id: &str, trip_id: &str, route_id: &str, stops: &[&str]| FeedEntity {
        id: id.to_string(),
        trip_update: Some(TripUpdate {
            trip: TripDescriptor {
                trip_id: Some(trip_id.to_string()),
                route_id: Some(route_id.to_string()),
                ..Default::default()
            },
            stop_time_update: stops
                .iter()
                .enumerate()
                .map(|(i, stop_id)| StopTimeUpdate {
                    stop_sequence: Some(i as u32 + 1),
                    stop_id: Some(stop_id.to_string()),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }),
        ..Default::default()
    };

    // Deliberately in the opposite order of the vehicle feed
    FeedMessage {
        header: header(),
        entity: vec![
            trip("t2", "trip-2", "7", &["S2"]),
            trip("t1", "trip-1", "12A", &["S1", "S2"]),
        ],
    }
    .encode_to_vec()
}

fn write_reference_tables(dir: &Path) -> ReferencePaths {
    let paths = ReferencePaths::in_dir(dir);
    std::fs::write(
        &paths.routes,
        "route_id,agency_id,route_short_name,route_long_name\n\
         \"12A\",\"ryobi\",\"Downtown Loop\",\"\"\n\
         \"7\",\"ryobi\",\"Harbor Line\",\"\"\n",
    )
    .unwrap();
    std::fs::write(
        &paths.routes_localized,
        "route_id,route_update_date,origin_stop,via_stop,destination_stop\n\
         \"12A\",\"20240401\",\"\",\"\",\"Central Station\"\n",
    )
    .unwrap();
    std::fs::write(
        &paths.stops,
        "stop_id,stop_code,stop_name\nS1,,Okayama Station\nS2,,Korakuen\n",
    )
    .unwrap();
    std::fs::write(
        &paths.vehicle_icons,
        "vehicle_label,icon_url\n\
         201,https://example.com/201_s.png\n\
         DEFAULT,https://example.com/default.png\n",
    )
    .unwrap();
    paths
}

fn service(dir: &Path, vehicle: FeedSource, trip: FeedSource) -> FeedService {
    let tables = ReferenceTables::load(&write_reference_tables(dir)).unwrap();
    FeedService::new(
        FeedFetcher::new(BasicClient::new()),
        vehicle,
        trip,
        Arc::new(tables),
        Correlation::Keyed,
    )
}

fn local_service(dir: &Path, vehicle_bytes: &[u8], trip_bytes: &[u8]) -> FeedService {
    let vehicle_path = dir.join("vpos.bin");
    let trip_path = dir.join("trip.bin");
    std::fs::write(&vehicle_path, vehicle_bytes).unwrap();
    std::fs::write(&trip_path, trip_bytes).unwrap();
    service(
        dir,
        FeedSource::Local(vehicle_path),
        FeedSource::Local(trip_path),
    )
}

#[tokio::test]
async fn test_full_pipeline_from_local_files() {
    let dir = tempfile::tempdir().unwrap();
    let service = local_service(dir.path(), &vehicle_feed(), &trip_feed());

    let merged = service.run_cycle().await;
    let records = merged.records;
    assert_eq!(records.len(), 2);

    let first = &records[0];
    assert_eq!(first.id, "v1");
    let update = first.trip_update.as_ref().unwrap();
    assert_eq!(update.trip.trip_id.as_deref(), Some("trip-1"));
    assert_eq!(update.trip.route_short_name.as_deref(), Some("Downtown Loop"));
    assert_eq!(
        update.trip.destination_stop_name.as_deref(),
        Some("Central Station")
    );
    assert_eq!(
        update.stop_time_update[0].stop_name.as_deref(),
        Some("Okayama Station")
    );
    assert_eq!(first.icon, "https://example.com/201_s.png");
    assert_eq!(first.next_stop_name.as_deref(), Some("Korakuen"));

    let second = &records[1];
    let update = second.trip_update.as_ref().unwrap();
    assert_eq!(update.trip.route_short_name.as_deref(), Some("Harbor Line"));
    assert_eq!(update.trip.destination_stop_name.as_deref(), Some(NOT_FOUND));
    assert_eq!(second.icon, "https://example.com/default.png");

    assert_eq!(merged.stats.destination_misses, 1);
    assert_eq!(merged.stats.default_icons, 1);
    assert_eq!(merged.stats.skipped, None);
}

#[tokio::test]
async fn test_decode_failure_yields_empty_collection() {
    let dir = tempfile::tempdir().unwrap();
    let service = local_service(dir.path(), &vehicle_feed(), &[0xFF, 0xFE, 0x00, 0x01]);

    let merged = service.run_cycle().await;
    assert!(merged.records.is_empty());
    assert_eq!(merged.stats.skipped, Some(MergeSkip::TripFeedUnavailable));
    assert_eq!(merged.stats.trip_feed_error.as_deref(), Some("decode_error"));
    assert_eq!(merged.stats.vehicle_feed_error, None);
}

#[tokio::test]
async fn test_missing_feed_file_yields_empty_collection() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(
        dir.path(),
        FeedSource::Local(dir.path().join("missing.bin")),
        FeedSource::Local(dir.path().join("missing-too.bin")),
    );

    let merged = service.run_cycle().await;
    assert!(merged.records.is_empty());
    assert_eq!(merged.stats.skipped, Some(MergeSkip::BothFeedsUnavailable));
    assert_eq!(merged.stats.vehicle_feed_error.as_deref(), Some("fetch_error"));
}

#[tokio::test]
async fn test_remote_feeds_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/realtime/vpos.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vehicle_feed()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/realtime/trip.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(trip_feed()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let service = service(
        dir.path(),
        FeedSource::Remote(format!("{}/realtime/vpos.bin", server.uri())),
        FeedSource::Remote(format!("{}/realtime/trip.bin", server.uri())),
    );

    let records = service.collect().await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].id, "v2");
}

#[tokio::test]
async fn test_remote_error_status_yields_empty_collection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/realtime/vpos.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vehicle_feed()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/realtime/trip.bin"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let service = service(
        dir.path(),
        FeedSource::Remote(format!("{}/realtime/vpos.bin", server.uri())),
        FeedSource::Remote(format!("{}/realtime/trip.bin", server.uri())),
    );

    let merged = service.run_cycle().await;
    assert!(merged.records.is_empty());
    assert_eq!(merged.stats.trip_feed_error.as_deref(), Some("fetch_error"));
}

#[tokio::test]
async fn test_empty_remote_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/realtime/vpos.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vehicle_feed()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/realtime/trip.bin"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let service = service(
        dir.path(),
        FeedSource::Remote(format!("{}/realtime/vpos.bin", server.uri())),
        FeedSource::Remote(format!("{}/realtime/trip.bin", server.uri())),
    );

    let merged = service.run_cycle().await;
    assert!(merged.records.is_empty());
    assert_eq!(merged.stats.skipped, Some(MergeSkip::TripFeedUnavailable));
    assert_eq!(merged.stats.trip_feed_error.as_deref(), Some("decode_error"));
}

async fn get_json(service: FeedService, uri: &str) -> (StatusCode, serde_json::Value) {
    let app = create_router(AppState::new(service));
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_root_returns_merged_records() {
    let dir = tempfile::tempdir().unwrap();
    let service = local_service(dir.path(), &vehicle_feed(), &trip_feed());

    let (status, body) = get_json(service, "/").await;

    assert_eq!(status, StatusCode::OK);
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["vehicle"]["timestamp"], "1700000000");
    assert_eq!(
        records[0]["tripUpdate"]["trip"]["routeShortName"],
        "Downtown Loop"
    );
    assert_eq!(
        records[0]["tripUpdate"]["stopTimeUpdate"][1]["stopName"],
        "Korakuen"
    );
    assert_eq!(records[0]["icon"], "https://example.com/201_s.png");
}

#[tokio::test]
async fn test_root_returns_empty_array_when_feed_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let service = local_service(dir.path(), &vehicle_feed(), b"not a feed");

    let (status, body) = get_json(service, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([]));
}

#[tokio::test]
async fn test_health_check() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(AppState::new(local_service(
        dir.path(),
        &vehicle_feed(),
        &trip_feed(),
    )));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
