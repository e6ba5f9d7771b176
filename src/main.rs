//! Entry point for the GTFS-RT merge service.
//!
//! `serve` answers every `GET /` with a fresh merge of the vehicle-position
//! and trip-update feeds; `snapshot` runs a single cycle and prints it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use gtfs_rt_merge::{
    config::{Cli, Commands, FeedArgs},
    fetch::{BasicClient, FeedFetcher},
    output::{to_pretty_json, write_snapshot},
    reference::ReferenceTables,
    service::FeedService,
    telemetry,
    web::{AppState, create_router},
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _log_guard = telemetry::init();

    let cli = Cli::parse();

    let tables = load_tables(&cli.feeds)?;
    let client = match cli.feeds.fetch_timeout_secs {
        Some(secs) => BasicClient::with_timeout(Duration::from_secs(secs))
            .context("failed to build HTTP client")?,
        None => BasicClient::new(),
    };
    let service = FeedService::new(
        FeedFetcher::new(client),
        cli.feeds.vehicle_source(),
        cli.feeds.trip_source(),
        Arc::new(tables),
        cli.feeds.correlation,
    );

    match cli.command {
        Commands::Serve { listen } => {
            let app = create_router(AppState::new(service));
            let listener = tokio::net::TcpListener::bind(listen)
                .await
                .with_context(|| format!("failed to bind {listen}"))?;

            info!(
                %listen,
                vehicle_feed = %cli.feeds.vehicle_source(),
                trip_feed = %cli.feeds.trip_source(),
                "Server ready"
            );
            axum::serve(listener, app).await?;
        }
        Commands::Snapshot { output } => {
            let records = service.collect().await;
            match output {
                Some(path) => write_snapshot(&path, &records)?,
                None => println!("{}", to_pretty_json(&records)?),
            }
        }
    }

    Ok(())
}

/// Loads the reference tables once for the process lifetime.
fn load_tables(feeds: &FeedArgs) -> Result<ReferenceTables> {
    let paths = feeds.reference_paths();
    if feeds.allow_missing_reference {
        warn!("Missing reference tables tolerated, lookups may return placeholders");
        return Ok(ReferenceTables::load_degraded(&paths));
    }
    ReferenceTables::load(&paths).context("reference tables are required at startup")
}
