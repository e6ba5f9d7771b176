//! Command-line and environment configuration.
//!
//! Every option can also come from the environment (a `.env` file is loaded
//! first), so a deployment only has to set variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::fetch::FeedSource;
use crate::merge::Correlation;
use crate::reference::ReferencePaths;

pub const DEFAULT_VEHICLE_FEED: &str = "https://loc.bus-vision.jp/realtime/ryobi_vpos_update.bin";
pub const DEFAULT_TRIP_FEED: &str = "https://loc.bus-vision.jp/realtime/ryobi_trip_update.bin";

#[derive(Parser, Debug)]
#[command(name = "gtfs_rt_merge")]
#[command(
    about = "Serve GTFS-RT vehicle positions merged with trip updates and static names",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub feeds: FeedArgs,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Serve the merged feed over HTTP
    Serve {
        /// Address to listen on
        #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:3000")]
        listen: SocketAddr,
    },
    /// Run one merge cycle and print the result as JSON
    Snapshot {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Feed sources, reference data and merge behaviour.
#[derive(Args, Debug)]
pub struct FeedArgs {
    /// Vehicle positions feed (URL or file path)
    #[arg(
        long,
        global = true,
        env = "VEHICLE_FEED_SOURCE",
        default_value = DEFAULT_VEHICLE_FEED
    )]
    pub vehicle_feed: String,

    /// Trip updates feed (URL or file path)
    #[arg(
        long,
        global = true,
        env = "TRIP_FEED_SOURCE",
        default_value = DEFAULT_TRIP_FEED
    )]
    pub trip_feed: String,

    /// Read both feeds from local files even if they look like URLs
    #[arg(long, global = true)]
    pub local_feeds: bool,

    /// Directory holding routes.txt, routes_jp.txt, stops.txt and vehicle_icon.csv
    #[arg(
        long,
        global = true,
        env = "REFERENCE_DATA_DIR",
        default_value = "data/ryobi"
    )]
    pub data_dir: PathBuf,

    /// Override the routes table path
    #[arg(long, global = true)]
    pub routes: Option<PathBuf>,

    /// Override the localized routes table path
    #[arg(long, global = true)]
    pub routes_localized: Option<PathBuf>,

    /// Override the stops table path
    #[arg(long, global = true)]
    pub stops: Option<PathBuf>,

    /// Override the vehicle icon table path
    #[arg(long, global = true)]
    pub vehicle_icons: Option<PathBuf>,

    /// How vehicle positions are paired with trip updates
    #[arg(
        long,
        global = true,
        env = "CORRELATION",
        value_enum,
        default_value_t = Correlation::Keyed
    )]
    pub correlation: Correlation,

    /// Abort a feed request after this many seconds (no limit when unset)
    #[arg(long, global = true, env = "FETCH_TIMEOUT_SECS")]
    pub fetch_timeout_secs: Option<u64>,

    /// Start with empty tables instead of failing when a reference file is unreadable
    #[arg(long, global = true)]
    pub allow_missing_reference: bool,
}

impl FeedArgs {
    pub fn vehicle_source(&self) -> FeedSource {
        FeedSource::from_descriptor(&self.vehicle_feed, self.local_feeds)
    }

    pub fn trip_source(&self) -> FeedSource {
        FeedSource::from_descriptor(&self.trip_feed, self.local_feeds)
    }

    pub fn reference_paths(&self) -> ReferencePaths {
        let mut paths = ReferencePaths::in_dir(&self.data_dir);
        if let Some(path) = &self.routes {
            paths.routes = path.clone();
        }
        if let Some(path) = &self.routes_localized {
            paths.routes_localized = path.clone();
        }
        if let Some(path) = &self.stops {
            paths.stops = path.clone();
        }
        if let Some(path) = &self.vehicle_icons {
            paths.vehicle_icons = path.clone();
        }
        paths
    }
}
