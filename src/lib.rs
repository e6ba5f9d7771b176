pub mod config;
pub mod entity;
pub mod error;
pub mod fetch;
pub mod merge;
pub mod output;
pub mod parser;
pub mod reference;
pub mod service;
pub mod stats;
pub mod telemetry;
pub mod web;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
