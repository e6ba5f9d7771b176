//! Static reference data: routes, localized routes, stops and vehicle icons.
//!
//! [`ReferenceTables`] is loaded once at startup and shared read-only for
//! the life of the process. A lookup miss resolves to [`NOT_FOUND`].

mod table;

pub use table::{DEFAULT_ICON_KEY, NOT_FOUND, ReferenceTable, ResolvedIcon};

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::error::ReferenceLoadError;

const ROUTE_ID_COLUMN: usize = 0;
const ROUTE_SHORT_NAME_COLUMN: usize = 2;
const DESTINATION_STOP_COLUMN: usize = 4;
const STOP_ID_COLUMN: usize = 0;
const STOP_NAME_COLUMN: usize = 2;

/// File locations of the four reference tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencePaths {
    pub routes: PathBuf,
    pub routes_localized: PathBuf,
    pub stops: PathBuf,
    pub vehicle_icons: PathBuf,
}

impl ReferencePaths {
    /// Conventional file names under a GTFS-JP style data directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            routes: dir.join("routes.txt"),
            routes_localized: dir.join("routes_jp.txt"),
            stops: dir.join("stops.txt"),
            vehicle_icons: dir.join("vehicle_icon.csv"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub routes: ReferenceTable,
    pub routes_localized: ReferenceTable,
    pub stops: ReferenceTable,
    pub vehicle_icons: ReferenceTable,
}

impl ReferenceTables {
    /// Loads all four tables, failing on the first one that cannot be read.
    pub fn load(paths: &ReferencePaths) -> Result<Self, ReferenceLoadError> {
        let tables = Self {
            routes: ReferenceTable::load(&paths.routes)?,
            routes_localized: ReferenceTable::load(&paths.routes_localized)?,
            stops: ReferenceTable::load(&paths.stops)?,
            vehicle_icons: ReferenceTable::load(&paths.vehicle_icons)?,
        };
        tables.log_loaded();
        Ok(tables)
    }

    /// Loads what it can; a table that fails is logged and left empty, so
    /// every lookup against it misses.
    pub fn load_degraded(paths: &ReferencePaths) -> Self {
        let load = |path: &Path| {
            ReferenceTable::load(path).unwrap_or_else(|e| {
                error!(error = %e, "Reference table unavailable, lookups will miss");
                ReferenceTable::empty(path.display().to_string())
            })
        };

        let tables = Self {
            routes: load(&paths.routes),
            routes_localized: load(&paths.routes_localized),
            stops: load(&paths.stops),
            vehicle_icons: load(&paths.vehicle_icons),
        };
        tables.log_loaded();
        tables
    }

    fn log_loaded(&self) {
        info!(
            routes = self.routes.len(),
            routes_localized = self.routes_localized.len(),
            stops = self.stops.len(),
            vehicle_icons = self.vehicle_icons.len(),
            "Reference tables loaded"
        );
    }

    pub fn route_short_name(&self, route_id: &str) -> String {
        self.routes
            .lookup(route_id, ROUTE_ID_COLUMN, ROUTE_SHORT_NAME_COLUMN)
    }

    pub fn destination_stop_name(&self, route_id: &str) -> String {
        self.routes_localized
            .lookup(route_id, ROUTE_ID_COLUMN, DESTINATION_STOP_COLUMN)
    }

    pub fn stop_name(&self, stop_id: &str) -> String {
        self.stops
            .lookup(stop_id, STOP_ID_COLUMN, STOP_NAME_COLUMN)
    }

    pub fn vehicle_icon(&self, label: &str) -> ResolvedIcon<'_> {
        self.vehicle_icons.resolve_icon(label)
    }
}
