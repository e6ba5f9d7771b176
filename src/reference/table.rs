//! A single static lookup table and the lookups run against it.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use tracing::debug;

use crate::error::ReferenceLoadError;

/// Placeholder returned when a lookup finds nothing usable.
pub const NOT_FOUND: &str = "無効データ";

/// Key of the icon row used when a vehicle label has no row of its own.
pub const DEFAULT_ICON_KEY: &str = "DEFAULT";

const KEY_COLUMN: usize = 0;
const ICON_COLUMN: usize = 1;

/// Result of [`ReferenceTable::resolve_icon`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedIcon<'a> {
    pub url: &'a str,
    /// No row matched the label, so the default row supplied `url`
    pub is_default: bool,
}

/// Rows of a comma-separated reference file, header removed.
///
/// Column 0 is indexed at load time. When a key occurs more than once the
/// first row wins, both through the index and through a scan.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    name: String,
    rows: Vec<Vec<String>>,
    key_index: HashMap<String, usize>,
}

fn strip_quotes(value: &str) -> &str {
    value.trim().trim_matches('"')
}

impl ReferenceTable {
    /// An empty table; every lookup against it misses.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Reads the table at `path`.
    pub fn load(path: &Path) -> Result<Self, ReferenceLoadError> {
        let file = std::fs::File::open(path).map_err(|source| ReferenceLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(path.display().to_string(), file).map_err(|source| {
            ReferenceLoadError::Csv {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    /// Parses CSV text: the first row is a header, blank rows are dropped,
    /// fields are trimmed and may be double-quoted, rows may differ in width.
    pub fn from_reader(name: impl Into<String>, reader: impl Read) -> Result<Self, csv::Error> {
        let name = name.into();
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }
            rows.push(
                record
                    .iter()
                    .map(|field| strip_quotes(field).to_string())
                    .collect(),
            );
        }

        Ok(Self::from_rows(name, rows))
    }

    /// Builds a table from data rows (no header).
    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        let mut key_index = HashMap::new();
        for (i, row) in rows.iter().enumerate() {
            if let Some(key) = row.get(KEY_COLUMN) {
                key_index.entry(key.clone()).or_insert(i);
            }
        }

        let table = Self {
            name: name.into(),
            rows,
            key_index,
        };
        debug!(table = %table.name, rows = table.rows.len(), "Reference table loaded");
        table
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn find_row(&self, key: &str, key_column: usize) -> Option<&[String]> {
        if key_column == KEY_COLUMN {
            return self.key_index.get(key).map(|&i| self.rows[i].as_slice());
        }
        self.rows
            .iter()
            .find(|row| row.get(key_column).is_some_and(|k| k == key))
            .map(Vec::as_slice)
    }

    fn try_lookup(&self, key: &str, key_column: usize, value_column: usize) -> Option<&str> {
        let key = strip_quotes(key);
        if key.is_empty() {
            return None;
        }
        self.find_row(key, key_column)?
            .get(value_column)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Value at `value_column` of the first row whose `key_column` equals
    /// `key`. No such row, an empty key or an empty value give [`NOT_FOUND`].
    pub fn lookup(&self, key: &str, key_column: usize, value_column: usize) -> String {
        self.try_lookup(key, key_column, value_column)
            .unwrap_or(NOT_FOUND)
            .to_string()
    }

    fn try_icon(&self, label: &str) -> Option<&str> {
        let label = strip_quotes(label);
        if label.is_empty() {
            return None;
        }
        self.find_row(label, KEY_COLUMN)
            .map(|row| row.get(ICON_COLUMN).map(String::as_str).unwrap_or(""))
    }

    /// Icon of the `DEFAULT` row, or of the last row when there is none.
    fn default_icon(&self) -> &str {
        self.find_row(DEFAULT_ICON_KEY, KEY_COLUMN)
            .or_else(|| self.rows.last().map(Vec::as_slice))
            .and_then(|row| row.get(ICON_COLUMN))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Icon of the first row keyed by `label`, falling back to the default
    /// row. An empty table yields an empty URL.
    pub fn resolve_icon(&self, label: &str) -> ResolvedIcon<'_> {
        match self.try_icon(label) {
            Some(url) => ResolvedIcon {
                url,
                is_default: false,
            },
            None => ResolvedIcon {
                url: self.default_icon(),
                is_default: true,
            },
        }
    }
}
