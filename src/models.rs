use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One usable CSV record. `entity` and `date` are always non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub entity: String,
    pub date: String, // "YYYY-MM-DD" expected, kept verbatim
    pub total_primary: f64,
    pub total_secondary: f64,
    pub new_primary: f64,
    pub new_primary_smoothed: f64,
}

/// Latest known totals for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub entity: String,
    pub date: String,
    pub total_primary: f64,
    pub total_secondary: f64,
}

impl Snapshot {
    pub fn from_row(row: &Row) -> Self {
        Snapshot {
            entity: row.entity.clone(),
            date: row.date.clone(),
            total_primary: row.total_primary,
            total_secondary: row.total_secondary,
        }
    }
}

/// Snapshots with positive totals, descending by primary total, top N only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankedSnapshotSet {
    pub snapshots: Vec<Snapshot>,
}

impl RankedSnapshotSet {
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.snapshots.iter().map(|s| s.entity.as_str())
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    pub lines: usize,
    pub rows: usize,
    pub skipped_blank: usize,
    pub skipped_incomplete: usize,
    pub missing_columns: Vec<String>,
}

/// One immutable load result. A new load builds a new `Dataset`; nothing
/// in here is patched in place.
#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    pub version: u64,
    pub fingerprint: String, // xxh3 of the raw text, 16 hex chars
    pub source: String,
    pub loaded_at: DateTime<Utc>,
    pub snapshots: RankedSnapshotSet,
    pub series: Vec<Row>,
    pub parse_stats: ParseStats,
}
