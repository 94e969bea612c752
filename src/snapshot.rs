use clap::ValueEnum;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

use crate::models::{RankedSnapshotSet, Row, Snapshot};
use crate::timeseries::parse_date;

/// How "latest" is decided between two date strings of one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DateOrdering {
    /// Plain string comparison. Only correct for zero-padded ISO dates.
    #[default]
    Lexical,
    /// Parse both dates; a parseable date always beats an unparseable one.
    Strict,
}

impl DateOrdering {
    pub fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            DateOrdering::Lexical => a.cmp(b),
            DateOrdering::Strict => match (parse_date(a), parse_date(b)) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => a.cmp(b),
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SnapshotParams {
    pub top_n: usize,             // 20
    pub date_ordering: DateOrdering,
}

impl Default for SnapshotParams {
    fn default() -> Self {
        SnapshotParams {
            top_n: 20,
            date_ordering: DateOrdering::Lexical,
        }
    }
}

/// Latest row per entity, positive totals only, ranked by primary total.
pub fn reduce(rows: &[Row], params: SnapshotParams) -> RankedSnapshotSet {
    // first-seen order keeps the later stable sort deterministic
    let mut order: Vec<&str> = Vec::new();
    let mut latest: HashMap<&str, &Row> = HashMap::new();

    for r in rows {
        let replace = match latest.get(r.entity.as_str()) {
            Some(cur) => params.date_ordering.compare(&r.date, &cur.date) == Ordering::Greater,
            None => {
                order.push(r.entity.as_str());
                true
            }
        };
        if replace {
            latest.insert(r.entity.as_str(), r);
        }
    }

    let distinct = order.len();
    let mut snapshots: Vec<Snapshot> = order
        .into_iter()
        .filter_map(|e| latest.get(e))
        .filter(|r| r.total_primary > 0.0 && r.total_secondary > 0.0)
        .map(|r| Snapshot::from_row(r))
        .collect();

    let positive = snapshots.len();
    snapshots.sort_by(|a, b| {
        b.total_primary
            .partial_cmp(&a.total_primary)
            .unwrap_or(Ordering::Equal)
    });
    snapshots.truncate(params.top_n);

    debug!(
        "Snapshot reduction - entities={}, positive={}, kept={}",
        distinct,
        positive,
        snapshots.len()
    );
    RankedSnapshotSet { snapshots }
}

/// Mean of `total_secondary / total_primary` across the set, the scatter
/// view's reference slope.
pub fn mean_secondary_ratio(set: &RankedSnapshotSet) -> Option<f64> {
    if set.is_empty() {
        return None;
    }
    let sum: f64 = set
        .snapshots
        .iter()
        .map(|s| s.total_secondary / s.total_primary)
        .sum();
    Some(sum / set.len() as f64)
}
