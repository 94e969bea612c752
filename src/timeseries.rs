use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use itertools::Itertools;
use std::collections::HashSet;
use tracing::debug;

use crate::models::Row;

/// Parse a CSV date cell. Date-only values are taken as UTC midnight.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y/%m/%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Keep rows of `allowed` entities whose date falls strictly after
/// `window_end - window_days`. Unparseable dates are dropped. Input order is
/// preserved; per-entity sorting is left to the consumer. A window reaching
/// past chrono's range is clamped to the earliest (or latest) instant.
pub fn filter(
    rows: &[Row],
    allowed: &HashSet<&str>,
    window_end: DateTime<Utc>,
    window_days: i64,
) -> Vec<Row> {
    let cutoff = Duration::try_days(window_days)
        .and_then(|d| window_end.checked_sub_signed(d))
        .unwrap_or(if window_days > 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        });
    let mut bad_dates = 0usize;

    let out: Vec<Row> = rows
        .iter()
        .filter(|r| allowed.contains(r.entity.as_str()))
        .filter(|r| match parse_date(&r.date) {
            Some(at) => at > cutoff,
            None => {
                bad_dates += 1;
                false
            }
        })
        .cloned()
        .collect();

    debug!(
        "Time window filter - cutoff={}, kept={}, unparseable_dates={}",
        cutoff.format("%Y-%m-%d %H:%M:%S"),
        out.len(),
        bad_dates
    );
    out
}

/// Group the series for `entities` (in that order), each group sorted
/// ascending by date. Entities without rows get an empty group.
pub fn group_by_entity<'a>(series: &'a [Row], entities: &[String]) -> Vec<(String, Vec<&'a Row>)> {
    let mut grouped = series.iter().into_group_map_by(|r| r.entity.as_str());
    entities
        .iter()
        .map(|e| {
            let rows = grouped
                .remove(e.as_str())
                .unwrap_or_default()
                .into_iter()
                .sorted_by_key(|r| parse_date(&r.date))
                .collect();
            (e.clone(), rows)
        })
        .collect()
}
