use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, warn};

use crate::errors::PipelineError;
use crate::models::{ParseStats, Row};

const COL_ENTITY: &str = "location";
const COL_DATE: &str = "date";
const COL_TOTAL_PRIMARY: &str = "total_cases";
const COL_TOTAL_SECONDARY: &str = "total_deaths";
const COL_NEW_PRIMARY: &str = "new_cases";
const COL_NEW_PRIMARY_SMOOTHED: &str = "new_cases_smoothed";

#[derive(Debug)]
pub struct ParsedTable {
    pub rows: Vec<Row>,
    pub stats: ParseStats,
}

/// Positions of the columns we read. `None` is an absent column; reads from
/// it fall back to the default value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    entity: Option<usize>,
    date: Option<usize>,
    total_primary: Option<usize>,
    total_secondary: Option<usize>,
    new_primary: Option<usize>,
    new_primary_smoothed: Option<usize>,
}

impl Columns {
    fn from_header(header: &StringRecord) -> Self {
        let find = |name: &str| header.iter().position(|h| h == name);
        Columns {
            entity: find(COL_ENTITY),
            date: find(COL_DATE),
            total_primary: find(COL_TOTAL_PRIMARY),
            total_secondary: find(COL_TOTAL_SECONDARY),
            new_primary: find(COL_NEW_PRIMARY),
            new_primary_smoothed: find(COL_NEW_PRIMARY_SMOOTHED),
        }
    }

    fn missing(&self) -> Vec<String> {
        [
            (COL_ENTITY, self.entity),
            (COL_DATE, self.date),
            (COL_TOTAL_PRIMARY, self.total_primary),
            (COL_TOTAL_SECONDARY, self.total_secondary),
            (COL_NEW_PRIMARY, self.new_primary),
            (COL_NEW_PRIMARY_SMOOTHED, self.new_primary_smoothed),
        ]
        .into_iter()
        .filter(|(_, idx)| idx.is_none())
        .map(|(name, _)| name.to_string())
        .collect()
    }
}

fn field(record: &StringRecord, idx: Option<usize>) -> &str {
    idx.and_then(|i| record.get(i)).unwrap_or("")
}

fn number(record: &StringRecord, idx: Option<usize>) -> f64 {
    field(record, idx)
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

/// Parse the CSV text into usable rows.
///
/// Quoting is switched off, so fields are split positionally on `,` and a
/// quoted field containing the delimiter is split too. Lines without an
/// entity or a date are skipped, unparseable numbers read as `0`. The only
/// failure is a missing header line.
pub fn parse(text: &str) -> Result<ParsedTable, PipelineError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .quoting(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut records = rdr.records();

    // the reader skips blank lines, so a header found past line 1 means the
    // first line was empty
    let header = match records.next() {
        Some(Ok(h)) if line_of(&h) == 1 && h.iter().any(|f| !f.trim().is_empty()) => h,
        _ => return Err(PipelineError::EmptyInput),
    };

    let cols = Columns::from_header(&header);
    let mut stats = ParseStats {
        missing_columns: cols.missing(),
        ..ParseStats::default()
    };
    for name in &stats.missing_columns {
        warn!("Missing column '{}' - values default to empty/0", name);
    }

    let mut rows = Vec::new();
    let mut prev_line = line_of(&header);
    for result in records {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                debug!("Skipping unreadable record - {}", e);
                stats.lines += 1;
                stats.skipped_incomplete += 1;
                continue;
            }
        };

        let line = line_of(&record);
        let blanks = line.saturating_sub(prev_line + 1) as usize;
        stats.skipped_blank += blanks;
        stats.lines += blanks + 1;
        prev_line = line;

        let entity = field(&record, cols.entity);
        let date = field(&record, cols.date);
        if entity.is_empty() || date.is_empty() {
            debug!("Skipping line {} - entity or date missing", line);
            stats.skipped_incomplete += 1;
            continue;
        }

        rows.push(Row {
            entity: entity.to_string(),
            date: date.to_string(),
            total_primary: number(&record, cols.total_primary),
            total_secondary: number(&record, cols.total_secondary),
            new_primary: number(&record, cols.new_primary),
            new_primary_smoothed: number(&record, cols.new_primary_smoothed),
        });
    }

    stats.rows = rows.len();
    debug!(
        "Parsed CSV - lines={}, rows={}, blank={}, incomplete={}",
        stats.lines, stats.rows, stats.skipped_blank, stats.skipped_incomplete
    );
    Ok(ParsedTable { rows, stats })
}
