use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

use crate::errors::SelectionError;
use crate::models::Row;

pub const SELECTION_CAP: usize = 5;
/// How many entities the trend view offers as checkboxes.
pub const CHECKBOX_LIMIT: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Checkbox {
    pub entity: String,
    pub checked: bool,
    pub enabled: bool,
}

/// Entities ranked by their peak `new_primary`, top `n`. Ties keep the
/// order in which entities were first seen.
pub fn seed_entities(rows: &[Row], n: usize) -> Vec<String> {
    let mut order: Vec<&str> = Vec::new();
    let mut peaks: HashMap<&str, f64> = HashMap::new();

    for r in rows {
        peaks
            .entry(r.entity.as_str())
            .and_modify(|p| *p = p.max(r.new_primary))
            .or_insert_with(|| {
                order.push(r.entity.as_str());
                r.new_primary
            });
    }

    let mut ranked: Vec<(&str, f64)> = order.into_iter().map(|e| (e, peaks[e])).collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked.into_iter().take(n).map(|(e, _)| e.to_string()).collect()
}

/// Trend-view selection over one dataset version.
///
/// A selector only exists once seeded, so toggling an unseeded selection
/// cannot be expressed. Callers that have not loaded data yet hold
/// `Option<SeriesSelector>`.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSelector {
    universe: Vec<String>, // sorted, distinct
    selected: Vec<String>, // insertion order drives legend colours
    cap: usize,
}

impl SeriesSelector {
    pub fn seed(rows: &[Row]) -> Self {
        let mut universe: Vec<String> = rows.iter().map(|r| r.entity.clone()).collect();
        universe.sort();
        universe.dedup();

        let selected = seed_entities(rows, SELECTION_CAP);
        debug!(
            "Seeded trend selection - universe={}, selected={:?}",
            universe.len(),
            selected
        );
        SeriesSelector {
            universe,
            selected,
            cap: SELECTION_CAP,
        }
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn universe(&self) -> &[String] {
        &self.universe
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.selected.iter().any(|e| e == entity)
    }

    pub fn is_full(&self) -> bool {
        self.selected.len() >= self.cap
    }

    /// Remove `entity` if selected, otherwise add it while below the cap.
    pub fn toggle(&mut self, entity: &str) -> Result<ToggleOutcome, SelectionError> {
        if let Some(pos) = self.selected.iter().position(|e| e == entity) {
            self.selected.remove(pos);
            return Ok(ToggleOutcome::Removed);
        }
        if self.universe.binary_search_by(|e| e.as_str().cmp(entity)).is_err() {
            return Err(SelectionError::UnknownEntity(entity.to_string()));
        }
        if self.is_full() {
            return Err(SelectionError::Full { cap: self.cap });
        }
        self.selected.push(entity.to_string());
        Ok(ToggleOutcome::Added)
    }

    /// Checkbox state for the first `CHECKBOX_LIMIT` entities. Unchecked
    /// boxes are disabled once the selection is full.
    pub fn checkboxes(&self) -> Vec<Checkbox> {
        let full = self.is_full();
        self.universe
            .iter()
            .take(CHECKBOX_LIMIT)
            .map(|e| {
                let checked = self.contains(e);
                Checkbox {
                    entity: e.clone(),
                    checked,
                    enabled: checked || !full,
                }
            })
            .collect()
    }
}
