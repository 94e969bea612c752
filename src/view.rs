use clap::ValueEnum;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::Dataset;
use crate::selection::SeriesSelector;

/// Which chart is on screen. Never influences derivation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChartMode {
    #[default]
    Bar,
    Scatter,
    Trend,
}

impl ChartMode {
    pub fn title(self) -> &'static str {
        match self {
            ChartMode::Bar => "Total Cases by Country",
            ChartMode::Scatter => "Cases vs Deaths Correlation",
            ChartMode::Trend => "New Cases Trend Over Time",
        }
    }
}

/// Holds the current dataset version only. Installing a newer load drops
/// the reference to the previous one.
#[derive(Debug, Default)]
pub struct DatasetStore {
    current: Option<Arc<Dataset>>,
    next_version: u64,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp `dataset` with the next version and make it current. Whichever
    /// load resolves last wins.
    pub fn install(&mut self, mut dataset: Dataset) -> Arc<Dataset> {
        self.next_version += 1;
        dataset.version = self.next_version;
        let ds = Arc::new(dataset);
        if let Some(prev) = self.current.replace(Arc::clone(&ds)) {
            debug!("Replacing dataset version {} ({})", prev.version, prev.fingerprint);
        }
        info!("Dataset installed - version={}, fingerprint={}", ds.version, ds.fingerprint);
        ds
    }

    pub fn current(&self) -> Option<Arc<Dataset>> {
        self.current.clone()
    }
}

/// UI-owned view state passed explicitly to renderers.
#[derive(Debug, Default)]
pub struct ViewState {
    pub mode: ChartMode,
    selection: Option<SeriesSelector>,
    seeded_version: Option<u64>,
}

impl ViewState {
    pub fn new(mode: ChartMode) -> Self {
        ViewState {
            mode,
            ..Self::default()
        }
    }

    /// Seed the trend selection when `dataset` is a version we have not
    /// seen. Returns true when a (re)seed happened.
    pub fn sync(&mut self, dataset: &Dataset) -> bool {
        if self.seeded_version == Some(dataset.version) {
            return false;
        }
        self.selection = Some(SeriesSelector::seed(&dataset.series));
        self.seeded_version = Some(dataset.version);
        true
    }

    pub fn selection(&self) -> Option<&SeriesSelector> {
        self.selection.as_ref()
    }

    /// `None` until a dataset has been synced.
    pub fn selection_mut(&mut self) -> Option<&mut SeriesSelector> {
        self.selection.as_mut()
    }
}
