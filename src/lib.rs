//! COVID-19 CSV pipeline: parse, reduce to latest snapshots, window the
//! trend series, keep the trend selection, and export D3-ready chart data.

pub mod config;
pub mod errors;
pub mod fetch;
pub mod models;
pub mod orchestrator;
pub mod parse;
pub mod render;
pub mod selection;
pub mod snapshot;
pub mod timeseries;
pub mod view;
pub mod viz_export;
