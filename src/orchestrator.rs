use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::config::{Args, PipelineParams};
use crate::errors::PipelineError;
use crate::fetch::fetch_text;
use crate::models::Dataset;
use crate::parse::parse;
use crate::render::render_summary_markdown;
use crate::snapshot::reduce;
use crate::timeseries::filter;
use crate::view::{DatasetStore, ViewState};
use crate::viz_export::write_all_viz;

fn fingerprint(text: &str) -> String {
    format!("{:016x}", xxh3_64(text.as_bytes()))
}

/// Derive a complete dataset from raw CSV text. Pure and synchronous; the
/// version stays 0 until a `DatasetStore` installs it.
pub fn build_dataset(
    text: &str,
    source: &str,
    now: DateTime<Utc>,
    params: &PipelineParams,
) -> Result<Dataset, PipelineError> {
    let start = std::time::Instant::now();

    let table = parse(text)?;
    if table.stats.skipped_incomplete > 0 {
        warn!(
            "Skipped rows without country or date - count={}",
            table.stats.skipped_incomplete
        );
    }

    let snapshots = reduce(&table.rows, params.snapshot);
    let allowed: HashSet<&str> = snapshots.entities().collect();
    let series = filter(&table.rows, &allowed, now, params.window_days);

    info!(
        "Dataset derived - duration={:.3}s, rows={}, snapshots={}, series_rows={}",
        start.elapsed().as_secs_f32(),
        table.rows.len(),
        snapshots.len(),
        series.len()
    );

    Ok(Dataset {
        version: 0,
        fingerprint: fingerprint(text),
        source: source.to_string(),
        loaded_at: now,
        snapshots,
        series,
        parse_stats: table.stats,
    })
}

/// One full load: fetch, derive, seed the trend selection, apply the
/// requested toggles, export. Returns the directory written.
pub async fn run_once(args: &Args) -> Result<PathBuf> {
    let pipeline_start = std::time::Instant::now();
    info!("Pipeline started - data={}, mode={:?}", args.data, args.mode);

    let client = Client::builder().build()?;
    let text = fetch_text(&client, &args.data).await?;

    let mut store = DatasetStore::new();
    let dataset = store.install(build_dataset(&text, &args.data, Utc::now(), &args.params())?);

    let mut view = ViewState::new(args.mode);
    view.sync(&dataset);

    if let Some(sel) = view.selection_mut() {
        for entity in &args.toggles {
            match sel.toggle(entity) {
                Ok(outcome) => debug!("Toggled {} - {:?}", entity, outcome),
                Err(e) => warn!("Toggle ignored - {}", e),
            }
        }
        info!("Trend selection - {:?}", sel.selected());
    }

    let dir = write_all_viz(&args.output_dir, &dataset, &view)?;
    let summary = render_summary_markdown(&dataset, &view)?;
    std::fs::write(dir.join("summary.md"), summary.as_bytes())
        .with_context(|| format!("Writing summary into {}", dir.display()))?;
    debug!("Wrote summary.md");

    info!(
        "Pipeline completed successfully - total_duration={:.2}s, directory={}",
        pipeline_start.elapsed().as_secs_f32(),
        dir.display()
    );
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::SeriesSelector;
    use crate::view::ChartMode;
    use chrono::TimeZone;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    const HEADER: &str = "location,date,total_cases,total_deaths,new_cases,new_cases_smoothed";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn latest_snapshot_scenario() {
        let text = format!(
            "{HEADER}\nA,2021-01-01,10,1,1,1\nA,2021-01-02,20,2,1,1\nB,2021-01-01,5,1,1,1\n"
        );
        let ds = build_dataset(&text, "mem", now(), &PipelineParams::default()).unwrap();

        let got: Vec<(&str, &str, f64, f64)> = ds
            .snapshots
            .snapshots
            .iter()
            .map(|s| (s.entity.as_str(), s.date.as_str(), s.total_primary, s.total_secondary))
            .collect();
        assert_eq!(got, vec![("A", "2021-01-02", 20.0, 2.0), ("B", "2021-01-01", 5.0, 1.0)]);
        assert_eq!(ds.series.len(), 3);
    }

    #[test]
    fn bad_date_counts_for_snapshot_but_not_series() {
        let text = format!("{HEADER}\nZ,not-a-date,10,1,4,4\nA,2021-05-01,5,1,1,1\n");
        let ds = build_dataset(&text, "mem", now(), &PipelineParams::default()).unwrap();

        assert_eq!(ds.snapshots.entities().collect::<Vec<_>>(), vec!["Z", "A"]);
        assert_eq!(SeriesSelector::seed(&ds.series).universe(), ["A".to_string()]);
    }

    #[test]
    fn series_only_covers_ranked_entities_in_window() {
        let mut text = String::from(HEADER);
        for i in 0..25 {
            text.push_str(&format!("\nE{i:02},2021-05-01,{},1,1,1", i + 1));
        }
        text.push_str("\nE24,2020-01-01,1,1,1,1");
        let ds = build_dataset(&text, "mem", now(), &PipelineParams::default()).unwrap();

        assert_eq!(ds.snapshots.len(), 20);
        assert!(ds.series.iter().all(|r| r.date == "2021-05-01"));
        let sel = SeriesSelector::seed(&ds.series);
        assert!(!sel.universe().contains(&"E00".to_string()));
        assert_eq!(sel.universe().len(), 20);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = build_dataset(HEADER, "mem", now(), &PipelineParams::default()).unwrap();
        let b = build_dataset(HEADER, "other", now(), &PipelineParams::default()).unwrap();
        let c = build_dataset(&format!("{HEADER}\n"), "mem", now(), &PipelineParams::default()).unwrap();

        assert_eq!(a.fingerprint.len(), 16);
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_ne!(a.fingerprint, c.fingerprint);
    }

    #[test]
    fn empty_source_fails_the_load() {
        let err = build_dataset("", "mem", now(), &PipelineParams::default()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
    }

    #[tokio::test]
    async fn run_once_exports_bundle() {
        let tmp = tempfile::tempdir().unwrap();
        let csv = tmp.path().join("data.csv");
        let today = Utc::now().date_naive();
        let mut text = String::from(HEADER);
        for (i, e) in ["A", "B", "C", "D", "E", "F"].iter().enumerate() {
            let d = today - chrono::Duration::days(10);
            text.push_str(&format!("\n{e},{},{},1,{},{}", d.format("%Y-%m-%d"), 100 - i, 60 - i, 50 - i));
        }
        std::fs::write(&csv, text).unwrap();

        let out = tmp.path().join("out");
        let args = Args::try_parse_from([
            "covid_vibes",
            "--data",
            csv.to_str().unwrap(),
            "--output-dir",
            out.to_str().unwrap(),
            "--mode",
            "trend",
            "--toggle",
            "F",
            "--toggle",
            "A",
            "--toggle",
            "F",
        ])
        .unwrap();
        assert_eq!(args.mode, ChartMode::Trend);

        let dir = run_once(&args).await.unwrap();
        assert!(dir.starts_with(&out));
        assert!(dir.join("viz.index.json").exists());

        let trend: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.join("viz.trend.json")).unwrap()).unwrap();
        // F rejected while full, A removed, then F fits
        assert_eq!(trend["selected"], serde_json::json!(["B", "C", "D", "E", "F"]));

        let summary = std::fs::read_to_string(dir.join("summary.md")).unwrap();
        assert!(summary.contains("## New Cases Trend Over Time"));
    }

    #[tokio::test]
    async fn missing_file_fails_run() {
        let tmp = tempfile::tempdir().unwrap();
        let args = Args::try_parse_from([
            "covid_vibes",
            "--data",
            tmp.path().join("absent.csv").to_str().unwrap(),
            "--output-dir",
            tmp.path().join("out").to_str().unwrap(),
        ])
        .unwrap();

        let err = run_once(&args).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::Fetch { .. })));
    }
}
