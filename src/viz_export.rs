// src/viz_export.rs
use serde::Serialize;
use serde_json::json;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::errors::PipelineError;
use crate::models::{Dataset, RankedSnapshotSet, Row};
use crate::render::ChartSink;
use crate::selection::{Checkbox, SeriesSelector};
use crate::snapshot::mean_secondary_ratio;
use crate::timeseries::group_by_entity;
use crate::view::ViewState;

/* -------------------------------------------------------------------------- */
/* Entry point                                                                */
/* -------------------------------------------------------------------------- */

const FILE_BAR: &str = "viz.bar.json";
const FILE_SCATTER: &str = "viz.scatter.json";
const FILE_TREND: &str = "viz.trend.json";
const FILE_INDEX: &str = "viz.index.json";

/// Write all D3-ready chart documents into `out/<fingerprint>/` and return
/// that directory. All three charts are exported; the index records which
/// one is active.
pub fn write_all_viz(out_dir: &Path, dataset: &Dataset, view: &ViewState) -> Result<PathBuf, PipelineError> {
    let dir = out_dir.join(&dataset.fingerprint);
    fs::create_dir_all(&dir).map_err(|e| PipelineError::export(&dir, e))?;

    let mut exporter = JsonExporter::new(&dir);
    exporter.render_snapshot_bar(&dataset.snapshots)?;
    exporter.render_snapshot_scatter(&dataset.snapshots)?;
    if let Some(sel) = view.selection() {
        exporter.render_trend(&dataset.series, sel)?;
    }

    let idx = json!({
        "version": dataset.version,
        "fingerprint": dataset.fingerprint,
        "source": dataset.source,
        "loaded_at": dataset.loaded_at.to_rfc3339(),
        "mode": view.mode,
        "title": view.mode.title(),
        "counts": {
            "snapshots": dataset.snapshots.len(),
            "series_rows": dataset.series.len(),
            "selected": view.selection().map(|s| s.selected().len()).unwrap_or(0),
            "skipped_rows": dataset.parse_stats.skipped_incomplete,
        },
        "missing_columns": dataset.parse_stats.missing_columns,
        "files": exporter.written,
    });
    write_json(dir.join(FILE_INDEX), &idx)?;

    Ok(dir)
}

fn write_json<P: AsRef<Path>, T: ?Sized + Serialize>(path: P, value: &T) -> Result<(), PipelineError> {
    let path = path.as_ref();
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| PipelineError::export(path, e))?;
    fs::write(path, bytes).map_err(|e| PipelineError::export(path, e))
}

/// `ChartSink` that writes one JSON document per chart.
pub struct JsonExporter {
    dir: PathBuf,
    written: Vec<&'static str>,
}

impl JsonExporter {
    pub fn new(dir: &Path) -> Self {
        JsonExporter {
            dir: dir.to_path_buf(),
            written: Vec::new(),
        }
    }

    fn emit<T: Serialize>(&mut self, name: &'static str, value: &T) -> Result<(), PipelineError> {
        write_json(self.dir.join(name), value)?;
        self.written.push(name);
        Ok(())
    }
}

impl ChartSink for JsonExporter {
    fn render_snapshot_bar(&mut self, snapshots: &RankedSnapshotSet) -> Result<(), PipelineError> {
        let bar = build_bar(snapshots);
        self.emit(FILE_BAR, &bar)
    }

    fn render_snapshot_scatter(&mut self, snapshots: &RankedSnapshotSet) -> Result<(), PipelineError> {
        let scatter = build_scatter(snapshots);
        self.emit(FILE_SCATTER, &scatter)
    }

    fn render_trend(&mut self, series: &[Row], selection: &SeriesSelector) -> Result<(), PipelineError> {
        let trend = build_trend(series, selection);
        self.emit(FILE_TREND, &trend)
    }
}

/* -------------------------------------------------------------------------- */
/* 1) Bar                                                                     */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Serialize, PartialEq)]
struct VBar {
    entity: String,
    value: f64, // total cases
    date: String,
}

#[derive(Debug, Serialize)]
struct VBarBundle {
    title: &'static str,
    y_max: f64,
    bars: Vec<VBar>,
}

fn build_bar(set: &RankedSnapshotSet) -> VBarBundle {
    let bars: Vec<VBar> = set
        .snapshots
        .iter()
        .map(|s| VBar {
            entity: s.entity.clone(),
            value: s.total_primary,
            date: s.date.clone(),
        })
        .collect();
    let y_max = bars.iter().map(|b| b.value).fold(0.0, f64::max);

    VBarBundle {
        title: "Total COVID-19 Cases by Country",
        y_max,
        bars,
    }
}

/* -------------------------------------------------------------------------- */
/* 2) Scatter                                                                 */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Serialize)]
struct VPoint {
    entity: String,
    x: f64, // total cases
    y: f64, // total deaths
    ratio: f64,
}

/// Reference line through the origin with slope = mean deaths/cases.
#[derive(Debug, Serialize, PartialEq)]
struct VReference {
    mean_ratio: f64,
    label: String,
    from: [f64; 2],
    to: [f64; 2],
}

#[derive(Debug, Serialize)]
struct VScatterBundle {
    title: &'static str,
    x_max: f64,
    y_max: f64,
    points: Vec<VPoint>,
    reference: Option<VReference>,
}

fn build_scatter(set: &RankedSnapshotSet) -> VScatterBundle {
    let points: Vec<VPoint> = set
        .snapshots
        .iter()
        .map(|s| VPoint {
            entity: s.entity.clone(),
            x: s.total_primary,
            y: s.total_secondary,
            ratio: s.total_secondary / s.total_primary,
        })
        .collect();
    let x_max = points.iter().map(|p| p.x).fold(0.0, f64::max);
    let y_max = points.iter().map(|p| p.y).fold(0.0, f64::max);

    let reference = mean_secondary_ratio(set).map(|r| VReference {
        mean_ratio: r,
        label: format!("Avg. Death Rate: {:.2}%", r * 100.0),
        from: [0.0, 0.0],
        to: [x_max, x_max * r],
    });

    VScatterBundle {
        title: "COVID-19 Cases vs Deaths",
        x_max,
        y_max,
        points,
        reference,
    }
}

/* -------------------------------------------------------------------------- */
/* 3) Trend                                                                   */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Serialize, PartialEq)]
struct VTrendPoint {
    date: String,
    value: f64, // new cases, 7-day smoothed
}

#[derive(Debug, Serialize)]
struct VTrendSeries {
    entity: String,
    points: Vec<VTrendPoint>,
}

#[derive(Debug, Serialize)]
struct VTrendBundle {
    title: &'static str,
    y_label: &'static str,
    y_max: f64,
    x_extent: Option<[String; 2]>,
    selected: Vec<String>,
    checkboxes: Vec<Checkbox>,
    series: Vec<VTrendSeries>,
}

fn build_trend(rows: &[Row], selection: &SeriesSelector) -> VTrendBundle {
    let series: Vec<VTrendSeries> = group_by_entity(rows, selection.selected())
        .into_iter()
        .map(|(entity, rows)| VTrendSeries {
            entity,
            points: rows
                .into_iter()
                .map(|r| VTrendPoint {
                    date: r.date.clone(),
                    value: r.new_primary_smoothed,
                })
                .collect(),
        })
        .collect();

    let peak = series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.value))
        .fold(0.0, f64::max);
    // a flat or empty chart still gets a usable axis
    let y_max = if peak > 0.0 { peak * 1.1 } else { 100.0 };

    let first = series.iter().filter_map(|s| s.points.first()).map(|p| &p.date).min();
    let last = series.iter().filter_map(|s| s.points.last()).map(|p| &p.date).max();
    let x_extent = first.zip(last).map(|(a, b)| [a.clone(), b.clone()]);

    VTrendBundle {
        title: "COVID-19: New Cases Trend Over Time",
        y_label: "New Cases (7-day avg)",
        y_max,
        x_extent,
        selected: selection.selected().to_vec(),
        checkboxes: selection.checkboxes(),
        series,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ParseStats, Snapshot};
    use crate::view::ChartMode;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn snap(entity: &str, primary: f64, secondary: f64) -> Snapshot {
        Snapshot {
            entity: entity.into(),
            date: "2021-01-02".into(),
            total_primary: primary,
            total_secondary: secondary,
        }
    }

    fn row(entity: &str, date: &str, new_primary: f64, smoothed: f64) -> Row {
        Row {
            entity: entity.into(),
            date: date.into(),
            total_primary: 1.0,
            total_secondary: 1.0,
            new_primary,
            new_primary_smoothed: smoothed,
        }
    }

    fn dataset() -> Dataset {
        Dataset {
            version: 1,
            fingerprint: "0123456789abcdef".into(),
            source: "data.csv".into(),
            loaded_at: Utc::now(),
            snapshots: RankedSnapshotSet {
                snapshots: vec![snap("A", 200.0, 4.0), snap("B", 100.0, 1.0)],
            },
            series: vec![
                row("A", "2021-01-03", 9.0, 30.0),
                row("B", "2021-01-01", 2.0, 5.0),
                row("A", "2021-01-01", 1.0, 10.0),
            ],
            parse_stats: ParseStats::default(),
        }
    }

    #[test]
    fn bar_keeps_rank_order() {
        let bar = build_bar(&dataset().snapshots);
        assert_eq!(bar.y_max, 200.0);
        assert_eq!(
            bar.bars.iter().map(|b| b.entity.as_str()).collect::<Vec<_>>(),
            vec!["A", "B"]
        );
    }

    #[test]
    fn scatter_reference_uses_mean_ratio() {
        let scatter = build_scatter(&dataset().snapshots);
        let reference = scatter.reference.unwrap();

        // (0.02 + 0.01) / 2
        assert!((reference.mean_ratio - 0.015).abs() < 1e-12);
        assert_eq!(reference.label, "Avg. Death Rate: 1.50%");
        assert_eq!(reference.to[0], 200.0);
        assert!((reference.to[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn scatter_without_points_has_no_reference() {
        let scatter = build_scatter(&RankedSnapshotSet::default());
        assert!(scatter.reference.is_none());
        assert!(scatter.points.is_empty());
    }

    #[test]
    fn trend_series_sorted_by_date() {
        let ds = dataset();
        let sel = SeriesSelector::seed(&ds.series);
        let trend = build_trend(&ds.series, &sel);

        assert_eq!(trend.selected, vec!["A", "B"]);
        assert_eq!(
            trend.series[0].points,
            vec![
                VTrendPoint { date: "2021-01-01".into(), value: 10.0 },
                VTrendPoint { date: "2021-01-03".into(), value: 30.0 },
            ]
        );
        assert!((trend.y_max - 33.0).abs() < 1e-9);
        assert_eq!(trend.x_extent, Some(["2021-01-01".to_string(), "2021-01-03".to_string()]));
    }

    #[test]
    fn empty_trend_gets_default_axis() {
        let ds = dataset();
        let mut sel = SeriesSelector::seed(&ds.series);
        sel.toggle("A").unwrap();
        sel.toggle("B").unwrap();

        let trend = build_trend(&ds.series, &sel);
        assert_eq!(trend.y_max, 100.0);
        assert_eq!(trend.x_extent, None);
        assert!(trend.series.is_empty());
    }

    #[test]
    fn writes_bundle_with_index() {
        let tmp = tempfile::tempdir().unwrap();
        let ds = dataset();
        let mut view = ViewState::new(ChartMode::Scatter);
        view.sync(&ds);

        let dir = write_all_viz(tmp.path(), &ds, &view).unwrap();
        assert_eq!(dir, tmp.path().join("0123456789abcdef"));
        for f in [FILE_BAR, FILE_SCATTER, FILE_TREND, FILE_INDEX] {
            assert!(dir.join(f).exists(), "{f} missing");
        }

        let idx: serde_json::Value =
            serde_json::from_slice(&fs::read(dir.join(FILE_INDEX)).unwrap()).unwrap();
        assert_eq!(idx["mode"], "scatter");
        assert_eq!(idx["counts"]["snapshots"], 2);
        assert_eq!(idx["counts"]["selected"], 2);
        assert_eq!(idx["files"], json!([FILE_BAR, FILE_SCATTER, FILE_TREND]));
    }
}
