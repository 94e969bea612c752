// src/render.rs
use crate::errors::PipelineError;
use crate::models::{Dataset, RankedSnapshotSet, Row};
use crate::selection::SeriesSelector;
use crate::snapshot::mean_secondary_ratio;
use crate::timeseries::group_by_entity;
use crate::view::{ChartMode, ViewState};

/// The render boundary. One entry per chart; the trend entry receives the
/// selection whose `toggle` is the UI's checkbox callback.
pub trait ChartSink {
    fn render_snapshot_bar(&mut self, snapshots: &RankedSnapshotSet) -> Result<(), PipelineError>;
    fn render_snapshot_scatter(&mut self, snapshots: &RankedSnapshotSet) -> Result<(), PipelineError>;
    fn render_trend(&mut self, series: &[Row], selection: &SeriesSelector) -> Result<(), PipelineError>;
}

/// Drive the entry point for the active mode. A trend view without a seeded
/// selection renders nothing.
pub fn render_active<S: ChartSink + ?Sized>(
    sink: &mut S,
    dataset: &Dataset,
    view: &ViewState,
) -> Result<(), PipelineError> {
    match view.mode {
        ChartMode::Bar => sink.render_snapshot_bar(&dataset.snapshots),
        ChartMode::Scatter => sink.render_snapshot_scatter(&dataset.snapshots),
        ChartMode::Trend => match view.selection() {
            Some(sel) => sink.render_trend(&dataset.series, sel),
            None => Ok(()),
        },
    }
}

/// Axis-style compact number: 1500000 -> "1.5M", 12000 -> "12K".
pub fn format_tick(v: f64) -> String {
    if v >= 1_000_000.0 {
        format!("{}M", trim_float(v / 1_000_000.0))
    } else if v >= 1_000.0 {
        format!("{}K", trim_float(v / 1_000.0))
    } else {
        trim_float(v)
    }
}

fn trim_float(v: f64) -> String {
    let s = format!("{:.2}", v);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Plain Markdown rendering of whichever chart is active.
#[derive(Debug, Default)]
pub struct MarkdownSummary {
    pub out: String,
}

impl ChartSink for MarkdownSummary {
    fn render_snapshot_bar(&mut self, snapshots: &RankedSnapshotSet) -> Result<(), PipelineError> {
        let md = &mut self.out;
        md.push_str(&format!("## {}\n\n", ChartMode::Bar.title()));
        if snapshots.is_empty() {
            md.push_str("No data available\n");
            return Ok(());
        }
        md.push_str("| # | Country | Total cases | As of |\n|---|---|---|---|\n");
        for (i, s) in snapshots.snapshots.iter().enumerate() {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                i + 1,
                s.entity,
                format_tick(s.total_primary),
                s.date
            ));
        }
        Ok(())
    }

    fn render_snapshot_scatter(&mut self, snapshots: &RankedSnapshotSet) -> Result<(), PipelineError> {
        let md = &mut self.out;
        md.push_str(&format!("## {}\n\n", ChartMode::Scatter.title()));
        if snapshots.is_empty() {
            md.push_str("No data available\n");
            return Ok(());
        }
        md.push_str("| Country | Cases | Deaths | Death rate |\n|---|---|---|---|\n");
        for s in &snapshots.snapshots {
            md.push_str(&format!(
                "| {} | {} | {} | {:.2}% |\n",
                s.entity,
                format_tick(s.total_primary),
                format_tick(s.total_secondary),
                s.total_secondary / s.total_primary * 100.0
            ));
        }
        if let Some(r) = mean_secondary_ratio(snapshots) {
            md.push_str(&format!("\nAvg. Death Rate: {:.2}%\n", r * 100.0));
        }
        Ok(())
    }

    fn render_trend(&mut self, series: &[Row], selection: &SeriesSelector) -> Result<(), PipelineError> {
        let md = &mut self.out;
        md.push_str(&format!("## {}\n\n", ChartMode::Trend.title()));
        if selection.selected().is_empty() {
            md.push_str("No countries selected\n");
            return Ok(());
        }
        md.push_str("| Country | Points | From | To | Peak (7-day avg) |\n|---|---|---|---|---|\n");
        for (entity, rows) in group_by_entity(series, selection.selected()) {
            let (first, last) = match (rows.first(), rows.last()) {
                (Some(f), Some(l)) => (f.date.as_str(), l.date.as_str()),
                _ => ("-", "-"),
            };
            let peak = rows.iter().map(|r| r.new_primary_smoothed).fold(0.0, f64::max);
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                entity,
                rows.len(),
                first,
                last,
                format_tick(peak)
            ));
        }
        Ok(())
    }
}

pub fn render_summary_markdown(dataset: &Dataset, view: &ViewState) -> Result<String, PipelineError> {
    let mut md = MarkdownSummary::default();
    md.out.push_str("# COVID-19 Data Visualization\n\n");
    md.out.push_str(&format!(
        "Source: `{}` (version {}, {})\n\n",
        dataset.source, dataset.version, dataset.fingerprint
    ));
    render_active(&mut md, dataset, view)?;
    Ok(md.out)
}
