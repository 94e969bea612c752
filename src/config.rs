use clap::Parser;
use std::path::PathBuf;

use crate::snapshot::{DateOrdering, SnapshotParams};
use crate::view::ChartMode;

/// Covid Vibes - COVID-19 CSV to D3 chart data
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// CSV location: a file path or an http(s) URL
    #[arg(short, long, env = "COVID_VIBES_DATA", default_value = "data.csv")]
    pub data: String,

    /// Output directory for generated chart files
    #[arg(short, long, env = "COVID_VIBES_OUT", default_value = "out")]
    pub output_dir: PathBuf,

    /// Active chart
    #[arg(short, long, value_enum, default_value_t = ChartMode::Bar)]
    pub mode: ChartMode,

    /// How many countries the bar and scatter views keep
    #[arg(long, default_value_t = 20)]
    pub top_n: usize,

    /// Length of the trailing trend window in days (1 to 36500)
    #[arg(long, default_value_t = 365, value_parser = clap::value_parser!(i64).range(1..=36500))]
    pub window_days: i64,

    /// How the latest row per country is chosen
    #[arg(long, value_enum, default_value_t = DateOrdering::Lexical)]
    pub date_ordering: DateOrdering,

    /// Toggle a country in the trend selection (repeatable, applied in order)
    #[arg(long = "toggle", value_name = "COUNTRY")]
    pub toggles: Vec<String>,
}

/// Derivation knobs for one load.
#[derive(Debug, Clone, Copy)]
pub struct PipelineParams {
    pub snapshot: SnapshotParams,
    pub window_days: i64, // 365
}

impl Default for PipelineParams {
    fn default() -> Self {
        PipelineParams {
            snapshot: SnapshotParams::default(),
            window_days: 365,
        }
    }
}

impl Args {
    pub fn params(&self) -> PipelineParams {
        PipelineParams {
            snapshot: SnapshotParams {
                top_n: self.top_n,
                date_ordering: self.date_ordering,
            },
            window_days: self.window_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard() {
        let args = Args::try_parse_from(["covid_vibes"]).unwrap();
        let params = args.params();

        assert_eq!(args.mode, ChartMode::Bar);
        assert_eq!(params.snapshot.top_n, 20);
        assert_eq!(params.window_days, 365);
        assert_eq!(params.snapshot.date_ordering, DateOrdering::Lexical);
        assert!(args.toggles.is_empty());
    }

    #[test]
    fn parses_mode_ordering_and_toggles() {
        let args = Args::try_parse_from([
            "covid_vibes",
            "--data",
            "https://example.org/owid.csv",
            "--mode",
            "trend",
            "--date-ordering",
            "strict",
            "--toggle",
            "France",
            "--toggle",
            "Italy",
        ])
        .unwrap();

        assert_eq!(args.data, "https://example.org/owid.csv");
        assert_eq!(args.mode, ChartMode::Trend);
        assert_eq!(args.date_ordering, DateOrdering::Strict);
        assert_eq!(args.toggles, vec!["France", "Italy"]);
    }

    #[test]
    fn window_days_must_stay_in_range() {
        for bad in ["0", "-5", "36501", "200000000000000"] {
            assert!(
                Args::try_parse_from(["covid_vibes", "--window-days", bad]).is_err(),
                "{bad} accepted"
            );
        }
        let args = Args::try_parse_from(["covid_vibes", "--window-days", "36500"]).unwrap();
        assert_eq!(args.params().window_days, 36500);
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(Args::try_parse_from(["covid_vibes", "--mode", "pie"]).is_err());
    }
}
