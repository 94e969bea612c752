use anyhow::Result;
use clap::Parser;
use covid_vibes::config::Args;
use covid_vibes::orchestrator::run_once;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();

    info!("Starting covid_vibes");

    let args = Args::parse();
    debug!(
        "Config - data={}, output_dir={}, top_n={}, window_days={}, date_ordering={:?}",
        args.data,
        args.output_dir.display(),
        args.top_n,
        args.window_days,
        args.date_ordering
    );

    let dir = run_once(&args).await?;
    info!("Charts ready in {}", dir.display());
    Ok(())
}
