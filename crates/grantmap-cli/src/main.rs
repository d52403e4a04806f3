use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use grantmap_judge::LlmJudge;
use grantmap_pipeline::{BatchCoordinator, RunOutcome};
use tracing::info;

mod config;
mod dataset;

/// Map research publications to the grants that likely funded them.
#[derive(Parser)]
#[command(name = "grantmap", version, about)]
struct Args {
    /// Grants dataset (JSON array of grant records).
    #[arg(long)]
    grants: PathBuf,

    /// Publications dataset (JSON array of publication records).
    #[arg(long)]
    publications: PathBuf,

    /// Configuration file.
    #[arg(long, default_value = "grantmap.toml", env = "GRANTMAP_CONFIG")]
    config: PathBuf,

    /// Process only the first N publications.
    #[arg(long)]
    sample: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let app_config = config::AppConfig::load(&args.config)
        .with_context(|| format!("reading config {}", args.config.display()))?;

    let grants = dataset::load_grants(&args.grants)
        .with_context(|| format!("reading grants dataset {}", args.grants.display()))?;
    let mut publications = dataset::load_publications(&args.publications)
        .with_context(|| format!("reading publications dataset {}", args.publications.display()))?;
    if let Some(n) = args.sample {
        publications.truncate(n);
        info!(sample = publications.len(), "processing a sample only");
    }
    info!(
        grants = grants.len(),
        publications = publications.len(),
        "datasets loaded"
    );

    let judge = LlmJudge::new(app_config.judge)?;
    let coordinator = BatchCoordinator::new(app_config.pipeline, judge);

    match coordinator.run(&grants, &publications).await? {
        RunOutcome::Complete(summary) => {
            info!(
                processed = summary.processed_count,
                mapped = summary.mapped_count,
                mapping_rate = %format_args!("{:.1}%", summary.mapping_rate()),
                api_calls = summary.api_calls_made,
                api_success_rate = %format_args!("{:.1}%", summary.api_success_rate()),
                "mapping run complete"
            );
        }
        RunOutcome::Paused(summary) => {
            info!(
                processed = summary.processed_count,
                total = summary.total_publications,
                mapped = summary.mapped_count,
                "run paused on rate limiting; progress and checkpoint are on disk, rerun to resume"
            );
        }
    }

    Ok(())
}
