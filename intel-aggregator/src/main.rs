use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use intel_aggregator::{load_config, logging, IntelPipeline};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "intel-aggregator", version, about = "Crypto regulation intelligence digest")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding the fetched and analyzed batches
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory the HTML reports and history index go to
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Report date (YYYY-MM-DD), defaults to today
    #[arg(long, global = true)]
    date: Option<NaiveDate>,

    /// Skip fetching and work from stored batches
    #[arg(long, global = true)]
    offline: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pull posts and articles and store the deduplicated batches
    Fetch,
    /// Classify stored batches and derive account recommendations
    Analyze,
    /// Render the HTML report and update history
    Report,
    /// Fetch, analyze and report
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = load_config().context("loading configuration")?;
    if let Some(dir) = cli.data_dir {
        config.directories.data_dir = dir;
    }
    if let Some(dir) = cli.output_dir {
        config.directories.output_dir = dir;
    }
    logging::init_tracing(&config.logging)?;

    let date = cli.date.unwrap_or_else(|| Local::now().date_naive());
    let mut pipeline = IntelPipeline::new(config);

    let outcome = match cli.command {
        Command::Fetch => {
            if cli.offline {
                info!("Offline mode, nothing to fetch");
                return Ok(());
            }
            pipeline.add_configured_sources()?;
            let summary = pipeline.fetch().await?;
            info!("Stored {} posts and {} articles", summary.posts, summary.articles);
            return Ok(());
        }
        Command::Analyze => {
            let analysis = pipeline.analyze().await?;
            info!(
                "Classified {} items, {} recommendations",
                analysis.items.len(),
                analysis.recommendations.len()
            );
            return Ok(());
        }
        Command::Report => pipeline.report(date),
        Command::Run => pipeline.run(date, cli.offline).await,
    };

    match outcome {
        Ok(report) => {
            info!("Report ready: {}", report.report_path.display());
            Ok(())
        }
        Err(e) => {
            error!("Could not produce report for {}: {}", date, e);
            Err(e).context("report run failed")
        }
    }
}
