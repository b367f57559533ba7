//! # crawl-tracker
//!
//! Console front end: submits one crawl job, prints every status change
//! until the job completes or fails, and optionally downloads the result.
//!
//! ```bash
//! crawl-tracker --url https://example.com --max-pages 50 --max-workers 3 \
//!   --include-subdomains false --output results.json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use crawl_task_tracker::infrastructure::init_logging_with_config;
use crawl_task_tracker::{JobOptions, JobRequest, TaskController, TaskStatus, TrackerConfig};

/// Submit a crawl job and follow it to completion
#[derive(Debug, Parser)]
#[command(name = "crawl-tracker", version, about)]
struct Cli {
    /// Site to crawl
    #[arg(long)]
    url: Option<String>,

    /// Maximum number of pages (default from config, 100)
    #[arg(long)]
    max_pages: Option<String>,

    /// Number of server-side workers (default from config, 5)
    #[arg(long)]
    max_workers: Option<String>,

    /// Follow subdomains of the start URL
    #[arg(long, action = clap::ArgAction::Set)]
    include_subdomains: Option<bool>,

    /// Config file (TOML or JSON)
    #[arg(short, long, env = "CRAWL_TRACKER_CONFIG")]
    config: Option<PathBuf>,

    /// Override the job service base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Save the result file here once the job completes
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only check whether the job service is healthy
    #[arg(long)]
    check_health: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = TrackerConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(base_url) = &cli.base_url {
        config.service.base_url.clone_from(base_url);
        config.validate().context("Invalid --base-url")?;
    }
    init_logging_with_config(&config.logging)?;

    let controller = TaskController::from_config(&config)?;

    if cli.check_health {
        let healthy = controller.check_service_health().await?;
        println!("{}: {}", config.service.base_url, if healthy { "healthy" } else { "unhealthy" });
        return Ok(if healthy { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    let url = cli.url.context("--url is required unless --check-health is given")?;
    let options = config.defaults.fill(JobOptions {
        max_pages: JobOptions::parse_numeric("maxPages", cli.max_pages.as_deref().unwrap_or(""))?,
        max_workers: JobOptions::parse_numeric("maxWorkers", cli.max_workers.as_deref().unwrap_or(""))?,
        include_subdomains: cli.include_subdomains,
    });
    let handle = controller.submit(JobRequest::from_options(url, options)).await?;
    println!("Submitted task {handle}");

    let mut updates = controller.updates();
    let mut last_status: Option<TaskStatus> = None;
    let mut last_error: Option<String> = None;
    loop {
        tokio::select! {
            update = updates.next() => {
                let Some(snapshot) = update else { break };
                if snapshot.status != last_status {
                    if let Some(status) = &snapshot.status {
                        println!("Status: {status}");
                    }
                    last_status.clone_from(&snapshot.status);
                }
                if snapshot.error != last_error {
                    if let Some(message) = &snapshot.error {
                        warn!("Job service error: {}", message);
                    }
                    last_error.clone_from(&snapshot.error);
                }
                if snapshot.is_terminal() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping status polling");
                controller.shutdown();
                return Ok(ExitCode::from(130));
            }
        }
    }

    let snapshot = controller.snapshot();
    if let Some(result) = &snapshot.result {
        println!("Pages scraped: {}", result.pages_scraped);
        if let Some(link) = controller.resolved_download_url() {
            println!("Download: {link}");
        }
        if let Some(reason) = &result.failure {
            println!("Failure: {reason}");
        }
    }

    if snapshot.status != Some(TaskStatus::Completed) {
        return Ok(ExitCode::FAILURE);
    }
    if let Some(path) = &cli.output {
        let written = controller.download_result(path).await?;
        println!("Saved {written} bytes to {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}
