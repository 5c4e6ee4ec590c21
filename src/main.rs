//! datacrunch CLI entry point

use anyhow::{Context, Result};
use datacrunch::config::cli::{Cli, ExecutionMode};
use datacrunch::config::{cli_convert, toml, validator, Config};
use datacrunch::distributed::coordinator::{connect_workers, Coordinator};
use datacrunch::distributed::node_service::local_node_id;
use datacrunch::distributed::{DistributionSummary, NodeService, Role};
use datacrunch::ingest::ingest_all;
use datacrunch::output::json::{write_reports, JsonDatasetReport, JsonRunReport};
use datacrunch::output::text::print_report;
use datacrunch::pipeline::{crunch_all, DatasetOutcome};
use datacrunch::sort::{ParallelSorter, RayonScheduler};
use datacrunch::util::logging::init_logging;
use std::sync::Arc;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();
    init_logging(&cli.log_level)?;
    cli.validate()?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), mode = ?cli.mode, "datacrunch starting");

    let config = toml::build_config(&cli)?;
    validator::validate_config(&config).context("Configuration validation failed")?;

    if cli.dry_run {
        print_configuration(&cli, &config);
        println!();
        println!("Dry run mode - configuration validated successfully");
        return Ok(());
    }

    // Handle different execution modes
    match cli.mode {
        ExecutionMode::Standalone => run_standalone(config),
        ExecutionMode::Local => run_local(&cli, config),
        ExecutionMode::Coordinator | ExecutionMode::Worker => match cli.role() {
            Role::Coordinator => run_coordinator(&cli, config),
            Role::Worker { rank } => run_worker(&cli, rank, config),
        },
    }
}

/// Run in standalone mode (single process, no distribution)
fn run_standalone(config: Config) -> Result<()> {
    let scheduler = RayonScheduler::new(config.sort.threads)
        .context("Failed to build sort thread pool")?;
    let sorter = ParallelSorter::new(scheduler);

    let ids = config.datasets.ids();
    let datasets = ingest_all(&config.datasets.input_dir, &ids)?;
    let outcomes = crunch_all(datasets, &ids, &sorter, &config.stats);
    let total = outcomes.len();

    let mut reports = Vec::with_capacity(total);
    for outcome in outcomes {
        match outcome {
            DatasetOutcome::Completed(report) => {
                print_report(&report.summary, config.output.precision);
                reports.push(report);
            }
            DatasetOutcome::Failed { .. } => {}
        }
    }

    if let Some(ref path) = config.output.json_output {
        let node_id = local_node_id();
        let entries = reports
            .iter()
            .map(|report| JsonDatasetReport {
                dataset: report.dataset,
                rank: None,
                node_id: node_id.clone(),
                elapsed_micros: report.elapsed.as_micros() as u64,
                summary: report.summary,
            })
            .collect();
        write_reports(path, &JsonRunReport::new("standalone", entries))?;
    }

    if reports.len() < total {
        anyhow::bail!("{} of {} datasets failed", total - reports.len(), total);
    }
    Ok(())
}

/// Run coordinator and workers in this process
fn run_local(cli: &Cli, config: Config) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create tokio runtime")?;

    let config = Arc::new(config);
    let summary = runtime.block_on(datacrunch::distributed::local::run_local(
        Arc::clone(&config),
        cli.num_workers,
    ))?;

    finish_distribution(&config, "local", &summary)
}

/// Run as coordinator of remote workers
fn run_coordinator(cli: &Cli, config: Config) -> Result<()> {
    let addresses = cli_convert::worker_addresses(cli)?;
    let precision = config.output.precision;

    // Coordinator mode uses tokio runtime
    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create tokio runtime")?;

    let config = Arc::new(config);
    let summary = runtime.block_on(async {
        let links = connect_workers(&addresses).await?;
        Coordinator::new(Arc::clone(&config)).run(links).await
    })?;

    // Workers print on their own hosts; repeat the lines here
    for report in summary.reports() {
        print_report(&report.summary, precision);
    }

    finish_distribution(&config, "coordinator", &summary)
}

/// Run as a worker: serve one dataset and exit
fn run_worker(cli: &Cli, rank: usize, config: Config) -> Result<()> {
    // Service mode uses tokio runtime
    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(async {
        let service = NodeService::new(rank, &config).context("Failed to create node service")?;
        service.listen(cli.listen_port).await
    })?;

    Ok(())
}

/// Write the JSON report if requested and fail if any worker failed
fn finish_distribution(config: &Config, mode: &str, summary: &DistributionSummary) -> Result<()> {
    if let Some(ref path) = config.output.json_output {
        let entries = summary
            .reports()
            .map(|report| JsonDatasetReport {
                dataset: report.dataset,
                rank: Some(report.rank),
                node_id: report.node_id.clone(),
                elapsed_micros: report.elapsed_ns / 1_000,
                summary: report.summary,
            })
            .collect();
        write_reports(path, &JsonRunReport::new(mode, entries))?;
    }

    if !summary.is_success() {
        anyhow::bail!(
            "{} of {} workers failed",
            summary.failures(),
            summary.outcomes.len()
        );
    }
    Ok(())
}

/// Print the effective configuration (dry run)
fn print_configuration(cli: &Cli, config: &Config) {
    println!("Configuration:");
    println!("  Mode: {:?}", cli.mode);
    println!("  Input directory: {}", config.datasets.input_dir.display());
    println!("  Datasets: {}", config.datasets.ids().len());
    for id in config.datasets.ids() {
        println!("    {}", id.path_in(&config.datasets.input_dir).display());
    }
    if config.sort.threads == 0 {
        println!("  Sort threads: {} (all cores)", num_cpus::get());
    } else {
        println!("  Sort threads: {}", config.sort.threads);
    }
    println!("  Percentile: {:?}", config.stats.percentile);
    println!("  Sort check: {:?}", config.stats.sort_check);
    println!("  Tag: {}", config.network.tag);
    println!("  Precision: {}", config.output.precision);
    if let Some(ref path) = config.output.json_output {
        println!("  JSON output: {}", path.display());
    }
}
