mod cli;
mod logging;
mod reporter;

use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use anyhow::{anyhow, Context};
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands, OrganizeArgs, PlanArgs, RootArgs, StatusArgs};
use colored::*;
use dedupe_organizer::apply::apply_plan;
use dedupe_organizer::scanner::scan_candidates;
use dedupe_organizer::{AppConfig, Error, ProgressReporter, RunController, RunOutcome, RunStart};
use dotenv::dotenv;
use reporter::CliReporter;
use tracing::{error, info, warn};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match dedupe_organizer::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    let result = match args.command {
        Some(Commands::Organize(args)) => run_organize(&config, &args),
        Some(Commands::Plan(args)) => run_plan(&config, &args),
        Some(Commands::Status(args)) => run_status(&config, &args),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
            Ok(())
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn run_organize(config: &AppConfig, args: &OrganizeArgs) -> anyhow::Result<()> {
    let reporter = CliReporter::new();
    let (outcome, target) = plan_roots(config, &args.roots, &reporter)?;

    let summary = apply_plan(&outcome.state, &target, args.dry_run, &reporter)
        .context("copy phase failed")?;
    info!(
        "{} directories created, {} files copied ({} bytes), {} skipped",
        format!("{}", summary.directories_created).cyan(),
        format!("{}", summary.files_copied).green(),
        summary.bytes_copied,
        format!("{}", summary.files_skipped).yellow(),
    );
    Ok(())
}

fn run_plan(config: &AppConfig, args: &PlanArgs) -> anyhow::Result<()> {
    let reporter = CliReporter::new();
    let (outcome, _) = plan_roots(config, &args.roots, &reporter)?;

    if let Some(csv_path) = &args.csv {
        write_plan_csv(&outcome, csv_path)
            .with_context(|| format!("writing plan to {}", csv_path.display()))?;
        info!("Plan written to {}", csv_path.display());
    }
    Ok(())
}

fn run_status(config: &AppConfig, args: &StatusArgs) -> anyhow::Result<()> {
    let source = resolve_root(args.source.as_deref(), config.source_root.as_deref(), "--source")?;
    let candidates = scan_candidates(&source, &config.ignore_patterns)?;
    let target = config.target_root.clone().unwrap_or_default();
    let controller = RunController::from_config(config, &source, target)?;
    let inspection = controller.inspect(&candidates)?;

    println!("Input set:  {} files", candidates.len());
    println!("Identity:   {}", inspection.identity);
    println!("Checkpoint: {}", inspection.checkpoint_path.display());
    match inspection.summary {
        Some(summary) => {
            let status = if summary.complete {
                "complete".green()
            } else {
                "in progress".yellow()
            };
            println!("Status:     {}", status);
            println!(
                "Checked:    {} of {}",
                summary.processed,
                candidates.len()
            );
            println!("Unique:     {}", summary.surviving);
            println!(
                "Planned:    {} files in {} directories",
                summary.planned_files, summary.target_directories
            );
        }
        None => println!("Status:     {}", "no checkpoint".dimmed()),
    }
    Ok(())
}

/// Scan the source tree and run the resumable dedupe/plan engine over it.
fn plan_roots(
    config: &AppConfig,
    roots: &RootArgs,
    reporter: &CliReporter,
) -> anyhow::Result<(RunOutcome, PathBuf)> {
    let source = resolve_root(roots.source.as_deref(), config.source_root.as_deref(), "--source")?;
    let target = resolve_root(roots.target.as_deref(), config.target_root.as_deref(), "--target")?;
    if target.starts_with(&source) {
        warn!(
            "Target {} is inside source {}; organized files will be picked up by the next scan",
            target.display(),
            source.display()
        );
    }

    reporter.on_scan_start();
    let scan_start = Instant::now();
    let candidates = scan_candidates(&source, &config.ignore_patterns)
        .with_context(|| format!("scanning {}", source.display()))?;
    reporter.on_scan_complete(candidates.len(), scan_start.elapsed().as_secs_f64());
    info!("Found {} files", candidates.len());

    let controller = RunController::from_config(config, &source, &target)?;
    let outcome = match controller.run(&candidates, reporter) {
        Err(Error::CorruptCheckpoint { path, reason }) if roots.discard_corrupt => {
            warn!(
                "Discarding unreadable checkpoint {} ({}), starting over",
                path.display(),
                reason
            );
            controller.discard_checkpoint(&candidates)?;
            controller.run(&candidates, reporter)?
        }
        other => other?,
    };

    print_outcome(&outcome);
    Ok((outcome, target))
}

fn print_outcome(outcome: &RunOutcome) {
    let start = match outcome.start {
        RunStart::Fresh => "fresh run".normal(),
        RunStart::Resumed => "resumed".yellow(),
        RunStart::AlreadyComplete => "reused completed checkpoint".cyan(),
    };
    info!(
        "{}: {} hashed, {} already checked, {} duplicates",
        start,
        format!("{}", outcome.hashed).green(),
        outcome.already_processed,
        format!("{}", outcome.duplicates).red(),
    );
    info!(
        "Dedupe: {}, Plan: {}",
        format!("{:.2}s", outcome.dedupe_duration.as_secs_f64()).green(),
        format!("{:.2}s", outcome.plan_duration.as_secs_f64()).green(),
    );
    info!(
        "{} files planned into {} directories, {} already present, {} name collisions",
        format!("{}", outcome.planned).green(),
        format!("{}", outcome.target_directories().len()).cyan(),
        outcome.already_present,
        outcome.name_collisions,
    );
}

fn write_plan_csv(outcome: &RunOutcome, path: &Path) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["subdirectory", "source", "destination"])?;
    for (subdir, assignment) in outcome.state.assignments() {
        writer.write_record([
            subdir.to_string(),
            assignment.source.to_string_lossy().into_owned(),
            assignment.destination.to_string_lossy().into_owned(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn resolve_root(
    from_args: Option<&Path>,
    from_config: Option<&Path>,
    flag: &str,
) -> anyhow::Result<PathBuf> {
    let path = from_args
        .or(from_config)
        .ok_or_else(|| anyhow!("{} is required", flag))?;
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
