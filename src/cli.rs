use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "dedupe-organizer")]
#[command(about = "De-duplicate a file tree and file it by year and category", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Plan and copy de-duplicated files into the target tree
    Organize(OrganizeArgs),
    /// Plan only, without copying
    Plan(PlanArgs),
    /// Show the checkpoint for the current contents of a source tree
    Status(StatusArgs),
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct RootArgs {
    /// Source directory (overrides `source_root` from config)
    #[arg(long)]
    pub source: Option<PathBuf>,
    /// Target directory (overrides `target_root` from config)
    #[arg(long)]
    pub target: Option<PathBuf>,
    /// Delete an unreadable checkpoint and start over instead of failing
    #[arg(long)]
    pub discard_corrupt: bool,
}

#[derive(Debug, Args)]
pub struct OrganizeArgs {
    #[command(flatten)]
    pub roots: RootArgs,
    /// Log what would be copied without touching the target tree
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub roots: RootArgs,
    /// Write the plan as CSV (subdirectory, source, destination)
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Source directory (overrides `source_root` from config)
    #[arg(long)]
    pub source: Option<PathBuf>,
}
