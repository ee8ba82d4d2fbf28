pub mod category;

pub use category::{CategoryTable, NO_EXTENSION};

use crate::error::{Error, Result};
use crate::progress::ProgressReporter;
use crate::state::{EngineState, TargetAssignment};
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Supplies the year a file is filed under.
pub trait YearSource {
    fn year_of(&self, path: &Path) -> Result<String>;
}

/// Local-time year of the file's creation time, or of its modification time
/// where the filesystem does not record creation.
#[derive(Debug, Default, Clone, Copy)]
pub struct CreationYear;

impl YearSource for CreationYear {
    fn year_of(&self, path: &Path) -> Result<String> {
        let metadata = fs::metadata(path).map_err(|e| Error::io_at(path, e))?;
        let timestamp = metadata
            .created()
            .or_else(|_| metadata.modified())
            .map_err(|e| Error::io_at(path, e))?;
        let local: DateTime<Local> = timestamp.into();
        Ok(local.format("%Y").to_string())
    }
}

#[derive(Debug)]
pub struct PlanOutcome {
    pub state: EngineState,
    pub planned: usize,
    /// Sources whose destination already exists on disk.
    pub already_present: usize,
    /// Sources whose destination was already claimed by an earlier source
    /// in the same plan.
    pub name_collisions: usize,
}

/// Files each surviving path under `<target_root>/<year>/<category>/<name>`.
///
/// Planning only reads metadata and checks for existing destinations; it
/// never creates directories or copies.
pub struct TargetPlanner<'a> {
    target_root: &'a Path,
    categories: &'a CategoryTable,
    years: &'a dyn YearSource,
}

impl<'a> TargetPlanner<'a> {
    pub fn new(
        target_root: &'a Path,
        categories: &'a CategoryTable,
        years: &'a dyn YearSource,
    ) -> Self {
        Self {
            target_root,
            categories,
            years,
        }
    }

    /// Rebuilds the plan from `surviving_paths`; any previous plan in `state`
    /// is replaced.
    pub fn plan(
        &self,
        mut state: EngineState,
        reporter: &dyn ProgressReporter,
    ) -> Result<PlanOutcome> {
        let start = Instant::now();
        state.target_directories.clear();
        state.plan.clear();

        let mut claimed: HashSet<PathBuf> = HashSet::new();
        let mut planned = 0usize;
        let mut already_present = 0usize;
        let mut name_collisions = 0usize;

        for source in &state.surviving_paths {
            let (subdir, destination) = self.assign(source)?;

            let exists = destination
                .try_exists()
                .map_err(|e| Error::io_at(&destination, e))?;
            if exists {
                debug!("Already exists, ignoring: {}", destination.display());
                already_present += 1;
                continue;
            }

            if !claimed.insert(destination.clone()) {
                warn!(
                    "{} would land on {} which is already planned, ignoring",
                    source.display(),
                    destination.display()
                );
                name_collisions += 1;
                continue;
            }

            if state.target_directories.insert(subdir.clone()) {
                debug!("Will create: {}", subdir);
            }
            state
                .plan
                .entry(subdir)
                .or_default()
                .push(TargetAssignment {
                    source: source.clone(),
                    destination,
                });
            planned += 1;
        }

        let duration = start.elapsed();
        info!(
            "Planned {} files into {} directories ({} already present) in {:.2}s",
            planned,
            state.target_directories.len(),
            already_present,
            duration.as_secs_f64()
        );
        reporter.on_plan_complete(planned, already_present, duration.as_secs_f64());

        Ok(PlanOutcome {
            state,
            planned,
            already_present,
            name_collisions,
        })
    }

    /// Target subdirectory and destination path for one source file.
    pub fn assign(&self, source: &Path) -> Result<(String, PathBuf)> {
        let file_name = source.file_name().ok_or_else(|| {
            Error::io_at(
                source,
                io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
            )
        })?;
        let year = self.years.year_of(source)?;
        let category = self.categories.categorize(&file_name.to_string_lossy());
        let subdir = format!("{}{}{}", year, MAIN_SEPARATOR, category);
        let destination = self.target_root.join(&subdir).join(file_name);
        Ok((subdir, destination))
    }
}
