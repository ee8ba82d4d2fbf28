use crate::error::{Error, Result};
use crate::progress::ProgressReporter;
use crate::state::EngineState;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ApplySummary {
    pub directories_created: usize,
    pub files_copied: usize,
    pub files_skipped: usize,
    pub bytes_copied: u64,
}

/// Create the planned directories under `target_root` and copy every planned
/// file. Existing destinations are never overwritten.
pub fn apply_plan(
    state: &EngineState,
    target_root: &Path,
    dry_run: bool,
    reporter: &dyn ProgressReporter,
) -> Result<ApplySummary> {
    let start = Instant::now();
    let total = state.planned_files();
    let mut summary = ApplySummary::default();

    info!(
        "Will create {} dirs and copy {} files{}",
        state.target_directories.len(),
        total,
        if dry_run { " (dry run)" } else { "" }
    );

    for subdir in &state.target_directories {
        let dir = target_root.join(subdir);
        if dry_run {
            debug!("Would create {}", dir.display());
        } else if !dir.is_dir() {
            fs::create_dir_all(&dir).map_err(|e| Error::io_at(&dir, e))?;
        } else {
            continue;
        }
        summary.directories_created += 1;
    }

    reporter.on_apply_start(total);
    for (done, (_, assignment)) in state.assignments().enumerate() {
        let (source, destination) = (&assignment.source, &assignment.destination);
        if dry_run {
            debug!("Would copy {} -> {}", source.display(), destination.display());
            summary.files_copied += 1;
        } else {
            match copy_no_clobber(source, destination)? {
                Some(bytes) => {
                    debug!("Copied {} -> {}", source.display(), destination.display());
                    summary.files_copied += 1;
                    summary.bytes_copied += bytes;
                }
                None => {
                    debug!("Already exists, skipping: {}", destination.display());
                    summary.files_skipped += 1;
                }
            }
        }
        reporter.on_apply_progress(done + 1, total);
    }

    let duration = start.elapsed();
    info!(
        "Copied {} files ({} bytes), skipped {} in {:.2}s",
        summary.files_copied,
        summary.bytes_copied,
        summary.files_skipped,
        duration.as_secs_f64()
    );
    reporter.on_apply_complete(
        summary.files_copied,
        summary.files_skipped,
        duration.as_secs_f64(),
    );

    Ok(summary)
}

/// `Ok(None)` when `destination` already exists. The destination is created
/// with `create_new`, so a file that appears between planning and copying is
/// left alone.
fn copy_no_clobber(source: &Path, destination: &Path) -> Result<Option<u64>> {
    let mut reader = fs::File::open(source).map_err(|e| Error::io_at(source, e))?;
    let mut writer = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)
    {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(None),
        Err(e) => return Err(Error::io_at(destination, e)),
    };

    let copied = io::copy(&mut reader, &mut writer);
    let bytes = match copied.and_then(|bytes| writer.sync_all().map(|_| bytes)) {
        Ok(bytes) => bytes,
        Err(e) => {
            drop(writer);
            let _ = fs::remove_file(destination);
            return Err(Error::io_at(destination, e));
        }
    };

    if let Ok(modified) = fs::metadata(source).and_then(|m| m.modified()) {
        let _ = writer.set_modified(modified);
    }

    Ok(Some(bytes))
}
