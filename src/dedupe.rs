use crate::checkpoint::CheckpointStore;
use crate::config::DEFAULT_CHECKPOINT_INTERVAL;
use crate::error::Result;
use crate::hasher::Fingerprinter;
use crate::progress::ProgressReporter;
use crate::state::EngineState;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, trace};

#[derive(Debug)]
pub struct DedupeOutcome {
    pub state: EngineState,
    /// Files fingerprinted by this call.
    pub hashed: usize,
    /// Files from this call discarded as duplicates.
    pub duplicates: usize,
    /// Files skipped because an earlier run already processed them.
    pub already_processed: usize,
}

/// Fingerprints every candidate at most once and keeps the first path seen
/// for each digest.
pub struct Deduplicator<'a> {
    fingerprinter: &'a dyn Fingerprinter,
    checkpoint: Option<(&'a CheckpointStore, &'a Path)>,
    checkpoint_interval: usize,
}

impl<'a> Deduplicator<'a> {
    pub fn new(fingerprinter: &'a dyn Fingerprinter) -> Self {
        Self {
            fingerprinter,
            checkpoint: None,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
        }
    }

    /// Persist the state to `path` every `checkpoint_interval` hashes and once
    /// more when the pass ends.
    pub fn with_checkpoint(mut self, store: &'a CheckpointStore, path: &'a Path) -> Self {
        self.checkpoint = Some((store, path));
        self
    }

    pub fn with_checkpoint_interval(mut self, interval: usize) -> Self {
        self.checkpoint_interval = interval.max(1);
        self
    }

    /// Candidates must be in a stable order across runs; the first path for
    /// each digest in that order is the one that survives.
    pub fn process(
        &self,
        mut state: EngineState,
        candidates: &[PathBuf],
        reporter: &dyn ProgressReporter,
    ) -> Result<DedupeOutcome> {
        let start = Instant::now();
        let total = candidates.len();
        let mut hashed = 0usize;
        let mut duplicates = 0usize;
        let mut already_processed = 0usize;
        let mut unsaved = 0usize;

        reporter.on_dedupe_start(total, state.processed_paths.len());

        for (index, path) in candidates.iter().enumerate() {
            if state.is_processed(path) {
                trace!("Already checked for duplicates {}", path.display());
                already_processed += 1;
                reporter.on_dedupe_progress(index + 1, total);
                continue;
            }

            debug!("Hashing {}...", path.display());
            let digest = self.fingerprinter.digest(path)?;
            state.processed_paths.insert(path.clone());
            hashed += 1;
            unsaved += 1;

            match state.digest_to_first_path.get(&digest) {
                Some(first) => {
                    debug!("{} de-duped by {}", path.display(), first.display());
                    duplicates += 1;
                }
                None => {
                    state
                        .digest_to_first_path
                        .insert(digest, path.clone());
                    state.surviving_paths.push(path.clone());
                }
            }

            if unsaved >= self.checkpoint_interval {
                self.save(&state, reporter)?;
                unsaved = 0;
            }
            reporter.on_dedupe_progress(index + 1, total);
        }

        if unsaved > 0 {
            self.save(&state, reporter)?;
        }

        let duration = start.elapsed();
        info!(
            "Got {} files after dedupe, from {} ({} hashed, {} already checked) in {:.2}s",
            state.surviving_paths.len(),
            state.processed_paths.len(),
            hashed,
            already_processed,
            duration.as_secs_f64(),
        );
        reporter.on_dedupe_complete(
            state.surviving_paths.len(),
            duplicates,
            duration.as_secs_f64(),
        );

        Ok(DedupeOutcome {
            state,
            hashed,
            duplicates,
            already_processed,
        })
    }

    fn save(&self, state: &EngineState, reporter: &dyn ProgressReporter) -> Result<()> {
        if let Some((store, path)) = self.checkpoint {
            store.save(path, state)?;
            reporter.on_checkpoint_saved(state.processed_paths.len());
        }
        Ok(())
    }
}
