use crate::checkpoint::CheckpointStore;
use crate::config::{AppConfig, DEFAULT_CHECKPOINT_INTERVAL};
use crate::dedupe::Deduplicator;
use crate::error::Result;
use crate::hasher::{fingerprinter_for, Fingerprinter, Md5Fingerprinter, RunIdentity};
use crate::planner::{CategoryTable, CreationYear, TargetPlanner, YearSource};
use crate::progress::ProgressReporter;
use crate::state::{EngineState, Plan, StateSummary};
use std::cell::Cell;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Where a run is in its lifecycle. `Failed` is reachable from every
/// non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Uninitialized,
    Loading,
    Fresh,
    Resuming,
    Deduplicating,
    Planning,
    Complete,
    Failed,
}

/// How the run found its checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStart {
    Fresh,
    Resumed,
    /// A completed checkpoint was replayed without any work.
    AlreadyComplete,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub identity: RunIdentity,
    pub checkpoint_path: PathBuf,
    pub start: RunStart,
    pub state: EngineState,
    pub hashed: usize,
    pub duplicates: usize,
    pub already_processed: usize,
    pub planned: usize,
    pub already_present: usize,
    pub name_collisions: usize,
    pub dedupe_duration: Duration,
    pub plan_duration: Duration,
}

impl RunOutcome {
    pub fn plan(&self) -> &Plan {
        &self.state.plan
    }

    pub fn target_directories(&self) -> &BTreeSet<String> {
        &self.state.target_directories
    }
}

#[derive(Debug)]
pub struct Inspection {
    pub identity: RunIdentity,
    pub checkpoint_path: PathBuf,
    pub summary: Option<StateSummary>,
}

/// Drives checkpoint lookup, deduplication and planning as one resumable
/// operation keyed by the identity of the candidate list.
pub struct RunController {
    checkpoint_dir: PathBuf,
    target_root: PathBuf,
    checkpoint_interval: usize,
    fingerprinter: Box<dyn Fingerprinter>,
    years: Box<dyn YearSource>,
    categories: CategoryTable,
    phase: Cell<RunPhase>,
}

impl RunController {
    /// Checkpoints are written into `checkpoint_dir` (normally the source
    /// root); plans target `target_root`.
    pub fn new(checkpoint_dir: impl Into<PathBuf>, target_root: impl Into<PathBuf>) -> Self {
        Self {
            checkpoint_dir: checkpoint_dir.into(),
            target_root: target_root.into(),
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            fingerprinter: Box::new(Md5Fingerprinter),
            years: Box::new(CreationYear),
            categories: CategoryTable::builtin(),
            phase: Cell::new(RunPhase::Uninitialized),
        }
    }

    pub fn from_config(
        config: &AppConfig,
        checkpoint_dir: impl Into<PathBuf>,
        target_root: impl Into<PathBuf>,
    ) -> Result<Self> {
        config.validate()?;
        let fingerprinter = fingerprinter_for(&config.hash_algorithm)?;
        Ok(Self::new(checkpoint_dir, target_root)
            .with_checkpoint_interval(config.checkpoint_interval)
            .with_fingerprinter(fingerprinter)
            .with_categories(CategoryTable::with_overrides(&config.categories)))
    }

    pub fn with_checkpoint_interval(mut self, interval: usize) -> Self {
        self.checkpoint_interval = interval.max(1);
        self
    }

    pub fn with_fingerprinter(mut self, fingerprinter: Box<dyn Fingerprinter>) -> Self {
        self.fingerprinter = fingerprinter;
        self
    }

    pub fn with_year_source(mut self, years: Box<dyn YearSource>) -> Self {
        self.years = years;
        self
    }

    pub fn with_categories(mut self, categories: CategoryTable) -> Self {
        self.categories = categories;
        self
    }

    pub fn phase(&self) -> RunPhase {
        self.phase.get()
    }

    pub fn checkpoint_store(&self) -> CheckpointStore {
        CheckpointStore::new(&self.checkpoint_dir)
    }

    pub fn identity_of(&self, candidates: &[PathBuf]) -> RunIdentity {
        RunIdentity::compute(self.fingerprinter.algorithm(), candidates)
    }

    /// Run (or resume, or replay) dedupe and planning for `candidates`, which
    /// must be sorted the same way on every run.
    pub fn run(
        &self,
        candidates: &[PathBuf],
        reporter: &dyn ProgressReporter,
    ) -> Result<RunOutcome> {
        let result = self.run_phases(candidates, reporter);
        if let Err(err) = &result {
            error!("Run failed during {:?}: {}", self.phase(), err);
            self.transition(RunPhase::Failed, reporter);
        }
        result
    }

    fn run_phases(
        &self,
        candidates: &[PathBuf],
        reporter: &dyn ProgressReporter,
    ) -> Result<RunOutcome> {
        self.transition(RunPhase::Loading, reporter);
        info!("Hashing source paths to determine checkpoint name...");
        let identity = self.identity_of(candidates);
        let store = self.checkpoint_store();
        let checkpoint_path = store.locate(&identity);

        let (state, start) = match store.load(&checkpoint_path)? {
            Some(state) if state.complete => {
                info!(
                    "Checkpoint {} is complete, reusing its plan",
                    checkpoint_path.display()
                );
                self.warn_on_foreign_target(&state);
                self.transition(RunPhase::Complete, reporter);
                let summary = state.summary();
                return Ok(RunOutcome {
                    identity,
                    checkpoint_path,
                    start: RunStart::AlreadyComplete,
                    planned: summary.planned_files,
                    state,
                    hashed: 0,
                    duplicates: 0,
                    already_processed: candidates.len(),
                    already_present: 0,
                    name_collisions: 0,
                    dedupe_duration: Duration::ZERO,
                    plan_duration: Duration::ZERO,
                });
            }
            Some(state) => {
                info!(
                    "Resuming from checkpoint {} ({} of {} already checked)",
                    checkpoint_path.display(),
                    state.processed_paths.len(),
                    candidates.len()
                );
                self.transition(RunPhase::Resuming, reporter);
                (state, RunStart::Resumed)
            }
            None => {
                info!("No checkpoint on disk, creating...");
                self.transition(RunPhase::Fresh, reporter);
                (EngineState::default(), RunStart::Fresh)
            }
        };

        self.transition(RunPhase::Deduplicating, reporter);
        let dedupe_start = Instant::now();
        let deduped = Deduplicator::new(self.fingerprinter.as_ref())
            .with_checkpoint(&store, &checkpoint_path)
            .with_checkpoint_interval(self.checkpoint_interval)
            .process(state, candidates, reporter)?;
        let dedupe_duration = dedupe_start.elapsed();

        self.transition(RunPhase::Planning, reporter);
        let plan_start = Instant::now();
        let planned = TargetPlanner::new(&self.target_root, &self.categories, self.years.as_ref())
            .plan(deduped.state, reporter)?;
        let plan_duration = plan_start.elapsed();

        let mut state = planned.state;
        state.complete = true;
        store.save(&checkpoint_path, &state)?;
        self.transition(RunPhase::Complete, reporter);

        Ok(RunOutcome {
            identity,
            checkpoint_path,
            start,
            state,
            hashed: deduped.hashed,
            duplicates: deduped.duplicates,
            already_processed: deduped.already_processed,
            planned: planned.planned,
            already_present: planned.already_present,
            name_collisions: planned.name_collisions,
            dedupe_duration,
            plan_duration,
        })
    }

    /// Read-only look at the checkpoint for `candidates`.
    pub fn inspect(&self, candidates: &[PathBuf]) -> Result<Inspection> {
        let identity = self.identity_of(candidates);
        let store = self.checkpoint_store();
        let checkpoint_path = store.locate(&identity);
        let summary = store.load(&checkpoint_path)?.map(|state| state.summary());
        Ok(Inspection {
            identity,
            checkpoint_path,
            summary,
        })
    }

    /// Delete the checkpoint for `candidates` so the next run starts fresh.
    pub fn discard_checkpoint(&self, candidates: &[PathBuf]) -> Result<PathBuf> {
        let store = self.checkpoint_store();
        let path = store.locate(&self.identity_of(candidates));
        store.discard(&path)?;
        Ok(path)
    }

    fn transition(&self, next: RunPhase, reporter: &dyn ProgressReporter) {
        let previous = self.phase.replace(next);
        debug!("Run phase {:?} -> {:?}", previous, next);
        reporter.on_phase(next);
    }

    fn warn_on_foreign_target(&self, state: &EngineState) {
        if let Some((_, assignment)) = state
            .assignments()
            .find(|(_, a)| !a.destination.starts_with(&self.target_root))
        {
            warn!(
                "Reused plan targets {} which is outside {}",
                assignment.destination.display(),
                self.target_root.display()
            );
        }
    }

    pub fn target_root(&self) -> &Path {
        &self.target_root
    }
}
