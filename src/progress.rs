use crate::engine::RunPhase;

/// Trait for reporting run progress.
///
/// The CLI implements it with indicatif bars; tests and library callers use
/// [`SilentReporter`]. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_phase(&self, _phase: RunPhase) {}
    fn on_scan_start(&self) {}
    fn on_scan_complete(&self, _total_files: usize, _duration_secs: f64) {}
    fn on_dedupe_start(&self, _total_files: usize, _already_processed: usize) {}
    fn on_dedupe_progress(&self, _files_seen: usize, _total_files: usize) {}
    fn on_checkpoint_saved(&self, _processed: usize) {}
    fn on_dedupe_complete(&self, _surviving: usize, _duplicates: usize, _duration_secs: f64) {}
    fn on_plan_complete(&self, _planned: usize, _already_present: usize, _duration_secs: f64) {}
    fn on_apply_start(&self, _total_files: usize) {}
    fn on_apply_progress(&self, _files_done: usize, _total_files: usize) {}
    fn on_apply_complete(&self, _copied: usize, _skipped: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
