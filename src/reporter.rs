use dedupe_organizer::{ProgressReporter, RunPhase};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif progress bars.
///
/// - Scan and checkpoint lookup: spinner
/// - Dedupe and copy: progress bar (totals known up front)
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }

    fn spinner(&self, message: &'static str) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_chars(TICK_CHARS),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn bar(&self, label: &str, total: usize, position: usize) {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::with_template(&format!(
                "  {{spinner:.cyan}} {} [{{bar:30.cyan/dim}}] {{pos}}/{{len}} files ({{eta}} remaining)",
                label
            ))
            .unwrap()
            .progress_chars("━╸─")
            .tick_chars(TICK_CHARS),
        );
        pb.set_position(position as u64);
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn set_position(&self, position: usize) {
        let guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.as_ref() {
            pb.set_position(position as u64);
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_phase(&self, phase: RunPhase) {
        match phase {
            RunPhase::Loading => self.spinner("Looking for a checkpoint..."),
            RunPhase::Planning => self.spinner("Determining target directory structure..."),
            RunPhase::Complete | RunPhase::Failed => self.finish_bar(),
            _ => {}
        }
    }

    fn on_scan_start(&self) {
        self.spinner("Walking source directory...");
    }

    fn on_scan_complete(&self, total_files: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Scan complete: {} files in {:.2}s",
            total_files, duration_secs
        );
    }

    fn on_dedupe_start(&self, total_files: usize, already_processed: usize) {
        self.bar("Hashing", total_files, 0);
        if already_processed > 0 {
            eprintln!(
                "  \x1b[33m↻\x1b[0m Resuming: {} files already checked",
                already_processed
            );
        }
    }

    fn on_dedupe_progress(&self, files_seen: usize, _total_files: usize) {
        self.set_position(files_seen);
    }

    fn on_dedupe_complete(&self, surviving: usize, duplicates: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m De-dup complete: {} unique files, {} duplicates in {:.2}s",
            surviving, duplicates, duration_secs
        );
    }

    fn on_plan_complete(&self, planned: usize, already_present: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Plan complete: {} files to copy, {} already present in {:.2}s",
            planned, already_present, duration_secs
        );
    }

    fn on_apply_start(&self, total_files: usize) {
        self.bar("Copying", total_files, 0);
    }

    fn on_apply_progress(&self, files_done: usize, _total_files: usize) {
        self.set_position(files_done);
    }

    fn on_apply_complete(&self, copied: usize, skipped: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Copy complete: {} copied, {} skipped in {:.2}s",
            copied, skipped, duration_secs
        );
    }
}
