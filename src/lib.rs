pub mod apply;
pub mod checkpoint;
pub mod config;
pub mod dedupe;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod planner;
pub mod progress;
pub mod scanner;
pub mod state;

pub use config::AppConfig;
pub use engine::{RunController, RunOutcome, RunPhase, RunStart};
pub use error::{Error, Result};
pub use progress::{ProgressReporter, SilentReporter};
pub use state::{EngineState, Plan, TargetAssignment};
