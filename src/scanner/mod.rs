pub mod walk;

pub use walk::{scan_candidates, sort_candidates};
