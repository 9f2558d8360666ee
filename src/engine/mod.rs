pub mod applicator;
pub mod backup;
pub mod coordinator;
pub mod dependency;
pub mod patch;

pub use coordinator::{RunResult, run, run_with_cancel};
