//! Rebuild a branch as a small set of coherent commits.
//!
//! The engine extracts the `base..HEAD` diff, decomposes it into
//! independently addressable hunks, and replays an externally-produced
//! grouping of those hunks as fresh commits on top of the base, preserving
//! the branch's final tree byte for byte, with a backup branch and full
//! rollback on any failure.
//!
//! All repository mutation goes through the host git binary
//! (`apply --cached`, `commit`, `checkout-index`, `reset`); the engine never
//! rewrites file content itself.

pub mod diff;
pub mod engine;
pub mod error;
pub mod git;
pub mod plan;

pub use diff::{ChangeKind, Hunk, parse_diff};
pub use engine::{RunResult, run, run_with_cancel};
pub use engine::coordinator::{extract_hunks, resolve_base_ref};
pub use error::RegroupError;
pub use git::{DebugSink, Repository};
pub use plan::{CommitPlan, GroupingAdvisor, PlannedGroup, validate_plan};
