pub mod test_repo;

pub use test_repo::TestRepo;

use git_regroup::{CommitPlan, PlannedGroup, RunResult};

/// Unwrap a successful run, returning `(new_tip, backup_ref)`.
#[allow(dead_code)]
pub fn expect_success(result: RunResult) -> (String, Option<String>) {
    match result {
        RunResult::Success {
            new_tip,
            backup_ref,
        } => (new_tip, backup_ref),
        RunResult::Failure { error, .. } => panic!("run failed: {}", error),
    }
}

/// Shorthand for building a plan from `(message, [hunk ids])` pairs.
pub fn plan(groups: &[(&str, &[&str])]) -> CommitPlan {
    CommitPlan {
        groups: groups
            .iter()
            .map(|(message, ids)| PlannedGroup {
                message: message.to_string(),
                hunk_ids: ids.iter().map(|s| s.to_string()).collect(),
            })
            .collect(),
    }
}
