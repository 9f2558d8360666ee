use std::sync::atomic::{AtomicBool, Ordering};

use crate::diff::{Hunk, parse_diff};
use crate::engine::applicator::Applicator;
use crate::engine::backup::{BackupRef, create_backup, restore};
use crate::engine::dependency::split_into_subgroups;
use crate::engine::patch::{OffsetMap, synthesize_patch};
use crate::error::RegroupError;
use crate::git::Repository;
use crate::plan::{CommitPlan, validate_plan};

/// Terminal state of one run. A failure after mutation began always carries
/// the backup ref; `restored` says whether the branch was successfully reset
/// back to it.
#[derive(Debug)]
pub enum RunResult {
    Success {
        new_tip: String,
        /// None for no-op runs where nothing was mutated and no backup was
        /// created.
        backup_ref: Option<String>,
    },
    Failure {
        error: RegroupError,
        backup_ref: Option<String>,
        restored: bool,
    },
}

/// Resolve the base the branch is rebuilt onto: the given ref, or its
/// `origin/` variant when the local name does not exist.
pub fn resolve_base_ref(repo: &Repository, base_ref: &str) -> Result<String, RegroupError> {
    if let Some(oid) = repo.try_rev_parse(&format!("{}^{{commit}}", base_ref))? {
        return Ok(oid);
    }
    if let Some(oid) = repo.try_rev_parse(&format!("origin/{}^{{commit}}", base_ref))? {
        return Ok(oid);
    }
    Err(RegroupError::BaseRefNotFound(base_ref.to_string()))
}

/// Extract and parse the `base..HEAD` diff. This is the same extraction a
/// run performs, exposed so the caller can hand the diff and hunk ids to a
/// grouping advisor first.
pub fn extract_hunks(
    repo: &Repository,
    base_ref: &str,
) -> Result<(String, Vec<Hunk>), RegroupError> {
    let base_oid = resolve_base_ref(repo, base_ref)?;
    let diff_text = repo.diff_range(&base_oid, "HEAD")?;
    let hunks = parse_diff(&diff_text)?;
    Ok((diff_text, hunks))
}

pub fn run(repo: &Repository, base_ref: &str, plan: &CommitPlan) -> RunResult {
    run_with_cancel(repo, base_ref, plan, None)
}

/// Drive one full run: verify the worktree, validate the plan, back up the
/// tip, rebuild the branch group by group, and verify the final tree hash
/// against the original tip.
///
/// `cancel` is consulted between git invocations only; a set flag aborts the
/// run through the same restore path as any other mid-run failure.
pub fn run_with_cancel(
    repo: &Repository,
    base_ref: &str,
    plan: &CommitPlan,
    cancel: Option<&AtomicBool>,
) -> RunResult {
    let prepared = match prepare(repo, base_ref) {
        Ok(p) => p,
        Err(error) => {
            return RunResult::Failure {
                error,
                backup_ref: None,
                restored: false,
            };
        }
    };

    if prepared.hunks.is_empty() && plan.is_empty() {
        // Nothing to reorganize and nothing asked for; leave the branch
        // untouched and create no backup.
        return RunResult::Success {
            new_tip: prepared.tip,
            backup_ref: None,
        };
    }

    let groups = match validate_plan(plan, &prepared.hunks) {
        Ok(groups) => groups,
        Err(error) => {
            return RunResult::Failure {
                error,
                backup_ref: None,
                restored: false,
            };
        }
    };

    let backup = match create_backup(repo, &prepared.branch, &prepared.tip) {
        Ok(b) => b,
        Err(error) => {
            return RunResult::Failure {
                error,
                backup_ref: None,
                restored: false,
            };
        }
    };

    match apply_groups(repo, &prepared, plan, &groups, cancel) {
        Ok(new_tip) => RunResult::Success {
            new_tip,
            backup_ref: Some(backup.name),
        },
        Err(error) => {
            let restored = restore_after_failure(repo, &backup);
            RunResult::Failure {
                error,
                backup_ref: Some(backup.name),
                restored,
            }
        }
    }
}

struct Prepared {
    base_oid: String,
    tip: String,
    tip_tree: String,
    branch: String,
    hunks: Vec<Hunk>,
}

fn prepare(repo: &Repository, base_ref: &str) -> Result<Prepared, RegroupError> {
    repo.ensure_clean_worktree()?;

    let base_oid = resolve_base_ref(repo, base_ref)?;
    let tip = repo.rev_parse("HEAD")?;
    let tip_tree = repo.tree_of("HEAD")?;
    let branch = repo.head_shorthand()?;

    let diff_text = repo.diff_range(&base_oid, &tip)?;
    let hunks = parse_diff(&diff_text)?;
    repo.debug_log(&format!(
        "extracted {} hunks between {} and {}",
        hunks.len(),
        base_oid,
        tip
    ));

    Ok(Prepared {
        base_oid,
        tip,
        tip_tree,
        branch,
        hunks,
    })
}

fn apply_groups(
    repo: &Repository,
    prepared: &Prepared,
    plan: &CommitPlan,
    groups: &[Vec<&Hunk>],
    cancel: Option<&AtomicBool>,
) -> Result<String, RegroupError> {
    repo.reset_hard(&prepared.base_oid)?;

    let applicator = Applicator::new(repo);
    let mut offsets = OffsetMap::new();
    for (group, members) in plan.groups.iter().zip(groups) {
        check_cancelled(cancel)?;

        let subgroups = split_into_subgroups(members);
        let mut patches = Vec::with_capacity(subgroups.len());
        for subgroup in &subgroups {
            let patch = synthesize_patch(&subgroup.hunks, &offsets);
            for hunk in &subgroup.hunks {
                offsets.record(hunk);
            }
            patches.push(patch);
        }

        applicator.apply_group(&patches, &group.message)?;
    }

    check_cancelled(cancel)?;

    // End-to-end correctness check: the rebuilt branch must reproduce the
    // original tip tree byte for byte.
    let final_tree = repo.tree_of("HEAD")?;
    if final_tree != prepared.tip_tree {
        return Err(RegroupError::TreeMismatch {
            expected: prepared.tip_tree.clone(),
            actual: final_tree,
        });
    }

    repo.rev_parse("HEAD")
}

fn restore_after_failure(repo: &Repository, backup: &BackupRef) -> bool {
    match restore(repo, backup) {
        Ok(()) => true,
        Err(err) => {
            repo.debug_log(&format!("restore from {} failed: {}", backup.name, err));
            false
        }
    }
}

fn check_cancelled(cancel: Option<&AtomicBool>) -> Result<(), RegroupError> {
    match cancel {
        Some(flag) if flag.load(Ordering::Relaxed) => Err(RegroupError::Cancelled),
        _ => Ok(()),
    }
}
