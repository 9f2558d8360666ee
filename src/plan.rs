use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::diff::Hunk;
use crate::error::RegroupError;

/// One intended commit: a label plus the hunk ids it should contain.
/// Produced by a grouping advisor, consumed by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedGroup {
    pub message: String,
    pub hunk_ids: Vec<String>,
}

/// The advisor's full answer: an ordered partition of all hunks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitPlan {
    pub groups: Vec<PlannedGroup>,
}

impl CommitPlan {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// The seam to whatever proposes the grouping. The engine treats the advisor
/// as a pure function; retries, fallbacks, and authentication are the
/// implementor's concern. Whatever comes back is still validated against the
/// parsed hunk set before anything is mutated.
pub trait GroupingAdvisor {
    fn propose(&self, full_diff: &str, hunks: &[Hunk]) -> Result<CommitPlan, RegroupError>;
}

/// Check that the plan is an exact partition of the parsed hunks and resolve
/// each group's ids to hunk references, in plan order.
///
/// Violations are reported in a fixed order: an unknown id first, then a
/// duplicated id, then uncovered hunks. All checks run before any
/// repository mutation.
pub fn validate_plan<'a>(
    plan: &CommitPlan,
    hunks: &'a [Hunk],
) -> Result<Vec<Vec<&'a Hunk>>, RegroupError> {
    let by_id: HashMap<String, &Hunk> = hunks.iter().map(|h| (h.id(), h)).collect();

    let mut claimed: HashSet<&str> = HashSet::new();
    let mut resolved = Vec::with_capacity(plan.groups.len());
    for group in &plan.groups {
        let mut members = Vec::with_capacity(group.hunk_ids.len());
        for id in &group.hunk_ids {
            let hunk = *by_id
                .get(id.as_str())
                .ok_or_else(|| RegroupError::UnknownHunk { id: id.clone() })?;
            if !claimed.insert(id.as_str()) {
                return Err(RegroupError::DuplicateHunk { id: id.clone() });
            }
            members.push(hunk);
        }
        resolved.push(members);
    }

    if claimed.len() != hunks.len() {
        let missing: Vec<String> = hunks
            .iter()
            .map(|h| h.id())
            .filter(|id| !claimed.contains(id.as_str()))
            .collect();
        return Err(RegroupError::IncompletePartition { missing });
    }

    Ok(resolved)
}
