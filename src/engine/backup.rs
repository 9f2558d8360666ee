use chrono::Utc;

use crate::error::RegroupError;
use crate::git::Repository;

/// A branch pinned at the pre-run tip. Created before the first mutation and
/// deliberately left behind afterwards: on failure it is what the branch is
/// reset to, on success it is the user's manual recovery point.
#[derive(Debug, Clone)]
pub struct BackupRef {
    pub name: String,
}

/// Create `<branch>-backup-<unix_seconds>` at `tip`. A detached HEAD yields
/// the shorthand "HEAD", which still produces a usable branch name.
pub fn create_backup(repo: &Repository, branch: &str, tip: &str) -> Result<BackupRef, RegroupError> {
    let name = format!("{}-backup-{}", branch, Utc::now().timestamp());
    repo.create_branch(&name, tip)?;
    repo.debug_log(&format!("backup branch {} at {}", name, tip));
    Ok(BackupRef { name })
}

/// Hard-reset the current branch back to the backup point. Commits created
/// by the aborted run become unreachable from the branch; the backup ref
/// itself stays.
pub fn restore(repo: &Repository, backup: &BackupRef) -> Result<(), RegroupError> {
    repo.reset_hard(&backup.name)?;
    repo.debug_log(&format!("restored from {}", backup.name));
    Ok(())
}
