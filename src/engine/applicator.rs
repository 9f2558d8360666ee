use crate::error::RegroupError;
use crate::git::Repository;

/// Stages and commits one group's patches with all-or-nothing semantics.
/// Every mutation flows through the host's patch machinery; rewriting file
/// content by line number is deliberately not implemented here, because raw
/// line numbers stop describing the file after the first application.
pub struct Applicator<'a> {
    repo: &'a Repository,
}

impl<'a> Applicator<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Applicator { repo }
    }

    /// Stage each patch into the index in order, then create one commit and
    /// resync the working tree. On any failure the index is restored to its
    /// pre-group state (and the tip to the pre-group commit) before the
    /// error propagates, so the repository never observes a half-applied
    /// group.
    pub fn apply_group(&self, patches: &[String], message: &str) -> Result<(), RegroupError> {
        let index_snapshot = self.repo.write_tree()?;
        let head_before = self.repo.rev_parse("HEAD")?;

        for patch in patches {
            if let Err(err) = self.repo.apply_cached(patch) {
                self.repo.read_tree(&index_snapshot)?;
                return Err(match err {
                    RegroupError::GitCliError { stderr, .. } => {
                        RegroupError::PatchApplyFailed { stderr }
                    }
                    other => other,
                });
            }
        }

        if let Err(err) = self.repo.commit(message) {
            self.repo.read_tree(&index_snapshot)?;
            self.repo.reset_hard(&head_before)?;
            return Err(match err {
                RegroupError::GitCliError { stderr, .. } => RegroupError::CommitFailed { stderr },
                other => other,
            });
        }

        // Earlier subgroup patches touched only the index; bring the on-disk
        // files back in line with what was just committed.
        self.repo.checkout_index()?;
        self.repo.debug_log(&format!(
            "committed group ({} patch{})",
            patches.len(),
            if patches.len() == 1 { "" } else { "es" }
        ));
        Ok(())
    }
}
