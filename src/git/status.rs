use crate::error::RegroupError;
use crate::git::repository::Repository;

/// Untracked files matching these patterns never block a run; everything
/// else untracked does. Staged and unstaged tracked changes always block.
const GENERATED_PATTERNS: &[&str] = &["*.pyc", "__pycache__", "*.log", "dist/", "build/"];

impl Repository {
    /// Paths with staged or unstaged modifications to tracked files.
    pub fn changed_tracked_paths(&self) -> Result<Vec<String>, RegroupError> {
        let mut args = self.global_args_for_exec();
        args.push("status".to_string());
        args.push("--porcelain".to_string());
        args.push("-z".to_string());
        let output = self.exec_git(&args)?;

        let mut paths = Vec::new();
        let mut records = output.stdout.split(|&b| b == 0).filter(|r| !r.is_empty());
        while let Some(record) = records.next() {
            let record = String::from_utf8(record.to_vec())?;
            if record.len() < 4 {
                continue;
            }
            let status = &record[..2];
            let path = &record[3..];
            // Rename records carry the original path in the next NUL field.
            if status.starts_with('R') || status.starts_with('C') {
                let _ = records.next();
            }
            if status == "??" || status == "!!" {
                continue;
            }
            paths.push(path.to_string());
        }
        Ok(paths)
    }

    /// Untracked, non-ignored paths.
    pub fn untracked_paths(&self) -> Result<Vec<String>, RegroupError> {
        let mut args = self.global_args_for_exec();
        args.push("ls-files".to_string());
        args.push("--others".to_string());
        args.push("--exclude-standard".to_string());
        args.push("-z".to_string());
        let output = self.exec_git(&args)?;
        Ok(output
            .stdout
            .split(|&b| b == 0)
            .filter(|r| !r.is_empty())
            .filter_map(|r| String::from_utf8(r.to_vec()).ok())
            .collect())
    }

    /// Precondition for a run: no staged or unstaged changes, and no
    /// untracked files other than common generated artifacts. Offending
    /// paths are carried in the error so the caller can name them.
    pub fn ensure_clean_worktree(&self) -> Result<(), RegroupError> {
        let mut offenders = self.changed_tracked_paths()?;
        offenders.extend(
            self.untracked_paths()?
                .into_iter()
                .filter(|p| !is_generated_path(p)),
        );
        if offenders.is_empty() {
            Ok(())
        } else {
            Err(RegroupError::UncleanWorktree { paths: offenders })
        }
    }
}

fn is_generated_path(path: &str) -> bool {
    for pattern in GENERATED_PATTERNS {
        if let Some(ext) = pattern.strip_prefix("*.") {
            if path.rsplit('/').next().is_some_and(|name| {
                name.rsplit_once('.').is_some_and(|(_, e)| e == ext)
            }) {
                return true;
            }
        } else if let Some(dir) = pattern.strip_suffix('/') {
            if path.split('/').any(|component| component == dir) {
                return true;
            }
        } else if path.split('/').any(|component| component == *pattern) {
            return true;
        }
    }
    false
}
