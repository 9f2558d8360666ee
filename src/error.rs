use std::fmt;

#[derive(Debug)]
pub enum RegroupError {
    IoError(std::io::Error),
    /// The git binary itself could not be spawned.
    GitUnavailable(std::io::Error),
    /// Errors from invoking the git CLI that exited with a non-zero status
    GitCliError {
        code: Option<i32>,
        stderr: String,
        args: Vec<String>,
    },
    FromUtf8Error(std::string::FromUtf8Error),
    JsonError(serde_json::Error),
    /// Malformed unified-diff input; carries a description of the offending line.
    DiffParse(String),
    /// The base ref (and its origin/ variant) could not be resolved.
    BaseRefNotFound(String),
    /// Staged, unstaged, or untracked-important files block the run.
    UncleanWorktree { paths: Vec<String> },
    /// The plan references a hunk id that was never parsed.
    UnknownHunk { id: String },
    /// A hunk id appears in more than one group (or twice in one group).
    DuplicateHunk { id: String },
    /// Some parsed hunks are not covered by any group.
    IncompletePartition { missing: Vec<String> },
    /// git apply rejected a synthesized patch; stderr is passed through verbatim.
    PatchApplyFailed { stderr: String },
    /// git commit failed (including the nothing-staged case).
    CommitFailed { stderr: String },
    /// The rebuilt branch does not reproduce the original tip tree.
    TreeMismatch { expected: String, actual: String },
    /// The run was cancelled between git invocations.
    Cancelled,
    Generic(String),
}

impl fmt::Display for RegroupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegroupError::IoError(e) => write!(f, "IO error: {}", e),
            RegroupError::GitUnavailable(e) => write!(f, "Could not run git: {}", e),
            RegroupError::GitCliError { code, stderr, args } => match code {
                Some(c) => write!(
                    f,
                    "Git CLI ({}) failed with exit code {}: {}",
                    args.join(" "),
                    c,
                    stderr
                ),
                None => write!(f, "Git CLI ({}) failed: {}", args.join(" "), stderr),
            },
            RegroupError::FromUtf8Error(e) => write!(f, "From UTF-8 error: {}", e),
            RegroupError::JsonError(e) => write!(f, "JSON error: {}", e),
            RegroupError::DiffParse(msg) => write!(f, "Diff parse error: {}", msg),
            RegroupError::BaseRefNotFound(r) => write!(f, "Base ref not found: {}", r),
            RegroupError::UncleanWorktree { paths } => {
                write!(f, "Working tree not clean: {}", paths.join(", "))
            }
            RegroupError::UnknownHunk { id } => write!(f, "Plan references unknown hunk: {}", id),
            RegroupError::DuplicateHunk { id } => {
                write!(f, "Hunk assigned to more than one group: {}", id)
            }
            RegroupError::IncompletePartition { missing } => {
                write!(f, "Hunks not covered by any group: {}", missing.join(", "))
            }
            RegroupError::PatchApplyFailed { stderr } => {
                write!(f, "Patch application failed: {}", stderr)
            }
            RegroupError::CommitFailed { stderr } => write!(f, "Commit failed: {}", stderr),
            RegroupError::TreeMismatch { expected, actual } => write!(
                f,
                "Rebuilt tree {} does not match original tip tree {}",
                actual, expected
            ),
            RegroupError::Cancelled => write!(f, "Run cancelled"),
            RegroupError::Generic(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RegroupError {}

impl From<std::io::Error> for RegroupError {
    fn from(err: std::io::Error) -> Self {
        RegroupError::IoError(err)
    }
}

impl From<std::string::FromUtf8Error> for RegroupError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        RegroupError::FromUtf8Error(err)
    }
}

impl From<serde_json::Error> for RegroupError {
    fn from(err: serde_json::Error) -> Self {
        RegroupError::JsonError(err)
    }
}
