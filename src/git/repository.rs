use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use crate::error::RegroupError;

/// Where engine debug lines go, when the caller wants them at all. The
/// engine never prints on its own and never consults the environment; both
/// the git binary and the sink are supplied by the caller.
pub type DebugSink = fn(&str);

/// Handle to one git repository, addressed through `-C <dir>` global
/// arguments so the engine never depends on the process working directory.
#[derive(Debug, Clone)]
pub struct Repository {
    global_args: Vec<String>,
    git_dir: PathBuf,
    workdir: PathBuf,
    git_cmd: String,
    debug: Option<DebugSink>,
}

impl Repository {
    /// Open the repository containing `dir`, invoking the `git` found on
    /// PATH and discarding debug output.
    pub fn discover(dir: &Path) -> Result<Repository, RegroupError> {
        Self::discover_with(dir, "git", None)
    }

    /// Open the repository containing `dir`. `git_cmd` names the host git
    /// binary to invoke and `debug` receives per-invocation trace lines;
    /// both belong to the calling layer. Fails when `dir` is not inside a
    /// git work tree (bare repositories are rejected: the engine needs a
    /// working tree to sync after each commit).
    pub fn discover_with(
        dir: &Path,
        git_cmd: &str,
        debug: Option<DebugSink>,
    ) -> Result<Repository, RegroupError> {
        let global_args = vec!["-C".to_string(), dir.to_string_lossy().to_string()];

        let mut args = global_args.clone();
        args.push("rev-parse".to_string());
        args.push("--is-bare-repository".to_string());
        args.push("--git-dir".to_string());
        args.push("--show-toplevel".to_string());
        let output = run_git(git_cmd, debug, &args)?;
        let stdout = String::from_utf8(output.stdout)?;
        let mut lines = stdout.lines().map(str::trim).filter(|l| !l.is_empty());

        match lines.next() {
            Some("false") => {}
            Some("true") => {
                return Err(RegroupError::Generic(
                    "Bare repositories are not supported".to_string(),
                ));
            }
            other => {
                return Err(RegroupError::Generic(format!(
                    "Unexpected --is-bare-repository output: {:?}",
                    other
                )));
            }
        }

        let git_dir = lines
            .next()
            .map(PathBuf::from)
            .ok_or_else(|| RegroupError::Generic("Missing --git-dir output".to_string()))?;
        let workdir = lines
            .next()
            .map(PathBuf::from)
            .ok_or_else(|| RegroupError::Generic("Missing --show-toplevel output".to_string()))?;

        // Re-anchor on the toplevel so relative paths in diffs and status
        // output are always repo-root relative.
        let global_args = vec!["-C".to_string(), workdir.to_string_lossy().to_string()];

        Ok(Repository {
            global_args,
            git_dir,
            workdir,
            git_cmd: git_cmd.to_string(),
            debug,
        })
    }

    // Util for preparing global args for execution
    pub fn global_args_for_exec(&self) -> Vec<String> {
        let mut args = self.global_args.clone();
        if !args.iter().any(|arg| arg == "--no-pager") {
            args.push("--no-pager".to_string());
        }
        args
    }

    pub fn path(&self) -> &Path {
        self.git_dir.as_path()
    }

    pub fn workdir(&self) -> &Path {
        self.workdir.as_path()
    }

    /// Forward one line to the caller's debug sink, if any.
    pub fn debug_log(&self, msg: &str) {
        if let Some(sink) = self.debug {
            sink(msg);
        }
    }

    /// Run the host git binary with the given argument vector.
    pub fn exec_git(&self, args: &[String]) -> Result<Output, RegroupError> {
        run_git(&self.git_cmd, self.debug, args)
    }

    /// Run the host git binary with data provided on stdin.
    pub fn exec_git_stdin(&self, args: &[String], stdin_data: &[u8]) -> Result<Output, RegroupError> {
        run_git_stdin(&self.git_cmd, self.debug, args, stdin_data)
    }

    /// Resolve a revision to a full object id. Non-existent revisions are an
    /// error; use [`Repository::try_rev_parse`] for probing.
    pub fn rev_parse(&self, spec: &str) -> Result<String, RegroupError> {
        let mut args = self.global_args_for_exec();
        args.push("rev-parse".to_string());
        args.push("--verify".to_string());
        args.push(spec.to_string());
        let output = self.exec_git(&args)?;
        Ok(String::from_utf8(output.stdout)?.trim().to_string())
    }

    /// Resolve a revision, returning None when it does not exist.
    pub fn try_rev_parse(&self, spec: &str) -> Result<Option<String>, RegroupError> {
        let mut args = self.global_args_for_exec();
        args.push("rev-parse".to_string());
        args.push("--verify".to_string());
        args.push("--quiet".to_string());
        args.push(spec.to_string());
        match self.exec_git(&args) {
            Ok(output) => Ok(Some(String::from_utf8(output.stdout)?.trim().to_string())),
            Err(RegroupError::GitCliError { code: Some(1), .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Tree hash of a commit-ish.
    pub fn tree_of(&self, rev: &str) -> Result<String, RegroupError> {
        self.rev_parse(&format!("{}^{{tree}}", rev))
    }

    /// Shorthand name of HEAD ("main", or "HEAD" when detached).
    pub fn head_shorthand(&self) -> Result<String, RegroupError> {
        let mut args = self.global_args_for_exec();
        args.push("rev-parse".to_string());
        args.push("--abbrev-ref".to_string());
        args.push("HEAD".to_string());
        let output = self.exec_git(&args)?;
        Ok(String::from_utf8(output.stdout)?.trim().to_string())
    }

    /// Full diff between `base` and `tip`, in the exact shape the parser and
    /// the grouping advisor both consume. Zero context keeps hunks minimal
    /// and independently addressable; `--binary --full-index` makes binary
    /// changes re-applyable; the remaining flags shield the output from user
    /// diff configuration.
    pub fn diff_range(&self, base: &str, tip: &str) -> Result<String, RegroupError> {
        let mut args = self.global_args_for_exec();
        args.push("diff".to_string());
        args.push("--no-color".to_string());
        args.push("--no-ext-diff".to_string());
        args.push("--no-textconv".to_string());
        args.push("--binary".to_string());
        args.push("--full-index".to_string());
        args.push("-U0".to_string());
        args.push(format!("{}..{}", base, tip));
        let output = self.exec_git(&args)?;
        Ok(String::from_utf8(output.stdout)?)
    }

    /// Write the current index state as a tree object, returning its hash.
    pub fn write_tree(&self) -> Result<String, RegroupError> {
        let mut args = self.global_args_for_exec();
        args.push("write-tree".to_string());
        let output = self.exec_git(&args)?;
        Ok(String::from_utf8(output.stdout)?.trim().to_string())
    }

    /// Replace the index with the given tree.
    pub fn read_tree(&self, tree: &str) -> Result<(), RegroupError> {
        let mut args = self.global_args_for_exec();
        args.push("read-tree".to_string());
        args.push(tree.to_string());
        self.exec_git(&args)?;
        Ok(())
    }

    /// Apply a patch to the index only. `--unidiff-zero` is required because
    /// synthesized patches carry no context lines.
    pub fn apply_cached(&self, patch: &str) -> Result<(), RegroupError> {
        let mut args = self.global_args_for_exec();
        args.push("apply".to_string());
        args.push("--cached".to_string());
        args.push("--unidiff-zero".to_string());
        args.push("--whitespace=nowarn".to_string());
        self.exec_git_stdin(&args, patch.as_bytes())?;
        Ok(())
    }

    /// Commit the staged index. Deliberately without `--allow-empty`: an
    /// empty commit means the scheduler staged nothing and must surface as a
    /// failure.
    pub fn commit(&self, message: &str) -> Result<(), RegroupError> {
        let mut args = self.global_args_for_exec();
        args.push("commit".to_string());
        args.push("-m".to_string());
        args.push(message.to_string());
        self.exec_git(&args)?;
        Ok(())
    }

    /// Force the working tree to match the index.
    pub fn checkout_index(&self) -> Result<(), RegroupError> {
        let mut args = self.global_args_for_exec();
        args.push("checkout-index".to_string());
        args.push("-f".to_string());
        args.push("-a".to_string());
        self.exec_git(&args)?;
        Ok(())
    }

    pub fn reset_hard(&self, rev: &str) -> Result<(), RegroupError> {
        let mut args = self.global_args_for_exec();
        args.push("reset".to_string());
        args.push("--hard".to_string());
        args.push(rev.to_string());
        self.exec_git(&args)?;
        Ok(())
    }

    /// Create a branch pointing at `target` without checking it out.
    pub fn create_branch(&self, name: &str, target: &str) -> Result<(), RegroupError> {
        let mut args = self.global_args_for_exec();
        args.push("branch".to_string());
        args.push(name.to_string());
        args.push(target.to_string());
        self.exec_git(&args)?;
        Ok(())
    }
}

fn run_git(
    git_cmd: &str,
    debug: Option<DebugSink>,
    args: &[String],
) -> Result<Output, RegroupError> {
    if let Some(sink) = debug {
        sink(&format!("git {}", args.join(" ")));
    }
    let mut cmd = Command::new(git_cmd);
    cmd.args(args);

    let output = cmd.output().map_err(RegroupError::GitUnavailable)?;

    if !output.status.success() {
        let code = output.status.code();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(RegroupError::GitCliError {
            code,
            stderr,
            args: args.to_vec(),
        });
    }

    Ok(output)
}

fn run_git_stdin(
    git_cmd: &str,
    debug: Option<DebugSink>,
    args: &[String],
    stdin_data: &[u8],
) -> Result<Output, RegroupError> {
    if let Some(sink) = debug {
        sink(&format!(
            "git {} <stdin {} bytes>",
            args.join(" "),
            stdin_data.len()
        ));
    }
    let mut cmd = Command::new(git_cmd);
    cmd.args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(RegroupError::GitUnavailable)?;

    if let Some(mut stdin) = child.stdin.take() {
        use std::io::Write;
        if let Err(e) = stdin.write_all(stdin_data) {
            return Err(RegroupError::IoError(e));
        }
    }

    let output = child.wait_with_output().map_err(RegroupError::IoError)?;

    if !output.status.success() {
        let code = output.status.code();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(RegroupError::GitCliError {
            code,
            stderr,
            args: args.to_vec(),
        });
    }

    Ok(output)
}
