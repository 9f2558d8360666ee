#![allow(dead_code)]

use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use git_regroup::Repository;

/// A throwaway repository under the system temp dir, driven through the real
/// git binary. Directories are intentionally left behind; the OS owns temp
/// cleanup.
#[derive(Clone, Debug)]
pub struct TestRepo {
    path: PathBuf,
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRepo {
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();
        let n: u64 = rng.gen_range(0..10000000000);
        let path = std::env::temp_dir().join(format!("git-regroup-{}", n));
        fs::create_dir_all(&path).expect("failed to create temp repo dir");

        let repo = Self { path };
        repo.git(&["init", "-q", "-b", "main"]).expect("git init failed");
        repo.git(&["config", "user.name", "Test User"]).unwrap();
        repo.git(&["config", "user.email", "test@example.com"])
            .unwrap();
        repo.git(&["config", "commit.gpgsign", "false"]).unwrap();
        repo
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn git(&self, args: &[&str]) -> Result<String, String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.path)
            .args(args)
            .output()
            .map_err(|e| e.to_string())?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            Err(format!(
                "git {:?} failed: {}",
                args,
                String::from_utf8_lossy(&output.stderr)
            ))
        }
    }

    pub fn repository(&self) -> Repository {
        Repository::discover(&self.path).expect("failed to open test repository")
    }

    pub fn write_file(&self, name: &str, contents: &str) {
        let full = self.path.join(name);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, contents).unwrap();
    }

    pub fn write_binary(&self, name: &str, contents: &[u8]) {
        let full = self.path.join(name);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, contents).unwrap();
    }

    pub fn read_file(&self, name: &str) -> String {
        fs::read_to_string(self.path.join(name)).unwrap()
    }

    pub fn stage_all_and_commit(&self, message: &str) -> Result<String, String> {
        self.git(&["add", "-A"])?;
        self.git(&["commit", "-q", "-m", message])?;
        self.head_oid()
    }

    pub fn head_oid(&self) -> Result<String, String> {
        self.git(&["rev-parse", "HEAD"]).map(|s| s.trim().to_string())
    }

    pub fn tree_oid(&self, rev: &str) -> Result<String, String> {
        self.git(&["rev-parse", &format!("{}^{{tree}}", rev)])
            .map(|s| s.trim().to_string())
    }

    /// Blob content of `path` at `rev`, bypassing the working tree.
    pub fn file_at(&self, rev: &str, path: &str) -> Result<String, String> {
        self.git(&["show", &format!("{}:{}", rev, path)])
    }

    /// Commit subjects in `range`, oldest first.
    pub fn log_subjects(&self, range: &str) -> Vec<String> {
        self.git(&["log", "--format=%s", "--reverse", range])
            .unwrap()
            .lines()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn commit_count(&self, range: &str) -> usize {
        self.git(&["rev-list", "--count", range])
            .unwrap()
            .trim()
            .parse()
            .unwrap()
    }

    pub fn backup_branches(&self) -> Vec<String> {
        self.git(&["branch", "--list", "*-backup-*", "--format=%(refname:short)"])
            .unwrap()
            .lines()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}
