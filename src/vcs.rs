use std::path::Path;
use std::process::Command;

use crate::error::Result;
use crate::util::command::run_capture;

/// Version-control operations the backup engine needs, modelled as an
/// injected capability so the orchestrator and synchronizer can be tested
/// against fakes.
pub trait VersionControl: Send + Sync {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()>;
    /// Check out `branch`, creating it locally when it does not exist on the
    /// remote, so the first backup into a fresh repository still succeeds.
    fn checkout_or_create(&self, repo: &Path, branch: &str) -> Result<()>;
    fn set_config(&self, repo: &Path, key: &str, value: &str) -> Result<()>;
    /// Paths that differ from the last commit, per working-tree status.
    fn changed_files(&self, repo: &Path) -> Result<Vec<String>>;
    fn stage_all(&self, repo: &Path) -> Result<()>;
    fn commit(&self, repo: &Path, message: &str) -> Result<()>;
    /// Push `branch`, creating the upstream tracking relationship if absent.
    fn push(&self, repo: &Path, branch: &str) -> Result<()>;
    fn head_commit(&self, repo: &Path) -> Result<String>;
    fn head_message(&self, repo: &Path) -> Result<String>;
}

/// `git` invoked as a subprocess with argument vectors, never shell strings.
pub struct GitCli;

impl GitCli {
    fn git(&self, repo: &Path, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(repo);
        for arg in args {
            cmd.arg(arg);
        }
        run_capture(&mut cmd)
    }
}

impl VersionControl for GitCli {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        let mut cmd = Command::new("git");
        cmd.arg("clone").arg(url).arg(dest);
        run_capture(&mut cmd)?;
        Ok(())
    }

    fn checkout_or_create(&self, repo: &Path, branch: &str) -> Result<()> {
        if self.git(repo, &["checkout", branch]).is_ok() {
            return Ok(());
        }
        self.git(repo, &["checkout", "-b", branch])?;
        Ok(())
    }

    fn set_config(&self, repo: &Path, key: &str, value: &str) -> Result<()> {
        self.git(repo, &["config", key, value])?;
        Ok(())
    }

    fn changed_files(&self, repo: &Path) -> Result<Vec<String>> {
        let out = self.git(repo, &["status", "--porcelain"])?;
        Ok(out
            .lines()
            .filter(|l| !l.is_empty())
            .map(|l| l.get(3..).unwrap_or(l).to_string())
            .collect())
    }

    fn stage_all(&self, repo: &Path) -> Result<()> {
        self.git(repo, &["add", "-A"])?;
        Ok(())
    }

    fn commit(&self, repo: &Path, message: &str) -> Result<()> {
        self.git(repo, &["commit", "-m", message])?;
        Ok(())
    }

    fn push(&self, repo: &Path, branch: &str) -> Result<()> {
        self.git(repo, &["push", "-u", "origin", branch])?;
        Ok(())
    }

    fn head_commit(&self, repo: &Path) -> Result<String> {
        self.git(repo, &["rev-parse", "HEAD"])
    }

    fn head_message(&self, repo: &Path) -> Result<String> {
        Ok(self.git(repo, &["log", "-1", "--pretty=%B"])?.trim().to_string())
    }
}
