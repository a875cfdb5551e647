use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{SecondsFormat, Utc};

use crate::error::{GitvaultError, Result};
use crate::vcs::VersionControl;

/// External tool that inspects staged changes and performs the commit itself.
/// Success is judged solely by exit status; the commit message is read back
/// from the repository afterwards.
pub trait CommitMessageGenerator: Send + Sync {
    fn commit_staged(&self, repo: &Path, label: &str) -> Result<()>;
}

/// Which path produced the commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitVia {
    Generator,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct CommitRecord {
    pub via: CommitVia,
    pub message: String,
}

/// Deterministic message used whenever the generator is unavailable. Has no
/// external dependency, so it is the availability floor for backups.
pub fn fallback_message(label: &str) -> String {
    format!(
        "Backup {}: {}",
        label,
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Try the generator first; on any failure commit directly with the fallback
/// message. Generator failure is degraded-but-successful, never an error.
pub fn commit_with_summary(
    vcs: &dyn VersionControl,
    generator: &dyn CommitMessageGenerator,
    repo: &Path,
    label: &str,
) -> Result<CommitRecord> {
    match generator.commit_staged(repo, label) {
        Ok(()) => {
            // The repository is the source of truth for the message the tool
            // actually used, not the tool's stdout.
            let message = vcs.head_message(repo)?;
            Ok(CommitRecord {
                via: CommitVia::Generator,
                message,
            })
        }
        Err(err) => {
            tracing::warn!("commit message generator failed, using fallback: {}", err);
            let message = fallback_message(label);
            vcs.commit(repo, &message)?;
            Ok(CommitRecord {
                via: CommitVia::Fallback,
                message,
            })
        }
    }
}

/// Invokes the configured AI commit tool with the working copy as its working
/// directory, granting it permission to run git commands only, bounded by a
/// hard timeout.
pub struct ToolCommit {
    program: String,
    timeout: Duration,
}

impl ToolCommit {
    pub fn new(program: String, timeout: Duration) -> Self {
        Self { program, timeout }
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(200);

impl CommitMessageGenerator for ToolCommit {
    fn commit_staged(&self, repo: &Path, label: &str) -> Result<()> {
        let prompt = format!(
            "Review the staged changes for the {} backup and commit them \
             with a one-line summary message.",
            label
        );
        let mut cmd = Command::new(&self.program);
        cmd.arg("-p")
            .arg(prompt)
            .arg("--allowedTools")
            .arg("Bash(git status:*),Bash(git diff:*),Bash(git commit:*)")
            .current_dir(repo)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        let mut child = cmd
            .spawn()
            .map_err(|e| GitvaultError::message(format!("{}: {}", self.program, e)))?;
        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait()? {
                Some(status) if status.success() => return Ok(()),
                Some(status) => {
                    return Err(GitvaultError::message(format!(
                        "{} exited with {}",
                        self.program,
                        status.code().unwrap_or(1)
                    )));
                }
                None => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(GitvaultError::message(format!(
                            "{} timed out after {}s",
                            self.program,
                            self.timeout.as_secs()
                        )));
                    }
                    thread::sleep(POLL_INTERVAL);
                }
            }
        }
    }
}

/// Used when no commit tool is configured; every commit takes the fallback
/// path.
pub struct NoGenerator;

impl CommitMessageGenerator for NoGenerator {
    fn commit_staged(&self, _repo: &Path, _label: &str) -> Result<()> {
        Err(GitvaultError::message("no commit tool configured"))
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::path::Path;
    use std::sync::Arc;

    use crate::error::{GitvaultError, Result};
    use crate::vcs::fake::FakeVcs;
    use crate::vcs::VersionControl;

    use super::CommitMessageGenerator;

    /// Simulates the external tool: on success it commits through the shared
    /// fake repository, exactly like the real tool commits on our behalf.
    pub struct FakeGenerator {
        pub fail: bool,
        pub vcs: Arc<FakeVcs>,
        pub message: String,
    }

    impl FakeGenerator {
        pub fn failing(vcs: Arc<FakeVcs>) -> Self {
            Self {
                fail: true,
                vcs,
                message: String::new(),
            }
        }

        pub fn succeeding(vcs: Arc<FakeVcs>, message: &str) -> Self {
            Self {
                fail: false,
                vcs,
                message: message.to_string(),
            }
        }
    }

    impl CommitMessageGenerator for FakeGenerator {
        fn commit_staged(&self, repo: &Path, _label: &str) -> Result<()> {
            if self.fail {
                return Err(GitvaultError::message("simulated tool failure"));
            }
            self.vcs.commit(repo, &self.message)
        }
    }
}
