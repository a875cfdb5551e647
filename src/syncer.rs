use std::path::Path;
use std::process::Command;

use crate::error::Result;
use crate::util::command::run_capture;

/// Mirrors one directory tree into another, honoring exclusion patterns.
pub trait FileSyncer: Send + Sync {
    fn mirror(&self, source: &Path, dest: &Path, excludes: &[String]) -> Result<()>;
}

/// `rsync` in mirror mode: archive, delete destination extras, delete files
/// that have become excluded. Each pattern is passed as its own `--exclude`
/// argument, never joined into a shell string.
pub struct RsyncSyncer;

impl FileSyncer for RsyncSyncer {
    fn mirror(&self, source: &Path, dest: &Path, excludes: &[String]) -> Result<()> {
        let mut cmd = Command::new("rsync");
        cmd.arg("-a").arg("--delete").arg("--delete-excluded");
        for pattern in excludes {
            cmd.arg("--exclude").arg(pattern);
        }
        // Trailing slash: copy the contents of source, not source itself.
        cmd.arg(format!("{}/", source.display())).arg(dest);
        run_capture(&mut cmd)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::path::Path;
    use std::sync::Mutex;

    use crate::error::{GitvaultError, Result};

    use super::FileSyncer;

    #[derive(Default)]
    pub struct FakeSyncer {
        pub invocations: Mutex<Vec<(String, String, Vec<String>)>>,
        /// Source paths whose sync should fail.
        pub fail_sources: Vec<String>,
    }

    impl FileSyncer for FakeSyncer {
        fn mirror(&self, source: &Path, dest: &Path, excludes: &[String]) -> Result<()> {
            let source = source.to_string_lossy().to_string();
            self.invocations.lock().expect("lock").push((
                source.clone(),
                dest.to_string_lossy().to_string(),
                excludes.to_vec(),
            ));
            if self.fail_sources.contains(&source) {
                return Err(GitvaultError::message(format!("rsync failed for {}", source)));
            }
            Ok(())
        }
    }
}
