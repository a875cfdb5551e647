use std::process::Command;

use crate::error::{GitvaultError, Result};

/// Run a command, capture output, and return trimmed stdout. Non-zero exit
/// becomes an error carrying the command name and trimmed stderr.
///
/// Only the program name is logged: clone and push arguments can carry a
/// credential-bearing URL that must never reach the log.
pub fn run_capture(cmd: &mut Command) -> Result<String> {
    let program = cmd.get_program().to_string_lossy().to_string();
    tracing::debug!("run: {}", program);
    let output = cmd
        .output()
        .map_err(|e| GitvaultError::message(format!("{}: {}", program, e)))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitvaultError::message(format!(
            "{} exited with {}: {}",
            program,
            output.status.code().unwrap_or(1),
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
