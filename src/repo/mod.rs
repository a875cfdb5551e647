use std::fs;

use crate::config::model::GlobalConfig;
use crate::error::Result;
use crate::vcs::VersionControl;

pub mod url;

/// Discard any previous working copy and produce a fresh clone on the
/// configured branch with author identity set.
///
/// The wipe is unconditional: the working copy is owned exclusively by the
/// running cycle, so nothing from a previous cycle may survive into this one.
/// Any clone or checkout failure propagates; a cycle cannot proceed without
/// a repository.
pub fn prepare(config: &GlobalConfig, vcs: &dyn VersionControl) -> Result<()> {
    if config.work_dir.exists() {
        fs::remove_dir_all(&config.work_dir)?;
    }
    if let Some(parent) = config.work_dir.parent() {
        fs::create_dir_all(parent)?;
    }
    let transport_url = url::with_credential(&config.repo_url, config.credential.as_deref());
    tracing::info!(
        "cloning {} into {}",
        url::without_credential(&config.repo_url),
        config.work_dir.display()
    );
    vcs.clone_repo(&transport_url, &config.work_dir)?;
    vcs.checkout_or_create(&config.work_dir, &config.branch)?;
    vcs.set_config(&config.work_dir, "user.name", &config.author_name)?;
    vcs.set_config(&config.work_dir, "user.email", &config.author_email)?;
    vcs.set_config(&config.work_dir, "init.defaultBranch", &config.branch)?;
    Ok(())
}
