use std::env;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use crate::config::model::{ConfigFile, GlobalConfig};
use crate::error::{ConfigError, GitvaultError, Result};

const DEFAULT_DATA_DIR: &str = "/var/lib/gitvault";
const DEFAULT_BRANCH: &str = "main";
const DEFAULT_AUTHOR_NAME: &str = "gitvault";
const DEFAULT_AUTHOR_EMAIL: &str = "gitvault@localhost";
const DEFAULT_INTERVAL_HOURS: u32 = 6;
const DEFAULT_COMMIT_TOOL_TIMEOUT_SECS: u64 = 120;

/// Environment variable that overrides the `token` config field.
pub const TOKEN_ENV: &str = "GITVAULT_TOKEN";

pub fn load_config(path: &str) -> Result<GlobalConfig> {
    let mut contents = String::new();
    File::open(path)
        .map_err(GitvaultError::Io)?
        .read_to_string(&mut contents)
        .map_err(GitvaultError::Io)?;
    let cfg: ConfigFile =
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
    build_runtime(cfg)
}

fn build_runtime(cfg: ConfigFile) -> Result<GlobalConfig> {
    if cfg.repo_url.trim().is_empty() {
        return Err(ConfigError::Invalid("repoUrl is required".to_string()).into());
    }
    let interval_hours = cfg.interval_hours.unwrap_or(DEFAULT_INTERVAL_HOURS);
    if interval_hours == 0 || interval_hours > 24 {
        return Err(ConfigError::Invalid(format!(
            "intervalHours must be between 1 and 24, got {}",
            interval_hours
        ))
        .into());
    }
    let credential = env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty()).or(cfg.token);
    let data_dir = PathBuf::from(cfg.data_dir.unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()));
    let work_dir = cfg
        .work_dir
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir.join("repo"));
    if !work_dir.is_absolute() {
        return Err(ConfigError::Invalid(format!(
            "workDir must be absolute, got {}",
            work_dir.display()
        ))
        .into());
    }
    Ok(GlobalConfig {
        repo_url: cfg.repo_url.trim().to_string(),
        credential,
        branch: cfg.branch.unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
        data_dir,
        work_dir,
        author_name: cfg
            .author_name
            .unwrap_or_else(|| DEFAULT_AUTHOR_NAME.to_string()),
        author_email: cfg
            .author_email
            .unwrap_or_else(|| DEFAULT_AUTHOR_EMAIL.to_string()),
        interval_hours,
        commit_tool: cfg.commit_tool,
        commit_tool_timeout_secs: cfg
            .commit_tool_timeout_secs
            .unwrap_or(DEFAULT_COMMIT_TOOL_TIMEOUT_SECS),
        config_backup_path: cfg.config_backup_path,
        legacy_source_dir: cfg.legacy_source_dir,
        legacy_repo_subdir: cfg.legacy_repo_subdir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn load_config_with_defaults() {
        let mut file = NamedTempFile::new().expect("tempfile");
        let yaml = r#"
repoUrl: "https://github.com/example/backups.git"
dataDir: "/tmp/gitvault-test"
"#;
        file.write_all(yaml.as_bytes()).expect("write");
        let cfg = load_config(file.path().to_string_lossy().as_ref()).expect("load");
        assert_eq!(cfg.branch, "main");
        assert_eq!(cfg.interval_hours, 6);
        assert_eq!(cfg.work_dir, PathBuf::from("/tmp/gitvault-test/repo"));
        assert_eq!(
            cfg.store_path(),
            PathBuf::from("/tmp/gitvault-test/mappings.json")
        );
    }

    #[test]
    fn load_config_rejects_zero_interval() {
        let mut file = NamedTempFile::new().expect("tempfile");
        let yaml = r#"
repoUrl: "https://github.com/example/backups.git"
intervalHours: 0
"#;
        file.write_all(yaml.as_bytes()).expect("write");
        assert!(load_config(file.path().to_string_lossy().as_ref()).is_err());
    }

    #[test]
    fn load_config_rejects_empty_repo_url() {
        let mut file = NamedTempFile::new().expect("tempfile");
        file.write_all(b"repoUrl: \"\"\n").expect("write");
        assert!(load_config(file.path().to_string_lossy().as_ref()).is_err());
    }
}
