use std::path::PathBuf;

use serde::Deserialize;

/// On-disk YAML shape of the main config file.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub repo_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub work_dir: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_email: Option<String>,
    #[serde(default)]
    pub interval_hours: Option<u32>,
    #[serde(default)]
    pub commit_tool: Option<String>,
    #[serde(default)]
    pub commit_tool_timeout_secs: Option<u64>,
    #[serde(default)]
    pub config_backup_path: Option<String>,
    #[serde(default)]
    pub legacy_source_dir: Option<String>,
    #[serde(default)]
    pub legacy_repo_subdir: Option<String>,
}

/// Validated, process-lifetime configuration. Read once at startup; only the
/// store-held settings are re-read per cycle.
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    pub repo_url: String,
    pub credential: Option<String>,
    pub branch: String,
    pub data_dir: PathBuf,
    pub work_dir: PathBuf,
    pub author_name: String,
    pub author_email: String,
    pub interval_hours: u32,
    pub commit_tool: Option<String>,
    pub commit_tool_timeout_secs: u64,
    /// Default in-repository mirror path for the mapping store. Lives in the
    /// YAML, which survives a data-dir loss, so recovery can find the mirror
    /// even when the store (and the settings inside it) are gone.
    pub config_backup_path: Option<String>,
    pub legacy_source_dir: Option<String>,
    pub legacy_repo_subdir: Option<String>,
}

impl GlobalConfig {
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("mappings.json")
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join("history.json")
    }
}
