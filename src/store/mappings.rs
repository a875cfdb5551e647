use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::store::write_atomic;

/// One source-directory-to-repository-subdirectory backup rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    pub id: String,
    pub name: String,
    pub source_dir: String,
    /// Relative to the repository root; empty string means the root itself.
    #[serde(default)]
    pub repo_subdir: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    #[serde(default)]
    pub readme_section: bool,
}

fn default_enabled() -> bool {
    true
}

/// Partial update for a mapping; `None` fields are left untouched. The id is
/// never patchable.
#[derive(Debug, Clone, Default)]
pub struct MappingPatch {
    pub name: Option<String>,
    pub source_dir: Option<String>,
    pub repo_subdir: Option<String>,
    pub enabled: Option<bool>,
    pub ignore_patterns: Option<Vec<String>>,
    pub readme_section: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub global_ignore_patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_backup_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreFile {
    #[serde(default)]
    mappings: Vec<Mapping>,
    #[serde(default)]
    settings: Settings,
}

pub struct NewMapping {
    pub name: String,
    pub source_dir: String,
    pub repo_subdir: String,
    pub ignore_patterns: Vec<String>,
    pub readme_section: bool,
}

/// Durable CRUD for mapping definitions and global settings, backed by a
/// single JSON file written via temp-file-then-rename.
pub struct MappingStore {
    path: PathBuf,
    legacy_source_dir: Option<String>,
    legacy_repo_subdir: Option<String>,
}

impl MappingStore {
    pub fn new(
        path: PathBuf,
        legacy_source_dir: Option<String>,
        legacy_repo_subdir: Option<String>,
    ) -> Self {
        Self {
            path,
            legacy_source_dir,
            legacy_repo_subdir,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<(Vec<Mapping>, Settings)> {
        if !self.path.exists() {
            let mut file = StoreFile::default();
            if let Some(mapping) = self.legacy_mapping() {
                file.mappings.push(mapping);
            }
            return Ok((file.mappings, file.settings));
        }
        let data = fs::read_to_string(&self.path)?;
        let file: StoreFile =
            serde_json::from_str(&data).map_err(|e| StoreError::Parse(e.to_string()))?;
        Ok((file.mappings, file.settings))
    }

    pub fn add(&self, new: NewMapping) -> Result<Mapping> {
        let (mut mappings, settings) = self.load()?;
        if let Some(existing) = mappings.iter().find(|m| m.repo_subdir == new.repo_subdir) {
            return Err(
                StoreError::DuplicateSubdir(new.repo_subdir.clone(), existing.id.clone()).into(),
            );
        }
        let mapping = Mapping {
            id: next_id(&mappings),
            name: new.name,
            source_dir: new.source_dir,
            repo_subdir: new.repo_subdir,
            enabled: true,
            ignore_patterns: new.ignore_patterns,
            readme_section: new.readme_section,
        };
        mappings.push(mapping.clone());
        self.save(&mappings, &settings)?;
        Ok(mapping)
    }

    pub fn update(&self, id: &str, patch: MappingPatch) -> Result<Mapping> {
        let (mut mappings, settings) = self.load()?;
        if let Some(subdir) = &patch.repo_subdir {
            if let Some(other) = mappings
                .iter()
                .find(|m| m.id != id && m.repo_subdir == *subdir)
            {
                return Err(StoreError::DuplicateSubdir(subdir.clone(), other.id.clone()).into());
            }
        }
        let mapping = mappings
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if let Some(name) = patch.name {
            mapping.name = name;
        }
        if let Some(source_dir) = patch.source_dir {
            mapping.source_dir = source_dir;
        }
        if let Some(repo_subdir) = patch.repo_subdir {
            mapping.repo_subdir = repo_subdir;
        }
        if let Some(enabled) = patch.enabled {
            mapping.enabled = enabled;
        }
        if let Some(ignore_patterns) = patch.ignore_patterns {
            mapping.ignore_patterns = ignore_patterns;
        }
        if let Some(readme_section) = patch.readme_section {
            mapping.readme_section = readme_section;
        }
        let updated = mapping.clone();
        self.save(&mappings, &settings)?;
        Ok(updated)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let (mut mappings, settings) = self.load()?;
        let before = mappings.len();
        mappings.retain(|m| m.id != id);
        if mappings.len() == before {
            return Err(StoreError::NotFound(id.to_string()).into());
        }
        self.save(&mappings, &settings)
    }

    /// Replace the local store with a recovered copy, after checking that the
    /// candidate actually parses as a store file with at least one mapping.
    pub fn adopt_file(&self, candidate: &Path) -> Result<bool> {
        let data = fs::read_to_string(candidate)?;
        match serde_json::from_str::<StoreFile>(&data) {
            Ok(file) if !file.mappings.is_empty() => {
                write_atomic(&self.path, data.as_bytes())?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn save(&self, mappings: &[Mapping], settings: &Settings) -> Result<()> {
        let file = StoreFile {
            mappings: mappings.to_vec(),
            settings: settings.clone(),
        };
        let data = serde_json::to_string_pretty(&file)
            .map_err(|e| StoreError::Parse(e.to_string()))?;
        write_atomic(&self.path, data.as_bytes())
    }

    fn legacy_mapping(&self) -> Option<Mapping> {
        let source_dir = self.legacy_source_dir.clone()?;
        Some(Mapping {
            id: "legacy".to_string(),
            name: "default".to_string(),
            source_dir,
            repo_subdir: self.legacy_repo_subdir.clone().unwrap_or_default(),
            enabled: true,
            ignore_patterns: Vec::new(),
            readme_section: false,
        })
    }
}

fn next_id(existing: &[Mapping]) -> String {
    let mut millis = chrono::Utc::now().timestamp_millis() as u64;
    loop {
        let candidate = format!("m{}", to_base36(millis));
        if !existing.iter().any(|m| m.id == candidate) {
            return candidate;
        }
        millis += 1;
    }
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
