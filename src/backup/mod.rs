use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};

use crate::backup::message::{CommitMessageGenerator, CommitVia};
use crate::backup::sync::{sync_mapping, SyncOutcome};
use crate::config::model::GlobalConfig;
use crate::error::{GitvaultError, Result};
use crate::repo;
use crate::repo::url::commit_url;
use crate::store::history::{HistoryEntry, HistoryStore};
use crate::store::mappings::{Mapping, MappingStore, Settings};
use crate::syncer::FileSyncer;
use crate::vcs::VersionControl;

pub mod message;
pub mod sync;

const README_BEGIN: &str = "<!-- gitvault:mappings:begin -->";
const README_END: &str = "<!-- gitvault:mappings:end -->";

#[derive(Debug, Clone)]
pub struct MappingReport {
    pub mapping_id: String,
    pub mapping_name: String,
    pub outcome: MappingOutcome,
}

#[derive(Debug, Clone)]
pub enum MappingOutcome {
    Committed {
        commit_id: String,
        message: String,
        via: CommitVia,
        files_changed: usize,
        commit_url: Option<String>,
    },
    NoChange,
    Failed(String),
}

/// Drives full backup cycles over the configured mappings. Holds the single
/// process-wide running flag; at most one cycle mutates the working copy at
/// a time, and a request arriving while busy is rejected, never queued.
pub struct Orchestrator {
    config: GlobalConfig,
    store: MappingStore,
    history: HistoryStore,
    vcs: Arc<dyn VersionControl>,
    syncer: Arc<dyn FileSyncer>,
    generator: Arc<dyn CommitMessageGenerator>,
    running: AtomicBool,
}

struct RunningFlag<'a>(&'a AtomicBool);

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Orchestrator {
    pub fn new(
        config: GlobalConfig,
        vcs: Arc<dyn VersionControl>,
        syncer: Arc<dyn FileSyncer>,
        generator: Arc<dyn CommitMessageGenerator>,
    ) -> Self {
        let store = MappingStore::new(
            config.store_path(),
            config.legacy_source_dir.clone(),
            config.legacy_repo_subdir.clone(),
        );
        let history = HistoryStore::new(config.history_path());
        Self {
            config,
            store,
            history,
            vcs,
            syncer,
            generator,
            running: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    pub fn store(&self) -> &MappingStore {
        &self.store
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run one full backup cycle, optionally narrowed to a single mapping id.
    /// Returns one report per selected mapping, in selection order. Rejects
    /// with [`GitvaultError::Busy`] while another cycle is running.
    pub fn run_cycle(&self, filter: Option<&str>) -> Result<Vec<MappingReport>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(GitvaultError::Busy);
        }
        // Cleared on every exit path, including panics and early errors, so a
        // failed cycle can never wedge the process into perpetually busy.
        let _flag = RunningFlag(&self.running);
        self.run_cycle_locked(filter)
    }

    fn run_cycle_locked(&self, filter: Option<&str>) -> Result<Vec<MappingReport>> {
        let had_store = self.store.exists();
        repo::prepare(&self.config, self.vcs.as_ref())?;
        if !had_store && self.recover_store()? {
            tracing::info!("recovered mapping store from the cloned repository");
        }
        let (mappings, settings) = self.store.load()?;
        let selected = select_mappings(&mappings, filter)?;
        let mut reports = Vec::with_capacity(selected.len());
        for mapping in &selected {
            reports.push(self.sync_one(mapping, &settings));
        }
        if let Err(err) = self.housekeeping(&mappings, &settings) {
            tracing::warn!("housekeeping failed: {}", err);
        }
        Ok(reports)
    }

    /// A failure here is recorded against this mapping only; the cycle keeps
    /// going with the remaining mappings.
    fn sync_one(&self, mapping: &Mapping, settings: &Settings) -> MappingReport {
        let outcome = match sync_mapping(
            &self.config.work_dir,
            mapping,
            &settings.global_ignore_patterns,
            &self.config.branch,
            self.vcs.as_ref(),
            self.syncer.as_ref(),
            self.generator.as_ref(),
        ) {
            Ok(SyncOutcome::Committed {
                commit_id,
                message,
                via,
                files_changed,
            }) => {
                let commit_url = commit_url(&self.config.repo_url, &commit_id);
                let entry = HistoryEntry {
                    timestamp: Utc::now(),
                    mapping_id: mapping.id.clone(),
                    mapping_name: mapping.name.clone(),
                    commit_id: commit_id.clone(),
                    commit_message: message.clone(),
                    files_changed,
                    commit_url: commit_url.clone(),
                };
                if let Err(err) = self.history.append(entry) {
                    tracing::warn!("history append failed for {}: {}", mapping.name, err);
                }
                MappingOutcome::Committed {
                    commit_id,
                    message,
                    via,
                    files_changed,
                    commit_url,
                }
            }
            Ok(SyncOutcome::NoChange) => MappingOutcome::NoChange,
            Err(err) => {
                tracing::warn!("mapping {} failed: {}", mapping.name, err);
                MappingOutcome::Failed(err.to_string())
            }
        };
        MappingReport {
            mapping_id: mapping.id.clone(),
            mapping_name: mapping.name.clone(),
            outcome,
        }
    }

    /// With no local store, look for a mirrored store inside the fresh clone:
    /// the configured mirror path first, then the well-known mirror path,
    /// then root-level JSON documents in lexicographic filename order.
    fn recover_store(&self) -> Result<bool> {
        if !self.config.work_dir.is_dir() {
            return Ok(false);
        }
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(configured) = &self.config.config_backup_path {
            let path = self.config.work_dir.join(configured);
            if path.is_file() {
                candidates.push(path);
            }
        }
        let well_known = self.config.work_dir.join("gitvault/mappings.json");
        if well_known.is_file() {
            candidates.push(well_known);
        }
        let mut names: Vec<String> = fs::read_dir(&self.config.work_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(".json"))
            .collect();
        names.sort();
        candidates.extend(names.into_iter().map(|n| self.config.work_dir.join(n)));
        for candidate in candidates {
            if self.store.adopt_file(&candidate)? {
                tracing::info!("mapping store recovered from {}", candidate.display());
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Regenerate opted-in README sections and mirror the store into the
    /// repository, then commit whatever that touched as one extra commit.
    fn housekeeping(&self, mappings: &[Mapping], settings: &Settings) -> Result<()> {
        let mut touched = false;
        if mappings.iter().any(|m| m.enabled && m.readme_section) {
            touched |= self.update_readme(mappings)?;
        }
        // Settings may override the YAML default, but both feed the same
        // path that recovery checks first.
        let mirror_path = settings
            .config_backup_path
            .as_ref()
            .or(self.config.config_backup_path.as_ref());
        if let Some(rel) = mirror_path {
            touched |= self.mirror_store(rel)?;
        }
        if !touched {
            return Ok(());
        }
        let changed = self.vcs.changed_files(&self.config.work_dir)?;
        if changed.is_empty() {
            return Ok(());
        }
        self.vcs.stage_all(&self.config.work_dir)?;
        let message = format!(
            "Update backup metadata: {}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        self.vcs.commit(&self.config.work_dir, &message)?;
        self.vcs.push(&self.config.work_dir, &self.config.branch)?;
        Ok(())
    }

    fn update_readme(&self, mappings: &[Mapping]) -> Result<bool> {
        let mut body = String::new();
        for mapping in mappings.iter().filter(|m| m.enabled && m.readme_section) {
            body.push_str(&format!("\n## {}\n\n", mapping.name));
            let location = if mapping.repo_subdir.is_empty() {
                "the repository root".to_string()
            } else {
                format!("`{}/`", mapping.repo_subdir)
            };
            body.push_str(&format!(
                "Backed up from `{}` into {}.\n",
                mapping.source_dir, location
            ));
            if let Some(entry) = self.history.latest_for(&mapping.id)? {
                body.push_str(&format!(
                    "Last backup: {} ({} file(s), commit {}).\n",
                    entry.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                    entry.files_changed,
                    entry.commit_id
                ));
            }
        }
        let block = format!("{}\n{}\n{}", README_BEGIN, body.trim_end(), README_END);
        let path = self.config.work_dir.join("README.md");
        let existing = fs::read_to_string(&path).unwrap_or_default();
        let updated = match (existing.find(README_BEGIN), existing.find(README_END)) {
            (Some(start), Some(end)) if end >= start => format!(
                "{}{}{}",
                &existing[..start],
                block,
                &existing[end + README_END.len()..]
            ),
            _ => {
                let mut out = existing.clone();
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(&block);
                out.push('\n');
                out
            }
        };
        if updated == existing {
            return Ok(false);
        }
        fs::create_dir_all(&self.config.work_dir)?;
        fs::write(&path, updated)?;
        Ok(true)
    }

    fn mirror_store(&self, relative: &str) -> Result<bool> {
        if !self.store.exists() {
            return Ok(false);
        }
        let dest = self.config.work_dir.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(self.store.path(), &dest)?;
        Ok(true)
    }
}

fn select_mappings(all: &[Mapping], filter: Option<&str>) -> Result<Vec<Mapping>> {
    match filter {
        Some(id) => {
            let mapping = all
                .iter()
                .find(|m| m.id == id)
                .ok_or_else(|| GitvaultError::message(format!("mapping {} not found", id)))?;
            if !mapping.enabled {
                return Err(GitvaultError::message(format!("mapping {} is disabled", id)));
            }
            Ok(vec![mapping.clone()])
        }
        None => Ok(all.iter().filter(|m| m.enabled).cloned().collect()),
    }
}
