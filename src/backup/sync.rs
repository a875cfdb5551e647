use std::fs;
use std::path::{Path, PathBuf};

use crate::backup::message::{commit_with_summary, CommitMessageGenerator, CommitVia};
use crate::error::{ConfigError, Result};
use crate::store::mappings::Mapping;
use crate::syncer::FileSyncer;
use crate::vcs::VersionControl;

/// Header line marking the exclusion file as generated, so operators can tell
/// managed entries from manual ones.
pub const MANAGED_HEADER: &str = "# Managed by gitvault; do not edit, regenerated every backup";

const SHELL_METACHARACTERS: [char; 4] = ['"', '\'', ';', '|'];

#[derive(Debug, Clone)]
pub enum SyncOutcome {
    Committed {
        commit_id: String,
        message: String,
        via: CommitVia,
        files_changed: usize,
    },
    NoChange,
}

/// Mirror one mapping's source directory into its repository subdirectory,
/// commit and push if anything changed.
///
/// Failures here are fatal to this mapping only; the orchestrator catches
/// them and moves on to the next mapping.
pub fn sync_mapping(
    work_dir: &Path,
    mapping: &Mapping,
    global_ignore_patterns: &[String],
    branch: &str,
    vcs: &dyn VersionControl,
    syncer: &dyn FileSyncer,
    generator: &dyn CommitMessageGenerator,
) -> Result<SyncOutcome> {
    let target = target_dir(work_dir, mapping);
    validate_path("source directory", &mapping.source_dir)?;
    validate_path("target directory", &target.to_string_lossy())?;
    fs::create_dir_all(&target)?;

    let merged = merged_patterns(global_ignore_patterns, &mapping.ignore_patterns);
    let excludes = exclusion_rules(&merged, Path::new(&mapping.source_dir));
    syncer.mirror(Path::new(&mapping.source_dir), &target, &excludes)?;
    write_managed_exclusions(&target, &merged)?;

    let changed = vcs.changed_files(work_dir)?;
    if changed.is_empty() {
        return Ok(SyncOutcome::NoChange);
    }
    let files_changed = changed.len();
    vcs.stage_all(work_dir)?;
    let record = commit_with_summary(vcs, generator, work_dir, &mapping.name)?;
    vcs.push(work_dir, branch)?;
    let commit_id = vcs.head_commit(work_dir)?;
    tracing::info!(
        "mapping {}: committed {} file(s) as {}",
        mapping.name,
        files_changed,
        commit_id
    );
    Ok(SyncOutcome::Committed {
        commit_id,
        message: record.message,
        via: record.via,
        files_changed,
    })
}

fn target_dir(work_dir: &Path, mapping: &Mapping) -> PathBuf {
    if mapping.repo_subdir.is_empty() {
        work_dir.to_path_buf()
    } else {
        work_dir.join(&mapping.repo_subdir)
    }
}

/// Invocation uses argument vectors, but the paths eventually reach external
/// tools; reject anything that could be read as shell syntax.
fn validate_path(label: &str, value: &str) -> Result<()> {
    if value.chars().any(|c| SHELL_METACHARACTERS.contains(&c)) {
        return Err(ConfigError::Invalid(format!(
            "{} {:?} contains a shell metacharacter",
            label, value
        ))
        .into());
    }
    Ok(())
}

/// Global patterns first, then mapping patterns; plain union, no override
/// semantics.
fn merged_patterns(global: &[String], mapping: &[String]) -> Vec<String> {
    let mut merged = global.to_vec();
    merged.extend(mapping.iter().cloned());
    merged
}

/// Full rule set handed to the sync tool: repository metadata and the managed
/// exclusion file at the sync root always come first, then the merged
/// patterns, then any patterns found in the source's own .gitignore.
fn exclusion_rules(merged: &[String], source_dir: &Path) -> Vec<String> {
    let mut rules = vec![".git".to_string(), "/.gitignore".to_string()];
    rules.extend(merged.iter().cloned());
    rules.extend(source_gitignore_patterns(source_dir));
    rules
}

fn source_gitignore_patterns(source_dir: &Path) -> Vec<String> {
    let path = source_dir.join(".gitignore");
    let Ok(contents) = fs::read_to_string(&path) else {
        return Vec::new();
    };
    contents
        .lines()
        .map(str::trim)
        // Negation lines have no --exclude counterpart, so skip them rather
        // than hand rsync a literal `!pattern`.
        .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with('!'))
        .map(str::to_string)
        .collect()
}

fn write_managed_exclusions(target: &Path, merged: &[String]) -> Result<()> {
    if merged.is_empty() {
        return Ok(());
    }
    let mut contents = String::from(MANAGED_HEADER);
    contents.push('\n');
    for pattern in merged {
        contents.push_str(pattern);
        contents.push('\n');
    }
    fs::write(target.join(".gitignore"), contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::message::fake::FakeGenerator;
    use crate::syncer::fake::FakeSyncer;
    use crate::vcs::fake::FakeVcs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn mapping(source_dir: &str, repo_subdir: &str) -> Mapping {
        Mapping {
            id: "m1".to_string(),
            name: "etc".to_string(),
            source_dir: source_dir.to_string(),
            repo_subdir: repo_subdir.to_string(),
            enabled: true,
            ignore_patterns: Vec::new(),
            readme_section: false,
        }
    }

    fn run(
        work_dir: &Path,
        mapping: &Mapping,
        global: &[String],
        vcs: &Arc<FakeVcs>,
        syncer: &FakeSyncer,
    ) -> Result<SyncOutcome> {
        let generator = FakeGenerator::failing(vcs.clone());
        sync_mapping(work_dir, mapping, global, "main", vcs.as_ref(), syncer, &generator)
    }

    #[test]
    fn metacharacter_in_source_fails_before_any_tool_runs() {
        let dir = TempDir::new().expect("tempdir");
        let vcs = Arc::new(FakeVcs::default());
        let syncer = FakeSyncer::default();
        let bad = mapping("/data/it's", "etc");
        let err = run(dir.path(), &bad, &[], &vcs, &syncer);
        assert!(err.is_err());
        assert!(syncer.invocations.lock().expect("lock").is_empty());
        assert!(vcs.calls.lock().expect("lock").is_empty());
    }

    #[test]
    fn clean_tree_returns_no_change_without_commit_or_push() {
        let dir = TempDir::new().expect("tempdir");
        let source = TempDir::new().expect("source");
        let vcs = Arc::new(FakeVcs::default());
        let syncer = FakeSyncer::default();
        let m = mapping(source.path().to_string_lossy().as_ref(), "etc");
        let outcome = run(dir.path(), &m, &[], &vcs, &syncer).expect("sync");
        assert!(matches!(outcome, SyncOutcome::NoChange));
        let calls = vcs.calls.lock().expect("lock");
        assert!(!calls.iter().any(|c| c == "add" || c == "commit" || c.starts_with("push")));
    }

    #[test]
    fn changed_tree_stages_commits_and_pushes() {
        let dir = TempDir::new().expect("tempdir");
        let source = TempDir::new().expect("source");
        let vcs = Arc::new(FakeVcs::with_changes(vec![vec![
            "servers/web01/nginx.conf".to_string(),
        ]]));
        let syncer = FakeSyncer::default();
        let m = mapping(source.path().to_string_lossy().as_ref(), "servers/web01");
        let outcome = run(dir.path(), &m, &[], &vcs, &syncer).expect("sync");
        match outcome {
            SyncOutcome::Committed {
                files_changed, via, ..
            } => {
                assert_eq!(files_changed, 1);
                assert_eq!(via, CommitVia::Fallback);
            }
            SyncOutcome::NoChange => panic!("expected a commit"),
        }
        let calls = vcs.calls.lock().expect("lock");
        assert!(calls.contains(&"add".to_string()));
        assert!(calls.contains(&"push main".to_string()));
        assert!(dir.path().join("servers/web01").is_dir());
    }

    #[test]
    fn exclusion_rules_keep_global_before_mapping_patterns() {
        let dir = TempDir::new().expect("tempdir");
        let source = TempDir::new().expect("source");
        let vcs = Arc::new(FakeVcs::default());
        let syncer = FakeSyncer::default();
        let mut m = mapping(source.path().to_string_lossy().as_ref(), "etc");
        m.ignore_patterns = vec!["*.cache".to_string()];
        run(dir.path(), &m, &["*.log".to_string()], &vcs, &syncer).expect("sync");
        let invocations = syncer.invocations.lock().expect("lock");
        let excludes = &invocations[0].2;
        assert_eq!(
            excludes,
            &vec![
                ".git".to_string(),
                "/.gitignore".to_string(),
                "*.log".to_string(),
                "*.cache".to_string(),
            ]
        );
    }

    #[test]
    fn source_gitignore_is_a_supplementary_exclusion_source() {
        let dir = TempDir::new().expect("tempdir");
        let source = TempDir::new().expect("source");
        std::fs::write(
            source.path().join(".gitignore"),
            "# comment\nnode_modules\n\n*.tmp\n!keep.log\n",
        )
        .expect("write");
        let vcs = Arc::new(FakeVcs::default());
        let syncer = FakeSyncer::default();
        let m = mapping(source.path().to_string_lossy().as_ref(), "etc");
        run(dir.path(), &m, &[], &vcs, &syncer).expect("sync");
        let invocations = syncer.invocations.lock().expect("lock");
        let excludes = &invocations[0].2;
        assert!(excludes.contains(&"node_modules".to_string()));
        assert!(excludes.contains(&"*.tmp".to_string()));
        assert!(!excludes.iter().any(|e| e.starts_with('#')));
        assert!(!excludes.iter().any(|e| e.starts_with('!')));
    }

    #[test]
    fn managed_exclusion_file_written_only_when_patterns_exist() {
        let dir = TempDir::new().expect("tempdir");
        let source = TempDir::new().expect("source");
        let vcs = Arc::new(FakeVcs::default());
        let syncer = FakeSyncer::default();
        let m = mapping(source.path().to_string_lossy().as_ref(), "etc");
        run(dir.path(), &m, &[], &vcs, &syncer).expect("sync");
        assert!(!dir.path().join("etc/.gitignore").exists());

        let mut with_patterns = m.clone();
        with_patterns.ignore_patterns = vec!["*.tmp".to_string()];
        run(dir.path(), &with_patterns, &["*.log".to_string()], &vcs, &syncer).expect("sync");
        let contents =
            std::fs::read_to_string(dir.path().join("etc/.gitignore")).expect("managed file");
        assert!(contents.starts_with(MANAGED_HEADER));
        assert_eq!(contents, format!("{}\n*.log\n*.tmp\n", MANAGED_HEADER));
    }

    #[test]
    fn empty_subdir_targets_repository_root() {
        let dir = TempDir::new().expect("tempdir");
        let source = TempDir::new().expect("source");
        let vcs = Arc::new(FakeVcs::default());
        let syncer = FakeSyncer::default();
        let m = mapping(source.path().to_string_lossy().as_ref(), "");
        run(dir.path(), &m, &[], &vcs, &syncer).expect("sync");
        let invocations = syncer.invocations.lock().expect("lock");
        assert_eq!(invocations[0].1, dir.path().to_string_lossy().to_string());
    }
}
