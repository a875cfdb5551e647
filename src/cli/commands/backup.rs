use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::backup::message::{CommitMessageGenerator, NoGenerator, ToolCommit};
use crate::backup::{MappingOutcome, Orchestrator};
use crate::config::model::GlobalConfig;
use crate::error::GitvaultError;
use crate::scheduler;
use crate::syncer::RsyncSyncer;
use crate::vcs::GitCli;

pub fn run_once(config: GlobalConfig, mapping: Option<&str>) -> Result<()> {
    let orchestrator = build_orchestrator(config);
    match orchestrator.run_cycle(mapping) {
        Ok(reports) => {
            for report in &reports {
                match &report.outcome {
                    MappingOutcome::Committed {
                        commit_id,
                        message,
                        files_changed,
                        commit_url,
                        ..
                    } => {
                        println!(
                            "{} ({}): {} file(s) committed as {}",
                            report.mapping_name, report.mapping_id, files_changed, commit_id
                        );
                        println!("  {}", message);
                        if let Some(url) = commit_url {
                            println!("  {}", url);
                        }
                    }
                    MappingOutcome::NoChange => {
                        println!("{} ({}): no changes", report.mapping_name, report.mapping_id)
                    }
                    MappingOutcome::Failed(err) => println!(
                        "{} ({}): failed: {}",
                        report.mapping_name, report.mapping_id, err
                    ),
                }
            }
            Ok(())
        }
        Err(GitvaultError::Busy) => {
            println!("a backup cycle is already running");
            std::process::exit(2);
        }
        Err(err) => Err(err.into()),
    }
}

pub fn run_daemon(config: GlobalConfig) -> Result<()> {
    let every_hours = config.interval_hours;
    let orchestrator = Arc::new(build_orchestrator(config));
    scheduler::run(orchestrator, every_hours);
    Ok(())
}

fn build_orchestrator(config: GlobalConfig) -> Orchestrator {
    let generator: Arc<dyn CommitMessageGenerator> = match &config.commit_tool {
        Some(program) => Arc::new(ToolCommit::new(
            program.clone(),
            Duration::from_secs(config.commit_tool_timeout_secs),
        )),
        None => Arc::new(NoGenerator),
    };
    Orchestrator::new(config, Arc::new(GitCli), Arc::new(RsyncSyncer), generator)
}
