use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "gitvault", version, about = "Backs up local directories into a Git repository")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run one backup cycle now.
    Run {
        /// Restrict the cycle to a single mapping id.
        #[arg(long)]
        mapping: Option<String>,
    },
    /// Run a cycle immediately, then keep running one per interval.
    Daemon,
    /// Show recent backup history, newest first.
    History {
        #[arg(long)]
        mapping: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Manage backup mappings.
    Mapping {
        #[command(subcommand)]
        command: MappingCommand,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum MappingCommand {
    List,
    Add(MappingAddArgs),
    Remove {
        id: String,
    },
    Enable {
        id: String,
    },
    Disable {
        id: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct MappingAddArgs {
    /// Display label for the mapping.
    #[arg(long)]
    pub name: String,
    /// Absolute local directory to back up.
    #[arg(long)]
    pub source: String,
    /// Subdirectory of the repository to mirror into; empty for the root.
    #[arg(long, default_value = "")]
    pub subdir: String,
    /// Exclusion pattern, repeatable.
    #[arg(long = "ignore")]
    pub ignore_patterns: Vec<String>,
    /// Include this mapping in the generated README section.
    #[arg(long)]
    pub readme: bool,
}
