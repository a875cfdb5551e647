use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::cli::args::{Cli, Command};
use crate::config::load::load_config;
use crate::config::model::GlobalConfig;

pub mod args;
pub mod commands;

const CONFIG_FILE: &str = "/etc/gitvault.yaml";

pub fn run() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let config = load_config(config_path.to_string_lossy().as_ref())?;
    dispatch(cli.command, config)
}

fn dispatch(command: Command, config: GlobalConfig) -> Result<()> {
    match command {
        Command::Run { mapping } => commands::backup::run_once(config, mapping.as_deref()),
        Command::Daemon => commands::backup::run_daemon(config),
        Command::History { mapping, limit } => {
            commands::history::show(config, mapping.as_deref(), limit)
        }
        Command::Mapping { command } => commands::mapping::run(config, command),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .try_init();
}
