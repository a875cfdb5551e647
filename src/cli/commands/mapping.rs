use anyhow::Result;

use crate::cli::args::{MappingAddArgs, MappingCommand};
use crate::config::model::GlobalConfig;
use crate::store::mappings::{MappingPatch, MappingStore, NewMapping};

pub fn run(config: GlobalConfig, command: MappingCommand) -> Result<()> {
    let store = MappingStore::new(
        config.store_path(),
        config.legacy_source_dir.clone(),
        config.legacy_repo_subdir.clone(),
    );
    match command {
        MappingCommand::List => list(&store),
        MappingCommand::Add(args) => add(&store, args),
        MappingCommand::Remove { id } => {
            store.delete(&id)?;
            println!("removed mapping {}", id);
            Ok(())
        }
        MappingCommand::Enable { id } => set_enabled(&store, &id, true),
        MappingCommand::Disable { id } => set_enabled(&store, &id, false),
    }
}

fn list(store: &MappingStore) -> Result<()> {
    let (mappings, settings) = store.load()?;
    if mappings.is_empty() {
        println!("no mappings configured");
        return Ok(());
    }
    for mapping in &mappings {
        let state = if mapping.enabled { "enabled" } else { "disabled" };
        let subdir = if mapping.repo_subdir.is_empty() {
            "<root>"
        } else {
            &mapping.repo_subdir
        };
        println!("{}  {}  {}", mapping.id, mapping.name, state);
        println!("  source: {}", mapping.source_dir);
        println!("  subdir: {}", subdir);
        if !mapping.ignore_patterns.is_empty() {
            println!("  ignore: {}", mapping.ignore_patterns.join(", "));
        }
    }
    if !settings.global_ignore_patterns.is_empty() {
        println!("global ignore: {}", settings.global_ignore_patterns.join(", "));
    }
    Ok(())
}

fn add(store: &MappingStore, args: MappingAddArgs) -> Result<()> {
    let mapping = store.add(NewMapping {
        name: args.name,
        source_dir: args.source,
        repo_subdir: args.subdir,
        ignore_patterns: args.ignore_patterns,
        readme_section: args.readme,
    })?;
    println!("added mapping {} ({})", mapping.name, mapping.id);
    Ok(())
}

fn set_enabled(store: &MappingStore, id: &str, enabled: bool) -> Result<()> {
    let patch = MappingPatch {
        enabled: Some(enabled),
        ..Default::default()
    };
    let mapping = store.update(id, patch)?;
    println!(
        "mapping {} ({}) is now {}",
        mapping.name,
        mapping.id,
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}
