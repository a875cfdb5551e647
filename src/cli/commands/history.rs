use anyhow::Result;
use chrono::SecondsFormat;

use crate::config::model::GlobalConfig;
use crate::store::history::HistoryStore;

pub fn show(config: GlobalConfig, mapping: Option<&str>, limit: usize) -> Result<()> {
    let store = HistoryStore::new(config.history_path());
    let entries = store.query(mapping, Some(limit))?;
    if entries.is_empty() {
        println!("no history entries");
        return Ok(());
    }
    for entry in entries {
        println!(
            "{}  {}  {}  {} file(s)",
            entry.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            entry.mapping_name,
            entry.commit_id,
            entry.files_changed
        );
        println!("  {}", entry.commit_message);
        if let Some(url) = &entry.commit_url {
            println!("  {}", url);
        }
    }
    Ok(())
}
