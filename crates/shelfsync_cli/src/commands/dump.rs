//! Dump command implementation.

use super::open_state;
use shelfsync_storage::StateStore;
use std::path::Path;

/// Runs the dump command.
pub fn run(data_dir: &Path, key: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_state(data_dir)?;
    let json = match key {
        Some(key) => {
            let value = store
                .get(key)?
                .ok_or_else(|| format!("No entry for key {key:?}"))?;
            serde_json::to_string_pretty(&value)?
        }
        None => serde_json::to_string_pretty(&store.get_all()?)?,
    };
    println!("{json}");
    Ok(())
}
