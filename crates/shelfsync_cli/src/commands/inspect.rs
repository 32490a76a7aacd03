//! Inspect command implementation.

use serde::Serialize;
use shelfsync_codec::ValueMap;
use shelfsync_protocol::{Snapshot, StateKey};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Snapshot inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Snapshot path.
    pub path: String,
    /// File size in bytes.
    pub size: usize,
    /// Format version.
    pub version: u32,
    /// Device that wrote the snapshot.
    pub origin_device_id: String,
    /// Export time as written.
    pub timestamp: String,
    /// Number of entries.
    pub entry_count: usize,
    /// Entry count per key kind.
    pub kinds: BTreeMap<String, usize>,
    /// The entries (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<ValueMap>,
}

/// Runs the inspect command.
pub fn run(path: &Path, show_payload: bool, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = fs::read(path).map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
    let result = inspect(path, &bytes, show_payload)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text(&result)?,
    }
    Ok(())
}

/// Decodes `bytes` and summarizes the snapshot.
pub fn inspect(
    path: &Path,
    bytes: &[u8],
    show_payload: bool,
) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let snapshot = Snapshot::decode(bytes)?;

    let mut kinds = BTreeMap::new();
    for key in snapshot.payload.keys() {
        *kinds
            .entry(StateKey::parse(key).kind.to_string())
            .or_insert(0) += 1;
    }

    Ok(InspectResult {
        path: path.display().to_string(),
        size: bytes.len(),
        version: snapshot.format_version,
        origin_device_id: snapshot.origin_device_id.to_string(),
        timestamp: snapshot.timestamp,
        entry_count: snapshot.payload.len(),
        kinds,
        payload: show_payload.then_some(snapshot.payload),
    })
}

fn print_text(result: &InspectResult) -> Result<(), Box<dyn std::error::Error>> {
    println!("Snapshot: {}", result.path);
    println!("  Size:      {} bytes", result.size);
    println!("  Version:   {}", result.version);
    println!("  Origin:    {}", result.origin_device_id);
    println!("  Exported:  {}", result.timestamp);
    println!("  Entries:   {}", result.entry_count);
    for (kind, count) in &result.kinds {
        println!("    {:<16} {}", kind, count);
    }
    if let Some(payload) = &result.payload {
        println!("{}", serde_json::to_string_pretty(payload)?);
    }
    Ok(())
}
