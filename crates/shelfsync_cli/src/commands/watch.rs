//! Periodic pulse command.

use super::{open_engine, SyncArgs};
use shelfsync_engine::spawn_periodic;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Runs the watch command until Ctrl-C.
pub fn run(
    data_dir: &Path,
    sync: &SyncArgs,
    interval_secs: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = Arc::new(open_engine(data_dir, sync)?);
    let interval = Duration::from_secs(interval_secs.max(1));

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        info!(device_id = %engine.device_id(), ?interval, "watching shared folder");
        let handle = spawn_periodic(Arc::clone(&engine), interval);
        let stopped = tokio::signal::ctrl_c().await;
        handle.abort();
        stopped
    })?;

    let stats = engine.stats();
    println!(
        "Stopped: {} published, {} merged, {} skipped, {} unreadable, {} failed",
        stats.pulses_out, stats.merges, stats.skipped, stats.decode_failures, stats.failures
    );
    Ok(())
}
