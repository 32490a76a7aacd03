//! Periodic pulse scheduling on the tokio runtime.

use crate::engine::{PulseInOutcome, PulseOutOutcome, SyncEngine};
use crate::error::SyncResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Outcomes of one import-then-export cycle.
#[derive(Debug)]
pub struct PulseCycle {
    /// Result of the import.
    pub pulse_in: SyncResult<PulseInOutcome>,
    /// Result of the export.
    pub pulse_out: SyncResult<PulseOutOutcome>,
}

/// Runs one cycle: import the peer's snapshot, then publish ours.
///
/// Importing first means the published snapshot already includes whatever
/// the peer contributed.
pub fn run_cycle(engine: &SyncEngine) -> PulseCycle {
    let pulse_in = engine.pulse_in();
    let pulse_out = engine.pulse_out();
    PulseCycle {
        pulse_in,
        pulse_out,
    }
}

/// Spawns a task that runs [`run_cycle`] every `interval`, the first one
/// immediately.
///
/// Pulses run on the blocking pool. Errors are logged by the engine and do
/// not stop the schedule; abort the returned handle to stop it.
pub fn spawn_periodic(engine: Arc<SyncEngine>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let engine = Arc::clone(&engine);
            match tokio::task::spawn_blocking(move || run_cycle(&engine)).await {
                Ok(cycle) => debug!(?cycle, "pulse cycle finished"),
                Err(e) => warn!(error = %e, "pulse cycle panicked"),
            }
        }
    })
}
