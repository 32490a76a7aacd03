//! One-shot pulse commands.

use super::{open_engine, SyncArgs};
use shelfsync_engine::{PulseInOutcome, PulseOutOutcome};
use std::path::Path;

/// Runs the pulse-out command.
pub fn run_out(data_dir: &Path, sync: &SyncArgs) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine(data_dir, sync)?;
    match engine.pulse_out()? {
        PulseOutOutcome::Disabled => println!("Sync is disabled"),
        PulseOutOutcome::Unavailable => println!("No shared folder available; nothing published"),
        PulseOutOutcome::Published { keys, bytes } => {
            println!("Published {} entries ({} bytes) as {}", keys, bytes, engine.device_id());
        }
    }
    Ok(())
}

/// Runs the pulse-in command.
pub fn run_in(data_dir: &Path, sync: &SyncArgs) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine(data_dir, sync)?;
    let outcome = engine.pulse_in()?;
    println!("{}", describe_in(&outcome));
    Ok(())
}

/// One-line description of an import outcome.
pub fn describe_in(outcome: &PulseInOutcome) -> String {
    match outcome {
        PulseInOutcome::Disabled => "Sync is disabled".to_string(),
        PulseInOutcome::Unavailable => "No shared folder available".to_string(),
        PulseInOutcome::NothingToImport => "No shared snapshot yet".to_string(),
        PulseInOutcome::Undecodable => "Shared snapshot is unreadable; ignored".to_string(),
        PulseInOutcome::SelfEcho => "Shared snapshot is our own; ignored".to_string(),
        PulseInOutcome::EmptyPayload => "Shared snapshot is empty; ignored".to_string(),
        PulseInOutcome::Merged(report) => {
            let mut line = format!(
                "Merged: {} changed, {} kept local",
                report.changed(),
                report.kept_local
            );
            if !report.shape_fallbacks.is_empty() {
                line.push_str(&format!(
                    ", {} with unexpected shape ({})",
                    report.shape_fallbacks.len(),
                    report.shape_fallbacks.join(", ")
                ));
            }
            line
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{open_state, set};
    use shelfsync_protocol::MergeReport;
    use shelfsync_storage::StateStore;

    #[test]
    fn merged_description_lists_fallbacks() {
        let report = MergeReport {
            combined: 2,
            kept_local: 3,
            shape_fallbacks: vec!["completedBooks".into()],
            ..MergeReport::default()
        };
        let line = describe_in(&PulseInOutcome::Merged(report));
        assert_eq!(
            line,
            "Merged: 3 changed, 3 kept local, 1 with unexpected shape (completedBooks)"
        );
    }

    #[test]
    fn pulse_roundtrip_between_installations() {
        let root = tempfile::tempdir().unwrap();
        let shared = root.path().join("shared");
        std::fs::create_dir(&shared).unwrap();
        let sync = SyncArgs {
            shared: Some(shared),
            ..SyncArgs::default()
        };

        set::run(&root.path().join("b"), "completedBooks", r#"["b2"]"#).unwrap();
        run_out(&root.path().join("b"), &sync).unwrap();
        run_in(&root.path().join("a"), &sync).unwrap();

        let state = open_state(&root.path().join("a")).unwrap();
        assert!(state.get("completedBooks").unwrap().is_some());
    }
}
