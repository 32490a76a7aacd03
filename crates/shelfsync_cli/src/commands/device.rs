//! Device id command.

use std::path::Path;

/// Runs the device-id command.
pub fn run(data_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", super::device_id(data_dir)?);
    Ok(())
}
