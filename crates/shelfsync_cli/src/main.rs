//! Shelfsync CLI
//!
//! Command-line tools for a Shelfsync installation.
//!
//! # Commands
//!
//! - `pulse-out` - Publish local state to the shared folder
//! - `pulse-in` - Merge the shared snapshot into local state
//! - `watch` - Pulse periodically until interrupted
//! - `device-id` - Print this installation's device id
//! - `inspect` - Describe a snapshot file
//! - `dump` - Print local state as JSON
//! - `set` - Write one local entry

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Shelfsync command-line tools.
#[derive(Parser)]
#[command(name = "shelfsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Installation directory holding local state and settings
    #[arg(global = true, short, long)]
    data_dir: Option<PathBuf>,

    /// Shared folder snapshots are exchanged through
    #[arg(global = true, short, long)]
    shared: Option<PathBuf>,

    /// File name of the shared snapshot
    #[arg(global = true, long)]
    snapshot_name: Option<String>,

    /// Largest snapshot to read or publish, in bytes
    #[arg(global = true, long)]
    max_snapshot_bytes: Option<usize>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish local state to the shared folder
    PulseOut,

    /// Merge the shared snapshot into local state
    PulseIn,

    /// Pulse in then out periodically until interrupted
    Watch {
        /// Seconds between pulses
        #[arg(short, long, default_value = "60")]
        interval: u64,
    },

    /// Print this installation's device id, creating it if needed
    DeviceId,

    /// Describe a snapshot file
    Inspect {
        /// Snapshot to read (defaults to the shared snapshot)
        file: Option<PathBuf>,

        /// Also print the payload
        #[arg(short, long)]
        payload: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print local state as JSON
    Dump {
        /// Only print this key
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Write one local entry
    Set {
        /// State key, e.g. progress:b1
        key: String,

        /// Value as JSON
        value: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let sync = commands::SyncArgs {
        shared: cli.shared,
        snapshot_name: cli.snapshot_name,
        max_snapshot_bytes: cli.max_snapshot_bytes,
    };

    match cli.command {
        Commands::PulseOut => {
            let data_dir = cli.data_dir.ok_or("Data directory required for pulse-out")?;
            commands::pulse::run_out(&data_dir, &sync)?;
        }
        Commands::PulseIn => {
            let data_dir = cli.data_dir.ok_or("Data directory required for pulse-in")?;
            commands::pulse::run_in(&data_dir, &sync)?;
        }
        Commands::Watch { interval } => {
            let data_dir = cli.data_dir.ok_or("Data directory required for watch")?;
            commands::watch::run(&data_dir, &sync, interval)?;
        }
        Commands::DeviceId => {
            let data_dir = cli.data_dir.ok_or("Data directory required for device-id")?;
            commands::device::run(&data_dir)?;
        }
        Commands::Inspect {
            file,
            payload,
            format,
        } => {
            let path = match file {
                Some(file) => file,
                None => sync
                    .config()
                    .snapshot_path()
                    .ok_or("Snapshot file or --shared required for inspect")?,
            };
            commands::inspect::run(&path, payload, &format)?;
        }
        Commands::Dump { key } => {
            let data_dir = cli.data_dir.ok_or("Data directory required for dump")?;
            commands::dump::run(&data_dir, key.as_deref())?;
        }
        Commands::Set { key, value } => {
            let data_dir = cli.data_dir.ok_or("Data directory required for set")?;
            commands::set::run(&data_dir, &key, &value)?;
        }
    }

    Ok(())
}
