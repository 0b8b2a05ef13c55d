//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Stopwatch and lap timer.
///
/// Times runs of laps, groups them into sessions and keeps the history
/// between invocations. The clock keeps running between commands.
#[derive(Debug, Parser)]
#[command(name = "lw", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start or resume the clock, opening a session if none is open.
    Start,

    /// Stop the clock and record the run.
    Stop,

    /// Capture an intermediate lap while the clock runs.
    Lap,

    /// Zero a stopped clock. The session stays open.
    Reset,

    /// Close the open session and reset the clock.
    EndSession,

    /// Delete one run. A session left without runs is deleted too.
    DeleteRun {
        /// Session the run belongs to.
        session: String,

        /// Run to delete.
        run: String,

        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },

    /// Delete a session and all its runs.
    DeleteSession {
        /// Session to delete.
        session: String,

        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },

    /// Delete the whole history.
    Clear {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },

    /// Show the clock and the open session.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List recorded sessions, runs and laps.
    History {
        /// Output the stored history as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Follow the running clock on the terminal.
    Watch {
        /// Stop following after this many milliseconds.
        #[arg(long, value_name = "MS")]
        for_ms: Option<u64>,
    },
}
