//! Shared utilities for CLI commands.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};

/// Asks a yes/no question; anything but `y`/`yes` is a no.
pub fn confirm<R: BufRead, W: Write>(reader: &mut R, writer: &mut W, prompt: &str) -> Result<bool> {
    write!(writer, "{prompt} [y/N] ")?;
    writer.flush()?;

    let mut answer = String::new();
    reader
        .read_line(&mut answer)
        .context("failed to read confirmation")?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Converts epoch milliseconds into the given zone.
pub fn to_zone<Tz: TimeZone>(tz: &Tz, epoch_ms: i64) -> Option<DateTime<Tz>> {
    tz.timestamp_millis_opt(epoch_ms).single()
}
