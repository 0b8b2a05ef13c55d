//! History command for listing sessions, runs and laps.

use std::fmt::{self, Write as _};
use std::io::Write;

use anyhow::Result;
use chrono::{Local, TimeZone};

use lw_core::{History, RunKind, format_seconds};

use super::status::plural;
use super::util::to_zone;

pub fn run<W: Write>(writer: &mut W, history: &History, json: bool) -> Result<()> {
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(history)?)?;
    } else {
        write!(writer, "{}", format_history(history, &Local))?;
    }
    Ok(())
}

/// Human-readable listing, newest session first.
pub fn format_history<Tz>(history: &History, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut output = String::new();

    if history.is_empty() {
        writeln!(output, "No recorded times.").unwrap();
        return output;
    }

    for session in history.sessions() {
        let opened = to_zone(tz, session.timestamp)
            .map_or_else(|| "?".to_string(), |dt| dt.format("%Y-%m-%d %H:%M").to_string());
        writeln!(
            output,
            "Session {}  {}  {}, total {}",
            session.id,
            opened,
            plural(session.runs.len(), "run"),
            format_seconds(session.total_ms())
        )
        .unwrap();

        for run in &session.runs {
            let at = to_zone(tz, run.timestamp)
                .map_or_else(|| "?".to_string(), |dt| dt.format("%H:%M:%S").to_string());
            let kind = match run.kind() {
                RunKind::Single => "single",
                RunKind::Series => "series",
            };
            writeln!(output, "  Run {}  {}  {}", run.id, at, kind).unwrap();
            for lap in &run.laps {
                writeln!(
                    output,
                    "    {:<8}{:>10}",
                    lap.label,
                    format_seconds(lap.duration)
                )
                .unwrap();
            }
        }
    }

    output
}
