//! Destructive commands: delete a run, delete a session, clear everything.
//!
//! Each one asks for confirmation unless `--yes` was given.

use std::io::{BufRead, Write};

use anyhow::{Result, bail};

use lw_core::{KeyValueStore, RunId, SessionController, SessionId, Ticker, TimeSource};

use super::status::plural;
use super::util::confirm;

pub fn delete_run<R, W, T, K, S>(
    reader: &mut R,
    writer: &mut W,
    controller: &mut SessionController<T, K, S>,
    session: &str,
    run: &str,
    yes: bool,
) -> Result<()>
where
    R: BufRead,
    W: Write,
    T: TimeSource,
    K: Ticker,
    S: KeyValueStore,
{
    let session_id = SessionId::new(session.trim())?;
    let run_id = RunId::new(run.trim())?;

    let Some(found) = controller.history().session(&session_id) else {
        bail!("session not found: {session_id}");
    };
    let Some(target) = found.runs.iter().find(|r| r.id == run_id) else {
        bail!("run not found: {run_id} in session {session_id}");
    };
    let last_run = found.runs.len() == 1;

    let prompt = format!(
        "Delete run {run_id} ({})?{}",
        lw_core::format_seconds(target.duration_ms()),
        if last_run {
            " This also deletes its session."
        } else {
            ""
        }
    );
    if !yes && !confirm(reader, writer, &prompt)? {
        writeln!(writer, "Aborted")?;
        return Ok(());
    }

    controller.delete_run(&session_id, &run_id);
    writeln!(writer, "Deleted run {run_id}")?;
    if last_run {
        writeln!(writer, "Deleted session {session_id}")?;
    }
    Ok(())
}

pub fn delete_session<R, W, T, K, S>(
    reader: &mut R,
    writer: &mut W,
    controller: &mut SessionController<T, K, S>,
    session: &str,
    yes: bool,
) -> Result<()>
where
    R: BufRead,
    W: Write,
    T: TimeSource,
    K: Ticker,
    S: KeyValueStore,
{
    let session_id = SessionId::new(session.trim())?;
    let Some(found) = controller.history().session(&session_id) else {
        bail!("session not found: {session_id}");
    };

    let prompt = format!(
        "Delete session {session_id} with {}?",
        plural(found.runs.len(), "run")
    );
    if !yes && !confirm(reader, writer, &prompt)? {
        writeln!(writer, "Aborted")?;
        return Ok(());
    }

    controller.delete_session(&session_id);
    writeln!(writer, "Deleted session {session_id}")?;
    Ok(())
}

pub fn clear<R, W, T, K, S>(
    reader: &mut R,
    writer: &mut W,
    controller: &mut SessionController<T, K, S>,
    yes: bool,
) -> Result<()>
where
    R: BufRead,
    W: Write,
    T: TimeSource,
    K: Ticker,
    S: KeyValueStore,
{
    let history = controller.history();
    let prompt = format!(
        "Delete all recorded times ({}, {})?",
        plural(history.len(), "session"),
        plural(history.run_count(), "run")
    );
    if !yes && !confirm(reader, writer, &prompt)? {
        writeln!(writer, "Aborted")?;
        return Ok(());
    }

    controller.clear_history();
    writeln!(writer, "History cleared")?;
    Ok(())
}
