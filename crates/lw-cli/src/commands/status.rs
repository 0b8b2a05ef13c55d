//! Status command for showing the clock and the open session.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use lw_core::{
    ControllerState, KeyValueStore, Lap, SessionController, SessionId, Ticker, TimeSource,
    format_clock,
};

/// Machine-readable status.
#[derive(Debug, Serialize)]
pub struct StatusView<'a> {
    pub state: ControllerState,
    pub running: bool,
    pub elapsed_ms: u64,
    pub open_session_id: Option<&'a SessionId>,
    pub open_session_runs: usize,
    pub staged_laps: &'a [Lap],
    pub sessions: usize,
    pub runs: usize,
    pub laps: usize,
}

pub fn run<W, T, K, S>(
    writer: &mut W,
    controller: &SessionController<T, K, S>,
    json: bool,
) -> Result<()>
where
    W: Write,
    T: TimeSource,
    K: Ticker,
    S: KeyValueStore,
{
    let snapshot = controller.snapshot();
    let open_session_runs = snapshot
        .open_session_id
        .and_then(|id| snapshot.history.session(id))
        .map_or(0, |s| s.runs.len());
    let view = StatusView {
        state: snapshot.state,
        running: snapshot.clock.running,
        elapsed_ms: snapshot.clock.elapsed_ms,
        open_session_id: snapshot.open_session_id,
        open_session_runs,
        staged_laps: snapshot.staging,
        sessions: snapshot.history.len(),
        runs: snapshot.history.run_count(),
        laps: snapshot.history.lap_count(),
    };

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&view)?)?;
        return Ok(());
    }

    writeln!(writer, "State:    {}", view.state)?;
    writeln!(writer, "Clock:    {}", format_clock(view.elapsed_ms))?;
    match view.open_session_id {
        Some(id) => writeln!(writer, "Session:  {id} ({})", plural(open_session_runs, "run"))?,
        None => writeln!(writer, "Session:  none")?,
    }
    for lap in view.staged_laps {
        writeln!(writer, "  {:<8}{}", lap.label, format_clock(lap.duration))?;
    }
    writeln!(
        writer,
        "History:  {}, {}, {}",
        plural(view.sessions, "session"),
        plural(view.runs, "run"),
        plural(view.laps, "lap")
    )?;

    Ok(())
}

pub(crate) fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;
    use lw_core::{ManualTicker, MemoryStore, PersistenceGateway, SequentialIds, VirtualClock};

    fn controller() -> (
        SessionController<VirtualClock, ManualTicker, MemoryStore>,
        VirtualClock,
    ) {
        let clock = VirtualClock::new(0);
        let controller = SessionController::new(
            clock.clone(),
            ManualTicker::new(),
            PersistenceGateway::new(MemoryStore::new()),
        )
        .with_ids(SequentialIds::new("t"));
        (controller, clock)
    }

    #[test]
    fn status_when_nothing_recorded() {
        let (c, _clock) = controller();
        let mut out = Vec::new();
        run(&mut out, &c, false).unwrap();

        assert_snapshot!(String::from_utf8(out).unwrap(), @r"
        State:    idle
        Clock:    00:00.00
        Session:  none
        History:  0 sessions, 0 runs, 0 laps
        ");
    }

    #[test]
    fn status_lists_staged_laps_while_running() {
        let (mut c, clock) = controller();
        c.start();
        clock.set(900);
        c.stop();
        c.start();
        clock.set(1300);
        c.lap();
        clock.set(2050);
        c.lap();
        clock.set(2500);

        let mut out = Vec::new();
        run(&mut out, &c, false).unwrap();

        assert_snapshot!(String::from_utf8(out).unwrap(), @r"
        State:    running
        Clock:    00:02.50
        Session:  t-1 (1 run)
          Lap 2   00:02.05
          Lap 1   00:01.30
        History:  1 session, 1 run, 1 lap
        ");
    }

    #[test]
    fn status_json_reports_clock_and_session() {
        let (mut c, clock) = controller();
        c.start();
        clock.set(700);
        c.stop();

        let mut out = Vec::new();
        run(&mut out, &c, true).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["state"], "paused");
        assert_eq!(value["running"], false);
        assert_eq!(value["elapsed_ms"], 700);
        assert_eq!(value["open_session_id"], "t-1");
        assert_eq!(value["open_session_runs"], 1);
        assert_eq!(value["staged_laps"], serde_json::json!([]));
        assert_eq!(value["runs"], 1);
        assert_eq!(value["laps"], 1);
    }
}
