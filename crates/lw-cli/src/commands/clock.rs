//! Clock commands: start, stop, lap, reset and end-session.

use std::io::Write;

use anyhow::Result;

use lw_core::{
    ControllerState, KeyValueStore, Outcome, SessionController, Ticker, TimeSource, format_clock,
};

/// A clock action from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockAction {
    Start,
    Stop,
    Lap,
    Reset,
    EndSession,
}

/// Applies the action and reports what happened.
pub fn run<W, T, K, S>(
    writer: &mut W,
    controller: &mut SessionController<T, K, S>,
    action: ClockAction,
) -> Result<Outcome>
where
    W: Write,
    T: TimeSource,
    K: Ticker,
    S: KeyValueStore,
{
    let state_before = controller.state();
    let outcome = match action {
        ClockAction::Start => controller.start(),
        ClockAction::Stop => controller.stop(),
        ClockAction::Lap => controller.lap(),
        ClockAction::Reset => controller.reset(),
        ClockAction::EndSession => controller.end_session(),
    };
    let clock = format_clock(controller.elapsed_ms());

    match (action, outcome) {
        (ClockAction::Start, Outcome::Applied) => {
            let session = controller
                .open_session_id()
                .map_or_else(String::new, ToString::to_string);
            if state_before == ControllerState::Paused {
                writeln!(writer, "Resumed at {clock} (session {session})")?;
            } else {
                writeln!(writer, "Started (session {session})")?;
            }
        }
        (ClockAction::Start, _) => writeln!(writer, "Already running: {clock}")?,
        (ClockAction::Lap, Outcome::Applied) => {
            if let Some(lap) = controller.staged_laps().first() {
                writeln!(writer, "{}  {}", lap.label, format_clock(lap.duration))?;
            }
        }
        (ClockAction::Lap, Outcome::Suppressed) => {
            writeln!(writer, "Lap not recorded: same time as the previous capture ({clock})")?;
        }
        (ClockAction::Stop, Outcome::Applied) => {
            let laps = controller
                .open_session_id()
                .and_then(|id| controller.history().session(id))
                .and_then(|s| s.newest_run())
                .map_or(0, |run| run.laps.len());
            let plural = if laps == 1 { "" } else { "s" };
            writeln!(writer, "Stopped at {clock}. Run recorded ({laps} lap{plural})")?;
        }
        (ClockAction::Stop, Outcome::Suppressed) => {
            writeln!(writer, "Stopped at {clock}. Nothing recorded")?;
        }
        (ClockAction::Lap | ClockAction::Stop, _) => writeln!(writer, "Clock is not running")?,
        (ClockAction::Reset, Outcome::Applied) => writeln!(writer, "Clock reset")?,
        (ClockAction::Reset, _) if state_before == ControllerState::Running => {
            writeln!(writer, "Stop the clock before resetting ({clock})")?;
        }
        (ClockAction::Reset, _) => writeln!(writer, "Nothing to reset")?,
        (ClockAction::EndSession, Outcome::Applied) => writeln!(writer, "Session ended")?,
        (ClockAction::EndSession, _) => writeln!(writer, "No open session")?,
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;
    use lw_core::{ManualTicker, MemoryStore, PersistenceGateway, SequentialIds, VirtualClock};

    type TestController = SessionController<VirtualClock, ManualTicker, MemoryStore>;

    fn controller() -> (TestController, VirtualClock) {
        let clock = VirtualClock::new(0);
        let controller = SessionController::new(
            clock.clone(),
            ManualTicker::new(),
            PersistenceGateway::new(MemoryStore::new()),
        )
        .with_ids(SequentialIds::new("t"));
        (controller, clock)
    }

    fn exec(controller: &mut TestController, action: ClockAction, out: &mut Vec<u8>) -> Outcome {
        run(out, controller, action).unwrap()
    }

    #[test]
    fn full_run_transcript() {
        let (mut c, clock) = controller();
        let mut out = Vec::new();

        exec(&mut c, ClockAction::Start, &mut out);
        clock.set(1500);
        exec(&mut c, ClockAction::Lap, &mut out);
        exec(&mut c, ClockAction::Lap, &mut out);
        clock.set(2300);
        exec(&mut c, ClockAction::Stop, &mut out);
        exec(&mut c, ClockAction::Stop, &mut out);
        clock.set(4000);
        exec(&mut c, ClockAction::Start, &mut out);
        exec(&mut c, ClockAction::Reset, &mut out);
        clock.set(4500);
        exec(&mut c, ClockAction::Stop, &mut out);
        exec(&mut c, ClockAction::Reset, &mut out);
        exec(&mut c, ClockAction::Reset, &mut out);
        exec(&mut c, ClockAction::EndSession, &mut out);
        exec(&mut c, ClockAction::EndSession, &mut out);

        assert_snapshot!(String::from_utf8(out).unwrap(), @r"
        Started (session t-1)
        Lap 1  00:01.50
        Lap not recorded: same time as the previous capture (00:01.50)
        Stopped at 00:02.30. Run recorded (2 laps)
        Clock is not running
        Resumed at 00:02.30 (session t-1)
        Stop the clock before resetting (00:02.30)
        Stopped at 00:02.80. Run recorded (1 lap)
        Clock reset
        Nothing to reset
        Session ended
        No open session
        ");
    }

    #[test]
    fn immediate_stop_reports_nothing_recorded() {
        let (mut c, _clock) = controller();
        let mut out = Vec::new();

        exec(&mut c, ClockAction::Start, &mut out);
        let outcome = exec(&mut c, ClockAction::Stop, &mut out);

        assert_eq!(outcome, Outcome::Suppressed);
        assert!(
            String::from_utf8(out)
                .unwrap()
                .ends_with("Stopped at 00:00.00. Nothing recorded\n")
        );
    }
}
