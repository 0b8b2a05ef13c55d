//! Watch command: follow the running clock until interrupted.

use std::io::Write;
use std::time::Duration;

use anyhow::Result;

use lw_core::{KeyValueStore, ManualTicker, SessionController, TimeSource, format_clock};

/// Ticks the controller at its sampling period and redraws the clock in place.
///
/// Stops after `for_ms` of wall time when given. Redraws only when the
/// displayed centiseconds change.
pub fn run<W, T, S, F>(
    writer: &mut W,
    controller: &mut SessionController<T, ManualTicker, S>,
    for_ms: Option<u64>,
    mut sleep: F,
) -> Result<()>
where
    W: Write,
    T: TimeSource,
    S: KeyValueStore,
    F: FnMut(Duration),
{
    if controller.ticker().active_count() == 0 {
        writeln!(writer, "{}  (not running)", format_clock(controller.elapsed_ms()))?;
        return Ok(());
    }

    let mut shown = String::new();
    let mut waited = 0;
    while let Some(period) = controller.ticker().active_period() {
        if for_ms.is_some_and(|limit| waited >= limit) {
            break;
        }
        sleep(Duration::from_millis(period));
        waited += period;

        let text = format_clock(controller.tick());
        if text != shown {
            write!(writer, "\r{text}")?;
            writer.flush()?;
            shown = text;
        }
    }
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use lw_core::{MemoryStore, PersistenceGateway, VirtualClock};

    fn controller(
        clock: &VirtualClock,
    ) -> SessionController<VirtualClock, ManualTicker, MemoryStore> {
        SessionController::new(
            clock.clone(),
            ManualTicker::new(),
            PersistenceGateway::new(MemoryStore::new()),
        )
    }

    #[test]
    fn watch_redraws_each_tick_until_limit() {
        let clock = VirtualClock::new(0);
        let mut c = controller(&clock).with_sample_period(20);
        c.start();

        let mut out = Vec::new();
        run(&mut out, &mut c, Some(60), |d| {
            clock.advance(i64::try_from(d.as_millis()).unwrap());
        })
        .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\r00:00.02\r00:00.04\r00:00.06\n"
        );
        assert_eq!(c.clock_state().elapsed_ms, 60);
    }

    #[test]
    fn watch_skips_unchanged_readings() {
        let clock = VirtualClock::new(0);
        let mut c = controller(&clock).with_sample_period(5);
        c.start();

        let mut out = Vec::new();
        run(&mut out, &mut c, Some(20), |d| {
            clock.advance(i64::try_from(d.as_millis()).unwrap());
        })
        .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "\r00:00.00\r00:00.01\r00:00.02\n");
    }

    #[test]
    fn watch_on_stopped_clock_prints_once() {
        let clock = VirtualClock::new(0);
        let mut c = controller(&clock);
        c.start();
        clock.set(1250);
        c.stop();

        let mut out = Vec::new();
        run(&mut out, &mut c, None, |_| unreachable!("no sleeping when stopped")).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "00:01.25  (not running)\n");
    }
}
