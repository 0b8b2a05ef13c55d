//! Elapsed-time counter and time sources.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};

use crate::timer::{TickToken, Ticker};

/// Sampling period used while the clock runs.
pub const DEFAULT_SAMPLE_PERIOD_MS: u64 = 10;

/// Wall-clock time source in epoch milliseconds.
pub trait TimeSource {
    fn now_ms(&self) -> i64;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A hand-driven clock. Clones share the same instant.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock(Arc<AtomicI64>);

impl VirtualClock {
    pub fn new(start_ms: i64) -> Self {
        Self(Arc::new(AtomicI64::new(start_ms)))
    }

    pub fn set(&self, ms: i64) {
        self.0.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: i64) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }
}

impl TimeSource for VirtualClock {
    fn now_ms(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Persistable clock state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockState {
    pub running: bool,
    /// Last sampled elapsed time; authoritative while stopped.
    pub elapsed_ms: u64,
    /// `now - elapsed` at the moment the clock was (re)started.
    pub anchor_ms: Option<i64>,
}

/// Start/stop/reset counter that samples `now - anchor` while running.
#[derive(Debug)]
pub struct ClockEngine {
    state: ClockState,
    period_ms: u64,
    tick: Option<TickToken>,
}

impl Default for ClockEngine {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_PERIOD_MS)
    }
}

impl ClockEngine {
    pub const fn new(period_ms: u64) -> Self {
        Self {
            state: ClockState {
                running: false,
                elapsed_ms: 0,
                anchor_ms: None,
            },
            period_ms,
            tick: None,
        }
    }

    /// Rebuilds an engine from saved state. A running clock has no tick
    /// registration until [`Self::resume_sampling`] is called.
    pub const fn from_state(state: ClockState, period_ms: u64) -> Self {
        Self {
            state,
            period_ms,
            tick: None,
        }
    }

    pub const fn state(&self) -> ClockState {
        self.state
    }

    pub const fn is_running(&self) -> bool {
        self.state.running
    }

    pub const fn period_ms(&self) -> u64 {
        self.period_ms
    }

    pub const fn tick_token(&self) -> Option<TickToken> {
        self.tick
    }

    /// Starts (or resumes) counting from the current elapsed value.
    pub fn start(&mut self, now_ms: i64, ticker: &mut dyn Ticker) -> bool {
        if self.state.running {
            return false;
        }
        let elapsed = i64::try_from(self.state.elapsed_ms).unwrap_or(i64::MAX);
        self.state.anchor_ms = Some(now_ms.saturating_sub(elapsed));
        self.state.running = true;
        self.tick = Some(ticker.schedule(self.period_ms));
        true
    }

    /// Registers sampling for a clock restored in the running state.
    pub fn resume_sampling(&mut self, ticker: &mut dyn Ticker) {
        if self.state.running && self.tick.is_none() {
            self.tick = Some(ticker.schedule(self.period_ms));
        }
    }

    /// Freezes the clock and returns the final elapsed value.
    pub fn stop(&mut self, now_ms: i64, ticker: &mut dyn Ticker) -> Option<u64> {
        if !self.state.running {
            return None;
        }
        self.state.elapsed_ms = self.sample(now_ms);
        self.state.running = false;
        self.release(ticker);
        Some(self.state.elapsed_ms)
    }

    /// Zeroes a stopped clock. Returns whether anything changed.
    pub fn reset(&mut self) -> bool {
        if self.state.running {
            return false;
        }
        let changed = self.state.elapsed_ms != 0 || self.state.anchor_ms.is_some();
        self.state.elapsed_ms = 0;
        self.state.anchor_ms = None;
        changed
    }

    /// Stops without recording anything and zeroes the clock.
    pub fn halt(&mut self, ticker: &mut dyn Ticker) {
        self.state.running = false;
        self.release(ticker);
        self.reset();
    }

    /// Current elapsed value without storing it.
    ///
    /// Never goes backwards while running, even if the wall clock does.
    pub fn sample(&self, now_ms: i64) -> u64 {
        match (self.state.running, self.state.anchor_ms) {
            (true, Some(anchor)) => {
                let since_anchor = u64::try_from(now_ms.saturating_sub(anchor)).unwrap_or(0);
                since_anchor.max(self.state.elapsed_ms)
            }
            _ => self.state.elapsed_ms,
        }
    }

    /// Sampling tick: refreshes the stored elapsed value.
    pub fn on_tick(&mut self, now_ms: i64) -> u64 {
        if self.state.running {
            self.state.elapsed_ms = self.sample(now_ms);
        }
        self.state.elapsed_ms
    }

    /// Hands the tick registration back, exactly once.
    pub fn release(&mut self, ticker: &mut dyn Ticker) {
        if let Some(token) = self.tick.take() {
            ticker.cancel(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ManualTicker;

    #[test]
    fn stopwatch_accumulates_across_stop_start_cycles() {
        let mut ticker = ManualTicker::new();
        let mut clock = ClockEngine::default();

        clock.start(1000, &mut ticker);
        assert_eq!(clock.sample(1500), 500);
        assert_eq!(clock.stop(2000, &mut ticker), Some(1000));
        assert_eq!(clock.sample(5000), 1000);

        clock.start(5000, &mut ticker);
        assert_eq!(clock.sample(5500), 1500);
        assert_eq!(clock.stop(6000, &mut ticker), Some(2000));

        assert!(clock.reset());
        assert_eq!(clock.sample(10_000), 0);
    }

    #[test]
    fn start_while_running_is_refused() {
        let mut ticker = ManualTicker::new();
        let mut clock = ClockEngine::default();
        assert!(clock.start(0, &mut ticker));
        assert!(!clock.start(50, &mut ticker));
        assert_eq!(ticker.scheduled_count(), 1);
    }

    #[test]
    fn stop_and_reset_respect_running_state() {
        let mut ticker = ManualTicker::new();
        let mut clock = ClockEngine::default();
        assert_eq!(clock.stop(10, &mut ticker), None);
        assert!(!clock.reset());

        clock.start(0, &mut ticker);
        assert!(!clock.reset());
        assert_eq!(clock.sample(30), 30);
    }

    #[test]
    fn sampling_is_registered_while_running_and_cancelled_once() {
        let mut ticker = ManualTicker::new();
        let mut clock = ClockEngine::new(10);

        clock.start(0, &mut ticker);
        let token = clock.tick_token().unwrap();
        assert!(ticker.is_active(token));
        assert_eq!(ticker.active_period(), Some(10));

        clock.stop(100, &mut ticker);
        clock.release(&mut ticker);
        assert_eq!(ticker.active_count(), 0);
        assert_eq!(ticker.cancelled_count(), 1);
        assert_eq!(ticker.stray_cancels(), 0);
    }

    #[test]
    fn sample_is_monotonic_when_wall_clock_steps_back() {
        let mut ticker = ManualTicker::new();
        let mut clock = ClockEngine::default();
        clock.start(1000, &mut ticker);
        assert_eq!(clock.on_tick(1800), 800);
        assert_eq!(clock.on_tick(1200), 800);
        assert_eq!(clock.sample(1900), 900);
    }

    #[test]
    fn restored_running_clock_continues_from_anchor() {
        let mut ticker = ManualTicker::new();
        let state = ClockState {
            running: true,
            elapsed_ms: 400,
            anchor_ms: Some(1000),
        };
        let mut clock = ClockEngine::from_state(state, 10);
        assert!(clock.tick_token().is_none());

        clock.resume_sampling(&mut ticker);
        clock.resume_sampling(&mut ticker);
        assert_eq!(ticker.active_count(), 1);
        assert_eq!(clock.stop(3000, &mut ticker), Some(2000));
    }

    #[test]
    fn halt_cancels_and_zeroes() {
        let mut ticker = ManualTicker::new();
        let mut clock = ClockEngine::default();
        clock.start(0, &mut ticker);
        clock.halt(&mut ticker);
        assert!(!clock.is_running());
        assert_eq!(clock.sample(500), 0);
        assert_eq!(ticker.active_count(), 0);
    }

    #[test]
    fn virtual_clock_clones_share_time() {
        let clock = VirtualClock::new(5);
        let other = clock.clone();
        clock.advance(10);
        assert_eq!(other.now_ms(), 15);
        other.set(1);
        assert_eq!(clock.now_ms(), 1);
    }
}
