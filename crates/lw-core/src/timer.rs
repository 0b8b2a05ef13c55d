//! Periodic sampling capability.
//!
//! The clock never owns a thread or a callback. It asks a [`Ticker`] for a
//! registration while it runs and hands the token back when it stops; the
//! host delivers ticks by calling the controller's `tick` method.

use std::collections::BTreeMap;

/// Handle for one periodic registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TickToken(u64);

/// Schedule/cancel pair for periodic sampling.
pub trait Ticker {
    fn schedule(&mut self, period_ms: u64) -> TickToken;
    fn cancel(&mut self, token: TickToken);
}

/// A ticker whose ticks are delivered by the caller.
///
/// It only does the bookkeeping: which registrations are live and at what
/// period. Cancelling a token twice, or one it never issued, is counted as a
/// stray cancel so leaks and double-cancels show up in tests.
#[derive(Debug, Default)]
pub struct ManualTicker {
    next: u64,
    active: BTreeMap<TickToken, u64>,
    scheduled: usize,
    cancelled: usize,
    stray_cancels: usize,
}

impl ManualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, token: TickToken) -> bool {
        self.active.contains_key(&token)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Period of the oldest live registration, if any.
    pub fn active_period(&self) -> Option<u64> {
        self.active.values().next().copied()
    }

    pub const fn scheduled_count(&self) -> usize {
        self.scheduled
    }

    pub const fn cancelled_count(&self) -> usize {
        self.cancelled
    }

    pub const fn stray_cancels(&self) -> usize {
        self.stray_cancels
    }
}

impl Ticker for ManualTicker {
    fn schedule(&mut self, period_ms: u64) -> TickToken {
        self.next += 1;
        let token = TickToken(self.next);
        self.active.insert(token, period_ms);
        self.scheduled += 1;
        token
    }

    fn cancel(&mut self, token: TickToken) {
        if self.active.remove(&token).is_some() {
            self.cancelled += 1;
        } else {
            tracing::warn!(?token, "cancel for a tick registration that is not live");
            self.stray_cancels += 1;
        }
    }
}
