//! The session state machine.
//!
//! Every user action goes through [`SessionController`], which reads the
//! current model and clock, applies the transition, and commits the history
//! through the persistence gateway when it changed. Actions that do not apply
//! in the current state are ignored, and degenerate captures (zero length,
//! same instant twice) are suppressed; neither is an error.

use serde::{Deserialize, Serialize};

use crate::clock::{ClockEngine, ClockState, DEFAULT_SAMPLE_PERIOD_MS, TimeSource};
use crate::model::{History, Lap, Run, RunRemoval, Session, StagingBuffer};
use crate::persist::{KeyValueStore, PersistenceGateway};
use crate::timer::Ticker;
use crate::types::{IdGenerator, LapId, RunId, SessionId, UuidIds};

/// Where the controller is in its lifecycle, derived from the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    /// Clock at zero and stopped. A session may still be open.
    Idle,
    Running,
    /// Stopped with time on the clock.
    Paused,
}

impl ControllerState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// Not valid in the current state; nothing changed.
    Ignored,
    /// Valid, but the capture was degenerate and nothing was recorded.
    Suppressed,
}

/// Clock view for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClockSnapshot {
    pub running: bool,
    pub elapsed_ms: u64,
}

/// Read-only view of everything a presentation layer needs.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot<'a> {
    pub history: &'a History,
    pub open_session_id: Option<&'a SessionId>,
    pub clock: ClockSnapshot,
    pub state: ControllerState,
    /// Laps captured in the run currently being timed, newest first.
    pub staging: &'a [Lap],
}

/// Controller state that is not part of the history.
///
/// A long-lived host never needs this. A host that restarts between actions
/// saves it after each one so a running clock and its staged laps survive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveState {
    pub open_session_id: Option<SessionId>,
    pub clock: ClockState,
    #[serde(default)]
    pub staging: StagingBuffer,
}

/// Applies user actions to the history and the clock.
pub struct SessionController<T, K: Ticker, S> {
    history: History,
    open_session: Option<SessionId>,
    staging: StagingBuffer,
    clock: ClockEngine,
    time: T,
    ticker: K,
    gateway: PersistenceGateway<S>,
    ids: Box<dyn IdGenerator>,
}

impl<T, K, S> SessionController<T, K, S>
where
    T: TimeSource,
    K: Ticker,
    S: KeyValueStore,
{
    /// Loads the history and starts in `Idle` with no session open.
    pub fn new(time: T, ticker: K, gateway: PersistenceGateway<S>) -> Self {
        Self::bootstrap(time, ticker, gateway, None)
    }

    /// Loads the history and the saved live state, if any.
    pub fn restore(time: T, ticker: K, gateway: PersistenceGateway<S>) -> Self {
        let live = gateway.load_live::<LiveState>();
        Self::bootstrap(time, ticker, gateway, live)
    }

    fn bootstrap(
        time: T,
        mut ticker: K,
        mut gateway: PersistenceGateway<S>,
        live: Option<LiveState>,
    ) -> Self {
        let mut history = gateway.load();
        let live = live.unwrap_or_default();

        let open_session = live
            .open_session_id
            .filter(|id| history.session(id).is_some());
        let (clock_state, staging) = if open_session.is_some() {
            (live.clock, live.staging)
        } else {
            (ClockState::default(), StagingBuffer::new())
        };

        let pruned = history.prune_empty(open_session.as_ref());
        if pruned > 0 {
            tracing::debug!(pruned, "dropped sessions without runs");
            gateway.save(&history);
        }

        let mut clock = ClockEngine::from_state(clock_state, DEFAULT_SAMPLE_PERIOD_MS);
        clock.resume_sampling(&mut ticker);

        Self {
            history,
            open_session,
            staging,
            clock,
            time,
            ticker,
            gateway,
            ids: Box::new(UuidIds),
        }
    }

    /// Replaces the id generator.
    #[must_use]
    pub fn with_ids(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    /// Changes the sampling period for future starts.
    #[must_use]
    pub fn with_sample_period(mut self, period_ms: u64) -> Self {
        let state = self.clock.state();
        self.clock.release(&mut self.ticker);
        self.clock = ClockEngine::from_state(state, period_ms.max(1));
        self.clock.resume_sampling(&mut self.ticker);
        self
    }

    pub const fn history(&self) -> &History {
        &self.history
    }

    pub const fn open_session_id(&self) -> Option<&SessionId> {
        self.open_session.as_ref()
    }

    pub fn staged_laps(&self) -> &[Lap] {
        self.staging.laps()
    }

    pub const fn clock_state(&self) -> ClockState {
        self.clock.state()
    }

    pub const fn ticker(&self) -> &K {
        &self.ticker
    }

    pub const fn gateway(&self) -> &PersistenceGateway<S> {
        &self.gateway
    }

    pub fn state(&self) -> ControllerState {
        if self.clock.is_running() {
            ControllerState::Running
        } else if self.clock.sample(self.time.now_ms()) > 0 {
            ControllerState::Paused
        } else {
            ControllerState::Idle
        }
    }

    /// Current elapsed value.
    pub fn elapsed_ms(&self) -> u64 {
        self.clock.sample(self.time.now_ms())
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        let elapsed_ms = self.elapsed_ms();
        Snapshot {
            history: &self.history,
            open_session_id: self.open_session.as_ref(),
            clock: ClockSnapshot {
                running: self.clock.is_running(),
                elapsed_ms,
            },
            state: self.state(),
            staging: self.staging.laps(),
        }
    }

    pub fn live_state(&self) -> LiveState {
        LiveState {
            open_session_id: self.open_session.clone(),
            clock: self.clock.state(),
            staging: self.staging.clone(),
        }
    }

    /// Saves [`LiveState`] under the gateway's live key.
    pub fn persist_live(&mut self) -> bool {
        let live = self.live_state();
        self.gateway.save_live(&live)
    }

    /// Periodic sampling callback.
    pub fn tick(&mut self) -> u64 {
        let elapsed = self.clock.on_tick(self.time.now_ms());
        tracing::trace!(elapsed, "tick");
        elapsed
    }

    /// Releases the tick registration. Call when the host goes away.
    pub fn shutdown(&mut self) {
        self.clock.release(&mut self.ticker);
    }

    pub fn start(&mut self) -> Outcome {
        if self.clock.is_running() {
            tracing::debug!("start ignored: already running");
            return Outcome::Ignored;
        }
        let now = self.time.now_ms();

        if self.open_session.is_none() {
            let session = Session::new(SessionId::generate(self.ids.as_mut()), now);
            tracing::debug!(session = %session.id, "opened session");
            self.open_session = Some(session.id.clone());
            self.history.prepend(session);
            self.commit();
        }

        self.clock.start(now, &mut self.ticker);
        tracing::debug!(elapsed = self.clock.state().elapsed_ms, "clock started");
        Outcome::Applied
    }

    pub fn lap(&mut self) -> Outcome {
        if !self.clock.is_running() {
            tracing::debug!("lap ignored: clock not running");
            return Outcome::Ignored;
        }
        let now = self.time.now_ms();
        let duration = self.clock.on_tick(now);

        if duration == 0 {
            tracing::debug!("lap suppressed: zero duration");
            return Outcome::Suppressed;
        }
        if self.last_capture_ms() == Some(duration) {
            tracing::debug!(duration, "lap suppressed: same as previous capture");
            return Outcome::Suppressed;
        }

        let label = self.staging.next_label();
        let id = LapId::generate(self.ids.as_mut());
        self.staging.append(id, now, duration, label);
        tracing::debug!(duration, staged = self.staging.laps().len(), "lap captured");
        Outcome::Applied
    }

    pub fn stop(&mut self) -> Outcome {
        let Some(session) = self
            .open_session
            .as_ref()
            .and_then(|id| self.history.session_mut(id))
        else {
            tracing::debug!("stop ignored: no open session");
            return Outcome::Ignored;
        };
        let now = self.time.now_ms();
        let Some(duration) = self.clock.stop(now, &mut self.ticker) else {
            tracing::debug!("stop ignored: clock not running");
            return Outcome::Ignored;
        };

        if duration == 0 {
            self.staging.clear();
            tracing::debug!("stop suppressed: zero duration");
            return Outcome::Suppressed;
        }

        // A staged lap at this duration is folded into the terminal lap by `seal`.
        let repeats_last_run = self.staging.is_empty()
            && session.newest_run().map(Run::duration_ms) == Some(duration);
        if repeats_last_run {
            tracing::debug!(duration, "stop suppressed: same as previous run");
            return Outcome::Suppressed;
        }

        let run_id = RunId::generate(self.ids.as_mut());
        let lap_id = LapId::generate(self.ids.as_mut());
        let run = self.staging.seal(run_id, lap_id, now, duration);
        tracing::debug!(
            session = %session.id,
            run = %run.id,
            duration,
            laps = run.laps.len(),
            "run recorded"
        );
        session.runs.insert(0, run);
        self.commit();
        Outcome::Applied
    }

    pub fn reset(&mut self) -> Outcome {
        if self.clock.is_running() {
            tracing::debug!("reset ignored: clock running");
            return Outcome::Ignored;
        }
        let changed = self.clock.reset() | !self.staging.is_empty();
        self.staging.clear();
        if changed {
            tracing::debug!("clock reset");
            Outcome::Applied
        } else {
            Outcome::Ignored
        }
    }

    /// Closes the open session and resets the clock.
    ///
    /// A session closed before any run completed is removed.
    pub fn end_session(&mut self) -> Outcome {
        let Some(id) = self.open_session.take() else {
            tracing::debug!("end session ignored: no open session");
            return Outcome::Ignored;
        };
        self.force_idle();
        if self.history.session(&id).is_some_and(|s| s.runs.is_empty()) {
            self.history.remove_session(&id);
            self.commit();
        }
        tracing::debug!(session = %id, "session ended");
        Outcome::Applied
    }

    pub fn delete_run(&mut self, session_id: &SessionId, run_id: &RunId) -> Outcome {
        match self.history.remove_run(session_id, run_id) {
            RunRemoval::NotFound => {
                tracing::debug!(
                    session = %session_id,
                    run = %run_id,
                    "delete run ignored: not found"
                );
                return Outcome::Ignored;
            }
            RunRemoval::Removed => {
                tracing::debug!(session = %session_id, run = %run_id, "run deleted");
            }
            RunRemoval::SessionRemoved => {
                tracing::debug!(
                    session = %session_id,
                    run = %run_id,
                    "last run deleted; session removed"
                );
                self.close_if_open(session_id);
            }
        }
        self.commit();
        Outcome::Applied
    }

    pub fn delete_session(&mut self, session_id: &SessionId) -> Outcome {
        if self.history.remove_session(session_id).is_none() {
            tracing::debug!(session = %session_id, "delete session ignored: not found");
            return Outcome::Ignored;
        }
        tracing::debug!(session = %session_id, "session deleted");
        self.close_if_open(session_id);
        self.commit();
        Outcome::Applied
    }

    /// Empties the history and discards anything in progress.
    pub fn clear_history(&mut self) -> Outcome {
        self.history.clear();
        self.open_session = None;
        self.force_idle();
        tracing::debug!("history cleared");
        self.commit();
        Outcome::Applied
    }

    fn open_session(&self) -> Option<&Session> {
        self.open_session
            .as_ref()
            .and_then(|id| self.history.session(id))
    }

    /// Duration of the most recent capture in the current session.
    fn last_capture_ms(&self) -> Option<u64> {
        self.staging.newest().map(|lap| lap.duration).or_else(|| {
            self.open_session()
                .and_then(Session::newest_run)
                .map(Run::duration_ms)
        })
    }

    fn close_if_open(&mut self, session_id: &SessionId) {
        if self.open_session.as_ref() == Some(session_id) {
            self.open_session = None;
            self.force_idle();
        }
    }

    fn force_idle(&mut self) {
        self.clock.halt(&mut self.ticker);
        self.staging.clear();
    }

    fn commit(&mut self) {
        self.gateway.save(&self.history);
    }
}

impl<T, K: Ticker, S> Drop for SessionController<T, K, S> {
    fn drop(&mut self) {
        self.clock.release(&mut self.ticker);
    }
}
