//! Laps, runs, sessions and the history that holds them.
//!
//! Every sequence in this module is stored newest-first: new entries are
//! prepended and array position is the order of record. Timestamps are kept
//! for display only and never used to reorder anything.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{LapId, RunId, SessionId, ValidationError};

/// Label reserved for the lap captured when a run is stopped.
pub const END_OF_RUN_LABEL: &str = "End";

/// Label for the `n`th intermediate lap of a run, counted from run start.
pub fn intermediate_label(n: usize) -> String {
    format!("Lap {n}")
}

/// A single captured time point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lap {
    pub id: LapId,
    /// Wall-clock capture time, epoch milliseconds.
    pub timestamp: i64,
    /// Clock value when captured (not a delta from the previous lap).
    pub duration: u64,
    pub label: String,
}

impl Lap {
    pub fn is_terminal(&self) -> bool {
        self.label == END_OF_RUN_LABEL
    }
}

/// Whether a run holds just its terminal lap or intermediate laps too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Single,
    Series,
}

/// One continuous start-to-stop interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub timestamp: i64,
    /// Newest first; the first entry is the terminal lap.
    pub laps: Vec<Lap>,
}

impl Run {
    /// The lap captured at stop time.
    pub fn terminal(&self) -> Option<&Lap> {
        self.laps.first().filter(|lap| lap.is_terminal())
    }

    /// Total duration of the run, i.e. the terminal capture.
    pub fn duration_ms(&self) -> u64 {
        self.terminal().map_or(0, |lap| lap.duration)
    }

    pub const fn kind(&self) -> RunKind {
        if self.laps.len() > 1 {
            RunKind::Series
        } else {
            RunKind::Single
        }
    }
}

/// A user-delimited container of runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub timestamp: i64,
    /// Newest first.
    pub runs: Vec<Run>,
}

impl Session {
    pub const fn new(id: SessionId, timestamp: i64) -> Self {
        Self {
            id,
            timestamp,
            runs: Vec::new(),
        }
    }

    /// Sum of the terminal durations of all runs.
    pub fn total_ms(&self) -> u64 {
        self.runs.iter().map(Run::duration_ms).sum()
    }

    pub fn newest_run(&self) -> Option<&Run> {
        self.runs.first()
    }
}

/// Result of removing a run from the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunRemoval {
    /// No such session or run.
    NotFound,
    /// The run was removed and its session still has runs.
    Removed,
    /// The run was the session's last, so the session went too.
    SessionRemoved,
}

/// All sessions, newest first. This is the persisted aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    sessions: Vec<Session>,
}

impl History {
    pub const fn new() -> Self {
        Self {
            sessions: Vec::new(),
        }
    }

    pub fn from_sessions(sessions: Vec<Session>) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub const fn len(&self) -> usize {
        self.sessions.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn session(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| &s.id == id)
    }

    pub fn session_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| &s.id == id)
    }

    /// Adds a session as the newest entry.
    pub fn prepend(&mut self, session: Session) {
        self.sessions.insert(0, session);
    }

    pub fn remove_session(&mut self, id: &SessionId) -> Option<Session> {
        let index = self.sessions.iter().position(|s| &s.id == id)?;
        Some(self.sessions.remove(index))
    }

    /// Removes a run, cascading to its session when it was the last one.
    pub fn remove_run(&mut self, session_id: &SessionId, run_id: &RunId) -> RunRemoval {
        let Some(session) = self.session_mut(session_id) else {
            return RunRemoval::NotFound;
        };
        let Some(index) = session.runs.iter().position(|r| &r.id == run_id) else {
            return RunRemoval::NotFound;
        };
        session.runs.remove(index);
        if session.runs.is_empty() {
            self.remove_session(session_id);
            RunRemoval::SessionRemoved
        } else {
            RunRemoval::Removed
        }
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    /// Drops sessions without runs, except `keep`. Returns how many were dropped.
    pub fn prune_empty(&mut self, keep: Option<&SessionId>) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|s| !s.runs.is_empty() || Some(&s.id) == keep);
        before - self.sessions.len()
    }

    pub fn run_count(&self) -> usize {
        self.sessions.iter().map(|s| s.runs.len()).sum()
    }

    pub fn lap_count(&self) -> usize {
        self.sessions
            .iter()
            .flat_map(|s| &s.runs)
            .map(|r| r.laps.len())
            .sum()
    }

    /// Checks the structural invariants a freshly loaded history must hold.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        let mut check = |id: &str| {
            if seen.insert(id.to_string()) {
                Ok(())
            } else {
                Err(ValidationError::DuplicateId { id: id.to_string() })
            }
        };

        for session in &self.sessions {
            check(session.id.as_str())?;
            for run in &session.runs {
                check(run.id.as_str())?;
                if run.laps.is_empty() {
                    return Err(ValidationError::EmptyRun {
                        run: run.id.to_string(),
                    });
                }
                if run.terminal().is_none() {
                    return Err(ValidationError::MissingTerminalLap {
                        run: run.id.to_string(),
                    });
                }
                for lap in &run.laps {
                    check(lap.id.as_str())?;
                }
            }
        }
        Ok(())
    }
}

/// Laps captured while the clock is running, not yet part of any run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StagingBuffer {
    laps: Vec<Lap>,
}

impl StagingBuffer {
    pub const fn new() -> Self {
        Self { laps: Vec::new() }
    }

    pub fn laps(&self) -> &[Lap] {
        &self.laps
    }

    pub const fn is_empty(&self) -> bool {
        self.laps.is_empty()
    }

    pub fn newest(&self) -> Option<&Lap> {
        self.laps.first()
    }

    /// Label the next intermediate lap will get.
    pub fn next_label(&self) -> String {
        intermediate_label(self.laps.len() + 1)
    }

    /// Prepends an intermediate lap. Zero-length captures are rejected.
    pub fn append(
        &mut self,
        id: LapId,
        timestamp: i64,
        duration: u64,
        label: impl Into<String>,
    ) -> bool {
        if duration == 0 {
            return false;
        }
        self.laps.insert(
            0,
            Lap {
                id,
                timestamp,
                duration,
                label: label.into(),
            },
        );
        true
    }

    /// Closes the buffer into a run whose newest lap is the terminal capture.
    ///
    /// An intermediate lap with the same duration as the terminal capture is
    /// the same moment recorded twice; the terminal lap replaces it.
    pub fn seal(
        &mut self,
        run_id: RunId,
        lap_id: LapId,
        timestamp: i64,
        final_duration: u64,
    ) -> Run {
        let mut laps = std::mem::take(&mut self.laps);
        if laps.first().is_some_and(|lap| lap.duration == final_duration) {
            laps.remove(0);
        }
        laps.insert(
            0,
            Lap {
                id: lap_id,
                timestamp,
                duration: final_duration,
                label: END_OF_RUN_LABEL.to_string(),
            },
        );
        Run {
            id: run_id,
            timestamp,
            laps,
        }
    }

    pub fn clear(&mut self) {
        self.laps.clear();
    }
}
