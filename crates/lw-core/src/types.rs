//! Identifier types and id generation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// The same identifier appears more than once in a history.
    #[error("duplicate id in history: {id}")]
    DuplicateId { id: String },

    /// A stored run has no laps at all.
    #[error("run {run} has no laps")]
    EmptyRun { run: String },

    /// A stored run does not end with the end-of-run lap.
    #[error("run {run} does not start with its terminal lap")]
    MissingTerminalLap { run: String },
}

/// Source of fresh, non-empty identifiers.
///
/// Implementations must never hand out the same value twice for the lifetime
/// of a history.
pub trait IdGenerator {
    fn next_id(&mut self) -> String;
}

/// Random UUID v4 identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&mut self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Monotonic counter within a namespace (`ns-1`, `ns-2`, ...).
///
/// Deterministic, which makes it the generator of choice for tests.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    namespace: String,
    next: u64,
}

impl SequentialIds {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            next: 1,
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> String {
        let id = format!("{}-{}", self.namespace, self.next);
        self.next += 1;
        id
    }
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Draws a fresh ID from the generator.
            pub fn generate(ids: &mut dyn IdGenerator) -> Self {
                let id = ids.next_id();
                if id.is_empty() {
                    return Self(UuidIds.next_id());
                }
                Self(id)
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// Identifier of a single lap capture.
    LapId, "lap ID"
);

define_string_id!(
    /// Identifier of a run (one start-to-stop interval).
    RunId, "run ID"
);

define_string_id!(
    /// Identifier of a session.
    SessionId, "session ID"
);
