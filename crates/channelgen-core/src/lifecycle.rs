//! Pipe lifecycle state machine

use serde::{Deserialize, Serialize};

/// States of one logical message stream ("pipe")
///
/// State transitions:
/// ```text
/// Created → Open → Closed
///             │       ↑
///             └→ Draining
/// ```
/// `Closed` is absorbing: reads against a closed pipe fail immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipeState {
    /// Constructed but not yet visible to the reader
    #[default]
    Created,
    /// Registered; the reader may push and consumers may pop
    Open,
    /// No longer accepting input; buffered messages can still be read
    Draining,
    /// Closed explicitly or by connection loss
    Closed,
}

impl PipeState {
    /// Check if this state can transition to the target state
    pub fn can_transition_to(&self, target: PipeState) -> bool {
        use PipeState::*;
        matches!(
            (self, target),
            (Created, Open)
                | (Created, Closed)
                | (Open, Draining)
                | (Open, Closed)
                | (Draining, Closed)
        )
    }

    /// Check if the reader may push into a pipe in this state
    pub fn accepts_input(&self) -> bool {
        matches!(self, PipeState::Open)
    }

    /// Check if a consumer may still read buffered messages
    pub fn is_readable(&self) -> bool {
        matches!(self, PipeState::Open | PipeState::Draining)
    }

    /// Check if the pipe is in the absorbing state
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipeState::Closed)
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            PipeState::Created => 0,
            PipeState::Open => 1,
            PipeState::Draining => 2,
            PipeState::Closed => 3,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => PipeState::Created,
            1 => PipeState::Open,
            2 => PipeState::Draining,
            _ => PipeState::Closed,
        }
    }
}

impl std::fmt::Display for PipeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipeState::Created => write!(f, "Created"),
            PipeState::Open => write!(f, "Open"),
            PipeState::Draining => write!(f, "Draining"),
            PipeState::Closed => write!(f, "Closed"),
        }
    }
}

#[cfg(test)]
#[path = "lifecycle/lifecycle_tests.rs"]
mod lifecycle_tests;

#[cfg(test)]
#[path = "lifecycle/lifecycle_parameterized_tests.rs"]
mod lifecycle_parameterized_tests;
