use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::connection::{ConnectionId, SessionId};
use super::transcript::join_finals;

/// Lifecycle of a streaming session.
///
/// `Idle -> Recording -> Stopping -> Closed`; no other transitions exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Recording,
    Stopping,
    Closed,
}

impl SessionState {
    /// Whether `next` directly follows `self`
    pub fn can_transition_to(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (SessionState::Idle, SessionState::Recording)
                | (SessionState::Recording, SessionState::Stopping)
                | (SessionState::Stopping, SessionState::Closed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Recording => "recording",
            SessionState::Stopping => "stopping",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Why a session left `Recording`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The client sent an end signal
    Ended,
    /// The connection went away or the registry force-removed the session
    Disconnected,
    /// The recognition channel failed; carries the reason sent to the client
    Failed(String),
}

/// Summary of a finished session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: SessionId,
    pub connection_id: ConnectionId,

    /// Every state the session passed through, starting with `Idle`
    pub transitions: Vec<SessionState>,

    pub stop_reason: StopReason,

    /// Chunks successfully written to the recognition channel
    pub chunks_written: usize,

    /// Final transcript fragments in arrival order
    pub finals: Vec<String>,

    /// Last interim fragment still pending when the session closed
    pub interim: String,

    pub started_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}

impl SessionReport {
    pub fn final_state(&self) -> SessionState {
        self.transitions
            .last()
            .copied()
            .unwrap_or(SessionState::Idle)
    }

    /// Non-empty final fragments joined with single spaces
    pub fn transcript(&self) -> String {
        join_finals(&self.finals)
    }

    pub fn duration_secs(&self) -> f64 {
        self.closed_at
            .signed_duration_since(self.started_at)
            .num_milliseconds() as f64
            / 1000.0
    }
}
