//! Streaming transcription sessions
//!
//! This module provides the relay between a client connection and an
//! external recognition channel:
//! - `Connection`: transport identity, liveness and outbound events
//! - `SessionCoordinator`: the per-session state machine
//!   (`Idle -> Recording -> Stopping -> Closed`)
//! - `ConnectionRegistry`: at most one active session per connection
//! - `SessionTranscript` / `SessionReport`: accumulated results

mod config;
mod connection;
mod error;
mod events;
mod registry;
mod session;
mod state;
mod transcript;

pub use config::SessionConfig;
pub use connection::{ClientSink, Connection, ConnectionId, Liveness, SessionId};
pub use error::SessionError;
pub use events::{ClientEvent, ControlMessage, StartOptions};
pub use registry::ConnectionRegistry;
pub use session::{SessionCoordinator, SessionHandle, StartedSession};
pub use state::{SessionReport, SessionState, StopReason};
pub use transcript::{join_finals, SessionTranscript};
