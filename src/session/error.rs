use super::connection::ConnectionId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Audio or an end signal arrived after the session stopped accepting input
    #[error("session is closed")]
    SessionClosed,

    #[error("a session is already active on {0}")]
    AlreadyActive(ConnectionId),

    #[error("no active session on {0}")]
    NotFound(ConnectionId),
}
