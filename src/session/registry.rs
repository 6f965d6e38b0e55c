use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::connection::{ConnectionId, SessionId};
use super::error::SessionError;
use super::session::SessionHandle;

/// Active sessions by connection (connection_id → session).
///
/// At most one session is registered per connection. Removal is keyed by
/// both ids, so a late cleanup from an old session can never evict a newer
/// one, and repeating a removal is harmless.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    sessions: Arc<RwLock<HashMap<ConnectionId, SessionHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` for its connection.
    ///
    /// Rejected with `AlreadyActive` while another session (recording or
    /// still stopping) is registered for the same connection.
    pub async fn register(&self, handle: SessionHandle) -> Result<(), SessionError> {
        let connection_id = handle.connection_id();
        let mut sessions = self.sessions.write().await;

        if let Some(existing) = sessions.get(&connection_id) {
            warn!(
                "Rejecting new session on {}: {} is {}",
                connection_id,
                existing.session_id(),
                existing.state()
            );
            return Err(SessionError::AlreadyActive(connection_id));
        }

        info!(
            "Registered {} on {} ({} active)",
            handle.session_id(),
            connection_id,
            sessions.len() + 1
        );
        sessions.insert(connection_id, handle);
        Ok(())
    }

    pub async fn get(&self, connection_id: ConnectionId) -> Option<SessionHandle> {
        let sessions = self.sessions.read().await;
        sessions.get(&connection_id).cloned()
    }

    /// Remove the entry for `connection_id` if it still belongs to `session_id`
    pub async fn release(&self, connection_id: ConnectionId, session_id: SessionId) -> bool {
        let mut sessions = self.sessions.write().await;

        match sessions.get(&connection_id) {
            Some(handle) if handle.session_id() == session_id => {
                sessions.remove(&connection_id);
                debug!("Released {} from {}", session_id, connection_id);
                true
            }
            _ => false,
        }
    }

    /// Force-remove the session of a disconnected connection and make it stop.
    /// Returns the removed handle, if there was one.
    pub async fn disconnect(&self, connection_id: ConnectionId) -> Option<SessionHandle> {
        let removed = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(&connection_id)
        };

        match &removed {
            Some(handle) => {
                info!(
                    "Connection {} disconnected, stopping {}",
                    connection_id,
                    handle.session_id()
                );
                handle.stop();
            }
            None => debug!("Connection {} disconnected with no session", connection_id),
        }

        removed
    }

    /// Deliver a graceful end signal to the connection's session
    pub async fn end(&self, connection_id: ConnectionId) -> Result<SessionHandle, SessionError> {
        let handle = self
            .get(connection_id)
            .await
            .ok_or(SessionError::NotFound(connection_id))?;
        handle.end()?;
        Ok(handle)
    }

    /// Push audio to the connection's session
    pub async fn push_audio(
        &self,
        connection_id: ConnectionId,
        data: Vec<u8>,
    ) -> Result<u64, SessionError> {
        let handle = self
            .get(connection_id)
            .await
            .ok_or(SessionError::NotFound(connection_id))?;
        handle.push_audio(data)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
