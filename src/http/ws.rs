// WebSocket transport for streaming transcription
//
// One socket is one Connection. Text frames carry control messages
// (`start` / `end`), binary frames carry audio, and every ClientEvent the
// session emits is sent back as a JSON text frame.

use super::handlers::error_response;
use super::state::AppState;
use crate::auth::{bearer_token, Identity};
use crate::journal::JournalStore;
use crate::session::{
    ClientEvent, Connection, ControlMessage, SessionConfig, SessionCoordinator, SessionReport,
    StartOptions, StopReason,
};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default, Deserialize)]
pub struct SocketParams {
    /// Browsers cannot set headers on WebSocket requests
    pub token: Option<String>,
}

/// GET /ws/transcribe
/// Authenticate, then upgrade to a streaming transcription socket
pub async fn transcribe_socket(
    State(state): State<AppState>,
    Query(params): Query<SocketParams>,
    headers: HeaderMap,
    upgrade: WebSocketUpgrade,
) -> Response {
    let token = bearer_token(&headers)
        .map(str::to_string)
        .or(params.token);

    match state.verifier.verify(token.as_deref()).await {
        Ok(identity) => upgrade.on_upgrade(move |socket| handle_socket(state, identity, socket)),
        Err(e) => {
            warn!("Rejected transcription socket: {}", e);
            error_response(StatusCode::UNAUTHORIZED, e.to_string())
        }
    }
}

async fn handle_socket(state: AppState, identity: Identity, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientEvent>();

    let connection = Connection::new(out_tx);
    let connection_id = connection.id();

    info!("Client {} connected as {}", connection_id, identity.subject);

    let send_task = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    error!("Failed to serialize client event: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = receiver.next().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                warn!("Socket error on {}: {}", connection_id, e);
                break;
            }
        };

        match message {
            Message::Text(text) => handle_control(&state, &connection, &text).await,
            Message::Binary(data) => {
                if let Err(e) = state.registry.push_audio(connection_id, data).await {
                    debug!("Dropping audio on {}: {}", connection_id, e);
                    connection.emit(ClientEvent::error(e.to_string()));
                }
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    connection.mark_disconnected();
    state.registry.disconnect(connection_id).await;
    send_task.abort();

    info!("Client {} disconnected", connection_id);
}

async fn handle_control(state: &AppState, connection: &Connection, text: &str) {
    match serde_json::from_str::<ControlMessage>(text) {
        Ok(ControlMessage::Start(options)) => start_session(state, connection, options).await,
        Ok(ControlMessage::End) => {
            if let Err(e) = state.registry.end(connection.id()).await {
                warn!("End signal on {} ignored: {}", connection.id(), e);
                connection.emit(ClientEvent::error(e.to_string()));
            }
        }
        Err(e) => {
            warn!("Invalid control message on {}: {}", connection.id(), e);
            connection.emit(ClientEvent::error(format!("Invalid control message: {}", e)));
        }
    }
}

async fn start_session(state: &AppState, connection: &Connection, options: StartOptions) {
    let config = session_config(&state.settings.session, options);

    match SessionCoordinator::start(
        state.registry.clone(),
        connection.client(),
        Arc::clone(&state.recognizer),
        config,
    )
    .await
    {
        Ok(started) => {
            if state.settings.autosave {
                tokio::spawn(save_transcript(Arc::clone(&state.journal), started.report));
            }
        }
        Err(e) => {
            warn!("Start signal on {} rejected: {}", connection.id(), e);
            connection.emit(ClientEvent::error(e.to_string()));
        }
    }
}

/// Apply client overrides to the configured session parameters
pub fn session_config(base: &SessionConfig, options: StartOptions) -> SessionConfig {
    let mut config = base.clone();
    if let Some(sample_rate) = options.sample_rate {
        config.recognition.sample_rate = sample_rate;
    }
    if let Some(language_code) = options.language_code {
        config.recognition.language_code = language_code;
    }
    if let Some(encoding) = options.encoding {
        config.recognition.encoding = encoding;
    }
    config
}

/// Hand the final transcript of a finished session to the journal
async fn save_transcript(journal: Arc<dyn JournalStore>, report: JoinHandle<SessionReport>) {
    let report = match report.await {
        Ok(report) => report,
        Err(e) => {
            error!("Session task panicked: {}", e);
            return;
        }
    };

    if let StopReason::Failed(reason) = &report.stop_reason {
        debug!("Not saving {} after failure: {}", report.session_id, reason);
        return;
    }

    let transcript = report.transcript();
    if transcript.is_empty() {
        debug!("Not saving {}: empty transcript", report.session_id);
        return;
    }

    match journal.create_entry(&transcript).await {
        Ok(entry) => info!("Saved {} as journal entry {}", report.session_id, entry.id),
        Err(e) => error!("Failed to save {}: {}", report.session_id, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::InMemoryJournalStore;
    use crate::recognition::AudioEncoding;
    use crate::session::{ConnectionId, SessionId, SessionState};
    use chrono::Utc;

    fn report(stop_reason: StopReason, finals: &[&str]) -> SessionReport {
        SessionReport {
            session_id: SessionId::new(),
            connection_id: ConnectionId::new(),
            transitions: vec![
                SessionState::Idle,
                SessionState::Recording,
                SessionState::Stopping,
                SessionState::Closed,
            ],
            stop_reason,
            chunks_written: 3,
            finals: finals.iter().map(|s| s.to_string()).collect(),
            interim: String::new(),
            started_at: Utc::now(),
            closed_at: Utc::now(),
        }
    }

    async fn saved(report: SessionReport) -> Vec<String> {
        let journal = Arc::new(InMemoryJournalStore::new());
        save_transcript(journal.clone(), tokio::spawn(async move { report })).await;
        journal
            .list_entries()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.transcript)
            .collect()
    }

    #[tokio::test]
    async fn test_completed_session_is_saved() {
        let entries = saved(report(StopReason::Ended, &["dear diary", " ", "today"])).await;
        assert_eq!(entries, vec!["dear diary today"]);
    }

    #[tokio::test]
    async fn test_failed_or_silent_session_is_not_saved() {
        let failed = report(StopReason::Failed("boom".to_string()), &["partial words"]);
        assert!(saved(failed).await.is_empty());
        assert!(saved(report(StopReason::Ended, &[])).await.is_empty());
    }

    #[test]
    fn test_start_options_override_configured_parameters() {
        let base = SessionConfig::default();
        let config = session_config(
            &base,
            StartOptions {
                sample_rate: Some(48000),
                language_code: None,
                encoding: Some(AudioEncoding::WebmOpus),
            },
        );

        assert_eq!(config.recognition.sample_rate, 48000);
        assert_eq!(config.recognition.language_code, base.recognition.language_code);
        assert_eq!(config.recognition.encoding, AudioEncoding::WebmOpus);
        assert_eq!(config.open_timeout, base.open_timeout);
    }
}
