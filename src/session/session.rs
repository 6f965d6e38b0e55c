use chrono::{DateTime, Utc};
use futures::stream::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::connection::{ClientSink, ConnectionId, Liveness, SessionId};
use super::error::SessionError;
use super::events::ClientEvent;
use super::registry::ConnectionRegistry;
use super::state::{SessionReport, SessionState, StopReason};
use super::transcript::SessionTranscript;
use crate::audio::{
    audio_chunk_buffer, AudioChunk, AudioChunkBuffer, AudioChunkReceiver, BufferedInput,
};
use crate::recognition::{
    EventStream, RecognitionChannel, RecognitionError, RecognitionEvent, Recognizer,
};

/// Shared handle to a running session, held by the registry and transport
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    session_id: SessionId,
    connection_id: ConnectionId,
    buffer: AudioChunkBuffer,
    stop: watch::Sender<bool>,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub fn session_id(&self) -> SessionId {
        self.inner.session_id
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.inner.connection_id
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// Queue one audio fragment for the recognizer
    pub fn push_audio(&self, data: Vec<u8>) -> Result<u64, SessionError> {
        self.inner.buffer.push(data)
    }

    /// Graceful end: audio already pushed is still forwarded, then the
    /// channel closes and remaining results are relayed
    pub fn end(&self) -> Result<(), SessionError> {
        self.inner.buffer.end()
    }

    /// Immediate stop: pending audio is dropped and nothing more is relayed
    pub fn stop(&self) {
        self.inner.stop.send_replace(true);
    }

    /// Wait until the session reaches `Closed`
    pub async fn closed(&self) {
        let mut state = self.inner.state.clone();
        loop {
            let current = *state.borrow_and_update();
            if current == SessionState::Closed {
                return;
            }
            if state.changed().await.is_err() {
                return;
            }
        }
    }
}

/// A session that was registered and is now running
pub struct StartedSession {
    pub handle: SessionHandle,
    /// Resolves with the session summary once it reaches `Closed`
    pub report: JoinHandle<SessionReport>,
}

/// Drives one session through `Idle -> Recording -> Stopping -> Closed`.
///
/// The coordinator is the single owner of its recognition channel, so the
/// channel is closed from exactly one place regardless of what triggered
/// the teardown.
pub struct SessionCoordinator {
    session_id: SessionId,
    connection_id: ConnectionId,
    config: SessionConfig,
    recognizer: Arc<dyn Recognizer>,
    registry: ConnectionRegistry,
    client: ClientSink,
    liveness: Liveness,
    inbound: AudioChunkReceiver,
    stop: watch::Receiver<bool>,
    state: watch::Sender<SessionState>,
    transitions: Vec<SessionState>,
    transcript: SessionTranscript,
    started_at: DateTime<Utc>,
}

impl SessionCoordinator {
    /// Register a new session for the client's connection and start it.
    ///
    /// Fails with `AlreadyActive` if the connection already has a session;
    /// the existing session is left untouched.
    pub async fn start(
        registry: ConnectionRegistry,
        client: ClientSink,
        recognizer: Arc<dyn Recognizer>,
        config: SessionConfig,
    ) -> Result<StartedSession, SessionError> {
        let session_id = SessionId::new();
        let connection_id = client.connection_id();

        let (buffer, inbound) = audio_chunk_buffer();
        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);

        let handle = SessionHandle {
            inner: Arc::new(HandleInner {
                session_id,
                connection_id,
                buffer,
                stop: stop_tx,
                state: state_rx,
            }),
        };

        registry.register(handle.clone()).await?;

        let liveness = client.liveness();
        let mut coordinator = Self {
            session_id,
            connection_id,
            config,
            recognizer,
            registry,
            client,
            liveness,
            inbound,
            stop: stop_rx,
            state: state_tx,
            transitions: vec![SessionState::Idle],
            transcript: SessionTranscript::new(),
            started_at: Utc::now(),
        };

        coordinator.transition(SessionState::Recording);
        coordinator.client.emit(ClientEvent::Started { session_id });

        let report = tokio::spawn(coordinator.run());

        Ok(StartedSession { handle, report })
    }

    async fn run(mut self) -> SessionReport {
        let (mut reason, mut channel, events) = self.record().await;

        self.transition(SessionState::Stopping);
        self.inbound.close();

        if let StopReason::Failed(message) = &reason {
            self.client.emit(ClientEvent::error(message.clone()));
        }

        let chunks_written = channel.as_ref().map_or(0, |c| c.chunks_written());
        if let Some(channel) = channel.as_mut() {
            close_channel(self.session_id, self.config.close_timeout, channel).await;
        }

        if reason == StopReason::Ended {
            if let Some(events) = events {
                if let Some(failure) = self.drain(events).await {
                    self.client.emit(ClientEvent::error(failure.clone()));
                    reason = StopReason::Failed(failure);
                }
            }
        }
        drop(channel);

        self.transition(SessionState::Closed);
        self.registry
            .release(self.connection_id, self.session_id)
            .await;

        self.client.emit(ClientEvent::Closed {
            session_id: self.session_id,
            transcript: self.transcript.text(),
        });

        let (finals, interim) = self.transcript.into_parts();
        let report = SessionReport {
            session_id: self.session_id,
            connection_id: self.connection_id,
            transitions: self.transitions,
            stop_reason: reason,
            chunks_written,
            finals,
            interim,
            started_at: self.started_at,
            closed_at: Utc::now(),
        };

        info!(
            "Session {} closed after {:.1}s ({:?}, {} chunks, {} final segments)",
            report.session_id,
            report.duration_secs(),
            report.stop_reason,
            report.chunks_written,
            report.finals.len()
        );

        report
    }

    /// The `Recording` state: open the channel, then forward audio and relay
    /// results until an end signal, a stop, or a channel failure.
    async fn record(&mut self) -> (StopReason, Option<RecognitionChannel>, Option<EventStream>) {
        let opened = tokio::select! {
            biased;
            _ = stop_requested(&mut self.stop, &mut self.liveness) => {
                info!("Session {} stopped while opening channel", self.session_id);
                return (StopReason::Disconnected, None, None);
            }
            result = timeout(
                self.config.open_timeout,
                RecognitionChannel::open(self.recognizer.as_ref(), &self.config.recognition),
            ) => result,
        };

        let mut channel = match opened {
            Ok(Ok(channel)) => channel,
            Ok(Err(e)) => {
                error!("Session {} failed to open channel: {}", self.session_id, e);
                return (StopReason::Failed(e.to_string()), None, None);
            }
            Err(_) => {
                let e = RecognitionError::ChannelUnavailable(format!(
                    "timed out after {:?}",
                    self.config.open_timeout
                ));
                error!("Session {} failed to open channel: {}", self.session_id, e);
                return (StopReason::Failed(e.to_string()), None, None);
            }
        };

        let Some(mut events) = channel.take_events() else {
            return (
                StopReason::Failed(RecognitionError::ChannelClosed.to_string()),
                Some(channel),
                None,
            );
        };

        // Results go ahead of queued audio so a backlog never delays them
        let reason = loop {
            tokio::select! {
                biased;
                _ = stop_requested(&mut self.stop, &mut self.liveness) => {
                    break StopReason::Disconnected;
                }
                item = events.next() => match item {
                    Some(Ok(event)) => self.relay(event),
                    Some(Err(e)) => {
                        warn!("Session {} recognition failed: {}", self.session_id, e);
                        break StopReason::Failed(e.to_string());
                    }
                    None => {
                        let e = RecognitionError::UpstreamTerminated(
                            "recognizer ended the stream".to_string(),
                        );
                        warn!("Session {}: {}", self.session_id, e);
                        break StopReason::Failed(e.to_string());
                    }
                },
                input = self.inbound.recv() => match input {
                    Some(BufferedInput::Chunk(chunk)) => {
                        if let Err(reason) = self.forward(&mut channel, &chunk).await {
                            break reason;
                        }
                    }
                    Some(BufferedInput::End) | None => break StopReason::Ended,
                },
            }
        };

        debug!("Session {} leaving recording: {:?}", self.session_id, reason);

        (reason, Some(channel), Some(events))
    }

    async fn forward(
        &mut self,
        channel: &mut RecognitionChannel,
        chunk: &AudioChunk,
    ) -> Result<(), StopReason> {
        tokio::select! {
            biased;
            _ = stop_requested(&mut self.stop, &mut self.liveness) => Err(StopReason::Disconnected),
            result = channel.write(chunk) => result.map_err(|e| {
                warn!(
                    "Session {} failed to write chunk {}: {}",
                    self.session_id,
                    chunk.sequence(),
                    e
                );
                StopReason::Failed(e.to_string())
            }),
        }
    }

    fn relay(&mut self, event: RecognitionEvent) {
        self.transcript.apply(&event);
        self.client.emit(ClientEvent::Transcript {
            transcript: event.transcript,
            is_final: event.is_final,
        });
    }

    /// Relay results still in flight after close. Returns a failure
    /// message if the recognizer ended abnormally.
    async fn drain(&mut self, mut events: EventStream) -> Option<String> {
        let deadline = sleep(self.config.drain_timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;
                _ = stop_requested(&mut self.stop, &mut self.liveness) => return None,
                _ = &mut deadline => {
                    warn!(
                        "Session {} stopped draining results after {:?}",
                        self.session_id, self.config.drain_timeout
                    );
                    return None;
                }
                item = events.next() => match item {
                    Some(Ok(event)) => self.relay(event),
                    Some(Err(e)) => {
                        warn!("Session {} recognition failed while draining: {}", self.session_id, e);
                        return Some(e.to_string());
                    }
                    None => return None,
                },
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        let current = *self.state.borrow();
        debug_assert!(
            current.can_transition_to(next),
            "invalid transition {current} -> {next}"
        );

        info!("Session {}: {} -> {}", self.session_id, current, next);

        self.state.send_replace(next);
        self.transitions.push(next);
    }
}

async fn close_channel(
    session_id: SessionId,
    close_timeout: Duration,
    channel: &mut RecognitionChannel,
) {
    match timeout(close_timeout, channel.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Session {} channel close failed: {}", session_id, e),
        Err(_) => warn!(
            "Session {} channel close timed out after {:?}",
            session_id, close_timeout
        ),
    }
}

/// Resolves when the session was force-stopped or its connection went away
async fn stop_requested(stop: &mut watch::Receiver<bool>, liveness: &mut Liveness) {
    tokio::select! {
        _ = stop_flag_set(stop) => {}
        _ = liveness.disconnected() => {}
    }
}

async fn stop_flag_set(stop: &mut watch::Receiver<bool>) {
    loop {
        let stopped = *stop.borrow_and_update();
        if stopped {
            return;
        }
        if stop.changed().await.is_err() {
            return;
        }
    }
}
