// NATS-backed streaming recognizer
//
// Audio for one channel is published as base64 frames on
// `audio.frame.<stream id>`; the STT service answers on `stt.text.>` with
// transcript messages carrying the same id. Closing a channel publishes an
// empty final frame and keeps relaying results for `drain_timeout` so the
// service can flush its last segment.

use futures::stream::{Stream, StreamExt};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::client::NatsClient;
use super::messages::TranscriptMessage;
use crate::audio::AudioChunk;
use crate::recognition::{
    AudioSink, EventStream, OpenedStream, RecognitionConfig, RecognitionError, RecognitionEvent,
    Recognizer,
};

type EventSender = mpsc::UnboundedSender<Result<RecognitionEvent, RecognitionError>>;

pub struct NatsRecognizer {
    url: String,
    drain_timeout: Duration,
}

impl NatsRecognizer {
    pub fn new(url: impl Into<String>, drain_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            drain_timeout,
        }
    }
}

#[async_trait::async_trait]
impl Recognizer for NatsRecognizer {
    async fn open(&self, config: &RecognitionConfig) -> Result<OpenedStream, RecognitionError> {
        let client = NatsClient::connect(&self.url)
            .await
            .map_err(|e| RecognitionError::ChannelUnavailable(format!("{:#}", e)))?;

        let subscriber = client
            .subscribe_transcripts()
            .await
            .map_err(|e| RecognitionError::ChannelUnavailable(format!("{:#}", e)))?;

        let stream_id = format!("stream-{}", uuid::Uuid::new_v4());
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = oneshot::channel();

        tokio::spawn(relay_transcripts(
            subscriber,
            stream_id.clone(),
            event_tx,
            close_rx,
            self.drain_timeout,
        ));

        info!("Opened NATS recognition stream {}", stream_id);

        let sink = NatsAudioSink {
            client,
            stream_id,
            config: config.clone(),
            next_sequence: 0,
            close_tx: Some(close_tx),
        };

        let events = event_stream(event_rx);

        Ok(OpenedStream {
            sink: Box::new(sink),
            events,
        })
    }

    fn name(&self) -> &str {
        "nats"
    }
}

fn event_stream(
    rx: mpsc::UnboundedReceiver<Result<RecognitionEvent, RecognitionError>>,
) -> EventStream {
    futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    })
    .boxed()
}

/// Write half of a NATS recognition stream
struct NatsAudioSink {
    client: NatsClient,
    stream_id: String,
    config: RecognitionConfig,
    next_sequence: u64,
    close_tx: Option<oneshot::Sender<()>>,
}

#[async_trait::async_trait]
impl AudioSink for NatsAudioSink {
    async fn write(&mut self, chunk: &AudioChunk) -> Result<(), RecognitionError> {
        if self.close_tx.is_none() {
            return Err(RecognitionError::ChannelClosed);
        }

        self.client
            .publish_audio_frame(
                &self.stream_id,
                chunk.sequence(),
                chunk.data(),
                &self.config,
                false,
            )
            .await
            .map_err(|e| RecognitionError::Transport(format!("{:#}", e)))?;

        self.next_sequence = chunk.sequence() + 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), RecognitionError> {
        let Some(close_tx) = self.close_tx.take() else {
            return Ok(());
        };

        // Final marker first, so the service flushes before we stop listening
        let published = self
            .client
            .publish_audio_frame(&self.stream_id, self.next_sequence, &[], &self.config, true)
            .await;
        let flushed = self.client.flush().await;

        let _ = close_tx.send(());

        published
            .and(flushed)
            .map_err(|e| RecognitionError::Transport(format!("{:#}", e)))
    }
}

/// Decode a transcript payload, keeping only messages for `stream_id`
pub fn decode_transcript(payload: &[u8], stream_id: &str) -> Option<RecognitionEvent> {
    match serde_json::from_slice::<TranscriptMessage>(payload) {
        Ok(msg) if msg.session_id == stream_id => Some(msg.into()),
        Ok(_) => None,
        Err(e) => {
            warn!("Failed to parse transcript message: {}", e);
            None
        }
    }
}

async fn relay_transcripts(
    mut subscriber: async_nats::Subscriber,
    stream_id: String,
    events: EventSender,
    close_rx: oneshot::Receiver<()>,
    drain_timeout: Duration,
) {
    debug!("Transcript relay for {} started", stream_id);

    {
        let mut payloads = (&mut subscriber).map(|msg| msg.payload);
        relay_payloads(&mut payloads, &stream_id, &events, close_rx, drain_timeout).await;
    }

    if let Err(e) = subscriber.unsubscribe().await {
        warn!("Failed to unsubscribe transcript relay for {}: {}", stream_id, e);
    }

    debug!("Transcript relay for {} stopped", stream_id);
}

/// Forward transcript payloads for `stream_id` until the sink closes, then
/// keep draining for `drain_timeout`.
async fn relay_payloads<S, P>(
    payloads: &mut S,
    stream_id: &str,
    events: &EventSender,
    mut close_rx: oneshot::Receiver<()>,
    drain_timeout: Duration,
) where
    S: Stream<Item = P> + Unpin,
    P: AsRef<[u8]>,
{
    // Open: relay until the sink closes (or is dropped)
    loop {
        tokio::select! {
            biased;
            _ = &mut close_rx => break,
            payload = payloads.next() => match payload {
                Some(payload) => {
                    if let Some(event) = decode_transcript(payload.as_ref(), stream_id) {
                        if events.send(Ok(event)).is_err() {
                            debug!("Event receiver for {} dropped", stream_id);
                            return;
                        }
                    }
                }
                None => {
                    warn!("Transcript subscription for {} ended", stream_id);
                    let _ = events.send(Err(RecognitionError::UpstreamTerminated(
                        "transcript subscription ended".to_string(),
                    )));
                    return;
                }
            }
        }
    }

    // Closing: give the service time to flush its last results
    let deadline = tokio::time::sleep(drain_timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            payload = payloads.next() => match payload {
                Some(payload) => {
                    if let Some(event) = decode_transcript(payload.as_ref(), stream_id) {
                        if events.send(Ok(event)).is_err() {
                            break;
                        }
                    }
                }
                None => break,
            }
        }
    }
}
