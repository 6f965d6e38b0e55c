use futures::future;
use futures::stream::{BoxStream, StreamExt};
use tracing::{debug, info, warn};

use super::error::RecognitionError;
use super::types::{RecognitionConfig, RecognitionEvent};
use crate::audio::AudioChunk;

/// Lazy sequence of recognition events.
///
/// Ends with `None` after a requested close; an abnormal end is reported as
/// `Err(RecognitionError::UpstreamTerminated)` before the stream finishes.
pub type EventStream = BoxStream<'static, Result<RecognitionEvent, RecognitionError>>;

/// Write half of an external recognition stream
#[async_trait::async_trait]
pub trait AudioSink: Send {
    /// Forward one chunk to the recognizer
    async fn write(&mut self, chunk: &AudioChunk) -> Result<(), RecognitionError>;

    /// Signal end of audio and release the external stream
    async fn close(&mut self) -> Result<(), RecognitionError>;
}

/// Both halves of a freshly opened external stream
pub struct OpenedStream {
    pub sink: Box<dyn AudioSink>,
    pub events: EventStream,
}

/// External streaming speech recognizer
///
/// Implementations:
/// - NATS: publishes audio frames and subscribes to transcript subjects
/// - Test doubles in `tests/common`
#[async_trait::async_trait]
pub trait Recognizer: Send + Sync {
    /// Establish a new bidirectional stream
    async fn open(&self, config: &RecognitionConfig) -> Result<OpenedStream, RecognitionError>;

    /// Get recognizer name for logging
    fn name(&self) -> &str;
}

/// Adapter around one external recognition stream.
///
/// Enforces the channel contract on top of any `Recognizer`: writes only
/// between open and close, a single close reaching the external stream, and
/// a best-effort close when dropped while still open.
pub struct RecognitionChannel {
    sink: Option<Box<dyn AudioSink>>,
    events: Option<EventStream>,
    recognizer: String,
    chunks_written: usize,
}

impl RecognitionChannel {
    /// Validate `config` and open a stream on `recognizer`
    pub async fn open(
        recognizer: &dyn Recognizer,
        config: &RecognitionConfig,
    ) -> Result<Self, RecognitionError> {
        config.validate()?;

        info!(
            "Opening recognition channel on {} ({}Hz, {}, {})",
            recognizer.name(),
            config.sample_rate,
            config.encoding,
            config.language_code
        );

        let opened = recognizer.open(config).await?;

        let events = if config.interim_results {
            opened.events
        } else {
            // Not every recognizer honours the flag
            opened
                .events
                .filter(|item| future::ready(!matches!(item, Ok(event) if !event.is_final)))
                .boxed()
        };

        Ok(Self {
            sink: Some(opened.sink),
            events: Some(events),
            recognizer: recognizer.name().to_string(),
            chunks_written: 0,
        })
    }

    /// Forward one chunk; fails with `ChannelClosed` after `close`
    pub async fn write(&mut self, chunk: &AudioChunk) -> Result<(), RecognitionError> {
        let sink = self.sink.as_mut().ok_or(RecognitionError::ChannelClosed)?;
        sink.write(chunk).await?;
        self.chunks_written += 1;
        Ok(())
    }

    /// Take the event stream. Returns `None` if it was already taken.
    pub fn take_events(&mut self) -> Option<EventStream> {
        self.events.take()
    }

    /// Close the external stream. Calling this again is a no-op.
    pub async fn close(&mut self) -> Result<(), RecognitionError> {
        let Some(mut sink) = self.sink.take() else {
            debug!("Recognition channel on {} already closed", self.recognizer);
            return Ok(());
        };

        info!(
            "Closing recognition channel on {} after {} chunks",
            self.recognizer, self.chunks_written
        );

        sink.close().await
    }

    pub fn is_open(&self) -> bool {
        self.sink.is_some()
    }

    pub fn chunks_written(&self) -> usize {
        self.chunks_written
    }
}

impl Drop for RecognitionChannel {
    fn drop(&mut self) {
        let Some(mut sink) = self.sink.take() else {
            return;
        };

        warn!(
            "Recognition channel on {} dropped while open, closing in background",
            self.recognizer
        );

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = sink.close().await {
                        warn!("Failed to close dropped recognition channel: {}", e);
                    }
                });
            }
            Err(_) => warn!("No runtime available to close dropped recognition channel"),
        }
    }
}
