// One-shot clip transcription
//
// The non-streaming upload path: a whole clip is written through a fresh
// recognition channel, the channel is closed, and the final results are
// collected until the recognizer ends the stream.

use futures::stream::StreamExt;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use super::channel::{EventStream, RecognitionChannel, Recognizer};
use super::error::RecognitionError;
use super::types::RecognitionConfig;
use crate::audio::AudioChunk;

#[derive(Debug, thiserror::Error)]
pub enum ClipError {
    #[error("invalid audio: {0}")]
    InvalidAudio(String),

    #[error(transparent)]
    Recognition(#[from] RecognitionError),

    #[error("timed out waiting for transcription results")]
    Timeout,
}

/// Time limits for a clip transcription
#[derive(Debug, Clone)]
pub struct ClipOptions {
    pub open_timeout: Duration,
    pub close_timeout: Duration,
    /// Upper bound on waiting for results after the clip was closed
    pub result_timeout: Duration,
}

impl Default for ClipOptions {
    fn default() -> Self {
        Self {
            open_timeout: Duration::from_secs(5),
            close_timeout: Duration::from_secs(3),
            result_timeout: Duration::from_secs(30),
        }
    }
}

/// Transcribe a complete clip given as ordered PCM chunks.
///
/// Returns the final results joined with single spaces. Interim results are
/// ignored.
pub async fn transcribe_clip(
    recognizer: &dyn Recognizer,
    config: &RecognitionConfig,
    chunks: Vec<Vec<u8>>,
    options: &ClipOptions,
) -> Result<String, ClipError> {
    if chunks.iter().all(|c| c.is_empty()) {
        return Err(ClipError::InvalidAudio("clip contains no audio".to_string()));
    }

    let mut channel = match timeout(
        options.open_timeout,
        RecognitionChannel::open(recognizer, config),
    )
    .await
    {
        Ok(result) => result?,
        Err(_) => {
            return Err(RecognitionError::ChannelUnavailable(format!(
                "timed out opening {} after {:?}",
                recognizer.name(),
                options.open_timeout
            ))
            .into())
        }
    };

    let mut events = channel
        .take_events()
        .ok_or(RecognitionError::ChannelClosed)?;

    let written = write_all(&mut channel, chunks).await;

    // Close on every path, including a failed write
    match timeout(options.close_timeout, channel.close()).await {
        Ok(Err(e)) => warn!("Failed to close clip channel: {}", e),
        Err(_) => warn!("Timed out closing clip channel"),
        Ok(Ok(())) => {}
    }

    let count = written?;

    let finals = timeout(options.result_timeout, collect_finals(&mut events))
        .await
        .map_err(|_| ClipError::Timeout)??;

    info!(
        "Clip transcribed: {} chunks, {} final segments",
        count,
        finals.len()
    );

    Ok(finals.join(" "))
}

async fn write_all(
    channel: &mut RecognitionChannel,
    chunks: Vec<Vec<u8>>,
) -> Result<usize, RecognitionError> {
    let mut count = 0;
    for (sequence, data) in chunks.into_iter().enumerate() {
        channel
            .write(&AudioChunk::new(sequence as u64, data))
            .await?;
        count += 1;
    }
    Ok(count)
}

async fn collect_finals(events: &mut EventStream) -> Result<Vec<String>, RecognitionError> {
    let mut finals = Vec::new();

    while let Some(item) = events.next().await {
        let event = item?;
        if !event.is_final {
            continue;
        }

        let text = event.transcript.trim();
        if !text.is_empty() {
            finals.push(text.to_string());
        }
    }

    Ok(finals)
}
