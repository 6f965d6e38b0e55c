use anyhow::{Context, Result};
use async_nats::Client;
use base64::Engine;
use tracing::{debug, info};

use super::messages::AudioFrameMessage;
use crate::recognition::RecognitionConfig;

/// Subject the recognizer publishes partial and final transcripts on
pub const TRANSCRIPT_SUBJECT: &str = "stt.text.>";

#[derive(Clone)]
pub struct NatsClient {
    client: Client,
}

impl NatsClient {
    /// Connect to NATS server
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client })
    }

    /// Subject audio for `session_id` is published on
    pub fn audio_subject(session_id: &str) -> String {
        format!("audio.frame.{}", session_id)
    }

    /// Publish audio frame to NATS
    pub async fn publish_audio_frame(
        &self,
        session_id: &str,
        sequence: u64,
        audio: &[u8],
        config: &RecognitionConfig,
        is_final: bool,
    ) -> Result<()> {
        let subject = Self::audio_subject(session_id);

        let message = AudioFrameMessage {
            session_id: session_id.to_string(),
            sequence,
            pcm: base64::engine::general_purpose::STANDARD.encode(audio),
            sample_rate: config.sample_rate,
            language_code: config.language_code.clone(),
            encoding: config.encoding,
            interim_results: config.interim_results,
            timestamp: chrono::Utc::now().to_rfc3339(),
            final_frame: is_final,
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish audio frame")?;

        debug!(
            "Published audio frame to {} (sequence={}, bytes={}, final={})",
            subject,
            sequence,
            audio.len(),
            is_final
        );

        Ok(())
    }

    /// Subscribe to transcript messages
    pub async fn subscribe_transcripts(&self) -> Result<async_nats::Subscriber> {
        // The recognizer publishes to stt.text.partial and stt.text.final;
        // messages are filtered by session_id in the payload
        info!("Subscribing to transcripts on {}", TRANSCRIPT_SUBJECT);

        let subscriber = self
            .client
            .subscribe(TRANSCRIPT_SUBJECT.to_string())
            .await
            .context("Failed to subscribe to transcripts")?;

        Ok(subscriber)
    }

    /// Flush pending publishes
    pub async fn flush(&self) -> Result<()> {
        self.client.flush().await.context("Failed to flush NATS")?;
        Ok(())
    }
}
