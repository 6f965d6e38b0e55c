use serde::{Deserialize, Serialize};

use crate::recognition::{AudioEncoding, RecognitionEvent};

/// Audio frame message published to NATS
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioFrameMessage {
    pub session_id: String,
    pub sequence: u64,
    pub pcm: String,  // Base64-encoded audio bytes
    pub sample_rate: u32,
    pub language_code: String,
    pub encoding: AudioEncoding,
    /// Whether the service should publish partial transcripts
    #[serde(default = "default_interim_results")]
    pub interim_results: bool,
    pub timestamp: String,  // RFC3339 timestamp
    #[serde(rename = "final")]
    pub final_frame: bool,
}

fn default_interim_results() -> bool {
    true
}

/// Transcript message received from STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub session_id: String,
    pub text: String,
    pub partial: bool,
    pub timestamp: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl From<TranscriptMessage> for RecognitionEvent {
    fn from(msg: TranscriptMessage) -> Self {
        RecognitionEvent {
            transcript: msg.text,
            is_final: !msg.partial,
            confidence: msg.confidence,
        }
    }
}
