use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::RecognitionError;

/// Audio encodings accepted by the external recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioEncoding {
    /// Uncompressed 16-bit signed little-endian PCM
    Linear16,
    Flac,
    Mulaw,
    OggOpus,
    WebmOpus,
}

impl AudioEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioEncoding::Linear16 => "LINEAR16",
            AudioEncoding::Flac => "FLAC",
            AudioEncoding::Mulaw => "MULAW",
            AudioEncoding::OggOpus => "OGG_OPUS",
            AudioEncoding::WebmOpus => "WEBM_OPUS",
        }
    }
}

impl fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for one streaming recognition channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionConfig {
    /// Sample rate of the audio sent on the channel (Hz)
    pub sample_rate: u32,

    /// BCP-47 language tag, e.g. "en-US"
    pub language_code: String,

    pub encoding: AudioEncoding,

    /// Whether the recognizer should emit interim (non-final) results
    pub interim_results: bool,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            language_code: "en-US".to_string(),
            encoding: AudioEncoding::Linear16,
            interim_results: true,
        }
    }
}

impl RecognitionConfig {
    /// Reject configurations no recognizer would accept
    pub fn validate(&self) -> Result<(), RecognitionError> {
        if !(8000..=48000).contains(&self.sample_rate) {
            return Err(RecognitionError::ChannelUnavailable(format!(
                "unsupported sample rate {}Hz",
                self.sample_rate
            )));
        }

        if self.language_code.trim().is_empty() {
            return Err(RecognitionError::ChannelUnavailable(
                "language code must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// One interim or final transcript update from the recognizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionEvent {
    pub transcript: String,
    pub is_final: bool,
    pub confidence: Option<f32>,
}

impl RecognitionEvent {
    pub fn interim(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: false,
            confidence: None,
        }
    }

    pub fn final_result(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: true,
            confidence: None,
        }
    }
}
