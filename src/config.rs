use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::recognition::{AudioEncoding, ClipOptions, RecognitionConfig};
use crate::session::SessionConfig;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub recognizer: RecognizerConfig,
    pub upload: UploadConfig,
    pub auth: AuthConfig,
    pub journal: JournalConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "voice-journal".to_string(),
            http: HttpConfig::default(),
            log_json: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    pub nats_url: String,
    pub sample_rate: u32,
    pub language_code: String,
    pub encoding: AudioEncoding,
    pub interim_results: bool,
    pub open_timeout_ms: u64,
    pub close_timeout_ms: u64,
    /// How long results are still relayed after a channel is closed
    pub drain_timeout_ms: u64,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            nats_url: "nats://localhost:4222".to_string(),
            sample_rate: 16000,
            language_code: "en-US".to_string(),
            encoding: AudioEncoding::Linear16,
            interim_results: true,
            open_timeout_ms: 5000,
            close_timeout_ms: 3000,
            drain_timeout_ms: 1500,
        }
    }
}

impl RecognizerConfig {
    pub fn recognition(&self) -> RecognitionConfig {
        RecognitionConfig {
            sample_rate: self.sample_rate,
            language_code: self.language_code.clone(),
            encoding: self.encoding,
            interim_results: self.interim_results,
        }
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            recognition: self.recognition(),
            open_timeout: Duration::from_millis(self.open_timeout_ms),
            close_timeout: Duration::from_millis(self.close_timeout_ms),
            // The recognizer drains for drain_timeout after close; give the
            // session enough slack to see the stream end on its own
            drain_timeout: Duration::from_millis(self.drain_timeout_ms + self.close_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Largest accepted clip body in bytes
    pub max_bytes: usize,
    /// Duration of each chunk written to the recognizer
    pub chunk_ms: u64,
    pub result_timeout_ms: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024, // 10MB
            chunk_ms: 100,
            result_timeout_ms: 30_000,
        }
    }
}

impl UploadConfig {
    pub fn clip_options(&self, recognizer: &RecognizerConfig) -> ClipOptions {
        ClipOptions {
            open_timeout: Duration::from_millis(recognizer.open_timeout_ms),
            close_timeout: Duration::from_millis(recognizer.close_timeout_ms),
            result_timeout: Duration::from_millis(self.result_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Accepted bearer tokens. Empty means unauthenticated access.
    pub tokens: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Save the final transcript of every completed streaming session
    pub autosave: bool,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self { autosave: true }
    }
}

impl Config {
    /// Load from an optional config file, then `VOICE_JOURNAL__*` env vars.
    ///
    /// `VOICE_JOURNAL__AUTH__TOKENS` takes a comma-separated list.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("VOICE_JOURNAL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("auth.tokens"),
            )
            .build()
            .with_context(|| format!("Failed to load config from {}", path))?;

        settings
            .try_deserialize()
            .context("Failed to deserialize config")
    }
}
