use std::sync::Arc;

use crate::auth::{AllowAnonymous, CredentialVerifier};
use crate::config::Config;
use crate::journal::{InMemoryJournalStore, JournalStore};
use crate::recognition::{ClipOptions, Recognizer};
use crate::session::{ConnectionRegistry, SessionConfig};

/// Settings the handlers need from the loaded config
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub session: SessionConfig,
    pub clip: ClipOptions,
    pub max_upload_bytes: usize,
    pub upload_chunk_ms: u64,
    pub autosave: bool,
}

impl HttpSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            session: config.recognizer.session(),
            clip: config.upload.clip_options(&config.recognizer),
            max_upload_bytes: config.upload.max_bytes,
            upload_chunk_ms: config.upload.chunk_ms,
            autosave: config.journal.autosave,
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Active streaming sessions (connection_id → session)
    pub registry: ConnectionRegistry,
    pub recognizer: Arc<dyn Recognizer>,
    pub journal: Arc<dyn JournalStore>,
    pub verifier: Arc<dyn CredentialVerifier>,
    pub settings: Arc<HttpSettings>,
}

impl AppState {
    /// State with an in-memory journal and no authentication
    pub fn new(recognizer: Arc<dyn Recognizer>) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            recognizer,
            journal: Arc::new(InMemoryJournalStore::new()),
            verifier: Arc::new(AllowAnonymous),
            settings: Arc::new(HttpSettings::default()),
        }
    }

    pub fn with_journal(mut self, journal: Arc<dyn JournalStore>) -> Self {
        self.journal = journal;
        self
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn CredentialVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_settings(mut self, settings: HttpSettings) -> Self {
        self.settings = Arc::new(settings);
        self
    }
}
