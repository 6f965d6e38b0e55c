pub mod audio;
pub mod auth;
pub mod config;
pub mod http;
pub mod journal;
pub mod nats;
pub mod recognition;
pub mod session;

pub use audio::{audio_chunk_buffer, AudioChunk, AudioChunkBuffer, AudioClip};
pub use auth::{AllowAnonymous, CredentialVerifier, Identity, StaticTokenVerifier};
pub use config::Config;
pub use http::{create_router, AppState, HttpSettings};
pub use journal::{Entry, InMemoryJournalStore, JournalStore};
pub use nats::{NatsClient, NatsRecognizer};
pub use recognition::{
    RecognitionChannel, RecognitionConfig, RecognitionError, RecognitionEvent, Recognizer,
};
pub use session::{
    ClientEvent, Connection, ConnectionRegistry, SessionConfig, SessionCoordinator, SessionError,
    SessionReport, SessionState,
};
