//! HTTP and WebSocket API
//!
//! - GET /ws/transcribe - Streaming transcription socket
//! - POST /api/transcribe - One-shot WAV clip transcription
//! - GET /api/journal-entries - List saved entries
//! - POST /api/journal-entries - Save a transcript
//! - POST /api/journal-entries/cleanup - Delete blank entries
//! - GET /api/check-auth - Credential check
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;
mod ws;

pub use handlers::{AuthStatusResponse, CleanupResponse, ErrorResponse, TranscribeResponse};
pub use routes::create_router;
pub use state::{AppState, HttpSettings};
pub use ws::session_config;
