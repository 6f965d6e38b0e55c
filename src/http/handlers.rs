use super::state::AppState;
use crate::audio::AudioClip;
use crate::auth::{bearer_token, Identity};
use crate::journal::{Entry, JournalError};
use crate::recognition::{transcribe_clip, AudioEncoding, ClipError};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SaveEntryRequest {
    pub transcript: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscribeResponse {
    pub transcript: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub message: String,
    pub deleted: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthStatusResponse {
    pub authenticated: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(super) fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

async fn authorize(state: &AppState, headers: &HeaderMap) -> Result<Identity, Response> {
    state
        .verifier
        .verify(bearer_token(headers))
        .await
        .map_err(|e| {
            warn!("Rejected request: {}", e);
            error_response(StatusCode::UNAUTHORIZED, e.to_string())
        })
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /api/check-auth
/// Report whether the presented credentials are accepted
pub async fn check_auth(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let authenticated = state.verifier.verify(bearer_token(&headers)).await.is_ok();
    (StatusCode::OK, Json(AuthStatusResponse { authenticated }))
}

/// POST /api/transcribe
/// Transcribe an uploaded WAV clip in one go
pub async fn transcribe_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(response) = authorize(&state, &headers).await {
        return response;
    }

    let settings = &state.settings;
    let mut recognition = settings.session.recognition.clone();
    recognition.encoding = AudioEncoding::Linear16;
    recognition.interim_results = false;

    if let Err(e) = recognition.validate() {
        error!("Clip transcription misconfigured: {}", e);
        return error_response(
            StatusCode::BAD_GATEWAY,
            format!("Failed to transcribe audio: {}", e),
        );
    }

    let clip = match AudioClip::from_wav_bytes(&body)
        .and_then(|clip| clip.prepare(recognition.sample_rate))
    {
        Ok(clip) => clip,
        Err(e) => {
            warn!("Rejected clip upload: {:#}", e);
            return error_response(StatusCode::BAD_REQUEST, format!("Invalid audio: {:#}", e));
        }
    };

    info!(
        "Transcribing uploaded clip ({} bytes, {:.1}s)",
        body.len(),
        clip.duration_seconds
    );

    let chunks = clip.pcm_chunks(settings.upload_chunk_ms);
    match transcribe_clip(state.recognizer.as_ref(), &recognition, chunks, &settings.clip).await {
        Ok(transcript) => (StatusCode::OK, Json(TranscribeResponse { transcript })).into_response(),
        Err(ClipError::InvalidAudio(message)) => {
            error_response(StatusCode::BAD_REQUEST, format!("Invalid audio: {}", message))
        }
        Err(ClipError::Timeout) => {
            error!("Clip transcription timed out");
            error_response(StatusCode::GATEWAY_TIMEOUT, "Transcription timed out")
        }
        Err(ClipError::Recognition(e)) => {
            error!("Clip transcription failed: {}", e);
            error_response(
                StatusCode::BAD_GATEWAY,
                format!("Failed to transcribe audio: {}", e),
            )
        }
    }
}

/// POST /api/journal-entries
/// Save a transcript as a journal entry
pub async fn save_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SaveEntryRequest>,
) -> Response {
    if let Err(response) = authorize(&state, &headers).await {
        return response;
    }

    match state.journal.create_entry(&req.transcript).await {
        Ok(entry) => (StatusCode::OK, Json::<Entry>(entry)).into_response(),
        Err(JournalError::EmptyTranscript) => {
            error_response(StatusCode::BAD_REQUEST, "Empty transcript not allowed")
        }
        Err(e) => {
            error!("Failed to save journal entry: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save journal entry",
            )
        }
    }
}

/// GET /api/journal-entries
/// List journal entries, newest first
pub async fn list_entries(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&state, &headers).await {
        return response;
    }

    match state.journal.list_entries().await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => {
            error!("Failed to fetch journal entries: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error fetching journal entries",
            )
        }
    }
}

/// POST /api/journal-entries/cleanup
/// Delete entries with blank transcripts
pub async fn cleanup_entries(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&state, &headers).await {
        return response;
    }

    match state.journal.delete_empty().await {
        Ok(deleted) => (
            StatusCode::OK,
            Json(CleanupResponse {
                message: format!("Deleted {} empty entries", deleted),
                deleted,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Error cleaning up empty entries: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to clean up empty entries",
            )
        }
    }
}
