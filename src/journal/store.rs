use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A saved journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: Uuid,
    pub transcript: String,
    pub created_at: DateTime<Utc>,
}

impl Entry {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            transcript: transcript.into(),
            created_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.transcript.trim().is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("empty transcript not allowed")]
    EmptyTranscript,

    #[error("journal storage failed: {0}")]
    Storage(String),
}

/// Persistence for journal entries
#[async_trait::async_trait]
pub trait JournalStore: Send + Sync {
    /// Save a transcript. Blank transcripts are rejected.
    async fn create_entry(&self, transcript: &str) -> Result<Entry, JournalError>;

    /// All entries, newest first
    async fn list_entries(&self) -> Result<Vec<Entry>, JournalError>;

    /// Remove entries whose transcript is blank, returning how many
    async fn delete_empty(&self) -> Result<usize, JournalError>;
}
