use tokio::sync::RwLock;
use tracing::info;

use super::store::{Entry, JournalError, JournalStore};

/// Process-local journal store
#[derive(Default)]
pub struct InMemoryJournalStore {
    entries: RwLock<Vec<Entry>>,
}

impl InMemoryJournalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an existing entry as-is, bypassing validation
    pub async fn insert(&self, entry: Entry) {
        self.entries.write().await.push(entry);
    }
}

#[async_trait::async_trait]
impl JournalStore for InMemoryJournalStore {
    async fn create_entry(&self, transcript: &str) -> Result<Entry, JournalError> {
        if transcript.trim().is_empty() {
            return Err(JournalError::EmptyTranscript);
        }

        let entry = Entry::new(transcript);
        self.entries.write().await.push(entry.clone());

        info!("Saved journal entry {} ({} chars)", entry.id, transcript.len());

        Ok(entry)
    }

    async fn list_entries(&self) -> Result<Vec<Entry>, JournalError> {
        let mut entries = self.entries.read().await.clone();
        // Later inserts win ties on equal timestamps
        entries.reverse();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn delete_empty(&self) -> Result<usize, JournalError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| !e.is_empty());
        let deleted = before - entries.len();

        info!("Deleted {} empty journal entries", deleted);

        Ok(deleted)
    }
}
