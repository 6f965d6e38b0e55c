//! Journal entry persistence
//!
//! Finalized transcripts end up here. The store is reached only through
//! `JournalStore`; the streaming core never touches it.

mod memory;
mod store;

pub use memory::InMemoryJournalStore;
pub use store::{Entry, JournalError, JournalStore};
