//! Per-conversation session store
//!
//! Process-wide mapping from a conversation id to the candidate list of its
//! most recent search. Entries are overwritten wholesale on every new search
//! (no merge, no history) and live for the process lifetime.
//!
//! Concurrency contract: independent conversations never interfere; all
//! reads see a single atomic snapshot of an entry taken under the store
//! lock. A search racing a selection for the *same* conversation is
//! last-write-wins, which is accepted behavior.

use crate::error::{Result, SessionError};
use crate::types::Candidate;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Shared store of the most recent candidate list per conversation
#[derive(Debug, Default)]
pub struct SessionStore {
    entries: RwLock<HashMap<i64, Vec<Candidate>>>,
}

impl SessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `candidates` for `conversation_id`, replacing any prior entry
    pub async fn put(&self, conversation_id: i64, candidates: Vec<Candidate>) {
        debug!(
            conversation_id,
            count = candidates.len(),
            "storing session entry"
        );
        self.entries
            .write()
            .await
            .insert(conversation_id, candidates);
    }

    /// Snapshot of the conversation's current candidate list, if any
    pub async fn get(&self, conversation_id: i64) -> Option<Vec<Candidate>> {
        self.entries.read().await.get(&conversation_id).cloned()
    }

    /// Resolve a selection index against the conversation's current entry.
    ///
    /// Fails with [`SessionError::Expired`] when the conversation has no
    /// entry and [`SessionError::SelectionNotFound`] when no candidate in
    /// the entry carries the requested index. The lookup is a linear scan:
    /// entries hold at most a handful of candidates.
    pub async fn find_by_index(&self, conversation_id: i64, index: &str) -> Result<Candidate> {
        let entries = self.entries.read().await;
        let candidates = entries
            .get(&conversation_id)
            .ok_or(SessionError::Expired { conversation_id })?;
        candidates
            .iter()
            .find(|c| c.index == index)
            .cloned()
            .ok_or_else(|| {
                SessionError::SelectionNotFound {
                    conversation_id,
                    index: index.to_string(),
                }
                .into()
            })
    }
}
