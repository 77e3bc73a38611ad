//! Relevance judgment returned by the completion backend.

use serde::{Deserialize, Serialize};

/// Per-memory relevance mask plus the backend's short rationale.
///
/// `relevance_list[i]` is the judgment for the i-th memory passed to the
/// filter; the list always has exactly one entry per memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceResponse {
    pub relevance_list: Vec<bool>,
    pub reasoning: String,
}

impl RelevanceResponse {
    /// Indices of the memories judged relevant.
    pub fn relevant_indices(&self) -> Vec<usize> {
        self.relevance_list
            .iter()
            .enumerate()
            .filter_map(|(i, relevant)| relevant.then_some(i))
            .collect()
    }

    /// Keep the items whose mask entry is true, preserving order.
    pub fn select<T: Clone>(&self, items: &[T]) -> Vec<T> {
        self.relevant_indices()
            .into_iter()
            .filter_map(|i| items.get(i).cloned())
            .collect()
    }
}
