//! Synchronous facade over [`MemoryFilter`] for callers without an async runtime.

use std::sync::Arc;

use crate::error::{RecallError, RecallResult};
use crate::types::{Message, RelevanceResponse};

use super::MemoryFilter;

/// Blocking wrapper that drives a [`MemoryFilter`] on its own tokio runtime.
///
/// Must not be used from inside an async context; blocking on a runtime from
/// within another runtime panics.
pub struct BlockingMemoryFilter {
    inner: MemoryFilter,
    runtime: Arc<tokio::runtime::Runtime>,
}

impl BlockingMemoryFilter {
    /// Wrap a filter, creating a current-thread runtime for it.
    pub fn new(inner: MemoryFilter) -> RecallResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RecallError::Internal(format!("Failed to create runtime: {}", e)))?;

        Ok(Self {
            inner,
            runtime: Arc::new(runtime),
        })
    }

    /// Wrap a filter, sharing an existing runtime.
    pub fn with_runtime(inner: MemoryFilter, runtime: Arc<tokio::runtime::Runtime>) -> Self {
        Self { inner, runtime }
    }

    /// Model identifier of the backend the filter calls.
    pub fn completion_model(&self) -> &str {
        self.inner.completion_model()
    }

    /// Blocking version of [`MemoryFilter::filter_relevant_memories`].
    pub fn filter_relevant_memories<S: AsRef<str>>(
        &self,
        conversation: &[Message],
        memories: &[S],
    ) -> RecallResult<Vec<bool>> {
        self.runtime
            .block_on(self.inner.filter_relevant_memories(conversation, memories))
    }

    /// Blocking version of [`MemoryFilter::filter_with_reasoning`].
    pub fn filter_with_reasoning<S: AsRef<str>>(
        &self,
        conversation: &[Message],
        memories: &[S],
    ) -> RecallResult<RelevanceResponse> {
        self.runtime
            .block_on(self.inner.filter_with_reasoning(conversation, memories))
    }
}
