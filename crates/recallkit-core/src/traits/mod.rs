//! Core traits for recallkit providers.

mod llm;

pub use llm::*;
