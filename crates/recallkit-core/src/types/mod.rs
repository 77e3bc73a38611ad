//! Core types for recallkit.

mod message;
mod relevance;

pub use message::*;
pub use relevance::*;
