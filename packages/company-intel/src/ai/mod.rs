//! Backend implementations of the [`AI`](crate::AI) trait.
//!
//! - `RateLimitedAI` wraps any backend with a request quota (always available)
//! - `OpenAI` talks to the OpenAI API (requires `openai` feature)

#[cfg(feature = "openai")]
mod openai;
mod rate_limited;

#[cfg(feature = "openai")]
pub use openai::{OpenAI, DEFAULT_EMBEDDING_MODEL, DEFAULT_MODEL};
pub use rate_limited::RateLimitedAI;
