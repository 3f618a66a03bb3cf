//! Prompt chains and the orchestrators built on them.

pub mod chain;
pub mod domain;
pub mod email;
pub mod normalize;
pub mod prompts;
pub mod rag;
pub mod service;
pub mod split;
pub mod summarize;
pub mod translate;
