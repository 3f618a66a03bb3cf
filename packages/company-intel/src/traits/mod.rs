//! Core trait abstractions.
//!
//! These traits define the seams to the external collaborators: the LLM
//! completion/embedding backend and the vector/document stores.

pub mod ai;
pub mod store;
