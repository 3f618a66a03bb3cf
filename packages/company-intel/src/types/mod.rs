//! Data types shared by the pipelines, stores and callers.

pub mod chunk;
pub mod config;
pub mod pattern;
pub mod record;
pub mod summary;
