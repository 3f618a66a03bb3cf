// HTTP routes
pub mod health;
pub mod intel;
pub mod rag;

pub use health::*;
pub use intel::*;
pub use rag::*;
