// Company Intel - API Core
//
// Thin HTTP wrapper around the company-intel pipelines: every route parses
// a JSON map, hands it to `IntelService`, and writes the answers back keyed
// the same way.

pub mod config;
pub mod server;

pub use config::*;
