pub mod config;
pub mod cycles;
pub mod dirs;
pub mod discovery;
pub mod error;
pub mod extractor;
pub mod orchestrator;
pub mod ordering;
pub mod overrides;
pub mod require_config;
pub mod resolver;
pub mod types;
pub mod util;
pub mod writer;
