/// Core library for the yourMoment monitoring pipeline.
///
/// This crate contains the pipeline stage workers, the broker-backed task
/// model, persistence, configuration, and the adapter traits (scrape, LLM,
/// crypto) that keep external collaborators swappable and testable.
pub mod broker;
pub mod config;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod runtime;
pub mod scrape;
pub mod storage;
pub mod template;

pub use error::*;

/// Returns the version of the yourmoment-core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
