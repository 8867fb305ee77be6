//! Summarization backends for issuefold.
//!
//! All backends implement the `issuefold_core::Summarizer` trait.
//! The router builds the configured one.

mod google;

pub mod gemini;
pub mod router;
pub mod vertex;

pub use gemini::GeminiSummarizer;
pub use router::build_from_config;
pub use vertex::VertexSummarizer;
