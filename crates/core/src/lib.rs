//! # issuefold Core
//!
//! Domain types, traits, and error definitions for issuefold.
//! This crate has **no I/O**; it defines the domain model that the
//! provider, issue-source, and reducer crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping the summarization backend via configuration
//! - Testing the reducer with scripted stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod source;
pub mod summarizer;
pub mod thread;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result, SafetyFlag, SourceError, SummarizeError};
pub use source::IssueSource;
pub use summarizer::{Summarizer, estimate_tokens};
pub use thread::{Fragment, IssueRef, IssueThread};
