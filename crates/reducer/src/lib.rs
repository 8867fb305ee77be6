//! Token-budgeted reduction of an issue thread into a single summary.
//!
//! The [`Reducer`] packs comments into prompts that fit a token budget,
//! calls a [`Summarizer`](issuefold_core::Summarizer) once per batch and
//! carries the running summary from one call into the next.

pub mod dump;
pub mod packing;
pub mod reducer;
pub mod template;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use dump::{DirectoryDump, DumpSink, NoDump, StepRecord};
pub use packing::{Batch, pack};
pub use reducer::{FailurePolicy, NO_SUMMARY_YET, ReduceError, Reducer, Reduction, StepReport};
pub use template::{PromptTemplate, PromptValues, TemplateError};
