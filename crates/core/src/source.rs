//! Issue source trait: where issue threads come from.

use async_trait::async_trait;
use crate::error::SourceError;
use crate::thread::{IssueRef, IssueThread};

/// Supplies an issue's title, body, and ordered comments.
///
/// Pagination and authentication are entirely the implementation's concern.
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// A human-readable name for this source (e.g., "github").
    fn name(&self) -> &str;

    /// Fetch the full thread for one issue, comments in chronological order.
    async fn fetch_thread(&self, issue: &IssueRef) -> std::result::Result<IssueThread, SourceError>;
}
