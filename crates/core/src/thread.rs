//! Issue thread types: the ordered input the reducer folds into a summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies one issue on a repository host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl IssueRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            number,
        }
    }
}

impl std::fmt::Display for IssueRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// One immutable piece of source text, usually a comment body.
///
/// Only `body` reaches the prompt; the rest is informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub body: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Fragment {
    /// A fragment with no metadata.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            author: None,
            created_at: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// An issue plus its comments, in chronological order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueThread {
    pub title: String,
    pub body: String,
    pub comments: Vec<Fragment>,
}

impl IssueThread {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            comments: Vec::new(),
        }
    }

    /// Append comment bodies in the given order.
    pub fn with_comments<I, S>(mut self, bodies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.comments.extend(bodies.into_iter().map(Fragment::new));
        self
    }
}
