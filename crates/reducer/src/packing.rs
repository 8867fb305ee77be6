//! Greedy batch packing.

use crate::template::{PromptTemplate, PromptValues};
use issuefold_core::{Fragment, Summarizer};
use std::ops::Range;

/// The fragments chosen for one summarize call, with the prompt they render to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Indices into the fragment list, `cursor..end`.
    pub range: Range<usize>,
    /// The template rendered with this batch.
    pub prompt: String,
    /// Token count of `prompt`.
    pub prompt_tokens: usize,
    /// A lone fragment whose prompt does not fit the budget.
    pub oversized: bool,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Pack fragments from `cursor` while the rendered prompt fits `budget`.
///
/// `seed` is the token count of the template rendered from `values` with no
/// fragments. Each candidate is priced by the text it adds to the prompt,
/// its `range .Issues` body, so separators count too. The finished prompt
/// is then counted as a whole and trailing fragments are dropped until it
/// fits.
///
/// A first fragment that cannot fit is taken alone so the cursor always
/// moves while fragments remain.
pub async fn pack(
    template: &PromptTemplate,
    values: &PromptValues<'_>,
    fragments: &[Fragment],
    cursor: usize,
    seed: usize,
    budget: usize,
    summarizer: &dyn Summarizer,
) -> Batch {
    let mut total = seed;
    let mut end = cursor;

    for fragment in &fragments[cursor..] {
        let cost = summarizer
            .count_tokens(&template.render_issue(values, fragment))
            .await;
        if total + cost > budget {
            if end == cursor {
                end += 1;
            }
            break;
        }
        total += cost;
        end += 1;
    }

    loop {
        let prompt = template.render(&PromptValues {
            issues: &fragments[cursor..end],
            ..*values
        });
        let prompt_tokens = summarizer.count_tokens(&prompt).await;
        let len = end - cursor;

        if prompt_tokens <= budget || len <= 1 {
            return Batch {
                range: cursor..end,
                prompt,
                prompt_tokens,
                oversized: len == 1 && prompt_tokens > budget,
            };
        }
        end -= 1;
    }
}
