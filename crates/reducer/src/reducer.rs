//! The bounded reducer loop.
//!
//! Folds an issue thread into one summary through repeated summarize calls,
//! each prompt packed to stay within a fixed token budget:
//!
//! ```text
//! seed = count(render(summary, []))
//! loop {
//!     batch   = pack(cursor, seed)      // count(render(summary, batch)) <= budget
//!     summary = summarize(batch.prompt) // kept on failure
//!     seed    = count(render(summary, []))
//! } until cursor == comments.len()
//! ```

use crate::dump::{DumpSink, NoDump, StepRecord};
use crate::packing::{Batch, pack};
use crate::template::{PromptTemplate, PromptValues};
use issuefold_core::{IssueThread, SummarizeError, Summarizer};
use std::ops::Range;
use tracing::{debug, info, warn};

/// Summary text before the first successful call.
pub const NO_SUMMARY_YET: &str = "No summary yet";

/// What to do when a summarize call fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Keep the previous summary and move past the batch.
    #[default]
    SkipAndContinue,
    /// Stop the run with the failing step's error.
    Abort,
}

/// Token-budgeted incremental summarizer.
#[derive(Debug, Clone)]
pub struct Reducer {
    template: PromptTemplate,
    budget: usize,
    policy: FailurePolicy,
}

impl Reducer {
    /// Reducer with the built-in prompt and the skip policy.
    pub fn new(budget: usize) -> Self {
        Self {
            template: PromptTemplate::builtin(),
            budget,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Reduce `thread` to a single summary.
    pub async fn reduce(
        &self,
        thread: &IssueThread,
        summarizer: &dyn Summarizer,
    ) -> Result<Reduction, ReduceError> {
        self.reduce_with_sink(thread, summarizer, &mut NoDump).await
    }

    /// Reduce `thread`, handing every prompt and outcome to `sink`.
    pub async fn reduce_with_sink(
        &self,
        thread: &IssueThread,
        summarizer: &dyn Summarizer,
        sink: &mut dyn DumpSink,
    ) -> Result<Reduction, ReduceError> {
        let fragments = thread.comments.as_slice();
        let mut summary = NO_SUMMARY_YET.to_string();
        let mut seed = self.measure_seed(thread, &summary, summarizer).await;

        if seed > self.budget {
            return Err(ReduceError::BudgetTooSmall {
                budget: self.budget,
                required: seed,
            });
        }

        info!(
            backend = summarizer.name(),
            comments = fragments.len(),
            budget = self.budget,
            seed,
            "Starting reduction"
        );

        let mut cursor = 0;
        let mut steps: Vec<StepReport> = Vec::new();
        let mut last_error: Option<SummarizeError> = None;

        loop {
            let step = steps.len() + 1;
            if seed > self.budget {
                warn!(
                    step,
                    seed,
                    budget = self.budget,
                    "Summary alone exceeds the budget, next comment goes in by itself"
                );
            }

            let values = PromptValues {
                original_issue_title: &thread.title,
                original_issue_description: &thread.body,
                current_summary: &summary,
                issues: &[],
            };
            let batch = pack(
                &self.template,
                &values,
                fragments,
                cursor,
                seed,
                self.budget,
                summarizer,
            )
            .await;
            if batch.oversized {
                warn!(
                    step,
                    comment = batch.range.start,
                    tokens = batch.prompt_tokens,
                    budget = self.budget,
                    "Comment does not fit the budget, sending it alone"
                );
            }

            info!(
                step,
                comments = batch.len(),
                from = batch.range.start,
                tokens = batch.prompt_tokens,
                "Summarizing batch"
            );

            let outcome = summarizer.summarize(&batch.prompt).await;
            self.dump(sink, step, &batch, &outcome);
            cursor = batch.range.end;

            let error = match outcome {
                Ok(text) => {
                    debug!(step, chars = text.len(), "Summary updated");
                    summary = text;
                    None
                }
                Err(e) => {
                    warn!(step, error = %e, "Summarize call failed, keeping previous summary");
                    if self.policy == FailurePolicy::Abort {
                        return Err(ReduceError::Aborted { step, source: e });
                    }
                    last_error = Some(e.clone());
                    Some(e)
                }
            };

            steps.push(StepReport {
                step,
                fragments: batch.range.clone(),
                prompt_tokens: batch.prompt_tokens,
                oversized: batch.oversized,
                error,
            });

            if cursor >= fragments.len() {
                break;
            }
            seed = self.measure_seed(thread, &summary, summarizer).await;
        }

        if let Some(last) = last_error.filter(|_| steps.iter().all(|s| s.error.is_some())) {
            return Err(ReduceError::AllCallsFailed {
                attempts: steps.len(),
                last,
            });
        }

        let reduction = Reduction { summary, steps };
        info!(
            calls = reduction.calls(),
            failed = reduction.failed_steps(),
            "Reduction complete"
        );
        Ok(reduction)
    }

    /// Token count of the prompt with `summary` and no comments.
    async fn measure_seed(
        &self,
        thread: &IssueThread,
        summary: &str,
        summarizer: &dyn Summarizer,
    ) -> usize {
        let empty = self.template.render(&PromptValues {
            original_issue_title: &thread.title,
            original_issue_description: &thread.body,
            current_summary: summary,
            issues: &[],
        });
        summarizer.count_tokens(&empty).await
    }

    fn dump(
        &self,
        sink: &mut dyn DumpSink,
        step: usize,
        batch: &Batch,
        outcome: &Result<String, SummarizeError>,
    ) {
        let record = StepRecord {
            step,
            fragments: batch.range.clone(),
            prompt_tokens: batch.prompt_tokens,
            prompt: &batch.prompt,
            outcome: outcome.as_ref().map(String::as_str),
        };
        if let Err(e) = sink.record(&record) {
            warn!(step, error = %e, "Failed to write debug dump");
        }
    }
}

/// Result of a completed reduction.
#[derive(Debug, Clone)]
pub struct Reduction {
    pub summary: String,
    pub steps: Vec<StepReport>,
}

impl Reduction {
    /// Number of summarize calls made.
    pub fn calls(&self) -> usize {
        self.steps.len()
    }

    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.error.is_some()).count()
    }
}

/// What happened in one step.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub step: usize,
    pub fragments: Range<usize>,
    pub prompt_tokens: usize,
    pub oversized: bool,
    pub error: Option<SummarizeError>,
}

/// Terminal reduction failures.
#[derive(Debug, thiserror::Error)]
pub enum ReduceError {
    #[error("Token budget {budget} cannot hold the prompt template, which needs {required}")]
    BudgetTooSmall { budget: usize, required: usize },

    #[error("All {attempts} summarize calls failed; last error: {last}")]
    AllCallsFailed {
        attempts: usize,
        #[source]
        last: SummarizeError,
    },

    #[error("Summarize call failed at step {step}: {source}")]
    Aborted {
        step: usize,
        source: SummarizeError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedSummarizer;

    // "T=Title S=No summary yet " is 4 words; every comment below is 2.
    const TEMPLATE: &str =
        "T={{ .OriginalIssueTitle }} S={{ .CurrentSummary }} {{ range .Issues }}{{ .Body }} {{ end }}";

    fn reducer(budget: usize) -> Reducer {
        Reducer::new(budget).with_template(PromptTemplate::parse(TEMPLATE).unwrap())
    }

    fn thread(bodies: &[&str]) -> IssueThread {
        IssueThread::new("Title", "Description").with_comments(bodies.iter().copied())
    }

    fn incomplete() -> SummarizeError {
        SummarizeError::IncompleteGeneration {
            finish_reason: "MAX_TOKENS".into(),
        }
    }

    #[tokio::test]
    async fn large_budget_packs_everything_into_one_call() {
        let s = ScriptedSummarizer::replies(&["all three summarized"]);
        let out = reducer(10)
            .reduce(&thread(&["a b", "c d", "e f"]), &s)
            .await
            .unwrap();

        assert_eq!(out.summary, "all three summarized");
        assert_eq!(out.calls(), 1);
        assert_eq!(out.steps[0].fragments, 0..3);
        assert_eq!(out.steps[0].prompt_tokens, 10);
        assert_eq!(s.prompts(), vec!["T=Title S=No summary yet a b c d e f "]);
    }

    #[tokio::test]
    async fn tight_budget_feeds_each_summary_into_the_next_call() {
        let s = ScriptedSummarizer::replies(&["first summary here", "second summary here", "third summary here"]);
        let out = reducer(6)
            .reduce(&thread(&["a b", "c d", "e f"]), &s)
            .await
            .unwrap();

        assert_eq!(out.summary, "third summary here");
        assert_eq!(out.calls(), 3);
        assert_eq!(
            s.prompts(),
            vec![
                "T=Title S=No summary yet a b ",
                "T=Title S=first summary here c d ",
                "T=Title S=second summary here e f ",
            ]
        );
        let ranges: Vec<_> = out.steps.iter().map(|s| s.fragments.clone()).collect();
        assert_eq!(ranges, vec![0..1, 1..2, 2..3]);
    }

    #[tokio::test]
    async fn budget_below_template_makes_no_calls() {
        let s = ScriptedSummarizer::new(vec![]);
        let err = reducer(3).reduce(&thread(&["a b"]), &s).await.unwrap_err();

        assert!(matches!(
            err,
            ReduceError::BudgetTooSmall {
                budget: 3,
                required: 4
            }
        ));
        assert_eq!(s.call_count(), 0);
    }

    #[tokio::test]
    async fn no_comments_still_makes_one_call() {
        let s = ScriptedSummarizer::replies(&["nothing discussed"]);
        let out = reducer(4).reduce(&thread(&[]), &s).await.unwrap();

        assert_eq!(out.summary, "nothing discussed");
        assert_eq!(out.calls(), 1);
        assert_eq!(out.steps[0].fragments, 0..0);
        assert_eq!(s.prompts(), vec!["T=Title S=No summary yet "]);
    }

    #[tokio::test]
    async fn oversized_comment_goes_alone() {
        let s = ScriptedSummarizer::replies(&["big one done", "small done too"]);
        let out = reducer(6)
            .reduce(&thread(&["one two three", "a"]), &s)
            .await
            .unwrap();

        assert_eq!(out.calls(), 2);
        assert!(out.steps[0].oversized);
        assert_eq!(out.steps[0].fragments, 0..1);
        assert_eq!(out.steps[0].prompt_tokens, 7);
        assert!(!out.steps[1].oversized);
        assert_eq!(out.summary, "small done too");
    }

    #[tokio::test]
    async fn summary_outgrowing_budget_still_terminates() {
        let s = ScriptedSummarizer::replies(&["one two three four five", "short again now"]);
        let out = reducer(6)
            .reduce(&thread(&["a b", "c d"]), &s)
            .await
            .unwrap();

        assert_eq!(out.calls(), 2);
        assert!(out.steps[1].oversized);
        assert_eq!(out.summary, "short again now");
    }

    #[tokio::test]
    async fn skip_policy_keeps_stale_summary_and_moves_on() {
        let s = ScriptedSummarizer::new(vec![Err(incomplete()), Ok("fine summary now".into())]);
        let out = reducer(6)
            .reduce(&thread(&["a b", "c d"]), &s)
            .await
            .unwrap();

        assert_eq!(out.summary, "fine summary now");
        assert_eq!(out.failed_steps(), 1);
        assert!(matches!(
            out.steps[0].error,
            Some(SummarizeError::IncompleteGeneration { .. })
        ));
        assert_eq!(s.prompts()[1], "T=Title S=No summary yet c d ");
    }

    #[tokio::test]
    async fn abort_policy_stops_at_first_failure() {
        let s = ScriptedSummarizer::new(vec![Ok("fine".into()), Err(incomplete())]);
        let err = reducer(6)
            .with_policy(FailurePolicy::Abort)
            .reduce(&thread(&["a b", "c d", "e f"]), &s)
            .await
            .unwrap_err();

        match err {
            ReduceError::Aborted { step, source } => {
                assert_eq!(step, 2);
                assert!(matches!(source, SummarizeError::IncompleteGeneration { .. }));
            }
            other => panic!("Expected Aborted, got {other:?}"),
        }
        assert_eq!(s.call_count(), 2);
    }

    #[tokio::test]
    async fn every_call_failing_is_an_error() {
        let blocked = SummarizeError::NoCandidates {
            block_reason: Some("SAFETY".into()),
            blocked_categories: vec![],
        };
        let s = ScriptedSummarizer::new(vec![Err(incomplete()), Err(blocked)]);
        let err = reducer(6)
            .reduce(&thread(&["a b", "c d"]), &s)
            .await
            .unwrap_err();

        match err {
            ReduceError::AllCallsFailed { attempts, last } => {
                assert_eq!(attempts, 2);
                assert!(matches!(last, SummarizeError::NoCandidates { .. }));
            }
            other => panic!("Expected AllCallsFailed, got {other:?}"),
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        seen: Vec<(usize, Range<usize>, bool)>,
    }

    impl DumpSink for RecordingSink {
        fn record(&mut self, step: &StepRecord<'_>) -> std::io::Result<()> {
            self.seen
                .push((step.step, step.fragments.clone(), step.outcome.is_ok()));
            Ok(())
        }
    }

    struct BrokenSink;

    impl DumpSink for BrokenSink {
        fn record(&mut self, _step: &StepRecord<'_>) -> std::io::Result<()> {
            Err(std::io::Error::other("disk full"))
        }
    }

    #[tokio::test]
    async fn sink_sees_every_step() {
        let s = ScriptedSummarizer::new(vec![Ok("ok one".into()), Err(incomplete())]);
        let mut sink = RecordingSink::default();
        reducer(6)
            .reduce_with_sink(&thread(&["a b", "c d"]), &s, &mut sink)
            .await
            .unwrap();

        assert_eq!(sink.seen, vec![(1, 0..1, true), (2, 1..2, false)]);
    }

    #[tokio::test]
    async fn sink_failure_does_not_stop_the_run() {
        let s = ScriptedSummarizer::replies(&["done"]);
        let out = reducer(10)
            .reduce_with_sink(&thread(&["a b"]), &s, &mut BrokenSink)
            .await
            .unwrap();
        assert_eq!(out.summary, "done");
    }
}
