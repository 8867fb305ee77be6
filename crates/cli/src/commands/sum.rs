//! `issuefold sum`: fetch an issue thread and reduce it to one summary.

use std::io::IsTerminal;

use issuefold_config::{AppConfig, ErrorPolicy};
use issuefold_core::{IssueRef, IssueSource};
use issuefold_github::GitHubIssueSource;
use issuefold_providers::build_from_config;
use issuefold_reducer::{DirectoryDump, FailurePolicy, PromptTemplate, Reducer, Reduction};
use tracing::info;

use crate::SumArgs;
use crate::render;

pub async fn run(args: SumArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let backend = args.backend.unwrap_or(config.default_backend);
    let summarizer = build_from_config(&config, backend)?;
    let reducer = build_reducer(&args, &config)?;

    let source = github_source(&config);
    let issue = IssueRef::new(&args.org, &args.repo, args.issue);
    info!(issue = %issue, backend = %backend, "Fetching issue thread");
    let thread = source.fetch_thread(&issue).await?;

    let reduction = match &args.dump {
        Some(dir) => {
            let mut sink = DirectoryDump::new(dir);
            reducer
                .reduce_with_sink(&thread, summarizer.as_ref(), &mut sink)
                .await?
        }
        None => reducer.reduce(&thread, summarizer.as_ref()).await?,
    };

    eprintln!("{}", step_summary(&reduction, thread.comments.len()));

    if args.raw || !std::io::stdout().is_terminal() {
        println!("{}", reduction.summary);
    } else {
        println!("{}", render::render_markdown(&reduction.summary));
    }

    Ok(())
}

fn build_reducer(args: &SumArgs, config: &AppConfig) -> Result<Reducer, Box<dyn std::error::Error>> {
    let template = match args.prompt.as_ref().or(config.prompt_file.as_ref()) {
        Some(path) => PromptTemplate::load(path)?,
        None => PromptTemplate::builtin(),
    };
    Ok(Reducer::new(args.budget.unwrap_or(config.token_budget))
        .with_template(template)
        .with_policy(failure_policy(args.abort_on_error, config.on_summarize_error)))
}

fn failure_policy(abort_on_error: bool, configured: ErrorPolicy) -> FailurePolicy {
    match (abort_on_error, configured) {
        (true, _) | (false, ErrorPolicy::Abort) => FailurePolicy::Abort,
        (false, ErrorPolicy::Skip) => FailurePolicy::SkipAndContinue,
    }
}

fn github_source(config: &AppConfig) -> GitHubIssueSource {
    let source = GitHubIssueSource::new(config.github.token.clone());
    match &config.github.api_url {
        Some(url) => source.with_api_url(url),
        None => source,
    }
}

fn step_summary(reduction: &Reduction, comments: usize) -> String {
    let oversized = reduction.steps.iter().filter(|s| s.oversized).count();
    let mut line = format!(
        "Summarized {comments} comment(s) in {} call(s)",
        reduction.calls()
    );
    if reduction.failed_steps() > 0 {
        line.push_str(&format!(", {} failed", reduction.failed_steps()));
    }
    if oversized > 0 {
        line.push_str(&format!(", {oversized} over budget"));
    }
    line
}
