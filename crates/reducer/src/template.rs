//! Prompt template parsing and rendering.
//!
//! Templates reference four named values:
//!
//! | Placeholder | Value |
//! |-------------|-------|
//! | `{{ .OriginalIssueTitle }}` | issue title |
//! | `{{ .OriginalIssueDescription }}` | issue body |
//! | `{{ .CurrentSummary }}` | running summary |
//! | `{{ range .Issues }}…{{ .Body }}…{{ end }}` | batch of comment bodies, in order |
//!
//! Parsing happens once; rendering is pure string assembly, so the same
//! values always render to byte-identical output.

use issuefold_core::Fragment;
use std::path::Path;

const BUILTIN_TEMPLATE: &str = include_str!("../prompts/summarize.txt");

/// Named values substituted into a template.
#[derive(Debug, Clone, Copy)]
pub struct PromptValues<'a> {
    pub original_issue_title: &'a str,
    pub original_issue_description: &'a str,
    pub current_summary: &'a str,
    pub issues: &'a [Fragment],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Description,
    Summary,
    Body,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field(Field),
    /// Repeated once per fragment; only `Text` and `Field(Body)` inside.
    Issues(Vec<Segment>),
}

/// A parsed prompt template.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Parse template text.
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        let mut top: Vec<Segment> = Vec::new();
        let mut range: Option<Vec<Segment>> = None;
        let mut rest = text;
        let mut offset = 0;

        while let Some(open) = rest.find("{{") {
            let literal = &rest[..open];
            let after_open = &rest[open + 2..];
            let Some(close) = after_open.find("}}") else {
                return Err(TemplateError::Unterminated {
                    offset: offset + open,
                });
            };
            let action = after_open[..close].trim();

            let in_range = range.is_some();
            let target = range.as_mut().unwrap_or(&mut top);
            if !literal.is_empty() {
                target.push(Segment::Text(literal.to_string()));
            }

            match action {
                ".OriginalIssueTitle" => target.push(Segment::Field(Field::Title)),
                ".OriginalIssueDescription" => target.push(Segment::Field(Field::Description)),
                ".CurrentSummary" => target.push(Segment::Field(Field::Summary)),
                ".Body" if in_range => target.push(Segment::Field(Field::Body)),
                ".Body" => return Err(TemplateError::BodyOutsideRange),
                "range .Issues" => {
                    if in_range {
                        return Err(TemplateError::NestedRange);
                    }
                    range = Some(Vec::new());
                }
                "end" => match range.take() {
                    Some(body) => top.push(Segment::Issues(body)),
                    None => return Err(TemplateError::UnexpectedEnd),
                },
                other => return Err(TemplateError::UnknownAction(other.to_string())),
            }

            let consumed = open + 2 + close + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }

        if range.is_some() {
            return Err(TemplateError::UnclosedRange);
        }
        if !rest.is_empty() {
            top.push(Segment::Text(rest.to_string()));
        }

        Ok(Self { segments: top })
    }

    /// The built-in summarization prompt.
    pub fn builtin() -> Self {
        Self::parse(BUILTIN_TEMPLATE).expect("built-in prompt template is valid")
    }

    /// Load and parse a template file.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let text = std::fs::read_to_string(path).map_err(|e| TemplateError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&text)
    }

    /// Substitute `values` into the template.
    pub fn render(&self, values: &PromptValues<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Issues(body) => {
                    for issue in values.issues {
                        render_segments(body, values, Some(issue), &mut out);
                    }
                }
                other => render_segments(std::slice::from_ref(other), values, None, &mut out),
            }
        }
        out
    }

    /// The text one fragment adds to the prompt: every `range .Issues`
    /// body rendered for `issue` alone.
    pub fn render_issue(&self, values: &PromptValues<'_>, issue: &Fragment) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            if let Segment::Issues(body) = segment {
                render_segments(body, values, Some(issue), &mut out);
            }
        }
        out
    }
}

fn render_segments(
    segments: &[Segment],
    values: &PromptValues<'_>,
    issue: Option<&Fragment>,
    out: &mut String,
) {
    for segment in segments {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Field(Field::Title) => out.push_str(values.original_issue_title),
            Segment::Field(Field::Description) => out.push_str(values.original_issue_description),
            Segment::Field(Field::Summary) => out.push_str(values.current_summary),
            Segment::Field(Field::Body) => {
                if let Some(issue) = issue {
                    out.push_str(&issue.body);
                }
            }
            Segment::Issues(_) => {}
        }
    }
}

/// Template parse and load errors.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Unterminated '{{{{' at byte {offset}")]
    Unterminated { offset: usize },

    #[error("Unknown template action: '{0}'")]
    UnknownAction(String),

    #[error("'.Body' is only valid inside 'range .Issues'")]
    BodyOutsideRange,

    #[error("'range .Issues' blocks cannot be nested")]
    NestedRange,

    #[error("'end' without a matching 'range .Issues'")]
    UnexpectedEnd,

    #[error("'range .Issues' is never closed with 'end'")]
    UnclosedRange,

    #[error("Failed to read template {path}: {reason}")]
    Read { path: String, reason: String },
}
