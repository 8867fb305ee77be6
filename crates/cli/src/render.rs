//! Terminal rendering for markdown summaries.
//!
//! Handles the subset the summaries use: ATX headings, bullet lists,
//! fenced code, `**bold**` and inline `code`. Everything else passes
//! through unchanged.

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const MAGENTA: &str = "\x1b[35m";
const CYAN: &str = "\x1b[36m";
const BULLET: &str = "•";

/// Render markdown into ANSI-styled text.
pub fn render_markdown(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len() + 64);
    let mut in_fence = false;

    for line in markdown.lines() {
        let trimmed = line.trim_start();

        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            out.push_str(&format!("    {DIM}{line}{RESET}\n"));
            continue;
        }

        if let Some((level, text)) = heading(trimmed) {
            let color = match level {
                1 => MAGENTA,
                2 => CYAN,
                _ => "",
            };
            out.push_str(&format!("{BOLD}{color}{}{RESET}\n", inline(text)));
        } else if let Some(item) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        {
            let indent = &line[..line.len() - trimmed.len()];
            out.push_str(&format!("{indent}  {BULLET} {}\n", inline(item)));
        } else {
            out.push_str(&inline(line));
            out.push('\n');
        }
    }

    out
}

/// `# Title` → `(1, "Title")`.
fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    line[level..].strip_prefix(' ').map(|text| (level, text.trim()))
}

/// Style `**bold**` and `` `code` `` spans.
fn inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('`') {
            if let Some(end) = after.find('`') {
                out.push_str(&format!("{DIM}{}{RESET}", &after[..end]));
                rest = &after[end + 1..];
                continue;
            }
        } else if let Some(after) = rest.strip_prefix("**") {
            if let Some(end) = after.find("**") {
                out.push_str(&format!("{BOLD}{}{RESET}", &after[..end]));
                rest = &after[end + 2..];
                continue;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    out
}
