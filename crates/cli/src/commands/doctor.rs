//! `issuefold doctor`: diagnose setup problems.

use issuefold_config::{AppConfig, Backend};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("issuefold doctor");
    println!("================\n");

    let config_path = AppConfig::config_path();
    if config_path.exists() {
        println!("  [ok] Config file found: {}", config_path.display());
    } else {
        println!("  [--] No config file, using defaults (run `issuefold onboard`)");
    }

    let (lines, issues) = match AppConfig::load() {
        Ok(config) => {
            println!("  [ok] Configuration valid");
            diagnose(&config)
        }
        Err(e) => (vec![format!("  [!!] Configuration invalid: {e}")], 1),
    };
    for line in &lines {
        println!("{line}");
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
        Ok(())
    } else {
        println!("  {issues} issue(s) found. See above for details.");
        Err(format!("doctor found {issues} issue(s)").into())
    }
}

/// Check a loaded config. Returns report lines and the number of issues.
fn diagnose(config: &AppConfig) -> (Vec<String>, usize) {
    let mut lines = Vec::new();
    let mut issues = 0;

    for backend in [Backend::Gemini, Backend::Vertex] {
        let marker = if backend == config.default_backend { " (default)" } else { "" };
        let missing = config.missing_credentials(backend);
        if missing.is_empty() {
            lines.push(format!("  [ok] {backend}{marker} credentials configured"));
        } else {
            lines.push(format!("  [!!] {backend}{marker} missing: {}", missing.join(", ")));
            if backend == config.default_backend {
                issues += 1;
            }
        }
    }

    if config.github.token.is_some() {
        lines.push("  [ok] GitHub token configured".into());
    } else {
        lines.push("  [--] No GitHub token, unauthenticated rate limits apply".into());
    }

    if let Some(prompt) = &config.prompt_file {
        match issuefold_reducer::PromptTemplate::load(prompt) {
            Ok(_) => lines.push(format!("  [ok] Prompt template parses: {}", prompt.display())),
            Err(e) => {
                lines.push(format!("  [!!] Prompt template: {e}"));
                issues += 1;
            }
        }
    }

    (lines, issues)
}
