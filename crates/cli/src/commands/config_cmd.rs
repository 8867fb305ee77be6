//! `issuefold config`: configuration management commands.

use issuefold_config::{AppConfig, Backend};

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e.into());
        }
    };
    println!("   Config parsed successfully");

    let missing = config.missing_credentials(config.default_backend);
    if missing.is_empty() {
        println!("   All checks passed");
    } else {
        println!();
        for m in &missing {
            println!("   Missing for {}: {m}", config.default_backend);
        }
    }
    if config.github.token.is_none() {
        println!("   No GitHub token: requests are unauthenticated (GITHUB_TOKEN)");
    }

    println!();
    println!("   Backend:   {}", config.default_backend);
    println!("   Model:     {}", config.model);
    println!("   Budget:    {} tokens", config.token_budget);
    if config.default_backend == Backend::Vertex {
        println!("   Region:    {}", config.vertex.region);
    }

    Ok(())
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{}", toml::to_string_pretty(&masked(config))?);
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", AppConfig::config_path().display());
    Ok(())
}

/// Replace every secret with a placeholder.
fn masked(mut config: AppConfig) -> AppConfig {
    let mask = |secret: &mut Option<String>| {
        if secret.is_some() {
            *secret = Some("***".into());
        }
    };
    mask(&mut config.github.token);
    mask(&mut config.gemini.api_key);
    mask(&mut config.vertex.access_token);
    config
}
