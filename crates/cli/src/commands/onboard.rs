//! `issuefold onboard`: first-time setup.

use issuefold_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = AppConfig::config_path();

    println!("issuefold setup");
    println!("===============\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n  Config already exists at: {}", config_path.display());
        println!("  Edit it manually or delete it and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("  Created config.toml at: {}", config_path.display());
    println!("\n  Next steps:");
    println!("   1. Set GEMINI_API_KEY, or add [gemini] api_key to the config");
    println!("      (Vertex AI: set GOOGLE_CLOUD_PROJECT and VERTEX_ACCESS_TOKEN)");
    println!("   2. Optionally set GITHUB_TOKEN for higher rate limits");
    println!("   3. Run: issuefold sum -o <org> -r <repo> -i <issue>\n");

    Ok(())
}
