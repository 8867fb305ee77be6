//! Backend selection: builds the configured summarizer.
//!
//! Callers get an `Arc<dyn Summarizer>` and never learn which backend is
//! behind it.

use std::sync::Arc;
use std::time::Duration;

use issuefold_config::{AppConfig, Backend};
use issuefold_core::{Error, Result, Summarizer};
use tracing::debug;

use crate::gemini::GeminiSummarizer;
use crate::vertex::VertexSummarizer;

/// Build the summarizer for `backend` from configuration.
///
/// Fails when the backend's credentials are missing.
pub fn build_from_config(config: &AppConfig, backend: Backend) -> Result<Arc<dyn Summarizer>> {
    let missing = config.missing_credentials(backend);
    if !missing.is_empty() {
        return Err(Error::Config {
            message: format!("{backend} backend is missing: {}", missing.join(", ")),
        });
    }

    let timeout = Duration::from_secs(config.request_timeout_secs);
    debug!(backend = %backend, model = %config.model, "Building summarizer");

    let summarizer: Arc<dyn Summarizer> = match backend {
        Backend::Gemini => {
            let mut g = GeminiSummarizer::new(config.gemini.api_key.clone().unwrap_or_default())
                .with_model(&config.model)
                .with_temperature(config.temperature)
                .with_max_output_tokens(config.max_output_tokens)
                .with_timeout(timeout);
            if let Some(url) = &config.gemini.base_url {
                g = g.with_base_url(url);
            }
            Arc::new(g)
        }
        Backend::Vertex => {
            let mut v = VertexSummarizer::new(
                config.vertex.project_id.clone().unwrap_or_default(),
                &config.vertex.region,
                config.vertex.access_token.clone().unwrap_or_default(),
            )
            .with_model(&config.model)
            .with_temperature(config.temperature)
            .with_max_output_tokens(config.max_output_tokens)
            .with_timeout(timeout);
            if let Some(url) = &config.vertex.base_url {
                v = v.with_base_url(url);
            }
            Arc::new(v)
        }
    };

    Ok(summarizer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_without_key_is_rejected() {
        let config = AppConfig::default();
        let err = build_from_config(&config, Backend::Gemini).err().unwrap();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn builds_gemini() {
        let mut config = AppConfig::default();
        config.gemini.api_key = Some("k".into());
        let s = build_from_config(&config, Backend::Gemini).unwrap();
        assert_eq!(s.name(), "gemini");
    }

    #[test]
    fn builds_vertex() {
        let mut config = AppConfig::default();
        config.vertex.project_id = Some("demo".into());
        config.vertex.access_token = Some("ya29".into());
        let s = build_from_config(&config, Backend::Vertex).unwrap();
        assert_eq!(s.name(), "vertex");
    }

    #[test]
    fn vertex_lists_every_missing_field() {
        let config = AppConfig::default();
        let err = build_from_config(&config, Backend::Vertex).err().unwrap();
        let text = err.to_string();
        assert!(text.contains("project_id"));
        assert!(text.contains("access_token"));
    }
}
