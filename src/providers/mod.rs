//! LLM provider bindings.
//!
//! The execution engine is agnostic to which backend is plugged in; everything
//! upstream of [`Provider`] is wire-format plumbing. One OpenAI-compatible
//! client covers the APIs webpilot targets (OpenAI, OpenRouter, Ollama,
//! Anthropic, and self-hosted gateways); aliases below just pick the right
//! base URL and auth
//! header.

pub mod compatible;
pub mod traits;

pub use compatible::{AuthStyle, OpenAiCompatibleProvider};
pub use traits::{ChatMessage, Provider};

use crate::config::Config;
use anyhow::Result;
use std::sync::Arc;

/// Resolve the configured provider into a chat binding.
///
/// Fails synchronously when no provider or API key is configured; the
/// executor must never be constructed with a half-wired binding.
pub fn create_provider(config: &Config) -> Result<Arc<dyn Provider>> {
    let name = config
        .provider
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("No LLM provider configured. Set `provider` in config.toml."))?;

    let api_key = config.api_key.as_deref();
    let provider: OpenAiCompatibleProvider = match name {
        "openai" => OpenAiCompatibleProvider::new(
            "openai",
            config.api_url.as_deref().unwrap_or("https://api.openai.com/v1"),
            api_key,
            AuthStyle::Bearer,
        ),
        "openrouter" => OpenAiCompatibleProvider::new(
            "openrouter",
            config
                .api_url
                .as_deref()
                .unwrap_or("https://openrouter.ai/api/v1"),
            api_key,
            AuthStyle::Bearer,
        ),
        // Ollama ignores credentials but the client requires one to be present.
        "ollama" => OpenAiCompatibleProvider::new(
            "ollama",
            config
                .api_url
                .as_deref()
                .unwrap_or("http://localhost:11434/v1"),
            api_key.or(Some("ollama")),
            AuthStyle::Bearer,
        ),
        // Anthropic's OpenAI-compatible endpoint authenticates with an
        // `x-api-key` header instead of a bearer token.
        "anthropic" => OpenAiCompatibleProvider::new(
            "anthropic",
            config
                .api_url
                .as_deref()
                .unwrap_or("https://api.anthropic.com/v1"),
            api_key,
            AuthStyle::XApiKey,
        ),
        "compatible" => {
            let url = config.api_url.as_deref().ok_or_else(|| {
                anyhow::anyhow!("provider \"compatible\" requires `api_url` in config.toml")
            })?;
            OpenAiCompatibleProvider::new("compatible", url, api_key, AuthStyle::Bearer)
        }
        other => anyhow::bail!(
            "Unknown provider '{other}'. Use 'openai', 'openrouter', 'ollama', 'anthropic', or 'compatible'."
        ),
    };

    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_provider_is_rejected() {
        let mut config = Config::default();
        config.provider = Some("definitely-not-real".into());
        assert!(create_provider(&config).is_err());
    }

    #[test]
    fn missing_provider_is_rejected() {
        let mut config = Config::default();
        config.provider = None;
        let Err(err) = create_provider(&config) else {
            panic!("expected an error with no provider configured");
        };
        assert!(err.to_string().contains("No LLM provider configured"));
    }

    #[test]
    fn compatible_requires_api_url() {
        let mut config = Config::default();
        config.provider = Some("compatible".into());
        config.api_url = None;
        assert!(create_provider(&config).is_err());
    }

    #[test]
    fn known_aliases_resolve() {
        for name in ["openai", "openrouter", "ollama", "anthropic"] {
            let mut config = Config::default();
            config.provider = Some(name.into());
            config.api_key = Some("k".into());
            assert!(create_provider(&config).is_ok(), "alias {name} failed");
        }
    }
}
