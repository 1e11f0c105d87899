//! Credential and model configuration.
//!
//! [`AgentTalkConfig`] holds, per provider, an optional API key and a model name. Users
//! construct it manually or read it from the process environment with
//! [`AgentTalkConfig::from_env`]. Loading `.env` or properties files is left to the
//! embedding application.
//!
//! # Example
//!
//! ```rust
//! use agenttalk::{AgentTalkConfig, ProviderConfig};
//!
//! let config = AgentTalkConfig {
//!     groq: ProviderConfig::new(Some("gsk_live".into()), "llama-3.3-70b-versatile"),
//!     ..AgentTalkConfig::default()
//! };
//! assert!(config.is_configured());
//! assert!(config.openai.api_key().is_none());
//! ```

use std::env;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_GOOGLE_MODEL: &str = "gemini-pro";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

/// `true` for keys that were never filled in: blank, or the `your_..._here` template value.
pub fn is_placeholder(key: &str) -> bool {
    let key = key.trim();
    key.is_empty() || (key.starts_with("your_") && key.ends_with("_here"))
}

/// Credentials and model for one provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    api_key: Option<String>,
    pub model: String,
}

impl ProviderConfig {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        ProviderConfig {
            api_key,
            model: model.into(),
        }
    }

    /// An unset provider using `model`.
    pub fn unset(model: impl Into<String>) -> Self {
        Self::new(None, model)
    }

    /// The usable key, or `None` when missing or a placeholder.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !is_placeholder(key))
    }

    pub fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }
}

/// Configuration for the three backing providers.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentTalkConfig {
    pub openai: ProviderConfig,
    pub google: ProviderConfig,
    pub groq: ProviderConfig,
}

impl Default for AgentTalkConfig {
    /// No keys, default models.
    fn default() -> Self {
        AgentTalkConfig {
            openai: ProviderConfig::unset(DEFAULT_OPENAI_MODEL),
            google: ProviderConfig::unset(DEFAULT_GOOGLE_MODEL),
            groq: ProviderConfig::unset(DEFAULT_GROQ_MODEL),
        }
    }
}

impl AgentTalkConfig {
    /// Read `OPENAI_API_KEY`, `GOOGLE_API_KEY`, `GROQ_API_KEY` and the matching
    /// `*_MODEL` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = |key_var: &str, model_var: &str, default_model: &str| {
            let model = lookup(model_var)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| default_model.to_string());
            ProviderConfig::new(lookup(key_var), model)
        };

        AgentTalkConfig {
            openai: provider("OPENAI_API_KEY", "OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            google: provider("GOOGLE_API_KEY", "GOOGLE_MODEL", DEFAULT_GOOGLE_MODEL),
            groq: provider("GROQ_API_KEY", "GROQ_MODEL", DEFAULT_GROQ_MODEL),
        }
    }

    /// `true` if at least one provider has a usable key.
    pub fn is_configured(&self) -> bool {
        self.openai.is_configured() || self.google.is_configured() || self.groq.is_configured()
    }
}
