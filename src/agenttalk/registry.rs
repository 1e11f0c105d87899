//! The set of configured agents.
//!
//! An [`AgentRegistry`] maps a registry name (`"chatgpt"`, `"gemini"`, `"groq"`, ...) to an
//! [`Agent`]. It is built once, either from an [`AgentTalkConfig`] or by hand through
//! [`AgentRegistry::builder`], and never changes afterwards. Iteration order is
//! registration order.
//!
//! ```
//! use agenttalk::{AgentRegistry, AgentTalkConfig};
//!
//! let registry = AgentRegistry::from_config(&AgentTalkConfig::default());
//! assert!(registry.is_empty());
//! assert!(registry.resolve("chatgpt").is_none());
//! ```

use crate::agent::{Agent, ChatGptAgent, GeminiAgent, GroqAgent};
use crate::clients::gemini::GeminiClient;
use crate::clients::groq::GroqClient;
use crate::clients::openai::OpenAIClient;
use crate::config::AgentTalkConfig;
use crate::conversation::USER_SPEAKER;
use crate::orchestrator::SYSTEM_SPEAKER;
use log::{info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

pub const CHATGPT: &str = "chatgpt";
pub const GEMINI: &str = "gemini";
pub const GROQ: &str = "groq";

/// Identity of a registered agent, as reported by status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentInfo {
    pub name: String,
    pub role: String,
    pub model: String,
}

pub struct AgentRegistry {
    agents: HashMap<String, Arc<dyn Agent>>,
    order: Vec<String>,
}

impl AgentRegistry {
    pub fn builder() -> AgentRegistryBuilder {
        AgentRegistryBuilder::default()
    }

    /// Create one agent per provider with a usable key. Unconfigured providers are absent.
    pub fn from_config(config: &AgentTalkConfig) -> Self {
        let mut builder = Self::builder();

        if let Some(key) = config.openai.api_key() {
            let client = OpenAIClient::new_with_model_string(key, &config.openai.model);
            builder = builder.register(CHATGPT, Arc::new(ChatGptAgent::new(Arc::new(client))));
        }
        if let Some(key) = config.google.api_key() {
            let client = GeminiClient::new_with_model_string(key, &config.google.model);
            builder = builder.register(GEMINI, Arc::new(GeminiAgent::new(Arc::new(client))));
        }
        if let Some(key) = config.groq.api_key() {
            let client = GroqClient::new_with_model_str(key, &config.groq.model);
            builder = builder.register(GROQ, Arc::new(GroqAgent::new(Arc::new(client))));
        }

        let registry = builder.build();
        if registry.is_empty() {
            warn!("AgentRegistry::from_config: no provider has a usable API key");
        } else {
            info!("AgentRegistry::from_config: agents {:?}", registry.names());
        }
        registry
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    /// Registry names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Name, role and model of every agent, in registration order.
    pub fn describe(&self) -> Vec<AgentInfo> {
        self.order
            .iter()
            .filter_map(|name| {
                self.agents.get(name).map(|agent| AgentInfo {
                    name: name.clone(),
                    role: agent.role().to_string(),
                    model: agent.model().to_string(),
                })
            })
            .collect()
    }
}

#[derive(Default)]
pub struct AgentRegistryBuilder {
    agents: HashMap<String, Arc<dyn Agent>>,
    order: Vec<String>,
}

impl AgentRegistryBuilder {
    /// Add an agent under `name`. A second registration of the same name is ignored, and so
    /// are the speaker names reserved for the user and the orchestrator.
    pub fn register(mut self, name: impl Into<String>, agent: Arc<dyn Agent>) -> Self {
        let name = name.into();
        if name == USER_SPEAKER || name == SYSTEM_SPEAKER {
            warn!(
                "AgentRegistryBuilder::register: '{}' is a reserved speaker name, ignoring",
                name
            );
            return self;
        }
        if self.agents.contains_key(&name) {
            warn!(
                "AgentRegistryBuilder::register: '{}' already registered, keeping the first",
                name
            );
            return self;
        }
        self.order.push(name.clone());
        self.agents.insert(name, agent);
        self
    }

    pub fn build(self) -> AgentRegistry {
        AgentRegistry {
            agents: self.agents,
            order: self.order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentReply;
    use crate::config::ProviderConfig;
    use crate::conversation::Turn;
    use async_trait::async_trait;

    #[test]
    fn test_from_config_discovery_order() {
        let config = AgentTalkConfig {
            openai: ProviderConfig::new(Some("sk-test".into()), "gpt-4o-mini"),
            google: ProviderConfig::new(Some("your_google_api_key_here".into()), "gemini-pro"),
            groq: ProviderConfig::new(Some("gsk-test".into()), "llama-3.3-70b-versatile"),
        };

        let registry = AgentRegistry::from_config(&config);
        assert_eq!(registry.names(), vec![CHATGPT.to_string(), GROQ.to_string()]);

        let described = registry.describe();
        assert_eq!(described[0].role, "Product Manager");
        assert_eq!(described[0].model, "gpt-4o-mini");
        assert_eq!(described[1].role, "QA Engineer");
        assert!(registry.resolve(GEMINI).is_none());
    }

    struct Named(&'static str);

    #[async_trait]
    impl Agent for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn role(&self) -> &str {
            "Tester"
        }

        fn model(&self) -> &str {
            "none"
        }

        async fn respond(&self, _prompt: &str, _context: &[Turn]) -> AgentReply {
            AgentReply::success("ok")
        }
    }

    #[test]
    fn test_reserved_and_duplicate_names_are_ignored() {
        let registry = AgentRegistry::builder()
            .register(USER_SPEAKER, Arc::new(Named("impostor")))
            .register(SYSTEM_SPEAKER, Arc::new(Named("impostor")))
            .register("critic", Arc::new(Named("first")))
            .register("critic", Arc::new(Named("second")))
            .build();

        assert_eq!(registry.names(), vec!["critic".to_string()]);
        assert!(!registry.contains(USER_SPEAKER));
        assert!(!registry.contains(SYSTEM_SPEAKER));
        let critic = registry.resolve("critic").unwrap();
        assert_eq!(critic.name(), "first");
    }
}
