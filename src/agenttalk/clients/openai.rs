//! The `OpenAIClient` struct implements `ClientWrapper` for OpenAI’s Chat API,
//! capturing both the assistant response and detailed token usage (input vs output).
//!
//! It is also the base for every OpenAI compatible endpoint (see
//! [`GroqClient`](crate::clients::groq::GroqClient)).
//!
//! # Example
//!
//! ```rust,no_run
//! use agenttalk::clients::openai::{OpenAIClient, Model};
//! use agenttalk::client_wrapper::{ClientWrapper, Message, RequestOptions, Role};
//!
//! #[tokio::main]
//! async fn main() {
//!     let secret_key: String = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY not set");
//!     let client = OpenAIClient::new_with_model_enum(&secret_key, Model::GPT35Turbo);
//!
//!     let resp = client.send_message(&[
//!         Message::new(Role::System, "You are an assistant."),
//!         Message::new(Role::User, "Hello!"),
//!     ], &RequestOptions::new(0.7, 600)).await.unwrap();
//!     println!("Assistant: {}", resp.content);
//!
//!     if let Some(usage) = client.get_last_usage() {
//!         println!("Tokens: {}", usage.total_tokens);
//!     }
//! }
//! ```

use async_trait::async_trait;
use openai_rust2 as openai_rust;
use std::sync::Mutex;

use crate::client_wrapper::{
    ClientError, ClientWrapper, Message, RequestOptions, Role, TokenUsage,
};
use crate::clients::common::{get_shared_http_client, send_and_track, to_chat_messages};

const DEFAULT_URL_PATH: &str = "/v1/chat/completions";

/// Model identifiers supported by OpenAI's Chat Completions API.
pub enum Model {
    /// `gpt-3.5-turbo` – default model of the Product Manager agent.
    GPT35Turbo,
    /// `gpt-4o` – Omni model with text + image inputs.
    GPT4o,
    /// `gpt-4o-mini` – cost effective GPT-4o derivative.
    GPT4oMini,
    /// `gpt-4.1` – general availability GPT-4.1.
    GPT41,
    /// `gpt-4.1-mini` – reduced cost GPT-4.1 tier.
    GPT41Mini,
    /// `gpt-4.1-nano` – ultra low cost GPT-4.1 derivative.
    GPT41Nano,
}

/// Convert a [`Model`] variant into the string identifier expected by the REST API.
pub fn model_to_string(model: Model) -> String {
    match model {
        Model::GPT35Turbo => "gpt-3.5-turbo".to_string(),
        Model::GPT4o => "gpt-4o".to_string(),
        Model::GPT4oMini => "gpt-4o-mini".to_string(),
        Model::GPT41 => "gpt-4.1".to_string(),
        Model::GPT41Mini => "gpt-4.1-mini".to_string(),
        Model::GPT41Nano => "gpt-4.1-nano".to_string(),
    }
}

/// Client wrapper for OpenAI's Chat Completions API.
///
/// The wrapper keeps the selected model identifier, the request path, and an internal
/// [`TokenUsage`] slot so callers can inspect how many tokens each request consumed.
pub struct OpenAIClient {
    /// Underlying SDK client pointing at the REST endpoint.
    client: openai_rust::Client,
    /// Model name that will be injected into each request.
    model: String,
    /// Path appended to the base URL for chat completions.
    url_path: String,
    /// Storage for the token usage returned by the most recent request.
    token_usage: Mutex<Option<TokenUsage>>,
}

impl OpenAIClient {
    /// Construct a new client using the provided API key and [`Model`] variant.
    pub fn new_with_model_enum(secret_key: &str, model: Model) -> Self {
        Self::new_with_model_string(secret_key, &model_to_string(model))
    }

    /// Construct a new client using the provided API key and explicit model name.
    pub fn new_with_model_string(secret_key: &str, model_name: &str) -> Self {
        OpenAIClient {
            client: openai_rust::Client::new_with_client(
                secret_key,
                get_shared_http_client().clone(),
            ),
            model: model_name.to_string(),
            url_path: DEFAULT_URL_PATH.to_string(),
            token_usage: Mutex::new(None),
        }
    }

    /// Construct a client targeting a custom OpenAI compatible base URL and request path.
    pub fn new_with_base_url(
        secret_key: &str,
        model_name: &str,
        base_url: &str,
        url_path: &str,
    ) -> Self {
        OpenAIClient {
            client: openai_rust::Client::new_with_client_and_base_url(
                secret_key,
                get_shared_http_client().clone(),
                base_url,
            ),
            model: model_name.to_string(),
            url_path: url_path.to_string(),
            token_usage: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ClientWrapper for OpenAIClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn send_message(
        &self,
        messages: &[Message],
        options: &RequestOptions,
    ) -> Result<Message, ClientError> {
        let content = send_and_track(
            &self.client,
            &self.model,
            to_chat_messages(messages),
            Some(self.url_path.clone()),
            options,
            &self.token_usage,
        )
        .await?;

        Ok(Message {
            role: Role::Assistant,
            content,
        })
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        Some(&self.token_usage)
    }
}
