use crate::client_wrapper::{ClientError, RequestOptions, TokenUsage};
use crate::clients::common::{send_and_track, to_chat_messages};
use crate::{ClientWrapper, Message, Role};
use async_trait::async_trait;
use log::error;
use openai_rust2 as openai_rust;
use std::sync::Mutex;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
const URL_PATH: &str = "/v1beta/openai/chat/completions";

pub struct GeminiClient {
    client: openai_rust::Client,
    pub model: String,
    token_usage: Mutex<Option<TokenUsage>>,
}

// Text models served by the OpenAI compatible endpoint.
pub enum Model {
    GeminiPro,
    Gemini15Flash,
    Gemini15Pro,
    Gemini20Flash,
    Gemini25Flash,
    Gemini25Pro,
}

pub fn model_to_string(model: Model) -> String {
    match model {
        Model::GeminiPro => "gemini-pro".to_string(),
        Model::Gemini15Flash => "gemini-1.5-flash".to_string(),
        Model::Gemini15Pro => "gemini-1.5-pro".to_string(),
        Model::Gemini20Flash => "gemini-2.0-flash".to_string(),
        Model::Gemini25Flash => "gemini-2.5-flash".to_string(),
        Model::Gemini25Pro => "gemini-2.5-pro".to_string(),
    }
}

impl GeminiClient {
    pub fn new_with_model_string(secret_key: &str, model_name: &str) -> Self {
        Self::new_with_base_url(secret_key, model_name, DEFAULT_BASE_URL)
    }

    pub fn new_with_model_enum(secret_key: &str, model: Model) -> Self {
        Self::new_with_model_string(secret_key, &model_to_string(model))
    }

    /// This function is used to create a GeminiClient with a custom base URL
    /// The default base URL is "<https://generativelanguage.googleapis.com/v1beta/>"
    pub fn new_with_base_url(secret_key: &str, model_name: &str, base_url: &str) -> Self {
        GeminiClient {
            client: openai_rust::Client::new_with_base_url(secret_key, base_url),
            model: model_name.to_string(),
            token_usage: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ClientWrapper for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn send_message(
        &self,
        messages: &[Message],
        options: &RequestOptions,
    ) -> Result<Message, ClientError> {
        let result = send_and_track(
            &self.client,
            &self.model,
            to_chat_messages(messages),
            Some(URL_PATH.to_string()),
            options,
            &self.token_usage,
        )
        .await;

        match result {
            Ok(content) => Ok(Message {
                role: Role::Assistant,
                content,
            }),
            Err(err) => {
                if log::log_enabled!(log::Level::Error) {
                    error!("GeminiClient::send_message error: {}", err);
                }
                Err(err)
            }
        }
    }

    /// Token usage for the last request; without this override the default trait
    /// implementation of `usage_slot()` returns `None` and nothing is tracked.
    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        Some(&self.token_usage)
    }
}
