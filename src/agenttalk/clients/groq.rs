use crate::client_wrapper::{ClientError, RequestOptions, TokenUsage};
use crate::clients::openai::OpenAIClient;
use crate::{ClientWrapper, Message};
use async_trait::async_trait;
use std::sync::Mutex;

const BASE_URL: &str = "https://api.groq.com/openai/v1";
const URL_PATH: &str = "/openai/v1/chat/completions";

/// Groq serves an OpenAI compatible API, so this is a thin shell around [`OpenAIClient`].
pub struct GroqClient {
    client: OpenAIClient,
}

// Production models on GroqCloud.
pub enum Model {
    Llama3370bVersatile,
    Llama318bInstant,
    Gemma29bIt,
    Mixtral8x7b32768,
}

pub fn model_to_string(model: Model) -> String {
    match model {
        Model::Llama3370bVersatile => "llama-3.3-70b-versatile".to_string(),
        Model::Llama318bInstant => "llama-3.1-8b-instant".to_string(),
        Model::Gemma29bIt => "gemma2-9b-it".to_string(),
        Model::Mixtral8x7b32768 => "mixtral-8x7b-32768".to_string(),
    }
}

impl GroqClient {
    pub fn new_with_model_enum(secret_key: &str, model: Model) -> Self {
        Self::new_with_model_str(secret_key, &model_to_string(model))
    }

    pub fn new_with_model_str(secret_key: &str, model_name: &str) -> Self {
        GroqClient {
            client: OpenAIClient::new_with_base_url(secret_key, model_name, BASE_URL, URL_PATH),
        }
    }
}

#[async_trait]
impl ClientWrapper for GroqClient {
    fn model_name(&self) -> &str {
        self.client.model_name()
    }

    async fn send_message(
        &self,
        messages: &[Message],
        options: &RequestOptions,
    ) -> Result<Message, ClientError> {
        self.client.send_message(messages, options).await
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        self.client.usage_slot()
    }
}

#[test]
pub fn test_groq_model_names() {
    assert_eq!(
        model_to_string(Model::Llama3370bVersatile),
        "llama-3.3-70b-versatile"
    );
    let client = GroqClient::new_with_model_enum("fake_key", Model::Llama318bInstant);
    assert_eq!(client.model_name(), "llama-3.1-8b-instant");
}
