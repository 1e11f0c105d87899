use crate::client_wrapper::{ClientError, Message, RequestOptions, TokenUsage};
use lazy_static::lazy_static;
use openai_rust::chat;
use openai_rust2 as openai_rust;
use std::time::Duration;
use std::sync::Mutex;

lazy_static! {
    /// Process-wide HTTP client. Every transport clones it so connections to the same host
    /// are pooled instead of re-doing DNS and TLS per request.
    static ref SHARED_HTTP_CLIENT: reqwest::Client = reqwest::ClientBuilder::new()
        .pool_max_idle_per_host(16)
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());
}

pub fn get_shared_http_client() -> &'static reqwest::Client {
    &SHARED_HTTP_CLIENT
}

/// Convert our messages into the format expected by openai_rust.
pub fn to_chat_messages(messages: &[Message]) -> Vec<chat::Message> {
    messages
        .iter()
        .map(|msg| chat::Message {
            role: msg.role.as_str().to_owned(),
            content: msg.content.clone(),
        })
        .collect()
}

/// Send a chat request, record its usage, and return the assistant’s content.
pub async fn send_and_track(
    api: &openai_rust::Client,
    model: &str,
    formatted_msgs: Vec<chat::Message>,
    url_path: Option<String>,
    options: &RequestOptions,
    usage_slot: &Mutex<Option<TokenUsage>>,
) -> Result<String, ClientError> {
    let mut chat_arguments = chat::ChatArguments::new(model, formatted_msgs);
    chat_arguments.temperature = options.temperature;
    chat_arguments.max_tokens = options.max_tokens;

    let response = api.create_chat(chat_arguments, url_path).await;

    match response {
        Ok(response) => {
            let usage = TokenUsage {
                input_tokens: response.usage.prompt_tokens as usize,
                output_tokens: response.usage.completion_tokens as usize,
                total_tokens: response.usage.total_tokens as usize,
            };

            // Store it for get_last_usage()
            if let Ok(mut slot) = usage_slot.lock() {
                *slot = Some(usage);
            }

            match response.choices.first() {
                Some(choice) => Ok(choice.message.content.clone()),
                None => Err("provider returned no choices".into()),
            }
        }
        Err(err) => {
            log::error!(
                "agenttalk::clients::common::send_and_track(...): API Error from model {}: {}",
                model,
                err
            );
            Err(format!("{}", err).into())
        }
    }
}
