use async_trait::async_trait;
use std::error::Error;
use std::sync::Mutex;

/// A ClientWrapper is a wrapper around a specific cloud LLM service.
/// It provides a common interface to interact with the LLMs.
/// It does not keep track of the conversation, for that the agents read a window of the
/// shared [`ConversationLog`](crate::ConversationLog) and build each request from it.
// src/agenttalk/client_wrapper.rs

/// Represents the possible roles for a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Role {
    System,
    // set by the developer to steer the model's responses
    User,
    // a message sent by a human user (or app user)
    Assistant, // lets the model know the content was generated as a response to a user message
}

impl Role {
    /// Wire name used by OpenAI compatible chat-completions endpoints.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// How many tokens were spent on prompt vs. completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

/// Represents a generic message to be sent to an LLM.
#[derive(Clone, Debug)]
pub struct Message {
    /// The role associated with the message.
    pub role: Role,
    /// The actual content of the message.
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Message {
            role,
            content: content.into(),
        }
    }
}

/// Per-request sampling knobs. `None` leaves the provider default in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl RequestOptions {
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        RequestOptions {
            temperature: Some(temperature),
            max_tokens: Some(max_tokens),
        }
    }
}

/// Type alias for the error every transport returns.
pub type ClientError = Box<dyn Error + Send + Sync>;

/// Trait defining the interface to interact with various LLM services.
///
/// Implementations are opaque to the orchestration core: they take the model's role-tagged
/// messages plus sampling options and return text or fail.
#[async_trait]
pub trait ClientWrapper: Send + Sync {
    /// Model identifier injected into every request.
    fn model_name(&self) -> &str;

    /// Send a message to the LLM and get a response.
    /// - `messages`: The messages to send in the request.
    /// - `options`: temperature and output token budget.
    async fn send_message(
        &self,
        messages: &[Message],
        options: &RequestOptions,
    ) -> Result<Message, ClientError>;

    /// Hook to retrieve usage from the *last* send_message() call.
    /// Default impl reads [`usage_slot`](ClientWrapper::usage_slot), so wrappers that do not
    /// track usage return `None`.
    fn get_last_usage(&self) -> Option<TokenUsage> {
        self.usage_slot()
            .and_then(|slot| slot.lock().ok().and_then(|usage| usage.clone()))
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        // ClientWrapper implementations supporting TokenUsage tracking should return a Mutex<Option<TokenUsage>> by overriding this method.
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TrackingClient {
        usage: Mutex<Option<TokenUsage>>,
    }

    #[async_trait]
    impl ClientWrapper for TrackingClient {
        fn model_name(&self) -> &str {
            "tracking"
        }

        async fn send_message(
            &self,
            _messages: &[Message],
            _options: &RequestOptions,
        ) -> Result<Message, ClientError> {
            *self.usage.lock().unwrap() = Some(TokenUsage {
                input_tokens: 12,
                output_tokens: 30,
                total_tokens: 42,
            });
            Ok(Message::new(Role::Assistant, "done"))
        }

        fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
            Some(&self.usage)
        }
    }

    #[tokio::test]
    async fn test_last_usage_reads_usage_slot() {
        let client = TrackingClient {
            usage: Mutex::new(None),
        };
        assert!(client.get_last_usage().is_none());

        client
            .send_message(&[Message::new(Role::User, "hi")], &RequestOptions::default())
            .await
            .unwrap();
        assert_eq!(client.get_last_usage().map(|u| u.total_tokens), Some(42));
    }
}
