//! Agent capabilities.
//!
//! An [`Agent`] is one remote collaborator: it has an identity (name, role, model) and can
//! produce a reply for a prompt given a window of the shared conversation. Each provider
//! variant owns its own context window size, truncation budget and preamble, and wraps any
//! [`ClientWrapper`] so tests can substitute a mock transport.
//!
//! Provider failures never escape [`Agent::respond`]. They come back as an [`AgentReply`]
//! with `is_error` set and a text starting with `"Error calling <Provider>: "`, which the
//! orchestrator records like any other turn.
//!
//! # Example
//!
//! ```rust,no_run
//! use agenttalk::agent::{Agent, ChatGptAgent};
//! use agenttalk::clients::openai::{Model, OpenAIClient};
//! use std::sync::Arc;
//!
//! # async {
//! let client = Arc::new(OpenAIClient::new_with_model_enum("key", Model::GPT35Turbo));
//! let pm = ChatGptAgent::new(client);
//!
//! let reply = pm.respond("Outline a URL shortener", &[]).await;
//! if reply.is_error {
//!     eprintln!("{}", reply.text);
//! }
//! # };
//! ```

use crate::client_wrapper::{ClientWrapper, Message, RequestOptions, Role};
use crate::conversation::{tail, Turn};
use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;

/// Instruction appended to every preamble so code comes back in fenced blocks.
pub const CODE_FENCE_INSTRUCTION: &str = "IMPORTANT: When sharing code, ALWAYS wrap it in markdown code blocks using triple backticks (```) with the language specified, like ```python or ```javascript or ```html.";

/// The outcome of one [`Agent::respond`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentReply {
    pub text: String,
    /// `true` when `text` describes a provider failure instead of a model reply.
    pub is_error: bool,
}

impl AgentReply {
    pub fn success(text: impl Into<String>) -> Self {
        AgentReply {
            text: text.into(),
            is_error: false,
        }
    }

    /// Build the failure reply for `provider`, keeping the `Error calling <Provider>: ` marker.
    pub fn failure(provider: &str, detail: impl std::fmt::Display) -> Self {
        AgentReply {
            text: format!("Error calling {}: {}", provider, detail),
            is_error: true,
        }
    }
}

/// A remote collaborator able to reply to a prompt in the context of the conversation.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Display name, e.g. `"ChatGPT"`.
    fn name(&self) -> &str;

    /// Human readable role, e.g. `"Product Manager"`.
    fn role(&self) -> &str;

    /// Model identifier used for requests.
    fn model(&self) -> &str;

    /// Produce a reply. `context` is the conversation so far, oldest first; each variant
    /// decides how much of its tail to send.
    async fn respond(&self, prompt: &str, context: &[Turn]) -> AgentReply;
}

/// Keep at most `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// `"[speaker]: message"` with the message cut to `max_chars`.
pub fn format_turn(turn: &Turn, max_chars: usize) -> String {
    format!(
        "[{}]: {}",
        turn.speaker,
        truncate_chars(&turn.message, max_chars)
    )
}

/// Build a chat transcript: preamble, one message per context turn, then the prompt.
/// User turns go out as user input, everything else as the assistant's prior output.
fn chat_transcript(
    preamble: String,
    prompt: &str,
    context: &[Turn],
    window: usize,
    max_chars: usize,
) -> Vec<Message> {
    let recent = tail(context, window);
    let mut messages = Vec::with_capacity(recent.len() + 2);
    messages.push(Message::new(Role::System, preamble));
    for turn in recent {
        let role = if turn.is_from_user() {
            Role::User
        } else {
            Role::Assistant
        };
        messages.push(Message::new(role, format_turn(turn, max_chars)));
    }
    messages.push(Message::new(Role::User, prompt));
    messages
}

async fn dispatch(
    provider: &str,
    client: &dyn ClientWrapper,
    messages: &[Message],
    options: &RequestOptions,
) -> AgentReply {
    debug!(
        "{}: sending {} messages to model {}",
        provider,
        messages.len(),
        client.model_name()
    );
    match client.send_message(messages, options).await {
        Ok(reply) => {
            if let Some(usage) = client.get_last_usage() {
                debug!(
                    "{}: tokens input={} output={} total={}",
                    provider, usage.input_tokens, usage.output_tokens, usage.total_tokens
                );
            }
            AgentReply::success(reply.content)
        }
        Err(err) => {
            warn!("{}: provider call failed: {}", provider, err);
            AgentReply::failure(provider, err)
        }
    }
}

/// Product Manager backed by OpenAI.
pub struct ChatGptAgent {
    client: Arc<dyn ClientWrapper>,
}

impl ChatGptAgent {
    pub const NAME: &'static str = "ChatGPT";
    pub const ROLE: &'static str = "Product Manager";
    pub const CONTEXT_WINDOW: usize = 5;
    pub const MAX_TURN_CHARS: usize = 500;
    pub const TEMPERATURE: f32 = 0.7;
    pub const MAX_TOKENS: u32 = 600;

    pub fn new(client: Arc<dyn ClientWrapper>) -> Self {
        ChatGptAgent { client }
    }

    /// The exact messages [`respond`](Agent::respond) sends.
    pub fn build_messages(&self, prompt: &str, context: &[Turn]) -> Vec<Message> {
        let preamble = format!(
            "You are a {}. You are collaborating with other AI agents to build a project. {} This ensures proper formatting.",
            Self::ROLE,
            CODE_FENCE_INSTRUCTION
        );
        chat_transcript(
            preamble,
            prompt,
            context,
            Self::CONTEXT_WINDOW,
            Self::MAX_TURN_CHARS,
        )
    }
}

#[async_trait]
impl Agent for ChatGptAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn role(&self) -> &str {
        Self::ROLE
    }

    fn model(&self) -> &str {
        self.client.model_name()
    }

    async fn respond(&self, prompt: &str, context: &[Turn]) -> AgentReply {
        let messages = self.build_messages(prompt, context);
        let options = RequestOptions::new(Self::TEMPERATURE, Self::MAX_TOKENS);
        dispatch(Self::NAME, self.client.as_ref(), &messages, &options).await
    }
}

/// Full-Stack Developer backed by Google Gemini.
///
/// Gemini gets one flat prompt: the role, the recent conversation as text, the task and
/// the formatting instruction.
pub struct GeminiAgent {
    client: Arc<dyn ClientWrapper>,
}

impl GeminiAgent {
    pub const NAME: &'static str = "Gemini";
    pub const ROLE: &'static str = "Full-Stack Developer";
    pub const CONTEXT_WINDOW: usize = 5;
    pub const MAX_TURN_CHARS: usize = 500;

    pub fn new(client: Arc<dyn ClientWrapper>) -> Self {
        GeminiAgent { client }
    }

    pub fn build_prompt(&self, prompt: &str, context: &[Turn]) -> String {
        let context_str = tail(context, Self::CONTEXT_WINDOW)
            .iter()
            .map(|turn| format_turn(turn, Self::MAX_TURN_CHARS))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are a {}. You are collaborating with other AI agents to build a project.\n\n\
             Previous conversation:\n{}\n\n\
             Your task: {}\n\n\
             {}\n\
             Provide your response with code examples where applicable. Keep responses concise.",
            Self::ROLE,
            context_str,
            prompt,
            CODE_FENCE_INSTRUCTION
        )
    }
}

#[async_trait]
impl Agent for GeminiAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn role(&self) -> &str {
        Self::ROLE
    }

    fn model(&self) -> &str {
        self.client.model_name()
    }

    async fn respond(&self, prompt: &str, context: &[Turn]) -> AgentReply {
        let messages = [Message::new(Role::User, self.build_prompt(prompt, context))];
        dispatch(
            Self::NAME,
            self.client.as_ref(),
            &messages,
            &RequestOptions::default(),
        )
        .await
    }
}

/// QA Engineer backed by Groq. Sees a shorter window than the other two.
pub struct GroqAgent {
    client: Arc<dyn ClientWrapper>,
}

impl GroqAgent {
    pub const NAME: &'static str = "Groq";
    pub const ROLE: &'static str = "QA Engineer";
    pub const CONTEXT_WINDOW: usize = 3;
    pub const MAX_TURN_CHARS: usize = 400;
    pub const TEMPERATURE: f32 = 0.7;
    pub const MAX_TOKENS: u32 = 500;

    pub fn new(client: Arc<dyn ClientWrapper>) -> Self {
        GroqAgent { client }
    }

    pub fn build_messages(&self, prompt: &str, context: &[Turn]) -> Vec<Message> {
        let preamble = format!(
            "You are a {}. You are collaborating with other AI agents. Be concise. {}",
            Self::ROLE,
            CODE_FENCE_INSTRUCTION
        );
        chat_transcript(
            preamble,
            prompt,
            context,
            Self::CONTEXT_WINDOW,
            Self::MAX_TURN_CHARS,
        )
    }
}

#[async_trait]
impl Agent for GroqAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn role(&self) -> &str {
        Self::ROLE
    }

    fn model(&self) -> &str {
        self.client.model_name()
    }

    async fn respond(&self, prompt: &str, context: &[Turn]) -> AgentReply {
        let messages = self.build_messages(prompt, context);
        let options = RequestOptions::new(Self::TEMPERATURE, Self::MAX_TOKENS);
        dispatch(Self::NAME, self.client.as_ref(), &messages, &options).await
    }
}
