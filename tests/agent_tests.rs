use agenttalk::agent::{Agent, ChatGptAgent, GeminiAgent, GroqAgent, CODE_FENCE_INSTRUCTION};
use agenttalk::client_wrapper::{
    ClientError, ClientWrapper, Message, RequestOptions, Role, TokenUsage,
};
use agenttalk::conversation::{ConversationLog, USER_SPEAKER};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Records the last request and answers with a canned reply.
struct RecordingClient {
    model: String,
    reply: String,
    last_messages: Mutex<Vec<Message>>,
    last_options: Mutex<Option<RequestOptions>>,
}

impl RecordingClient {
    fn new(model: &str, reply: &str) -> Arc<Self> {
        Arc::new(RecordingClient {
            model: model.to_string(),
            reply: reply.to_string(),
            last_messages: Mutex::new(Vec::new()),
            last_options: Mutex::new(None),
        })
    }

    fn messages(&self) -> Vec<Message> {
        self.last_messages.lock().unwrap().clone()
    }

    fn options(&self) -> Option<RequestOptions> {
        self.last_options.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClientWrapper for RecordingClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn send_message(
        &self,
        messages: &[Message],
        options: &RequestOptions,
    ) -> Result<Message, ClientError> {
        *self.last_messages.lock().unwrap() = messages.to_vec();
        *self.last_options.lock().unwrap() = Some(options.clone());
        Ok(Message::new(Role::Assistant, self.reply.clone()))
    }
}

struct FailingClient;

#[async_trait]
impl ClientWrapper for FailingClient {
    fn model_name(&self) -> &str {
        "broken"
    }

    async fn send_message(
        &self,
        _messages: &[Message],
        _options: &RequestOptions,
    ) -> Result<Message, ClientError> {
        Err("connection reset by peer".into())
    }

    fn get_last_usage(&self) -> Option<TokenUsage> {
        None
    }
}

/// user, chatgpt, user, gemini, ... with numbered messages.
fn sample_log(turns: usize) -> ConversationLog {
    let mut log = ConversationLog::new();
    for i in 0..turns {
        if i % 2 == 0 {
            log.append(USER_SPEAKER, "User", format!("user message {}", i));
        } else {
            log.append("chatgpt", "Product Manager", format!("agent message {}", i));
        }
    }
    log
}

#[tokio::test]
async fn test_chatgpt_agent_builds_bounded_transcript() {
    let client = RecordingClient::new("gpt-3.5-turbo", "Here is the spec");
    let agent = ChatGptAgent::new(client.clone());
    let log = sample_log(7);

    let reply = agent.respond("Write the spec", log.all()).await;
    assert!(!reply.is_error);
    assert_eq!(reply.text, "Here is the spec");

    let messages = client.messages();
    // system + last 5 turns + prompt
    assert_eq!(messages.len(), 7);
    assert_eq!(messages[0].role, Role::System);
    assert!(messages[0].content.contains("Product Manager"));
    assert!(messages[0].content.contains(CODE_FENCE_INSTRUCTION));

    assert_eq!(messages[1].content, "[User]: user message 2");
    assert_eq!(messages[1].role, Role::User);
    assert_eq!(messages[2].content, "[chatgpt]: agent message 3");
    assert_eq!(messages[2].role, Role::Assistant);

    let last = messages.last().unwrap();
    assert_eq!(last.role, Role::User);
    assert_eq!(last.content, "Write the spec");

    assert_eq!(client.options(), Some(RequestOptions::new(0.7, 600)));
}

#[tokio::test]
async fn test_chatgpt_agent_truncates_each_turn() {
    let client = RecordingClient::new("gpt-3.5-turbo", "ok");
    let agent = ChatGptAgent::new(client.clone());

    let mut log = ConversationLog::new();
    log.append(USER_SPEAKER, "User", "x".repeat(2_000));
    agent.respond("go", log.all()).await;

    let messages = client.messages();
    let expected = format!("[User]: {}", "x".repeat(ChatGptAgent::MAX_TURN_CHARS));
    assert_eq!(messages[1].content, expected);
}

#[tokio::test]
async fn test_groq_agent_uses_shorter_window() {
    let client = RecordingClient::new("llama-3.3-70b-versatile", "Tests look fine");
    let agent = GroqAgent::new(client.clone());

    let mut log = sample_log(5);
    log.append("gemini", "Full-Stack Developer", "y".repeat(1_000));

    agent.respond("Review it", log.all()).await;

    let messages = client.messages();
    // system + last 3 turns + prompt
    assert_eq!(messages.len(), 5);
    assert!(messages[0].content.contains("QA Engineer"));
    assert!(messages[0].content.contains("Be concise."));
    assert_eq!(messages[1].content, "[chatgpt]: agent message 3");
    assert_eq!(
        messages[3].content,
        format!("[gemini]: {}", "y".repeat(GroqAgent::MAX_TURN_CHARS))
    );
    assert_eq!(client.options(), Some(RequestOptions::new(0.7, 500)));
}

#[tokio::test]
async fn test_gemini_agent_sends_single_flat_prompt() {
    let client = RecordingClient::new("gemini-pro", "fn main() {}");
    let agent = GeminiAgent::new(client.clone());
    let log = sample_log(6);

    agent.respond("Write the code", log.all()).await;

    let messages = client.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::User);

    let prompt = &messages[0].content;
    assert!(prompt.starts_with("You are a Full-Stack Developer."));
    assert!(prompt.contains("Previous conversation:\n[chatgpt]: agent message 1"));
    assert!(!prompt.contains("user message 0"));
    assert!(prompt.contains("Your task: Write the code"));
    assert!(prompt.contains(CODE_FENCE_INSTRUCTION));
    assert_eq!(client.options(), Some(RequestOptions::default()));
}

#[tokio::test]
async fn test_empty_context_still_sends_prompt() {
    let client = RecordingClient::new("gpt-4o-mini", "hello");
    let agent = ChatGptAgent::new(client.clone());

    agent.respond("Say hello", &[]).await;

    let messages = client.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "Say hello");
}

#[tokio::test]
async fn test_provider_failure_becomes_marked_reply() {
    let agents: Vec<(Box<dyn Agent>, &str)> = vec![
        (
            Box::new(ChatGptAgent::new(Arc::new(FailingClient))) as Box<dyn Agent>,
            "ChatGPT",
        ),
        (
            Box::new(GeminiAgent::new(Arc::new(FailingClient))) as Box<dyn Agent>,
            "Gemini",
        ),
        (
            Box::new(GroqAgent::new(Arc::new(FailingClient))) as Box<dyn Agent>,
            "Groq",
        ),
    ];

    for (agent, provider) in agents {
        let reply = agent.respond("anything", &[]).await;
        assert!(reply.is_error);
        assert_eq!(
            reply.text,
            format!("Error calling {}: connection reset by peer", provider)
        );
    }
}

#[tokio::test]
async fn test_agent_identity() {
    let agent = GroqAgent::new(RecordingClient::new("llama-3.1-8b-instant", ""));
    assert_eq!(agent.name(), "Groq");
    assert_eq!(agent.role(), "QA Engineer");
    assert_eq!(agent.model(), "llama-3.1-8b-instant");

    let agent = GeminiAgent::new(RecordingClient::new("gemini-2.5-flash", ""));
    assert_eq!(agent.name(), "Gemini");
    assert_eq!(agent.role(), "Full-Stack Developer");
    assert_eq!(agent.model(), "gemini-2.5-flash");
}
