//! # AgentTalk
//!
//! AgentTalk relays a user's request to several remote Large Language Model providers,
//! records every reply in one shared conversation, and streams progress to a client while
//! the agents work.
//!
//! The crate is layered leaves first:
//!
//! * **Transports**: [`ClientWrapper`] implementations for OpenAI, Google Gemini and Groq in
//!   [`clients`]. They all speak the OpenAI compatible chat-completions format.
//! * **Agents**: the [`Agent`] capability. One variant per provider, each owning its context
//!   window, truncation budget and role preamble.
//! * **Conversation**: the append-only [`ConversationLog`] of [`Turn`]s shared by every agent.
//! * **Registry**: [`AgentRegistry`], built once from whichever providers have credentials.
//! * **Orchestrator**: [`Orchestrator`], the session object that runs single calls, the
//!   Product Manager → Developer → QA pipeline and round-robin discussions.
//! * **Events**: [`event`] turns a protocol run into an ordered stream of
//!   [`StreamEvent`]s (`start`, `thinking`, `message`, `error`, `complete`).
//!
//! ## Getting Started
//!
//! ```rust,no_run
//! use agenttalk::{AgentTalkConfig, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     agenttalk::init_logger();
//!
//!     let mut orchestrator = Orchestrator::from_config(&AgentTalkConfig::from_env());
//!     let steps = orchestrator.run_sequential_pipeline("A todo list web app").await?;
//!
//!     for step in steps {
//!         match step {
//!             Ok(call) => println!("[{}] {}", call.role, call.response),
//!             Err(e) => println!("step failed: {}", e),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Streaming
//!
//! ```rust,no_run
//! use agenttalk::event::stream_round_robin_discussion;
//! use agenttalk::{AgentTalkConfig, Orchestrator};
//! use futures_util::StreamExt;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let session = Orchestrator::from_config(&AgentTalkConfig::from_env()).into_shared();
//! let mut events = stream_round_robin_discussion(session, "Tabs or spaces?".into(), 2);
//!
//! while let Some(event) = events.next().await {
//!     print!("{}", event.to_sse());
//! }
//! # }
//! ```

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// Applications embedding AgentTalk opt in to `RUST_LOG` driven diagnostics by calling this
/// once at startup. Later calls are no-ops.
///
/// ```rust
/// agenttalk::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::try_init();
    });
}

// Import the top-level `agenttalk` module.
pub mod agenttalk;

// Re-exporting key items for easier external access.
pub use agenttalk::agent;
pub use agenttalk::agent::{Agent, AgentReply, ChatGptAgent, GeminiAgent, GroqAgent};
pub use agenttalk::client_wrapper;
pub use agenttalk::client_wrapper::{ClientWrapper, Message, RequestOptions, Role, TokenUsage};
pub use agenttalk::clients;
pub use agenttalk::config;
pub use agenttalk::config::{AgentTalkConfig, ProviderConfig};
pub use agenttalk::conversation;
pub use agenttalk::conversation::{ConversationLog, Turn, USER_SPEAKER};
pub use agenttalk::event;
pub use agenttalk::event::{EventHandler, EventStream, StreamEvent};
pub use agenttalk::orchestrator;
pub use agenttalk::orchestrator::{
    AgentCall, CallResponse, Orchestrator, OrchestratorError, ProjectPhase, ProjectState,
    Protocol, RunState, SharedOrchestrator, StatusSnapshot, StepResult,
};
pub use agenttalk::registry;
pub use agenttalk::registry::{AgentInfo, AgentRegistry};
