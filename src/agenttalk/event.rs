//! Streaming protocol runs.
//!
//! A streamed run reports each transition as a [`StreamEvent`], in strict order:
//!
//! ```text
//! start
//!   thinking { agent, role }          ┐
//!   message { agent, role, message }  ┘ once per scheduled step (or error { agent, error })
//! message { agent: "System", role: "Orchestrator", message: <summary> }
//! complete
//! ```
//!
//! `start` is always the first event and `complete` always the last, exactly once each.
//!
//! Events reach the consumer through an [`EventHandler`]. Implement it for callbacks, or use
//! [`stream_sequential_pipeline`] / [`stream_round_robin_discussion`], which run the protocol
//! on a tokio task and hand back an [`EventStream`] fed by a [`ChannelEventHandler`].
//!
//! # Example
//!
//! ```rust,no_run
//! use agenttalk::event::{stream_sequential_pipeline, StreamEvent};
//! use agenttalk::{AgentTalkConfig, Orchestrator};
//! use futures_util::StreamExt;
//!
//! # async {
//! let session = Orchestrator::from_config(&AgentTalkConfig::from_env()).into_shared();
//! let mut events = stream_sequential_pipeline(session.clone(), "A recipe sharing site".into());
//!
//! while let Some(event) = events.next().await {
//!     match &event {
//!         StreamEvent::Thinking { agent, role } => println!("{} ({}) is thinking...", agent, role),
//!         StreamEvent::Message { agent, message, .. } => println!("[{}] {}", agent, message),
//!         _ => {}
//!     }
//! }
//! # };
//! ```

use crate::orchestrator::SharedOrchestrator;
use async_trait::async_trait;
use futures_util::Stream;
use log::debug;
use serde::Serialize;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// One lifecycle event of a streamed run. Serializes as `{"type": "...", ...payload}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// The run was accepted. Always first.
    Start { message: String },

    /// `agent` is about to be invoked.
    Thinking { agent: String, role: String },

    /// A reply, either from an agent or the closing summary from `System`.
    Message {
        agent: String,
        role: String,
        message: String,
    },

    /// A step's agent could not be resolved, or the run was rejected before it started
    /// (then `agent` is `System`).
    Error { agent: String, error: String },

    /// The run is over. Always last.
    Complete,
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete)
    }

    /// Render the event as one Server-Sent-Events frame: `data: <json>\n\n`.
    pub fn to_sse(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => format!("data: {}\n\n", json),
            Err(_) => "data: {\"type\":\"error\",\"agent\":\"System\",\"error\":\"unserializable event\"}\n\n".to_string(),
        }
    }
}

/// Receives the events of a streamed run, in order.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_stream_event(&self, event: &StreamEvent);
}

/// Forwards every event onto an unbounded channel.
///
/// If the consumer goes away the run still finishes and its turns are still appended; the
/// remaining events are dropped.
pub struct ChannelEventHandler {
    sender: mpsc::UnboundedSender<StreamEvent>,
}

impl ChannelEventHandler {
    /// A handler and the stream that yields what it receives.
    pub fn channel() -> (ChannelEventHandler, EventStream) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (ChannelEventHandler { sender }, EventStream { receiver })
    }
}

#[async_trait]
impl EventHandler for ChannelEventHandler {
    async fn on_stream_event(&self, event: &StreamEvent) {
        if self.sender.send(event.clone()).is_err() {
            debug!("ChannelEventHandler: consumer gone, dropping {:?}", event);
        }
    }
}

/// The consumer side of a streamed run. Ends after `complete`.
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<StreamEvent>,
}

impl EventStream {
    /// Wait for the run to finish and return every event it produced.
    pub async fn collect_all(mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.receiver.recv().await {
            events.push(event);
        }
        events
    }
}

impl Stream for EventStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StreamEvent>> {
        self.receiver.poll_recv(cx)
    }
}

/// Run the pipeline on `request` in the background and stream its events.
///
/// The session stays locked until the run completes, so concurrent runs queue up instead of
/// interleaving turns. Must be called from within a tokio runtime.
pub fn stream_sequential_pipeline(session: SharedOrchestrator, request: String) -> EventStream {
    let (handler, stream) = ChannelEventHandler::channel();
    tokio::spawn(async move {
        let mut orchestrator = session.lock().await;
        let _ = orchestrator
            .run_sequential_pipeline_with_events(&request, &handler)
            .await;
    });
    stream
}

/// Run a round-robin discussion in the background and stream its events.
pub fn stream_round_robin_discussion(
    session: SharedOrchestrator,
    topic: String,
    rounds: usize,
) -> EventStream {
    let (handler, stream) = ChannelEventHandler::channel();
    tokio::spawn(async move {
        let mut orchestrator = session.lock().await;
        let _ = orchestrator
            .run_round_robin_discussion_with_events(&topic, rounds, &handler)
            .await;
    });
    stream
}
