//! The shared conversation.
//!
//! A [`ConversationLog`] is an append-only, insertion-ordered record of [`Turn`]s. Only the
//! [`Orchestrator`](crate::Orchestrator) writes to it; agents receive a read-only window
//! built with [`ConversationLog::recent_window`].
//!
//! ```
//! use agenttalk::conversation::{ConversationLog, USER_SPEAKER};
//!
//! let mut log = ConversationLog::new();
//! log.append(USER_SPEAKER, "User", "Build a chess engine");
//! log.append("chatgpt", "Product Manager", "Spec: ...");
//!
//! assert_eq!(log.len(), 2);
//! assert_eq!(log.recent_window(1)[0].speaker, "chatgpt");
//! assert_eq!(log.recent_window(10).len(), 2);
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Speaker recorded for turns written on behalf of the human user.
pub const USER_SPEAKER: &str = "User";

/// One immutable entry of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    /// Registry name of the agent, or [`USER_SPEAKER`].
    #[serde(rename = "agent")]
    pub speaker: String,
    pub role: String,
    pub message: String,
    /// Set when `message` carries a provider failure rather than a real reply.
    pub is_error: bool,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn is_from_user(&self) -> bool {
        self.speaker == USER_SPEAKER
    }
}

#[derive(Debug, Default)]
pub struct ConversationLog {
    turns: Vec<Turn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        ConversationLog { turns: Vec::new() }
    }

    /// Append a turn stamped with the current time and return a reference to it.
    pub fn append(
        &mut self,
        speaker: impl Into<String>,
        role: impl Into<String>,
        message: impl Into<String>,
    ) -> &Turn {
        self.push(speaker.into(), role.into(), message.into(), false)
    }

    /// Same as [`append`](ConversationLog::append) but records a provider failure.
    pub fn append_error(
        &mut self,
        speaker: impl Into<String>,
        role: impl Into<String>,
        message: impl Into<String>,
    ) -> &Turn {
        self.push(speaker.into(), role.into(), message.into(), true)
    }

    fn push(&mut self, speaker: String, role: String, message: String, is_error: bool) -> &Turn {
        self.turns.push(Turn {
            speaker,
            role,
            message,
            is_error,
            timestamp: Utc::now(),
        });
        &self.turns[self.turns.len() - 1]
    }

    /// The last `n` turns in log order, or the whole log when it is shorter.
    pub fn recent_window(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    pub fn all(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

/// Last `n` turns of an arbitrary slice. Agents use this on the context they are handed.
pub fn tail(turns: &[Turn], n: usize) -> &[Turn] {
    &turns[turns.len().saturating_sub(n)..]
}
