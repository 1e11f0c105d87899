//! Provider specific [`ClientWrapper`](crate::client_wrapper::ClientWrapper) implementations.
//!
//! Each submodule offers a concrete client that speaks a particular vendor's API while
//! conforming to the uniform AgentTalk transport contract.

pub mod common;

pub mod gemini;
pub mod groq;
pub mod openai;
