// src/agenttalk/mod.rs

pub mod agent;
pub mod client_wrapper;
pub mod clients;
pub mod config;
pub mod conversation;
pub mod event;
pub mod orchestrator;
pub mod registry;
