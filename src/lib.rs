//! Guide Agent — proactive in-app guidance core.

pub mod agent;
pub mod clock;
pub mod config;
pub mod conversation;
pub mod emotion;
pub mod error;
pub mod events;
pub mod host;
pub mod knowledge;
pub mod lifecycle;
pub mod llm;
pub mod playbook;
pub mod policy;
pub mod store;
pub mod summon;
pub mod telemetry;
