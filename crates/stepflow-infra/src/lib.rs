//! Infrastructure layer for Stepflow.
//!
//! Contains the implementations behind the boundaries `stepflow-core`
//! defines: the connector implementations for every built-in capability
//! (GitHub, Notion, Slack, Discord, weather, AI summarization, email, docs,
//! generic HTTP) and the read-only secret stores (environment, JSON file,
//! chain).

pub mod connectors;
pub mod secret;
