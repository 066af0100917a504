//! Shared domain types for Stepflow.
//!
//! This crate contains the types passed between the engine layers:
//! the workflow document model, the capability catalog model, sanitizer
//! diagnostics, and execution trace records.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono.

pub mod capability;
pub mod diagnostic;
pub mod workflow;
