//! Workflow engine core for Stepflow.
//!
//! This crate contains the "brain" of the engine:
//! - `registry` -- immutable capability catalog with parameter contracts
//! - `sanitize` -- repair passes turning untrusted documents into valid workflows
//! - `resolve` -- missing-parameter resolution strategies and parameter hooks
//! - `template` -- `{{ ... }}` interpolation against the execution context
//! - `expression` -- JEXL evaluator for step `condition` clauses
//! - `connector` -- the boundary every capability implementation satisfies
//! - `runner` -- sequential step dispatcher with per-step failure isolation
//!
//! The core performs no I/O of its own: connectors, secret stores, and
//! value-resolution strategies are injected by the caller.

pub mod connector;
pub mod context;
pub mod expression;
pub mod registry;
pub mod resolve;
pub mod runner;
pub mod sanitize;
pub mod secret;
pub mod template;
