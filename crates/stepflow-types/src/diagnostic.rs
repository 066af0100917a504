//! Sanitizer diagnostics.
//!
//! Every repair the sanitizer performs (unknown trigger replaced, step
//! rewritten to the fallback capability, placeholder value scrubbed) is
//! recorded as a `Diagnostic` so callers can surface what was changed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How serious a diagnostic is. Repairs are warnings; informational notes
/// (e.g. an adopted suggested trigger) are info.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
}

/// One sanitizer finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Step the finding applies to; `None` for trigger- or document-level
    /// findings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_index: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            step_index: None,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            step_index: None,
            message: message.into(),
        }
    }

    pub fn for_step(mut self, index: usize) -> Self {
        self.step_index = Some(index);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Info => "info",
            Severity::Warning => "warning",
        };
        match self.step_index {
            Some(index) => write!(f, "{level}: step {index}: {}", self.message),
            None => write!(f, "{level}: {}", self.message),
        }
    }
}
