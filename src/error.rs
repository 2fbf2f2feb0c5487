use std::fmt;

use crate::context::AgentMode;

/// A single offending parameter, addressed by its path in the raw arguments
/// (e.g. `transfers[0].account_id`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field \"{}\": {}", self.field, self.message)
    }
}

/// Agent-supplied arguments failed validation.
///
/// Carries every issue found, in the order the fields were read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn new(issues: Vec<FieldIssue>) -> Self {
        Self { issues }
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            issues: vec![FieldIssue::new(field, message)],
        }
    }

    /// Names of all offending fields.
    pub fn fields(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.field.as_str()).collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid parameters: ")?;
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", issue)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, thiserror::Error)]
pub enum KitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("agent mode {0} is not supported")]
    UnsupportedMode(AgentMode),

    #[error("execution failed: {tool}: {message}")]
    Execution { tool: String, message: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
