// Copyright 2025 Cowboy AI, LLC.

//! Error types for workflow operations

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur in the event bus, rule registry and executor
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum WorkflowError {
    /// A rule with the same id is already registered
    #[error("Duplicate rule id: {0}")]
    DuplicateRuleId(String),

    /// No rule with the given id is registered
    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    /// A rule action failed
    #[error("Rule {rule_id} failed: {message}")]
    RuleExecution {
        /// Rule whose action failed
        rule_id: String,
        /// Failure reported by the action
        message: String,
    },

    /// A rule action exceeded the configured budget
    #[error("Rule {rule_id} timed out after {timeout_ms}ms")]
    RuleTimeout {
        /// Rule whose action timed out
        rule_id: String,
        /// Budget that was exceeded
        timeout_ms: u64,
    },

    /// The bus has been shut down and accepts no more events
    #[error("Event bus is closed")]
    BusClosed,

    /// The bus could not record or dispatch the event
    #[error("Event bus unavailable: {0}")]
    BusUnavailable(String),

    /// An event payload did not have the shape its type requires
    #[error("Invalid payload for {event_type}: {reason}")]
    InvalidPayload {
        /// Event type tag
        event_type: String,
        /// What was wrong with the payload
        reason: String,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be loaded or applied
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;

impl From<serde_json::Error> for WorkflowError {
    fn from(err: serde_json::Error) -> Self {
        WorkflowError::Serialization(err.to_string())
    }
}

impl WorkflowError {
    /// Wrap an action failure with the id of the rule that produced it
    pub fn rule_execution(rule_id: impl Into<String>, err: &anyhow::Error) -> Self {
        WorkflowError::RuleExecution {
            rule_id: rule_id.into(),
            message: format!("{err:#}"),
        }
    }

    /// Id of the rule this error is attributed to, if any
    pub fn rule_id(&self) -> Option<&str> {
        match self {
            WorkflowError::DuplicateRuleId(id) | WorkflowError::RuleNotFound(id) => Some(id),
            WorkflowError::RuleExecution { rule_id, .. }
            | WorkflowError::RuleTimeout { rule_id, .. } => Some(rule_id),
            _ => None,
        }
    }

    /// Check if this is a registry configuration error
    pub fn is_registry_error(&self) -> bool {
        matches!(
            self,
            WorkflowError::DuplicateRuleId(_) | WorkflowError::RuleNotFound(_)
        )
    }

    /// Check if this error came out of running a rule
    pub fn is_execution_error(&self) -> bool {
        matches!(
            self,
            WorkflowError::RuleExecution { .. } | WorkflowError::RuleTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = WorkflowError::DuplicateRuleId("auto-qc".to_string());
        assert_eq!(err.to_string(), "Duplicate rule id: auto-qc");

        let err = WorkflowError::RuleNotFound("missing".to_string());
        assert_eq!(err.to_string(), "Rule not found: missing");

        let err = WorkflowError::RuleTimeout {
            rule_id: "slow".to_string(),
            timeout_ms: 250,
        };
        assert_eq!(err.to_string(), "Rule slow timed out after 250ms");

        assert_eq!(WorkflowError::BusClosed.to_string(), "Event bus is closed");
    }

    #[test]
    fn test_rule_execution_keeps_context_chain() {
        let cause = anyhow::anyhow!("row locked").context("update task status");
        let err = WorkflowError::rule_execution("complete-task", &cause);

        assert_eq!(err.rule_id(), Some("complete-task"));
        assert_eq!(
            err.to_string(),
            "Rule complete-task failed: update task status: row locked"
        );
    }

    #[test]
    fn test_error_categories() {
        assert!(WorkflowError::DuplicateRuleId("a".into()).is_registry_error());
        assert!(WorkflowError::RuleNotFound("a".into()).is_registry_error());
        assert!(!WorkflowError::BusClosed.is_registry_error());

        let timeout = WorkflowError::RuleTimeout {
            rule_id: "a".into(),
            timeout_ms: 1,
        };
        assert!(timeout.is_execution_error());
        assert!(!WorkflowError::BusClosed.is_execution_error());
        assert_eq!(WorkflowError::BusClosed.rule_id(), None);
    }

    #[test]
    fn test_from_serde_error() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: WorkflowError = parse.unwrap_err().into();
        assert!(matches!(err, WorkflowError::Serialization(_)));
    }
}
