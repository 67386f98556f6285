// Copyright 2025 Cowboy AI, LLC.

//! Outcome of running a rule batch for one event

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::WorkflowError;
use crate::identifiers::EventId;
use crate::workflow::event_type::WorkflowEventType;

/// Outcome of one rule whose action ran
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    /// Rule that ran
    pub rule_id: String,
    /// Whether the action completed without error
    pub success: bool,
    /// Failure, if the action failed or timed out
    pub error: Option<WorkflowError>,
    /// How long the action took
    pub duration: Duration,
}

/// Aggregate outcome of executing every matching rule for one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecutionResult {
    /// Event that triggered the batch
    pub event_id: EventId,
    /// Type of the triggering event
    pub event_type: WorkflowEventType,
    /// True iff `errors` is empty
    pub success: bool,
    /// Rules whose condition matched and whose action ran
    pub rules_executed: usize,
    /// Every failure captured during the batch
    pub errors: Vec<WorkflowError>,
    /// Wall-clock time of the whole batch
    pub execution_time: Duration,
    /// Per-rule outcomes, in execution order
    pub rule_results: Vec<RuleResult>,
}

impl WorkflowExecutionResult {
    /// Start an empty result for an event
    pub(crate) fn empty(event_id: EventId, event_type: WorkflowEventType) -> Self {
        Self {
            event_id,
            event_type,
            success: true,
            rules_executed: 0,
            errors: Vec::new(),
            execution_time: Duration::ZERO,
            rule_results: Vec::new(),
        }
    }

    /// Record the outcome of one rule
    pub(crate) fn record(
        &mut self,
        rule_id: &str,
        outcome: Result<(), WorkflowError>,
        duration: Duration,
    ) {
        self.rules_executed += 1;
        let error = outcome.err();
        if let Some(err) = &error {
            self.errors.push(err.clone());
        }
        self.success = self.errors.is_empty();
        self.rule_results.push(RuleResult {
            rule_id: rule_id.to_string(),
            success: error.is_none(),
            error,
            duration,
        });
    }

    /// Ids of the rules that ran, in execution order
    pub fn executed_rule_ids(&self) -> Vec<&str> {
        self.rule_results.iter().map(|r| r.rule_id.as_str()).collect()
    }

    /// Ids of the rules that failed
    pub fn failed_rule_ids(&self) -> Vec<&str> {
        self.rule_results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.rule_id.as_str())
            .collect()
    }
}
