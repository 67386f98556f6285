// Copyright 2025 Cowboy AI, LLC.

//! Rule registry
//!
//! Stores workflow rules and answers "which enabled rules fire for this event
//! type, in what order". Ordering is priority descending, then registration
//! order.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::errors::{WorkflowError, WorkflowResult};
use crate::workflow::event_type::WorkflowEventType;
use crate::workflow::rule::WorkflowRule;

/// Runtime override for one registered rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSetting {
    /// Rule to adjust
    pub id: String,
    /// New enabled flag, if any
    #[serde(default)]
    pub enabled: Option<bool>,
    /// New priority, if any
    #[serde(default)]
    pub priority: Option<i32>,
}

#[derive(Debug)]
struct RegisteredRule {
    rule: Arc<WorkflowRule>,
    sequence: u64,
}

#[derive(Debug, Default)]
struct RegistryState {
    entries: Vec<RegisteredRule>,
    next_sequence: u64,
}

impl RegistryState {
    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.rule.id == id)
    }

    fn update<F>(&mut self, id: &str, change: F) -> WorkflowResult<()>
    where
        F: FnOnce(&mut WorkflowRule),
    {
        let index = self
            .position(id)
            .ok_or_else(|| WorkflowError::RuleNotFound(id.to_string()))?;
        let entry = &mut self.entries[index];
        let mut rule = WorkflowRule::clone(&entry.rule);
        change(&mut rule);
        entry.rule = Arc::new(rule);
        Ok(())
    }
}

/// Thread-safe store of workflow rules
///
/// Mutations swap whole rule snapshots under a write lock, so a reader never
/// sees a partially updated rule.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    state: RwLock<RegistryState>,
}

impl RuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule; fails if its id is taken
    pub async fn register(&self, rule: WorkflowRule) -> WorkflowResult<()> {
        let mut state = self.state.write().await;
        if state.position(&rule.id).is_some() {
            return Err(WorkflowError::DuplicateRuleId(rule.id));
        }

        let sequence = state.next_sequence;
        state.next_sequence += 1;
        info!(
            rule_id = %rule.id,
            trigger = %rule.trigger_event,
            priority = rule.priority.unwrap_or(0),
            enabled = rule.enabled,
            "Registered workflow rule"
        );
        state.entries.push(RegisteredRule {
            rule: Arc::new(rule),
            sequence,
        });
        Ok(())
    }

    /// Register several rules, stopping at the first failure
    pub async fn register_all(
        &self,
        rules: impl IntoIterator<Item = WorkflowRule>,
    ) -> WorkflowResult<()> {
        for rule in rules {
            self.register(rule).await?;
        }
        Ok(())
    }

    /// Remove a rule; returns whether anything was removed
    pub async fn unregister(&self, id: &str) -> bool {
        let mut state = self.state.write().await;
        match state.position(id) {
            Some(index) => {
                state.entries.remove(index);
                debug!(rule_id = id, "Unregistered workflow rule");
                true
            }
            None => false,
        }
    }

    /// Enable or disable a rule
    pub async fn set_enabled(&self, id: &str, enabled: bool) -> WorkflowResult<()> {
        self.state
            .write()
            .await
            .update(id, |rule| rule.enabled = enabled)?;
        debug!(rule_id = id, enabled, "Toggled workflow rule");
        Ok(())
    }

    /// Change a rule's priority
    pub async fn set_priority(&self, id: &str, priority: Option<i32>) -> WorkflowResult<()> {
        self.state
            .write()
            .await
            .update(id, |rule| rule.priority = priority)?;
        debug!(rule_id = id, priority = priority.unwrap_or(0), "Reprioritized workflow rule");
        Ok(())
    }

    /// Apply a table of overrides atomically
    ///
    /// Every id is checked before anything changes; one unknown id leaves the
    /// registry untouched.
    pub async fn apply_settings(&self, settings: &[RuleSetting]) -> WorkflowResult<()> {
        let mut state = self.state.write().await;
        if let Some(missing) = settings.iter().find(|s| state.position(&s.id).is_none()) {
            return Err(WorkflowError::RuleNotFound(missing.id.clone()));
        }
        for setting in settings {
            state.update(&setting.id, |rule| {
                if let Some(enabled) = setting.enabled {
                    rule.enabled = enabled;
                }
                if setting.priority.is_some() {
                    rule.priority = setting.priority;
                }
            })?;
        }
        Ok(())
    }

    /// Enabled rules for an event type
    ///
    /// Highest priority first, ties in registration order.
    pub async fn rules_for(&self, event_type: WorkflowEventType) -> Vec<Arc<WorkflowRule>> {
        let state = self.state.read().await;
        let mut matching: Vec<&RegisteredRule> = state
            .entries
            .iter()
            .filter(|e| e.rule.enabled && e.rule.trigger_event == event_type)
            .collect();
        matching.sort_by(|a, b| {
            let pa = a.rule.priority.unwrap_or(0);
            let pb = b.rule.priority.unwrap_or(0);
            pb.cmp(&pa).then(a.sequence.cmp(&b.sequence))
        });
        matching.into_iter().map(|e| Arc::clone(&e.rule)).collect()
    }

    /// Look up a rule by id
    pub async fn get(&self, id: &str) -> Option<Arc<WorkflowRule>> {
        let state = self.state.read().await;
        state.position(id).map(|i| Arc::clone(&state.entries[i].rule))
    }

    /// Whether a rule is enabled; `None` if it is not registered
    pub async fn is_enabled(&self, id: &str) -> Option<bool> {
        self.get(id).await.map(|r| r.enabled)
    }

    /// Registered rule ids in registration order
    pub async fn rule_ids(&self) -> Vec<String> {
        let state = self.state.read().await;
        state.entries.iter().map(|e| e.rule.id.clone()).collect()
    }

    /// Number of registered rules
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Whether no rules are registered
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
