// Copyright 2025 Cowboy AI, LLC.

//! Workflow rules: trigger, condition, action
//!
//! A rule listens for one [`WorkflowEventType`]. When an event of that type
//! arrives, the executor evaluates the rule's [`RuleCondition`] and, if it
//! holds, awaits the rule's [`RuleAction`].

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::workflow::event_type::WorkflowEventType;
use crate::workflow::events::WorkflowEvent;

/// Pure predicate deciding whether a rule applies to an event
pub trait RuleCondition: Send + Sync {
    /// Check the event; must not have side effects
    fn matches(&self, event: &WorkflowEvent) -> bool;
}

impl<F> RuleCondition for F
where
    F: Fn(&WorkflowEvent) -> bool + Send + Sync,
{
    fn matches(&self, event: &WorkflowEvent) -> bool {
        self(event)
    }
}

/// Condition that accepts every event
#[derive(Debug, Clone, Copy, Default)]
pub struct Always;

impl RuleCondition for Always {
    fn matches(&self, _event: &WorkflowEvent) -> bool {
        true
    }
}

/// Asynchronous effect run when a rule's condition holds
///
/// Implementations carry whatever services they need (bus handles,
/// repositories, notifiers). Actions are responsible for their own tenant
/// filtering: the engine hands them events from every blueprint.
#[async_trait]
pub trait RuleAction: Send + Sync {
    /// Run the effect for a matching event
    async fn execute(&self, event: &WorkflowEvent) -> anyhow::Result<()>;
}

/// A declarative trigger-condition-action tuple
#[derive(Clone)]
pub struct WorkflowRule {
    /// Unique rule id
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Event type this rule listens for
    pub trigger_event: WorkflowEventType,
    /// Whether the rule starts enabled
    pub enabled: bool,
    /// Higher runs first; absent counts as zero
    pub priority: Option<i32>,
    condition: Arc<dyn RuleCondition>,
    action: Arc<dyn RuleAction>,
}

impl WorkflowRule {
    /// Create an enabled rule with no priority that runs on every event of `trigger_event`
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        trigger_event: WorkflowEventType,
        action: impl RuleAction + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            trigger_event,
            enabled: true,
            priority: None,
            condition: Arc::new(Always),
            action: Arc::new(action),
        }
    }

    /// Replace the condition
    pub fn when(mut self, condition: impl RuleCondition + 'static) -> Self {
        self.condition = Arc::new(condition);
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Register the rule disabled
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Use a shared action instance
    pub fn with_shared_action(mut self, action: Arc<dyn RuleAction>) -> Self {
        self.action = action;
        self
    }

    /// Evaluate the condition
    pub fn matches(&self, event: &WorkflowEvent) -> bool {
        self.condition.matches(event)
    }

    /// The rule's action
    pub fn action(&self) -> &Arc<dyn RuleAction> {
        &self.action
    }
}

impl fmt::Debug for WorkflowRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowRule")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("trigger_event", &self.trigger_event)
            .field("enabled", &self.enabled)
            .field("priority", &self.priority)
            .finish()
    }
}
