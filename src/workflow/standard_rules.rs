// Copyright 2025 Cowboy AI, LLC.

//! Standard task/QC automation rules and the follow-up publishing action

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::errors::WorkflowResult;
use crate::infrastructure::EventBus;
use crate::workflow::event_type::WorkflowEventType;
use crate::workflow::events::WorkflowEvent;
use crate::workflow::payloads::{QcPayload, TaskQuantityPayload, TaskTransitionPayload};
use crate::workflow::rule::{RuleAction, WorkflowRule};

/// Source recorded on events produced by workflow rules
pub const WORKFLOW_SOURCE: &str = "workflow";

/// Id of the rule handing finished tasks to QC
pub const AUTO_SEND_TO_QC: &str = "task-auto-send-to-qc";
/// Id of the rule completing finished tasks that skip QC
pub const AUTO_COMPLETE: &str = "task-auto-complete";
/// Id of the rule completing tasks whose inspection passed
pub const QC_PASSED_COMPLETE: &str = "qc-passed-complete-task";
/// Id of the rule reopening tasks whose inspection failed
pub const QC_FAILED_REOPEN: &str = "qc-failed-reopen-task";

/// Builds the payload of a follow-up event from the triggering event
pub type PayloadMapper = fn(&WorkflowEvent) -> WorkflowResult<Value>;

fn copy_payload(event: &WorkflowEvent) -> WorkflowResult<Value> {
    Ok(event.payload.clone())
}

/// Rule action publishing a follow-up event on the bus
///
/// The follow-up inherits blueprint, actor and correlation id from the
/// triggering event and records it as its cause.
#[derive(Clone)]
pub struct PublishFollowUp {
    bus: EventBus<WorkflowEvent>,
    event_type: WorkflowEventType,
    source: String,
    mapper: PayloadMapper,
}

impl PublishFollowUp {
    /// Publish `event_type` carrying a copy of the triggering payload
    pub fn new(bus: EventBus<WorkflowEvent>, event_type: WorkflowEventType) -> Self {
        Self {
            bus,
            event_type,
            source: WORKFLOW_SOURCE.to_string(),
            mapper: copy_payload,
        }
    }

    /// Build the payload with `mapper`
    pub fn with_payload(mut self, mapper: PayloadMapper) -> Self {
        self.mapper = mapper;
        self
    }

    /// Record a different source on the follow-up
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

#[async_trait]
impl RuleAction for PublishFollowUp {
    async fn execute(&self, event: &WorkflowEvent) -> anyhow::Result<()> {
        let payload = (self.mapper)(event)?;
        let next = event.follow_up(self.event_type, self.source.clone(), payload);
        debug!(
            cause = %event.id,
            follow_up = %next.id,
            event_type = %next.event_type,
            "Publishing follow-up event"
        );
        self.bus.publish(next)?;
        Ok(())
    }
}

fn quantity_reached(event: &WorkflowEvent) -> Option<TaskQuantityPayload> {
    event
        .payload_as::<TaskQuantityPayload>()
        .ok()
        .filter(TaskQuantityPayload::is_reached)
}

fn should_send_to_qc(event: &WorkflowEvent) -> bool {
    quantity_reached(event).is_some_and(|p| p.auto_send_to_qc_enabled)
}

fn should_auto_complete(event: &WorkflowEvent) -> bool {
    quantity_reached(event).is_some_and(|p| p.auto_complete_enabled && !p.auto_send_to_qc_enabled)
}

fn transition(task_id: String, reason: &str, qc_id: Option<String>) -> WorkflowResult<Value> {
    Ok(serde_json::to_value(TaskTransitionPayload {
        task_id,
        reason: Some(reason.to_string()),
        qc_id,
    })?)
}

fn quantity_reached_payload(event: &WorkflowEvent) -> WorkflowResult<Value> {
    let quantity: TaskQuantityPayload = event.payload_as()?;
    transition(quantity.task_id, "quantity reached", None)
}

fn qc_passed_payload(event: &WorkflowEvent) -> WorkflowResult<Value> {
    let qc: QcPayload = event.payload_as()?;
    transition(qc.task_id, "qc passed", Some(qc.qc_id))
}

fn qc_failed_payload(event: &WorkflowEvent) -> WorkflowResult<Value> {
    let qc: QcPayload = event.payload_as()?;
    let reason = qc.notes.unwrap_or_else(|| "qc failed".to_string());
    transition(qc.task_id, &reason, Some(qc.qc_id))
}

/// The task/QC automation rules shipped with the engine
///
/// - quantity reached with auto-send enabled → `task.sent.to.qc`
/// - quantity reached with only auto-complete enabled → `task.completed`
/// - `qc.passed` → `task.completed`
/// - `qc.failed` → `task.reopened`
pub fn standard_rules(bus: &EventBus<WorkflowEvent>) -> Vec<WorkflowRule> {
    vec![
        WorkflowRule::new(
            AUTO_SEND_TO_QC,
            "Send task to QC when its quantity is reached",
            WorkflowEventType::TaskQuantityReached,
            PublishFollowUp::new(bus.clone(), WorkflowEventType::TaskSentToQc)
                .with_payload(quantity_reached_payload),
        )
        .when(should_send_to_qc)
        .with_priority(20),
        WorkflowRule::new(
            AUTO_COMPLETE,
            "Complete task when its quantity is reached",
            WorkflowEventType::TaskQuantityReached,
            PublishFollowUp::new(bus.clone(), WorkflowEventType::TaskCompleted)
                .with_payload(quantity_reached_payload),
        )
        .when(should_auto_complete)
        .with_priority(10),
        WorkflowRule::new(
            QC_PASSED_COMPLETE,
            "Complete task after passed inspection",
            WorkflowEventType::QcPassed,
            PublishFollowUp::new(bus.clone(), WorkflowEventType::TaskCompleted)
                .with_payload(qc_passed_payload),
        ),
        WorkflowRule::new(
            QC_FAILED_REOPEN,
            "Reopen task after failed inspection",
            WorkflowEventType::QcFailed,
            PublishFollowUp::new(bus.clone(), WorkflowEventType::TaskReopened)
                .with_payload(qc_failed_payload),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reached(auto_complete: bool, auto_qc: bool) -> WorkflowEvent {
        WorkflowEvent::new(
            WorkflowEventType::TaskQuantityReached,
            "bp1",
            "tasks",
            json!({
                "taskId": "t1",
                "totalQuantity": 40,
                "completedQuantity": 40,
                "autoCompleteEnabled": auto_complete,
                "autoSendToQCEnabled": auto_qc
            }),
        )
    }

    #[test]
    fn test_conditions_are_exclusive() {
        assert!(should_send_to_qc(&reached(true, true)));
        assert!(!should_auto_complete(&reached(true, true)));

        assert!(should_auto_complete(&reached(true, false)));
        assert!(!should_send_to_qc(&reached(true, false)));

        assert!(!should_auto_complete(&reached(false, false)));
    }

    #[test]
    fn test_unfinished_quantity_does_not_match() {
        let mut event = reached(true, true);
        event.payload["completedQuantity"] = json!(39.5);
        assert!(!should_send_to_qc(&event));
        assert!(!should_auto_complete(&event));
    }

    #[test]
    fn test_malformed_payload_does_not_match() {
        let event = WorkflowEvent::new(
            WorkflowEventType::TaskQuantityReached,
            "bp1",
            "tasks",
            json!("oops"),
        );
        assert!(!should_send_to_qc(&event));
    }

    #[tokio::test]
    async fn test_publish_follow_up_chains_correlation() {
        let bus = EventBus::<WorkflowEvent>::default();
        let action = PublishFollowUp::new(bus.clone(), WorkflowEventType::TaskSentToQc)
            .with_payload(quantity_reached_payload);
        let event = reached(false, true).with_correlation_id("corr-42");

        action.execute(&event).await.unwrap();

        let history = bus.history();
        assert_eq!(history.len(), 1);
        let next = &history[0];
        assert_eq!(next.event_type, WorkflowEventType::TaskSentToQc);
        assert_eq!(next.source, WORKFLOW_SOURCE);
        assert_eq!(next.correlation_id, event.correlation_id);
        assert_eq!(next.causation_id, Some(event.id));
        assert_eq!(next.payload["taskId"], "t1");
    }

    #[tokio::test]
    async fn test_qc_failed_reason_uses_notes() {
        let bus = EventBus::<WorkflowEvent>::default();
        let rules = standard_rules(&bus);
        let reopen = rules.iter().find(|r| r.id == QC_FAILED_REOPEN).unwrap();
        let event = WorkflowEvent::new(
            WorkflowEventType::QcFailed,
            "bp1",
            "qc",
            json!({ "qcId": "q1", "taskId": "t1", "notes": "rebar spacing" }),
        );

        reopen.action().execute(&event).await.unwrap();

        let published = bus.history();
        assert_eq!(published[0].event_type, WorkflowEventType::TaskReopened);
        assert_eq!(published[0].payload["reason"], "rebar spacing");
        assert_eq!(published[0].payload["qcId"], "q1");
    }

    #[tokio::test]
    async fn test_publish_on_closed_bus_fails() {
        let bus = EventBus::<WorkflowEvent>::default();
        bus.shutdown();
        let action = PublishFollowUp::new(bus, WorkflowEventType::TaskCompleted);
        assert!(action.execute(&reached(true, false)).await.is_err());
    }
}
