// Copyright 2025 Cowboy AI, LLC.

//! Audit and notification sink
//!
//! The sink is the boundary to persistence and user notification. This crate
//! only defines the interface; the hosting application supplies the
//! implementation.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::workflow::events::WorkflowEvent;
use crate::workflow::result::WorkflowExecutionResult;
use crate::workflow::rule::RuleAction;

/// Receives workflow events and execution outcomes for persistence and notification
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkflowSink: Send + Sync {
    /// Persist or notify about an event
    async fn deliver(&self, event: &WorkflowEvent) -> anyhow::Result<()>;

    /// Record the outcome of a rule batch
    async fn record_execution(
        &self,
        _event: &WorkflowEvent,
        _result: &WorkflowExecutionResult,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Rule action that forwards the triggering event to a sink
#[derive(Clone)]
pub struct NotifySink {
    sink: Arc<dyn WorkflowSink>,
}

impl NotifySink {
    /// Forward to `sink`
    pub fn new(sink: Arc<dyn WorkflowSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl RuleAction for NotifySink {
    async fn execute(&self, event: &WorkflowEvent) -> anyhow::Result<()> {
        debug!(event_id = %event.id, event_type = %event.event_type, "Forwarding event to sink");
        self.sink.deliver(event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::event_type::WorkflowEventType;
    use serde_json::json;

    #[tokio::test]
    async fn test_notify_sink_forwards_event() {
        let event = WorkflowEvent::new(
            WorkflowEventType::LogSubmitted,
            "bp1",
            "logs",
            json!({"logId": "l1"}),
        );
        let expected_id = event.id;

        let mut sink = MockWorkflowSink::new();
        sink.expect_deliver()
            .withf(move |e| e.id == expected_id)
            .times(1)
            .returning(|_| Ok(()));

        let action = NotifySink::new(Arc::new(sink));
        action.execute(&event).await.unwrap();
    }

    #[tokio::test]
    async fn test_notify_sink_surfaces_failure() {
        let event = WorkflowEvent::new(WorkflowEventType::LogSubmitted, "bp1", "logs", json!({}));

        let mut sink = MockWorkflowSink::new();
        sink.expect_deliver()
            .returning(|_| Err(anyhow::anyhow!("notification service down")));

        let action = NotifySink::new(Arc::new(sink));
        let err = action.execute(&event).await.unwrap_err();
        assert_eq!(err.to_string(), "notification service down");
    }
}
