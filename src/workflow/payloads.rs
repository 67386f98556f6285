// Copyright 2025 Cowboy AI, LLC.

//! Typed payloads carried by workflow events
//!
//! Payloads travel as JSON on [`WorkflowEvent`](super::WorkflowEvent) and are
//! read back through [`WorkflowEvent::payload_as`](super::WorkflowEvent::payload_as).
//! Field names use camelCase to match what the hosting application sends.

use serde::{Deserialize, Serialize};

/// Payload of `task.quantity.updated` and `task.quantity.reached`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuantityPayload {
    /// Task whose quantity changed
    pub task_id: String,
    /// Planned quantity for the task
    pub total_quantity: f64,
    /// Quantity completed so far
    pub completed_quantity: f64,
    /// Complete the task automatically once the quantity is reached
    #[serde(default)]
    pub auto_complete_enabled: bool,
    /// Hand the task to QC automatically once the quantity is reached
    #[serde(default, rename = "autoSendToQCEnabled")]
    pub auto_send_to_qc_enabled: bool,
}

impl TaskQuantityPayload {
    /// Whether the completed quantity has reached the planned total
    pub fn is_reached(&self) -> bool {
        self.total_quantity > 0.0 && self.completed_quantity >= self.total_quantity
    }
}

/// Payload of task lifecycle events (`task.completed`, `task.sent.to.qc`, `task.reopened`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTransitionPayload {
    /// Task that changed state
    pub task_id: String,
    /// Why the transition happened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// QC inspection involved in the transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qc_id: Option<String>,
}

/// Payload of QC events (`qc.created`, `qc.passed`, `qc.failed`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QcPayload {
    /// Inspection record
    pub qc_id: String,
    /// Task under inspection
    pub task_id: String,
    /// Inspector who recorded the outcome
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspector_id: Option<String>,
    /// Inspector notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Payload of daily log events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPayload {
    /// Daily log record
    pub log_id: String,
    /// User who authored or reviewed the log
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Review comment, for approvals and rejections
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quantity_payload_reads_host_field_names() {
        let payload: TaskQuantityPayload = serde_json::from_value(json!({
            "taskId": "t1",
            "totalQuantity": 100,
            "completedQuantity": 100,
            "autoCompleteEnabled": true,
            "autoSendToQCEnabled": true
        }))
        .unwrap();

        assert_eq!(payload.task_id, "t1");
        assert!(payload.auto_send_to_qc_enabled);
        assert!(payload.is_reached());
    }

    #[test]
    fn test_zero_total_is_never_reached() {
        let payload = TaskQuantityPayload {
            task_id: "t1".into(),
            total_quantity: 0.0,
            completed_quantity: 0.0,
            auto_complete_enabled: true,
            auto_send_to_qc_enabled: false,
        };
        assert!(!payload.is_reached());
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let payload = TaskTransitionPayload {
            task_id: "t1".into(),
            reason: None,
            qc_id: None,
        };
        assert_eq!(serde_json::to_value(&payload).unwrap(), json!({ "taskId": "t1" }));
    }
}
