// Copyright 2025 Cowboy AI, LLC.

//! Domain event catalog
//!
//! The closed set of state changes emitted by the blueprint, task, log and QC
//! aggregates, wrapped in [`DomainEventEnum`] for uniform handling.

use serde::{Deserialize, Serialize};

use crate::errors::WorkflowResult;
use crate::events::DomainEvent;
use crate::identifiers::BlueprintId;
use crate::workflow::{
    LogPayload, QcPayload, TaskQuantityPayload, TaskTransitionPayload, WorkflowEventType,
};

/// Enum wrapper for all domain events
///
/// Serialized adjacently tagged: `{"eventType": "TaskCreated", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType", content = "data")]
pub enum DomainEventEnum {
    // Blueprint events
    /// A blueprint was created
    BlueprintCreated(BlueprintCreated),
    /// A blueprint's details changed
    BlueprintUpdated(BlueprintUpdated),
    /// A blueprint was archived
    BlueprintArchived(BlueprintArchived),

    // Task events
    /// A task was created
    TaskCreated(TaskCreated),
    /// A task's completed quantity changed
    TaskQuantityUpdated(TaskQuantityChanged),
    /// A task's completed quantity reached its total
    TaskQuantityReached(TaskQuantityChanged),
    /// A task was completed
    TaskCompleted(TaskCompleted),

    // Log events
    /// A daily log was created
    LogCreated(LogCreated),
    /// A daily log was submitted for review
    LogSubmitted(LogSubmitted),
    /// A daily log was approved
    LogApproved(LogReviewed),
    /// A daily log was rejected
    LogRejected(LogReviewed),

    // QC events
    /// A QC inspection was opened for a task
    QcCreated(QcCreated),
    /// A QC inspection passed
    QcPassed(QcInspected),
    /// A QC inspection failed
    QcFailed(QcInspected),
}

/// Blueprint created event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintCreated {
    /// The new blueprint
    pub blueprint_id: BlueprintId,
    /// Display name
    pub name: String,
    /// User who owns the blueprint
    pub owner_id: String,
}

/// Blueprint updated event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintUpdated {
    /// The changed blueprint
    pub blueprint_id: BlueprintId,
    /// Names of the fields that changed
    pub changed_fields: Vec<String>,
    /// User who made the change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

/// Blueprint archived event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintArchived {
    /// The archived blueprint
    pub blueprint_id: BlueprintId,
    /// User who archived it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_by: Option<String>,
}

/// Task created event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreated {
    /// Owning blueprint
    pub blueprint_id: BlueprintId,
    /// The new task
    pub task_id: String,
    /// Task title
    pub title: String,
    /// Planned quantity
    pub total_quantity: f64,
}

/// Task quantity change, shared by the updated and reached events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuantityChanged {
    /// Owning blueprint
    pub blueprint_id: BlueprintId,
    /// The task
    pub task_id: String,
    /// Planned quantity
    pub total_quantity: f64,
    /// Quantity completed before this change
    pub previous_quantity: f64,
    /// Quantity completed after this change
    pub completed_quantity: f64,
    /// Task is configured to complete itself
    pub auto_complete_enabled: bool,
    /// Task is configured to go to QC by itself
    #[serde(rename = "autoSendToQCEnabled")]
    pub auto_send_to_qc_enabled: bool,
    /// User who reported the quantity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl TaskQuantityChanged {
    /// Whether this change moved the task from below its total to at or above it
    pub fn crosses_total(&self) -> bool {
        self.total_quantity > 0.0
            && self.previous_quantity < self.total_quantity
            && self.completed_quantity >= self.total_quantity
    }

    /// Events this change produces: always the update, plus the reached event
    /// when the total is crossed
    pub fn into_events(self) -> Vec<DomainEventEnum> {
        if self.crosses_total() {
            vec![
                DomainEventEnum::TaskQuantityUpdated(self.clone()),
                DomainEventEnum::TaskQuantityReached(self),
            ]
        } else {
            vec![DomainEventEnum::TaskQuantityUpdated(self)]
        }
    }
}

/// Task completed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCompleted {
    /// Owning blueprint
    pub blueprint_id: BlueprintId,
    /// The completed task
    pub task_id: String,
    /// User who completed it, absent when completed by automation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<String>,
}

/// Daily log created event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogCreated {
    /// Owning blueprint
    pub blueprint_id: BlueprintId,
    /// The new log
    pub log_id: String,
    /// Author
    pub author_id: String,
}

/// Daily log submitted event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSubmitted {
    /// Owning blueprint
    pub blueprint_id: BlueprintId,
    /// The submitted log
    pub log_id: String,
    /// Submitting user
    pub submitted_by: String,
}

/// Daily log review outcome, shared by approval and rejection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogReviewed {
    /// Owning blueprint
    pub blueprint_id: BlueprintId,
    /// The reviewed log
    pub log_id: String,
    /// Reviewer
    pub reviewer_id: String,
    /// Review comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// QC inspection opened event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QcCreated {
    /// Owning blueprint
    pub blueprint_id: BlueprintId,
    /// The inspection
    pub qc_id: String,
    /// Task under inspection
    pub task_id: String,
}

/// QC inspection outcome, shared by pass and fail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QcInspected {
    /// Owning blueprint
    pub blueprint_id: BlueprintId,
    /// The inspection
    pub qc_id: String,
    /// Task under inspection
    pub task_id: String,
    /// Inspector
    pub inspector_id: String,
    /// Inspector notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl DomainEventEnum {
    /// The workflow event type this domain event maps to
    pub fn workflow_type(&self) -> WorkflowEventType {
        match self {
            Self::BlueprintCreated(_) => WorkflowEventType::BlueprintCreated,
            Self::BlueprintUpdated(_) => WorkflowEventType::BlueprintUpdated,
            Self::BlueprintArchived(_) => WorkflowEventType::BlueprintArchived,
            Self::TaskCreated(_) => WorkflowEventType::TaskCreated,
            Self::TaskQuantityUpdated(_) => WorkflowEventType::TaskQuantityUpdated,
            Self::TaskQuantityReached(_) => WorkflowEventType::TaskQuantityReached,
            Self::TaskCompleted(_) => WorkflowEventType::TaskCompleted,
            Self::LogCreated(_) => WorkflowEventType::LogCreated,
            Self::LogSubmitted(_) => WorkflowEventType::LogSubmitted,
            Self::LogApproved(_) => WorkflowEventType::LogApproved,
            Self::LogRejected(_) => WorkflowEventType::LogRejected,
            Self::QcCreated(_) => WorkflowEventType::QcCreated,
            Self::QcPassed(_) => WorkflowEventType::QcPassed,
            Self::QcFailed(_) => WorkflowEventType::QcFailed,
        }
    }

    /// User whose action produced the event, when known
    pub fn actor_id(&self) -> Option<&str> {
        match self {
            Self::BlueprintCreated(e) => Some(e.owner_id.as_str()),
            Self::BlueprintUpdated(e) => e.updated_by.as_deref(),
            Self::BlueprintArchived(e) => e.archived_by.as_deref(),
            Self::TaskCreated(_) => None,
            Self::TaskQuantityUpdated(e) | Self::TaskQuantityReached(e) => e.updated_by.as_deref(),
            Self::TaskCompleted(e) => e.completed_by.as_deref(),
            Self::LogCreated(e) => Some(e.author_id.as_str()),
            Self::LogSubmitted(e) => Some(e.submitted_by.as_str()),
            Self::LogApproved(e) | Self::LogRejected(e) => Some(e.reviewer_id.as_str()),
            Self::QcCreated(_) => None,
            Self::QcPassed(e) | Self::QcFailed(e) => Some(e.inspector_id.as_str()),
        }
    }

    /// Payload in the shape workflow rules read for the mapped event type
    pub fn workflow_payload(&self) -> WorkflowResult<serde_json::Value> {
        let value = match self {
            Self::BlueprintCreated(e) => serde_json::to_value(e)?,
            Self::BlueprintUpdated(e) => serde_json::to_value(e)?,
            Self::BlueprintArchived(e) => serde_json::to_value(e)?,
            Self::TaskCreated(e) => serde_json::to_value(e)?,
            Self::TaskQuantityUpdated(e) | Self::TaskQuantityReached(e) => {
                serde_json::to_value(TaskQuantityPayload {
                    task_id: e.task_id.clone(),
                    total_quantity: e.total_quantity,
                    completed_quantity: e.completed_quantity,
                    auto_complete_enabled: e.auto_complete_enabled,
                    auto_send_to_qc_enabled: e.auto_send_to_qc_enabled,
                })?
            }
            Self::TaskCompleted(e) => serde_json::to_value(TaskTransitionPayload {
                task_id: e.task_id.clone(),
                reason: None,
                qc_id: None,
            })?,
            Self::LogCreated(e) => serde_json::to_value(LogPayload {
                log_id: e.log_id.clone(),
                user_id: Some(e.author_id.clone()),
                comment: None,
            })?,
            Self::LogSubmitted(e) => serde_json::to_value(LogPayload {
                log_id: e.log_id.clone(),
                user_id: Some(e.submitted_by.clone()),
                comment: None,
            })?,
            Self::LogApproved(e) | Self::LogRejected(e) => serde_json::to_value(LogPayload {
                log_id: e.log_id.clone(),
                user_id: Some(e.reviewer_id.clone()),
                comment: e.comment.clone(),
            })?,
            Self::QcCreated(e) => serde_json::to_value(QcPayload {
                qc_id: e.qc_id.clone(),
                task_id: e.task_id.clone(),
                inspector_id: None,
                notes: None,
            })?,
            Self::QcPassed(e) | Self::QcFailed(e) => serde_json::to_value(QcPayload {
                qc_id: e.qc_id.clone(),
                task_id: e.task_id.clone(),
                inspector_id: Some(e.inspector_id.clone()),
                notes: e.notes.clone(),
            })?,
        };
        Ok(value)
    }
}

impl DomainEvent for DomainEventEnum {
    fn aggregate_id(&self) -> &str {
        match self {
            Self::BlueprintCreated(e) => e.blueprint_id.as_str(),
            Self::BlueprintUpdated(e) => e.blueprint_id.as_str(),
            Self::BlueprintArchived(e) => e.blueprint_id.as_str(),
            Self::TaskCreated(e) => &e.task_id,
            Self::TaskQuantityUpdated(e) | Self::TaskQuantityReached(e) => &e.task_id,
            Self::TaskCompleted(e) => &e.task_id,
            Self::LogCreated(e) => &e.log_id,
            Self::LogSubmitted(e) => &e.log_id,
            Self::LogApproved(e) | Self::LogRejected(e) => &e.log_id,
            Self::QcCreated(e) => &e.qc_id,
            Self::QcPassed(e) | Self::QcFailed(e) => &e.qc_id,
        }
    }

    fn event_type(&self) -> &'static str {
        match self {
            Self::BlueprintCreated(_) => "BlueprintCreated",
            Self::BlueprintUpdated(_) => "BlueprintUpdated",
            Self::BlueprintArchived(_) => "BlueprintArchived",
            Self::TaskCreated(_) => "TaskCreated",
            Self::TaskQuantityUpdated(_) => "TaskQuantityUpdated",
            Self::TaskQuantityReached(_) => "TaskQuantityReached",
            Self::TaskCompleted(_) => "TaskCompleted",
            Self::LogCreated(_) => "LogCreated",
            Self::LogSubmitted(_) => "LogSubmitted",
            Self::LogApproved(_) => "LogApproved",
            Self::LogRejected(_) => "LogRejected",
            Self::QcCreated(_) => "QcCreated",
            Self::QcPassed(_) => "QcPassed",
            Self::QcFailed(_) => "QcFailed",
        }
    }

    fn blueprint_id(&self) -> &BlueprintId {
        match self {
            Self::BlueprintCreated(e) => &e.blueprint_id,
            Self::BlueprintUpdated(e) => &e.blueprint_id,
            Self::BlueprintArchived(e) => &e.blueprint_id,
            Self::TaskCreated(e) => &e.blueprint_id,
            Self::TaskQuantityUpdated(e) | Self::TaskQuantityReached(e) => &e.blueprint_id,
            Self::TaskCompleted(e) => &e.blueprint_id,
            Self::LogCreated(e) => &e.blueprint_id,
            Self::LogSubmitted(e) => &e.blueprint_id,
            Self::LogApproved(e) | Self::LogRejected(e) => &e.blueprint_id,
            Self::QcCreated(e) => &e.blueprint_id,
            Self::QcPassed(e) | Self::QcFailed(e) => &e.blueprint_id,
        }
    }
}
