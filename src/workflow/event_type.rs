// Copyright 2025 Cowboy AI, LLC.

//! The closed set of workflow event types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::WorkflowError;

/// Aggregate family a workflow event type belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFamily {
    /// Blueprint (project workspace) events
    Blueprint,
    /// Task progress events
    Task,
    /// Daily log events
    Log,
    /// Quality control events
    Qc,
}

/// Workflow event types that rules can be triggered by
///
/// Serialized as dotted tags such as `task.quantity.reached`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowEventType {
    /// A blueprint was created
    #[serde(rename = "blueprint.created")]
    BlueprintCreated,
    /// A blueprint's details changed
    #[serde(rename = "blueprint.updated")]
    BlueprintUpdated,
    /// A blueprint was archived
    #[serde(rename = "blueprint.archived")]
    BlueprintArchived,
    /// A task was created
    #[serde(rename = "task.created")]
    TaskCreated,
    /// A task's completed quantity changed
    #[serde(rename = "task.quantity.updated")]
    TaskQuantityUpdated,
    /// A task's completed quantity reached its total
    #[serde(rename = "task.quantity.reached")]
    TaskQuantityReached,
    /// A task was completed
    #[serde(rename = "task.completed")]
    TaskCompleted,
    /// A task was handed to quality control
    #[serde(rename = "task.sent.to.qc")]
    TaskSentToQc,
    /// A task was reopened after a failed inspection
    #[serde(rename = "task.reopened")]
    TaskReopened,
    /// A daily log was created
    #[serde(rename = "log.created")]
    LogCreated,
    /// A daily log was submitted for review
    #[serde(rename = "log.submitted")]
    LogSubmitted,
    /// A daily log was approved
    #[serde(rename = "log.approved")]
    LogApproved,
    /// A daily log was rejected
    #[serde(rename = "log.rejected")]
    LogRejected,
    /// A QC inspection was opened
    #[serde(rename = "qc.created")]
    QcCreated,
    /// A QC inspection passed
    #[serde(rename = "qc.passed")]
    QcPassed,
    /// A QC inspection failed
    #[serde(rename = "qc.failed")]
    QcFailed,
}

impl WorkflowEventType {
    /// Every workflow event type, in declaration order
    pub const ALL: [WorkflowEventType; 16] = [
        Self::BlueprintCreated,
        Self::BlueprintUpdated,
        Self::BlueprintArchived,
        Self::TaskCreated,
        Self::TaskQuantityUpdated,
        Self::TaskQuantityReached,
        Self::TaskCompleted,
        Self::TaskSentToQc,
        Self::TaskReopened,
        Self::LogCreated,
        Self::LogSubmitted,
        Self::LogApproved,
        Self::LogRejected,
        Self::QcCreated,
        Self::QcPassed,
        Self::QcFailed,
    ];

    /// The dotted tag for this type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BlueprintCreated => "blueprint.created",
            Self::BlueprintUpdated => "blueprint.updated",
            Self::BlueprintArchived => "blueprint.archived",
            Self::TaskCreated => "task.created",
            Self::TaskQuantityUpdated => "task.quantity.updated",
            Self::TaskQuantityReached => "task.quantity.reached",
            Self::TaskCompleted => "task.completed",
            Self::TaskSentToQc => "task.sent.to.qc",
            Self::TaskReopened => "task.reopened",
            Self::LogCreated => "log.created",
            Self::LogSubmitted => "log.submitted",
            Self::LogApproved => "log.approved",
            Self::LogRejected => "log.rejected",
            Self::QcCreated => "qc.created",
            Self::QcPassed => "qc.passed",
            Self::QcFailed => "qc.failed",
        }
    }

    /// The aggregate family this type belongs to
    pub fn family(&self) -> AggregateFamily {
        match self {
            Self::BlueprintCreated | Self::BlueprintUpdated | Self::BlueprintArchived => {
                AggregateFamily::Blueprint
            }
            Self::TaskCreated
            | Self::TaskQuantityUpdated
            | Self::TaskQuantityReached
            | Self::TaskCompleted
            | Self::TaskSentToQc
            | Self::TaskReopened => AggregateFamily::Task,
            Self::LogCreated | Self::LogSubmitted | Self::LogApproved | Self::LogRejected => {
                AggregateFamily::Log
            }
            Self::QcCreated | Self::QcPassed | Self::QcFailed => AggregateFamily::Qc,
        }
    }
}

impl fmt::Display for WorkflowEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowEventType {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| WorkflowError::InvalidPayload {
                event_type: s.to_string(),
                reason: "unknown workflow event type".to_string(),
            })
    }
}
