// Copyright 2025 Cowboy AI, LLC.

//! Domain events
//!
//! Events represent facts that have occurred to an aggregate. They are
//! immutable once published and travel over the bus wrapped in a
//! [`DomainEventEnvelope`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain_events::DomainEventEnum;
use crate::errors::WorkflowResult;
use crate::identifiers::{BlueprintId, CorrelationId, EventId};
use crate::infrastructure::BusEvent;
use crate::workflow::WorkflowEvent;

/// Base trait for all domain events
///
/// # Examples
///
/// ```rust
/// use blueprint_workflow::{BlueprintId, DomainEvent};
///
/// #[derive(Debug)]
/// struct PhotoAttached {
///     blueprint_id: BlueprintId,
///     task_id: String,
/// }
///
/// impl DomainEvent for PhotoAttached {
///     fn aggregate_id(&self) -> &str {
///         &self.task_id
///     }
///
///     fn event_type(&self) -> &'static str {
///         "PhotoAttached"
///     }
///
///     fn blueprint_id(&self) -> &BlueprintId {
///         &self.blueprint_id
///     }
/// }
///
/// let event = PhotoAttached {
///     blueprint_id: BlueprintId::from("bp1"),
///     task_id: "t1".to_string(),
/// };
///
/// assert_eq!(event.event_type(), "PhotoAttached");
/// assert_eq!(event.version(), "v1");
/// ```
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Get the aggregate ID this event relates to
    fn aggregate_id(&self) -> &str;

    /// Get the event type name
    fn event_type(&self) -> &'static str;

    /// Get the blueprint the aggregate belongs to
    fn blueprint_id(&self) -> &BlueprintId;

    /// Get the schema version
    fn version(&self) -> &'static str {
        "v1"
    }
}

/// Domain event with identity and timing, as published on the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainEventEnvelope {
    /// Unique id of this occurrence
    pub event_id: EventId,

    /// When the state change happened
    pub occurred_on: DateTime<Utc>,

    /// Aggregate the event is about
    pub aggregate_id: String,

    /// Causal chain the event belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,

    /// The event itself
    pub data: DomainEventEnum,
}

impl DomainEventEnvelope {
    /// Wrap an event that just happened
    pub fn new(data: DomainEventEnum) -> Self {
        Self {
            event_id: EventId::new(),
            occurred_on: Utc::now(),
            aggregate_id: data.aggregate_id().to_string(),
            correlation_id: None,
            data,
        }
    }

    /// Attach a correlation id
    pub fn with_correlation_id(mut self, correlation_id: impl Into<CorrelationId>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Type tag of the wrapped event
    pub fn event_type(&self) -> &'static str {
        self.data.event_type()
    }

    /// Convert into the workflow event the rule engine consumes
    ///
    /// Blueprint, actor, correlation id and timestamp are carried over; the
    /// envelope's aggregate id and event id are kept as metadata.
    pub fn to_workflow_event(&self, source: impl Into<String>) -> WorkflowResult<WorkflowEvent> {
        let mut event = WorkflowEvent::new(
            self.data.workflow_type(),
            self.data.blueprint_id().clone(),
            source,
            self.data.workflow_payload()?,
        )
        .with_metadata("aggregateId", serde_json::Value::from(self.aggregate_id.clone()))
        .with_metadata("domainEventId", serde_json::Value::from(self.event_id.to_string()));
        event.timestamp = self.occurred_on;
        event.actor_id = self.data.actor_id().map(str::to_string);
        event.correlation_id = self.correlation_id.clone();
        Ok(event)
    }
}

impl BusEvent for DomainEventEnvelope {
    fn event_type(&self) -> &str {
        self.data.event_type()
    }

    fn scope_id(&self) -> &str {
        &self.aggregate_id
    }

    fn correlation_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref()
    }
}
