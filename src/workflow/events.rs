// Copyright 2025 Cowboy AI, LLC.

//! Workflow events
//!
//! A [`WorkflowEvent`] is the generalized event the rule engine consumes. It is
//! always scoped to exactly one blueprint, and may carry a correlation id that
//! follow-up events inherit so a causal chain can be reconstructed.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::{WorkflowError, WorkflowResult};
use crate::identifiers::{BlueprintId, CorrelationId, EventId};
use crate::infrastructure::BusEvent;
use crate::workflow::event_type::WorkflowEventType;

/// Event consumed by the workflow rule engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEvent {
    /// Unique id of this event
    pub id: EventId,

    /// Workflow event type
    #[serde(rename = "type")]
    pub event_type: WorkflowEventType,

    /// Payload, shaped according to `event_type`
    pub payload: serde_json::Value,

    /// When the event was created
    pub timestamp: DateTime<Utc>,

    /// Module that originated the event
    pub source: String,

    /// Blueprint the event belongs to
    pub blueprint_id: BlueprintId,

    /// User whose action produced the event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,

    /// Token shared by every event in a causal chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,

    /// Event that directly caused this one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub causation_id: Option<EventId>,

    /// Free-form metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl WorkflowEvent {
    /// Create an event with a raw JSON payload
    pub fn new(
        event_type: WorkflowEventType,
        blueprint_id: impl Into<BlueprintId>,
        source: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            payload,
            timestamp: Utc::now(),
            source: source.into(),
            blueprint_id: blueprint_id.into(),
            actor_id: None,
            correlation_id: None,
            causation_id: None,
            metadata: HashMap::new(),
        }
    }

    /// Create an event from a typed payload
    pub fn with_payload<P: Serialize>(
        event_type: WorkflowEventType,
        blueprint_id: impl Into<BlueprintId>,
        source: impl Into<String>,
        payload: &P,
    ) -> WorkflowResult<Self> {
        let payload = serde_json::to_value(payload)?;
        Ok(Self::new(event_type, blueprint_id, source, payload))
    }

    /// Set the acting user
    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    /// Set the correlation id
    pub fn with_correlation_id(mut self, correlation_id: impl Into<CorrelationId>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Build an event caused by this one
    ///
    /// The follow-up keeps the blueprint, actor and correlation id of `self`
    /// and records `self.id` as its causation id.
    pub fn follow_up(
        &self,
        event_type: WorkflowEventType,
        source: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        let mut next = Self::new(event_type, self.blueprint_id.clone(), source, payload);
        next.actor_id = self.actor_id.clone();
        next.correlation_id = self.correlation_id.clone();
        next.causation_id = Some(self.id);
        next
    }

    /// Deserialize the payload into its typed form
    pub fn payload_as<P: DeserializeOwned>(&self) -> WorkflowResult<P> {
        serde_json::from_value(self.payload.clone()).map_err(|e| WorkflowError::InvalidPayload {
            event_type: self.event_type.to_string(),
            reason: e.to_string(),
        })
    }
}

impl BusEvent for WorkflowEvent {
    fn event_type(&self) -> &str {
        self.event_type.as_str()
    }

    fn scope_id(&self) -> &str {
        self.blueprint_id.as_str()
    }

    fn correlation_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref()
    }
}
