// Copyright 2025 Cowboy AI, LLC.

//! Event bridge from the domain event bus to the workflow bus
//!
//! Aggregates publish [`DomainEventEnvelope`]s. The bridge converts each one
//! into the matching [`WorkflowEvent`] and republishes it where the rule
//! executor listens.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::WorkflowResult;
use crate::events::DomainEventEnvelope;
use crate::infrastructure::EventBus;
use crate::workflow::WorkflowEvent;

/// Configuration for the event bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Source recorded on forwarded workflow events
    pub source: String,

    /// Domain event types to forward; empty forwards everything
    pub event_types: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            source: "domain".to_string(),
            event_types: Vec::new(),
        }
    }
}

impl BridgeConfig {
    fn forwards(&self, event_type: &str) -> bool {
        self.event_types.is_empty() || self.event_types.iter().any(|t| t == event_type)
    }
}

/// Forwarding counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Events republished on the workflow bus
    pub forwarded: u64,
    /// Events skipped by the type filter
    pub skipped: u64,
    /// Events that could not be converted or published
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    forwarded: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

/// Routes domain events onto the workflow bus
#[derive(Clone)]
pub struct DomainEventBridge {
    domain_bus: EventBus<DomainEventEnvelope>,
    workflow_bus: EventBus<WorkflowEvent>,
    config: BridgeConfig,
    counters: Arc<Counters>,
}

impl DomainEventBridge {
    /// Create a bridge between two buses
    pub fn new(
        domain_bus: EventBus<DomainEventEnvelope>,
        workflow_bus: EventBus<WorkflowEvent>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            domain_bus,
            workflow_bus,
            config,
            counters: Arc::default(),
        }
    }

    /// Convert and republish a single envelope
    ///
    /// Returns `Ok(None)` when the type filter skips the event.
    pub fn forward(&self, envelope: &DomainEventEnvelope) -> WorkflowResult<Option<u64>> {
        if !self.config.forwards(envelope.event_type()) {
            self.counters.skipped.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        let outcome = envelope
            .to_workflow_event(self.config.source.clone())
            .and_then(|event| self.workflow_bus.publish(event));

        match outcome {
            Ok(sequence) => {
                self.counters.forwarded.fetch_add(1, Ordering::Relaxed);
                debug!(
                    domain_event_id = %envelope.event_id,
                    event_type = envelope.event_type(),
                    sequence,
                    "Forwarded domain event"
                );
                Ok(Some(sequence))
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Forward every envelope published on the domain bus until it shuts down
    pub fn spawn(&self) -> WorkflowResult<JoinHandle<()>> {
        let mut subscription = self.domain_bus.subscribe_all()?;
        let bridge = self.clone();

        Ok(tokio::spawn(async move {
            while let Some(envelope) = subscription.recv().await {
                if let Err(e) = bridge.forward(&envelope) {
                    warn!(
                        domain_event_id = %envelope.event_id,
                        event_type = envelope.event_type(),
                        error = %e,
                        "Failed to forward domain event"
                    );
                }
            }
            debug!("Domain event bridge stopped");
        }))
    }

    /// Current forwarding counters
    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            forwarded: self.counters.forwarded.load(Ordering::Relaxed),
            skipped: self.counters.skipped.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}
