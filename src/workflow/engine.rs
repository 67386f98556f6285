// Copyright 2025 Cowboy AI, LLC.

//! Workflow engine
//!
//! Wires one workflow bus, one rule registry and one executor together from a
//! [`WorkflowConfig`], plus the domain event bus feeding it through the
//! bridge.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::WorkflowConfig;
use crate::errors::{WorkflowError, WorkflowResult};
use crate::events::DomainEventEnvelope;
use crate::infrastructure::EventBus;
use crate::integration::DomainEventBridge;
use crate::workflow::events::WorkflowEvent;
use crate::workflow::executor::{ExecutorHandle, WorkflowExecutor};
use crate::workflow::registry::RuleRegistry;
use crate::workflow::result::WorkflowExecutionResult;
use crate::workflow::rule::WorkflowRule;
use crate::workflow::sink::WorkflowSink;
use crate::workflow::standard_rules::standard_rules;

/// Running handles returned by [`WorkflowEngine::start`]
pub struct EngineHandle {
    /// Executor listener on the workflow bus
    pub executor: ExecutorHandle,
    /// Bridge task forwarding domain events
    pub bridge: JoinHandle<()>,
}

/// Composition root for the workflow core
pub struct WorkflowEngine {
    config: WorkflowConfig,
    bus: EventBus<WorkflowEvent>,
    domain_bus: EventBus<DomainEventEnvelope>,
    registry: Arc<RuleRegistry>,
    executor: Arc<WorkflowExecutor>,
    started: AtomicBool,
}

impl WorkflowEngine {
    /// Build the buses, registry and executor described by `config`
    pub fn new(config: WorkflowConfig) -> Self {
        let bus = EventBus::new(config.bus.clone());
        let domain_bus = EventBus::new(config.bus.clone());
        let registry = Arc::new(RuleRegistry::new());
        let executor = Arc::new(WorkflowExecutor::new(
            Arc::clone(&registry),
            bus.clone(),
            config.executor.clone(),
        ));

        Self {
            config,
            bus,
            domain_bus,
            registry,
            executor,
            started: AtomicBool::new(false),
        }
    }

    /// Report every listener batch outcome to `sink`
    pub fn with_sink(mut self, sink: Arc<dyn WorkflowSink>) -> Self {
        self.executor = Arc::new(
            WorkflowExecutor::new(
                Arc::clone(&self.registry),
                self.bus.clone(),
                self.config.executor.clone(),
            )
            .with_sink(sink),
        );
        self
    }

    /// Register one rule
    pub async fn register(&self, rule: WorkflowRule) -> WorkflowResult<()> {
        self.registry.register(rule).await
    }

    /// Register the standard task/QC rules, then apply the configured overrides
    pub async fn register_standard_rules(&self) -> WorkflowResult<()> {
        self.registry.register_all(standard_rules(&self.bus)).await?;
        self.registry.apply_settings(&self.config.rules).await?;
        info!(
            rules = self.registry.len().await,
            overrides = self.config.rules.len(),
            "Registered standard workflow rules"
        );
        Ok(())
    }

    /// Start the executor listener and the domain event bridge
    ///
    /// Events published on either bus after this call are executed by the
    /// listener, including follow-ups published by rule actions. An engine
    /// starts once; a second call returns [`WorkflowError::Configuration`].
    pub fn start(&self) -> WorkflowResult<EngineHandle> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(WorkflowError::Configuration(
                "workflow engine already started".into(),
            ));
        }
        let executor = Arc::clone(&self.executor).spawn()?;
        let bridge = DomainEventBridge::new(
            self.domain_bus.clone(),
            self.bus.clone(),
            self.config.bridge.clone(),
        )
        .spawn()?;
        info!("Workflow engine started");
        Ok(EngineHandle { executor, bridge })
    }

    /// Publish `event` and execute its rules directly
    ///
    /// For use without a running listener. Follow-up events published by
    /// actions land on the bus but are not executed here. Once [`start`] has
    /// run the listener owns execution, so this returns
    /// [`WorkflowError::Configuration`] without publishing; publish on
    /// [`bus`] instead.
    ///
    /// [`start`]: WorkflowEngine::start
    /// [`bus`]: WorkflowEngine::bus
    pub async fn dispatch(&self, event: WorkflowEvent) -> WorkflowResult<WorkflowExecutionResult> {
        if self.is_started() {
            return Err(WorkflowError::Configuration(
                "listener is running; publish on the bus instead of dispatching".into(),
            ));
        }
        self.bus.publish(event.clone())?;
        Ok(self.executor.execute(&event).await)
    }

    /// Whether [`start`](WorkflowEngine::start) has run
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Close both buses; listeners drain and stop
    pub fn shutdown(&self) {
        self.domain_bus.shutdown();
        self.bus.shutdown();
    }

    /// The workflow event bus
    pub fn bus(&self) -> &EventBus<WorkflowEvent> {
        &self.bus
    }

    /// The bus aggregates publish domain events on
    pub fn domain_bus(&self) -> &EventBus<DomainEventEnvelope> {
        &self.domain_bus
    }

    /// The rule registry
    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    /// The executor
    pub fn executor(&self) -> &Arc<WorkflowExecutor> {
        &self.executor
    }

    /// The configuration the engine was built from
    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }
}

impl Default for WorkflowEngine {
    fn default() -> Self {
        Self::new(WorkflowConfig::default())
    }
}
