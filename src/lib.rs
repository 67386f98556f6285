//! # Blueprint Workflow
//!
//! Event-driven workflow automation for construction blueprints.
//!
//! Aggregates (blueprints, tasks, daily logs, QC inspections) publish domain
//! events. The workflow core reacts to them:
//! - **Event Bus**: In-process publish/subscribe with filtered subscriptions and bounded history
//! - **Domain Events**: The closed catalog of aggregate state changes
//! - **Rules**: Trigger type, condition and async action
//! - **Registry**: Priority-ordered rule lookup with runtime toggles
//! - **Executor**: Sequential rule execution with per-rule failure isolation
//! - **Sink**: Boundary to persistence and notification
//!
//! ## Design Principles
//!
//! 1. **Explicit wiring**: Bus and registry are passed in, never global
//! 2. **Isolation**: One failing rule never aborts its siblings
//! 3. **Explicit chaining**: Actions publish follow-ups; the executor never re-publishes
//! 4. **Traceability**: Correlation ids flow along every chain
//!
//! ## Example
//!
//! ```rust
//! use blueprint_workflow::{WorkflowEngine, WorkflowEvent, WorkflowEventType};
//! use serde_json::json;
//!
//! # tokio_test_block(async {
//! let engine = WorkflowEngine::default();
//! engine.register_standard_rules().await.unwrap();
//!
//! let event = WorkflowEvent::new(
//!     WorkflowEventType::QcFailed,
//!     "bp1",
//!     "qc",
//!     json!({ "qcId": "q1", "taskId": "t1", "notes": "rebar spacing" }),
//! );
//! let result = engine.dispatch(event).await.unwrap();
//!
//! assert!(result.success);
//! assert_eq!(engine.bus().history().len(), 2);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod domain_events;
mod errors;
mod events;
mod identifiers;
pub mod infrastructure;
pub mod integration;
pub mod workflow;

pub use config::WorkflowConfig;
pub use domain_events::{
    BlueprintArchived, BlueprintCreated, BlueprintUpdated, DomainEventEnum, LogCreated,
    LogReviewed, LogSubmitted, QcCreated, QcInspected, TaskCompleted, TaskCreated,
    TaskQuantityChanged,
};
pub use errors::{WorkflowError, WorkflowResult};
pub use events::{DomainEvent, DomainEventEnvelope};
pub use identifiers::{BlueprintId, CorrelationId, EventId};
pub use infrastructure::{
    BusConfig, BusEvent, EventBus, EventHandler, Subscription, SubscriptionFilter,
};
pub use integration::{BridgeConfig, DomainEventBridge};
pub use workflow::{
    standard_rules, Always, EngineHandle, ExecutorConfig, ExecutorHandle, NotifySink,
    PublishFollowUp, RuleAction, RuleCondition, RuleRegistry, RuleResult, RuleSetting,
    WorkflowEngine, WorkflowEvent, WorkflowEventType, WorkflowExecutionResult,
    WorkflowExecutor, WorkflowRule, WorkflowSink,
};
