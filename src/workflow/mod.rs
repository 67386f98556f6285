// Copyright 2025 Cowboy AI, LLC.

//! Workflow rule engine
//!
//! This module provides the event-driven automation core:
//! - Workflow events and their closed set of type tags
//! - Rules pairing a trigger type with a condition and an async action
//! - A registry ordering rules by priority
//! - An executor isolating failures per rule
//! - The engine wiring bus, registry and executor from configuration

pub mod engine;
pub mod event_type;
pub mod events;
pub mod executor;
pub mod payloads;
pub mod registry;
pub mod result;
pub mod rule;
pub mod sink;
pub mod standard_rules;

pub use engine::{EngineHandle, WorkflowEngine};
pub use event_type::{AggregateFamily, WorkflowEventType};
pub use events::WorkflowEvent;
pub use executor::{ExecutorConfig, ExecutorHandle, WorkflowExecutor};
pub use payloads::{LogPayload, QcPayload, TaskQuantityPayload, TaskTransitionPayload};
pub use registry::{RuleRegistry, RuleSetting};
pub use result::{RuleResult, WorkflowExecutionResult};
pub use rule::{Always, RuleAction, RuleCondition, WorkflowRule};
pub use sink::{NotifySink, WorkflowSink};
pub use standard_rules::{standard_rules, PayloadMapper, PublishFollowUp, WORKFLOW_SOURCE};
