// Copyright 2025 Cowboy AI, LLC.

//! Workflow executor
//!
//! Runs every enabled rule matching an event, one after another in registry
//! order. A failing, panicking or timed-out action is recorded against its
//! rule and the batch carries on with the next rule.
//!
//! The executor never re-publishes on its own. Actions that want to chain
//! publish follow-up events on the bus explicitly.

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use crate::errors::{WorkflowError, WorkflowResult};
use crate::infrastructure::EventBus;
use crate::workflow::events::WorkflowEvent;
use crate::workflow::registry::RuleRegistry;
use crate::workflow::result::WorkflowExecutionResult;
use crate::workflow::rule::WorkflowRule;
use crate::workflow::sink::WorkflowSink;

/// Executor policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExecutorConfig {
    /// Per-rule budget in milliseconds; `None` lets actions run unbounded.
    /// Zero is rejected by [`ExecutorConfig::validate`].
    pub rule_timeout_ms: Option<u64>,
}

impl ExecutorConfig {
    /// Per-rule budget as a duration
    pub fn rule_timeout(&self) -> Option<Duration> {
        self.rule_timeout_ms.map(Duration::from_millis)
    }

    /// Set the per-rule budget, saturating at `u64::MAX` milliseconds
    pub fn with_rule_timeout(mut self, timeout: Duration) -> Self {
        self.rule_timeout_ms = Some(millis(timeout));
        self
    }

    /// Reject a zero budget, which would time out every rule
    pub fn validate(&self) -> WorkflowResult<()> {
        if self.rule_timeout_ms == Some(0) {
            return Err(WorkflowError::Configuration(
                "executor.ruleTimeoutMs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Runs matching rules for workflow events
pub struct WorkflowExecutor {
    registry: Arc<RuleRegistry>,
    bus: EventBus<WorkflowEvent>,
    config: ExecutorConfig,
    sink: Option<Arc<dyn WorkflowSink>>,
}

impl WorkflowExecutor {
    /// Create an executor over an existing registry and bus
    pub fn new(
        registry: Arc<RuleRegistry>,
        bus: EventBus<WorkflowEvent>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            registry,
            bus,
            config,
            sink: None,
        }
    }

    /// Report every batch outcome to `sink` when running as a listener
    pub fn with_sink(mut self, sink: Arc<dyn WorkflowSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// The registry rules are read from
    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    /// The bus the listener consumes
    pub fn bus(&self) -> &EventBus<WorkflowEvent> {
        &self.bus
    }

    /// The executor policy
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run every matching rule for `event` and report the outcome
    pub async fn execute(&self, event: &WorkflowEvent) -> WorkflowExecutionResult {
        let started = Instant::now();
        let mut result = WorkflowExecutionResult::empty(event.id, event.event_type);
        let rules = self.registry.rules_for(event.event_type).await;

        debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            blueprint_id = %event.blueprint_id,
            candidates = rules.len(),
            "Executing workflow rules"
        );

        for rule in rules {
            if !Self::condition_holds(&rule, event) {
                continue;
            }

            let rule_started = Instant::now();
            let outcome = self.run_action(&rule, event).await;
            if let Err(e) = &outcome {
                warn!(rule_id = %rule.id, event_id = %event.id, error = %e, "Workflow rule failed");
            }
            result.record(&rule.id, outcome, rule_started.elapsed());
        }

        result.execution_time = started.elapsed();
        info!(
            event_id = %event.id,
            event_type = %event.event_type,
            rules_executed = result.rules_executed,
            success = result.success,
            elapsed_ms = millis(result.execution_time),
            "Workflow execution finished"
        );
        result
    }

    fn condition_holds(rule: &WorkflowRule, event: &WorkflowEvent) -> bool {
        match catch_unwind(AssertUnwindSafe(|| rule.matches(event))) {
            Ok(matched) => matched,
            Err(_) => {
                error!(
                    rule_id = %rule.id,
                    event_id = %event.id,
                    "Rule condition panicked; skipping rule"
                );
                false
            }
        }
    }

    async fn run_action(&self, rule: &WorkflowRule, event: &WorkflowEvent) -> WorkflowResult<()> {
        let action = AssertUnwindSafe(rule.action().execute(event)).catch_unwind();

        let outcome = match self.config.rule_timeout() {
            Some(limit) => match tokio::time::timeout(limit, action).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    return Err(WorkflowError::RuleTimeout {
                        rule_id: rule.id.clone(),
                        timeout_ms: millis(limit),
                    })
                }
            },
            None => action.await,
        };

        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(WorkflowError::rule_execution(&rule.id, &e)),
            Err(panic) => Err(WorkflowError::RuleExecution {
                rule_id: rule.id.clone(),
                message: format!("action panicked: {}", panic_message(panic.as_ref())),
            }),
        }
    }

    /// Start a listener that executes every event published on the bus
    ///
    /// Events are handled one at a time, each batch to completion before the
    /// next. Follow-up events published by actions are picked up by the same
    /// listener, which is how chains progress.
    pub fn spawn(self: Arc<Self>) -> WorkflowResult<ExecutorHandle> {
        let mut subscription = self.bus.subscribe_all()?;
        let (tx, rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                let result = self.execute(&event).await;
                if let Some(sink) = &self.sink {
                    if let Err(e) = sink.record_execution(&event, &result).await {
                        warn!(event_id = %event.id, error = %e, "Sink rejected execution record");
                    }
                }
                // The handle may have stopped reading results; keep executing.
                let _ = tx.send(result);
            }
            debug!("Workflow executor listener stopped");
        });

        Ok(ExecutorHandle {
            task,
            results: UnboundedReceiverStream::new(rx),
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Handle to a running executor listener
pub struct ExecutorHandle {
    task: JoinHandle<()>,
    results: UnboundedReceiverStream<WorkflowExecutionResult>,
}

impl ExecutorHandle {
    /// Wait for the next batch outcome
    pub async fn next_result(&mut self) -> Option<WorkflowExecutionResult> {
        self.results.next().await
    }

    /// Wait for the next batch outcome, giving up after `limit`
    pub async fn next_result_within(&mut self, limit: Duration) -> Option<WorkflowExecutionResult> {
        tokio::time::timeout(limit, self.next_result()).await.ok().flatten()
    }

    /// Whether the listener task has ended
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Abort the listener
    pub fn stop(self) {
        self.task.abort();
    }

    /// Wait for the listener to end (after the bus shuts down)
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            if e.is_panic() {
                error!("Workflow executor listener panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::event_type::WorkflowEventType;
    use crate::workflow::rule::RuleAction;
    use crate::workflow::sink::MockWorkflowSink;
    use async_trait::async_trait;
    use serde_json::json;

    struct Sleep(Duration);

    #[async_trait]
    impl RuleAction for Sleep {
        async fn execute(&self, _event: &WorkflowEvent) -> anyhow::Result<()> {
            tokio::time::sleep(self.0).await;
            Ok(())
        }
    }

    struct Panics;

    #[async_trait]
    impl RuleAction for Panics {
        async fn execute(&self, _event: &WorkflowEvent) -> anyhow::Result<()> {
            panic!("boom");
        }
    }

    fn qc_passed() -> WorkflowEvent {
        WorkflowEvent::new(WorkflowEventType::QcPassed, "bp1", "qc", json!({}))
    }

    async fn executor_with(rules: Vec<WorkflowRule>, config: ExecutorConfig) -> WorkflowExecutor {
        let registry = Arc::new(RuleRegistry::new());
        registry.register_all(rules).await.unwrap();
        WorkflowExecutor::new(registry, EventBus::default(), config)
    }

    #[tokio::test]
    async fn test_timeout_is_recorded_and_batch_continues() {
        let executor = executor_with(
            vec![
                WorkflowRule::new(
                    "slow",
                    "Slow",
                    WorkflowEventType::QcPassed,
                    Sleep(Duration::from_secs(5)),
                )
                .with_priority(2),
                WorkflowRule::new(
                    "fast",
                    "Fast",
                    WorkflowEventType::QcPassed,
                    Sleep(Duration::ZERO),
                )
                .with_priority(1),
            ],
            ExecutorConfig::default().with_rule_timeout(Duration::from_millis(20)),
        )
        .await;

        let result = executor.execute(&qc_passed()).await;

        assert!(!result.success);
        assert_eq!(result.rules_executed, 2);
        assert_eq!(
            result.errors,
            vec![WorkflowError::RuleTimeout {
                rule_id: "slow".to_string(),
                timeout_ms: 20
            }]
        );
        assert!(result.rule_results[1].success);
    }

    #[tokio::test]
    async fn test_panicking_action_is_isolated() {
        let executor = executor_with(
            vec![
                WorkflowRule::new("panics", "Panics", WorkflowEventType::QcPassed, Panics),
                WorkflowRule::new(
                    "after",
                    "After",
                    WorkflowEventType::QcPassed,
                    Sleep(Duration::ZERO),
                ),
            ],
            ExecutorConfig::default(),
        )
        .await;

        let result = executor.execute(&qc_passed()).await;

        assert_eq!(result.executed_rule_ids(), vec!["panics", "after"]);
        assert_eq!(result.failed_rule_ids(), vec!["panics"]);
        assert!(matches!(
            &result.errors[0],
            WorkflowError::RuleExecution { rule_id, message }
                if rule_id == "panics" && message.contains("boom")
        ));
    }

    #[tokio::test]
    async fn test_panicking_condition_skips_rule() {
        let executor = executor_with(
            vec![WorkflowRule::new(
                "bad-condition",
                "Bad",
                WorkflowEventType::QcPassed,
                Sleep(Duration::ZERO),
            )
            .when(|_: &WorkflowEvent| -> bool { panic!("condition bug") })],
            ExecutorConfig::default(),
        )
        .await;

        let result = executor.execute(&qc_passed()).await;
        assert!(result.success);
        assert_eq!(result.rules_executed, 0);
    }

    #[tokio::test]
    async fn test_listener_reports_to_sink_and_handle() {
        let mut sink = MockWorkflowSink::new();
        sink.expect_record_execution()
            .withf(|event, result| {
                event.event_type == WorkflowEventType::QcPassed && result.rules_executed == 1
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let executor = executor_with(
            vec![WorkflowRule::new("a", "A", WorkflowEventType::QcPassed, Sleep(Duration::ZERO))],
            ExecutorConfig::default(),
        )
        .await
        .with_sink(Arc::new(sink));
        let bus = executor.bus().clone();

        let mut handle = Arc::new(executor).spawn().unwrap();
        bus.publish(qc_passed()).unwrap();

        let result = handle.next_result_within(Duration::from_secs(2)).await.unwrap();
        assert!(result.success);
        assert_eq!(result.executed_rule_ids(), vec!["a"]);

        bus.shutdown();
        handle.join().await;
    }

    #[test]
    fn test_config_timeout_conversion() {
        let config: ExecutorConfig = serde_json::from_str(r#"{"ruleTimeoutMs": 1500}"#).unwrap();
        assert_eq!(config.rule_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(ExecutorConfig::default().rule_timeout(), None);
    }

    #[test]
    fn test_oversized_timeout_saturates() {
        let config = ExecutorConfig::default().with_rule_timeout(Duration::MAX);
        assert_eq!(config.rule_timeout_ms, Some(u64::MAX));
    }

    #[test]
    fn test_zero_timeout_fails_validation() {
        let config = ExecutorConfig::default().with_rule_timeout(Duration::ZERO);
        assert!(matches!(config.validate(), Err(WorkflowError::Configuration(_))));
        assert!(ExecutorConfig::default().validate().is_ok());
    }

    #[tokio::test]
    async fn test_stopped_listener_releases_subscription() {
        let executor = executor_with(Vec::new(), ExecutorConfig::default()).await;
        let bus = executor.bus().clone();

        let handle = Arc::new(executor).spawn().unwrap();
        assert!(!handle.is_finished());
        handle.stop();

        // Aborting drops the listener's subscription.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while bus.subscriber_count() > 0 && tokio::time::Instant::now() < deadline {
            tokio::task::yield_now().await;
        }
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_listener_finishes_after_bus_shutdown() {
        let executor = executor_with(Vec::new(), ExecutorConfig::default()).await;
        let bus = executor.bus().clone();
        let mut handle = Arc::new(executor).spawn().unwrap();

        bus.shutdown();
        assert!(handle.next_result().await.is_none());

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while !handle.is_finished() && tokio::time::Instant::now() < deadline {
            tokio::task::yield_now().await;
        }
        assert!(handle.is_finished());
        handle.join().await;
    }
}
