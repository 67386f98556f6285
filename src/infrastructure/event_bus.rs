// Copyright 2025 Cowboy AI, LLC.

//! In-process event bus
//!
//! The bus decouples publishers from subscribers. It is generic over any
//! [`BusEvent`], so the same implementation carries both domain event
//! envelopes and workflow events.
//!
//! # Delivery
//!
//! - `publish` hands the event to every matching subscriber in registration
//!   order and returns; it never waits on a stream subscriber.
//! - Stream subscribers ([`Subscription`]) receive through unbounded channels,
//!   in the same order the events enter the history.
//! - Handler subscribers run inline on the publishing thread. Events published
//!   from inside a handler are queued and handled after the current event, so
//!   every handler also sees events in history order. A handler that returns
//!   an error or panics is logged and skipped; delivery continues.
//! - The bus keeps a bounded history of published events for inspection.

use futures::Stream;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::errors::{WorkflowError, WorkflowResult};
use crate::identifiers::CorrelationId;
use crate::infrastructure::event_history::EventHistory;

/// Default number of events retained in the bus history
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Events that can travel over an [`EventBus`]
pub trait BusEvent: Clone + Send + Sync + 'static {
    /// Type tag used by `subscribe_by_type`
    fn event_type(&self) -> &str;

    /// Correlation key used by `subscribe_by_scope` (aggregate or blueprint id)
    fn scope_id(&self) -> &str;

    /// Correlation id of the causal chain this event belongs to
    fn correlation_id(&self) -> Option<&CorrelationId> {
        None
    }
}

/// Callback subscriber invoked synchronously for each matching event
pub trait EventHandler<E>: Send + Sync {
    /// Handle one event
    fn handle(&self, event: &E) -> anyhow::Result<()>;
}

impl<E, F> EventHandler<E> for F
where
    F: Fn(&E) -> anyhow::Result<()> + Send + Sync,
{
    fn handle(&self, event: &E) -> anyhow::Result<()> {
        self(event)
    }
}

/// Configuration for the event bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BusConfig {
    /// Number of published events retained for inspection
    pub history_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// Which events a subscriber receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionFilter {
    /// Every event
    All,
    /// Events whose type tag equals the value
    EventType(String),
    /// Events whose scope id equals the value
    Scope(String),
}

impl SubscriptionFilter {
    /// Check whether an event passes this filter
    pub fn matches<E: BusEvent>(&self, event: &E) -> bool {
        match self {
            SubscriptionFilter::All => true,
            SubscriptionFilter::EventType(t) => event.event_type() == t,
            SubscriptionFilter::Scope(s) => event.scope_id() == s,
        }
    }
}

enum Delivery<E> {
    Stream(mpsc::UnboundedSender<E>),
    Handler(Arc<dyn EventHandler<E>>),
}

struct SubscriberEntry<E> {
    id: u64,
    filter: SubscriptionFilter,
    delivery: Delivery<E>,
}

struct BusState<E> {
    subscribers: Vec<SubscriberEntry<E>>,
    history: EventHistory<E>,
    pending: VecDeque<(E, HandlerBatch<E>)>,
    dispatching: bool,
    closed: bool,
}

type HandlerBatch<E> = Vec<(u64, Arc<dyn EventHandler<E>>)>;

struct BusInner<E> {
    state: Mutex<BusState<E>>,
    published: AtomicU64,
    next_subscriber: AtomicU64,
}

impl<E> BusInner<E> {
    fn remove_subscriber(&self, id: u64) {
        if let Ok(mut state) = self.state.lock() {
            state.subscribers.retain(|s| s.id != id);
        }
    }
}

/// Publish/subscribe channel for events of type `E`
///
/// Cloning the bus yields another handle to the same channel.
pub struct EventBus<E: BusEvent> {
    inner: Arc<BusInner<E>>,
}

impl<E: BusEvent> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

impl<E: BusEvent> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("published", &self.published_count())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl<E: BusEvent> EventBus<E> {
    /// Create a new bus
    pub fn new(config: BusConfig) -> Self {
        Self {
            inner: Arc::new(BusInner {
                state: Mutex::new(BusState {
                    subscribers: Vec::new(),
                    history: EventHistory::new(config.history_capacity),
                    pending: VecDeque::new(),
                    dispatching: false,
                    closed: false,
                }),
                published: AtomicU64::new(0),
                next_subscriber: AtomicU64::new(1),
            }),
        }
    }

    fn lock(&self) -> WorkflowResult<MutexGuard<'_, BusState<E>>> {
        self.inner
            .state
            .lock()
            .map_err(|_| WorkflowError::BusUnavailable("bus state lock poisoned".to_string()))
    }

    /// Publish an event to all current subscribers
    ///
    /// Returns the event's sequence number (1-based, monotonic). Subscriber
    /// failures are logged and never returned; only a closed or broken bus
    /// yields an error.
    pub fn publish(&self, event: E) -> WorkflowResult<u64> {
        let (sequence, drain) = {
            let mut state = self.lock()?;
            if state.closed {
                return Err(WorkflowError::BusClosed);
            }

            state.history.push(event.clone());
            let sequence = self.inner.published.fetch_add(1, Ordering::SeqCst) + 1;

            state.subscribers.retain(|s| match &s.delivery {
                Delivery::Stream(tx) => !tx.is_closed(),
                Delivery::Handler(_) => true,
            });

            // Streams are fed under the lock so their order matches history.
            let mut handlers = Vec::new();
            for sub in state.subscribers.iter().filter(|s| s.filter.matches(&event)) {
                match &sub.delivery {
                    Delivery::Stream(tx) => {
                        if tx.send(event.clone()).is_err() {
                            debug!(subscriber_id = sub.id, "Subscriber dropped before delivery");
                        }
                    }
                    Delivery::Handler(handler) => handlers.push((sub.id, Arc::clone(handler))),
                }
            }

            debug!(
                event_type = event.event_type(),
                scope = event.scope_id(),
                sequence,
                handlers = handlers.len(),
                "Published event"
            );

            if !handlers.is_empty() {
                state.pending.push_back((event, handlers));
            }
            // A publish made while handlers are already being drained is
            // queued behind the event that caused it.
            let drain = !state.dispatching && !state.pending.is_empty();
            if drain {
                state.dispatching = true;
            }
            (sequence, drain)
        };

        if drain {
            self.drain_handlers();
        }
        Ok(sequence)
    }

    fn drain_handlers(&self) {
        loop {
            let next = match self.lock() {
                Ok(mut state) => {
                    let next = state.pending.pop_front();
                    if next.is_none() {
                        state.dispatching = false;
                    }
                    next
                }
                Err(_) => return,
            };
            let Some((event, handlers)) = next else {
                return;
            };

            for (subscriber_id, handler) in handlers {
                match catch_unwind(AssertUnwindSafe(|| handler.handle(&event))) {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(
                        subscriber_id,
                        event_type = event.event_type(),
                        error = %e,
                        "Event handler failed"
                    ),
                    Err(_) => error!(
                        subscriber_id,
                        event_type = event.event_type(),
                        "Event handler panicked"
                    ),
                }
            }
        }
    }

    fn add_subscriber(
        &self,
        filter: SubscriptionFilter,
        delivery: Delivery<E>,
    ) -> WorkflowResult<u64> {
        let mut state = self.lock()?;
        if state.closed {
            return Err(WorkflowError::BusClosed);
        }
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::SeqCst);
        state.subscribers.push(SubscriberEntry {
            id,
            filter,
            delivery,
        });
        Ok(id)
    }

    /// Subscribe with an explicit filter
    pub fn subscribe(&self, filter: SubscriptionFilter) -> WorkflowResult<Subscription<E>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.add_subscriber(filter, Delivery::Stream(tx))?;
        Ok(Subscription {
            id,
            receiver: rx,
            bus: Arc::downgrade(&self.inner),
        })
    }

    /// Stream of every event published after this call
    pub fn subscribe_all(&self) -> WorkflowResult<Subscription<E>> {
        self.subscribe(SubscriptionFilter::All)
    }

    /// Stream of events with the given type tag
    pub fn subscribe_by_type(
        &self,
        event_type: impl Into<String>,
    ) -> WorkflowResult<Subscription<E>> {
        self.subscribe(SubscriptionFilter::EventType(event_type.into()))
    }

    /// Stream of events with the given scope id
    pub fn subscribe_by_scope(
        &self,
        scope_id: impl Into<String>,
    ) -> WorkflowResult<Subscription<E>> {
        self.subscribe(SubscriptionFilter::Scope(scope_id.into()))
    }

    /// Stream of events for one aggregate
    pub fn subscribe_by_aggregate(
        &self,
        aggregate_id: impl Into<String>,
    ) -> WorkflowResult<Subscription<E>> {
        self.subscribe_by_scope(aggregate_id)
    }

    /// Stream of events for one blueprint
    pub fn from_blueprint(
        &self,
        blueprint_id: impl Into<String>,
    ) -> WorkflowResult<Subscription<E>> {
        self.subscribe_by_scope(blueprint_id)
    }

    /// Register a callback subscriber, returning its id
    pub fn subscribe_handler(
        &self,
        filter: SubscriptionFilter,
        handler: Arc<dyn EventHandler<E>>,
    ) -> WorkflowResult<u64> {
        self.add_subscriber(filter, Delivery::Handler(handler))
    }

    /// Remove a subscriber by id; unknown ids are ignored
    pub fn unsubscribe(&self, subscriber_id: u64) {
        self.inner.remove_subscriber(subscriber_id);
    }

    /// Retained events, oldest first
    pub fn history(&self) -> Vec<E> {
        self.lock().map(|s| s.history.snapshot()).unwrap_or_default()
    }

    /// Retained events belonging to one causal chain, oldest first
    pub fn correlated(&self, correlation_id: &CorrelationId) -> Vec<E> {
        self.lock()
            .map(|s| {
                s.history
                    .filtered(|e| e.correlation_id() == Some(correlation_id))
            })
            .unwrap_or_default()
    }

    /// Forget every retained event
    pub fn clear_history(&self) {
        if let Ok(mut state) = self.lock() {
            state.history.clear();
        }
    }

    /// Total number of events ever published
    pub fn published_count(&self) -> u64 {
        self.inner.published.load(Ordering::SeqCst)
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.lock()
            .map(|s| {
                s.subscribers
                    .iter()
                    .filter(|sub| match &sub.delivery {
                        Delivery::Stream(tx) => !tx.is_closed(),
                        Delivery::Handler(_) => true,
                    })
                    .count()
            })
            .unwrap_or(0)
    }

    /// Tear the bus down: every subscription ends and further publishes fail
    pub fn shutdown(&self) {
        if let Ok(mut state) = self.lock() {
            state.closed = true;
            state.subscribers.clear();
        }
    }

    /// Whether `shutdown` has been called
    pub fn is_closed(&self) -> bool {
        self.lock().map(|s| s.closed).unwrap_or(true)
    }
}

/// Live stream of events from an [`EventBus`]
///
/// The stream ends when it is unsubscribed, dropped, or the bus shuts down.
pub struct Subscription<E> {
    id: u64,
    receiver: mpsc::UnboundedReceiver<E>,
    bus: Weak<BusInner<E>>,
}

impl<E> Subscription<E> {
    /// Subscriber id on the bus
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next event
    pub async fn recv(&mut self) -> Option<E> {
        futures::StreamExt::next(self).await
    }

    /// Take an already-delivered event without waiting
    pub fn try_recv(&mut self) -> Option<E> {
        self.receiver.try_recv().ok()
    }

    /// Stop receiving events
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl<E> Stream for Subscription<E> {
    type Item = E;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<E>> {
        self.receiver.poll_recv(cx)
    }
}

impl<E> Drop for Subscription<E> {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove_subscriber(self.id);
        }
    }
}

impl<E> fmt::Debug for Subscription<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, Clone, PartialEq)]
    struct Ping {
        kind: &'static str,
        scope: &'static str,
        n: u32,
        correlation: Option<CorrelationId>,
    }

    impl Ping {
        fn new(kind: &'static str, scope: &'static str, n: u32) -> Self {
            Self {
                kind,
                scope,
                n,
                correlation: None,
            }
        }
    }

    impl BusEvent for Ping {
        fn event_type(&self) -> &str {
            self.kind
        }

        fn scope_id(&self) -> &str {
            self.scope
        }

        fn correlation_id(&self) -> Option<&CorrelationId> {
            self.correlation.as_ref()
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let bus = EventBus::<Ping>::default();
        let mut first = bus.subscribe_all().unwrap();
        let mut second = bus.subscribe_all().unwrap();

        assert_eq!(bus.publish(Ping::new("a", "bp1", 1)).unwrap(), 1);

        assert_eq!(first.recv().await.unwrap().n, 1);
        assert_eq!(second.recv().await.unwrap().n, 1);
    }

    #[tokio::test]
    async fn test_filters_by_type_and_scope() {
        let bus = EventBus::<Ping>::default();
        let mut by_type = bus.subscribe_by_type("qc.passed").unwrap();
        let mut by_scope = bus.from_blueprint("bp2").unwrap();

        bus.publish(Ping::new("task.created", "bp1", 1)).unwrap();
        bus.publish(Ping::new("qc.passed", "bp1", 2)).unwrap();
        bus.publish(Ping::new("task.created", "bp2", 3)).unwrap();

        assert_eq!(by_type.recv().await.unwrap().n, 2);
        assert!(by_type.try_recv().is_none());
        assert_eq!(by_scope.recv().await.unwrap().n, 3);
        assert!(by_scope.try_recv().is_none());
    }

    #[test]
    fn test_publish_without_subscribers_succeeds() {
        let bus = EventBus::<Ping>::default();
        assert!(bus.publish(Ping::new("a", "bp1", 1)).is_ok());
        assert_eq!(bus.published_count(), 1);
    }

    #[test]
    fn test_failing_handlers_do_not_block_delivery() {
        let bus = EventBus::<Ping>::default();
        let delivered = Arc::new(AtomicUsize::new(0));

        bus.subscribe_handler(
            SubscriptionFilter::All,
            Arc::new(|_: &Ping| -> anyhow::Result<()> { anyhow::bail!("handler broke") }),
        )
        .unwrap();
        bus.subscribe_handler(
            SubscriptionFilter::All,
            Arc::new(|_: &Ping| -> anyhow::Result<()> { panic!("handler panicked") }),
        )
        .unwrap();
        let counter = Arc::clone(&delivered);
        bus.subscribe_handler(
            SubscriptionFilter::All,
            Arc::new(move |_: &Ping| -> anyhow::Result<()> {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        )
        .unwrap();

        assert!(bus.publish(Ping::new("a", "bp1", 1)).is_ok());
        assert!(bus.publish(Ping::new("a", "bp1", 2)).is_ok());
        assert_eq!(delivered.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let bus = EventBus::<Ping>::default();
        let order = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            bus.subscribe_handler(
                SubscriptionFilter::All,
                Arc::new(move |_: &Ping| -> anyhow::Result<()> {
                    order.lock().unwrap().push(name);
                    Ok(())
                }),
            )
            .unwrap();
        }

        bus.publish(Ping::new("a", "bp1", 1)).unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_handler_may_publish_reentrantly() {
        let bus = EventBus::<Ping>::default();
        let inner = bus.clone();
        bus.subscribe_handler(
            SubscriptionFilter::EventType("first".into()),
            Arc::new(move |e: &Ping| -> anyhow::Result<()> {
                inner.publish(Ping::new("second", e.scope, e.n + 1))?;
                Ok(())
            }),
        )
        .unwrap();

        bus.publish(Ping::new("first", "bp1", 1)).unwrap();

        let kinds: Vec<_> = bus.history().iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec!["first", "second"]);
    }

    #[test]
    fn test_reentrant_publish_keeps_history_order_for_later_subscribers() {
        let bus = EventBus::<Ping>::default();
        let inner = bus.clone();
        bus.subscribe_handler(
            SubscriptionFilter::EventType("first".into()),
            Arc::new(move |e: &Ping| -> anyhow::Result<()> {
                inner.publish(Ping::new("second", e.scope, e.n + 1))?;
                Ok(())
            }),
        )
        .unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        bus.subscribe_handler(
            SubscriptionFilter::All,
            Arc::new(move |e: &Ping| -> anyhow::Result<()> {
                log.lock().unwrap().push(e.kind);
                Ok(())
            }),
        )
        .unwrap();
        let mut stream = bus.subscribe_all().unwrap();

        bus.publish(Ping::new("first", "bp1", 1)).unwrap();

        let history: Vec<_> = bus.history().iter().map(|p| p.kind).collect();
        let mut streamed = Vec::new();
        while let Some(p) = stream.try_recv() {
            streamed.push(p.kind);
        }
        assert_eq!(history, vec!["first", "second"]);
        assert_eq!(streamed, history);
        assert_eq!(*seen.lock().unwrap(), history);
    }

    #[test]
    fn test_history_is_bounded_fifo() {
        let bus = EventBus::<Ping>::new(BusConfig {
            history_capacity: 100,
        });
        for n in 0..150 {
            bus.publish(Ping::new("a", "bp1", n)).unwrap();
        }

        let history = bus.history();
        assert_eq!(history.len(), 100);
        assert_eq!(history.first().unwrap().n, 50);
        assert_eq!(history.last().unwrap().n, 149);
        assert_eq!(bus.published_count(), 150);
    }

    #[test]
    fn test_correlated_history() {
        let bus = EventBus::<Ping>::default();
        let chain = CorrelationId::from("chain-1");
        let mut linked = Ping::new("a", "bp1", 1);
        linked.correlation = Some(chain.clone());

        bus.publish(linked.clone()).unwrap();
        bus.publish(Ping::new("b", "bp1", 2)).unwrap();

        assert_eq!(bus.correlated(&chain), vec![linked]);
    }

    #[tokio::test]
    async fn test_unsubscribe_and_drop_remove_subscribers() {
        let bus = EventBus::<Ping>::default();
        let kept = bus.subscribe_all().unwrap();
        let dropped = bus.subscribe_all().unwrap();
        assert_eq!(bus.subscriber_count(), 2);

        dropped.unsubscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.unsubscribe(kept.id());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_ends_streams_and_rejects_publish() {
        let bus = EventBus::<Ping>::default();
        let mut sub = bus.subscribe_all().unwrap();
        bus.publish(Ping::new("a", "bp1", 1)).unwrap();

        bus.shutdown();

        assert_eq!(sub.recv().await.unwrap().n, 1);
        assert!(sub.recv().await.is_none());
        assert!(bus.is_closed());
        assert_eq!(
            bus.publish(Ping::new("a", "bp1", 2)).unwrap_err(),
            WorkflowError::BusClosed
        );
        assert!(matches!(bus.subscribe_all(), Err(WorkflowError::BusClosed)));
    }
}
