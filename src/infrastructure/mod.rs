// Copyright 2025 Cowboy AI, LLC.

//! Infrastructure layer
//!
//! In-process event transport: the publish/subscribe bus and its bounded
//! history.

pub mod event_bus;
pub mod event_history;

pub use event_bus::{
    BusConfig, BusEvent, EventBus, EventHandler, Subscription, SubscriptionFilter,
    DEFAULT_HISTORY_CAPACITY,
};
pub use event_history::EventHistory;
