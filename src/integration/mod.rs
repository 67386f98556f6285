// Copyright 2025 Cowboy AI, LLC.

//! Integration between the domain event bus and the workflow engine

pub mod event_bridge;

pub use event_bridge::{BridgeConfig, BridgeStats, DomainEventBridge};
