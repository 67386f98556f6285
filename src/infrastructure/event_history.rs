// Copyright 2025 Cowboy AI, LLC.

//! Bounded in-memory history of published events

use std::collections::VecDeque;

/// Keeps the most recent events up to a fixed capacity
///
/// Once full, pushing a new event evicts the oldest one.
#[derive(Debug, Clone)]
pub struct EventHistory<E> {
    capacity: usize,
    events: VecDeque<E>,
}

impl<E: Clone> EventHistory<E> {
    /// Create an empty history holding at most `capacity` events
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            events: VecDeque::with_capacity(capacity),
        }
    }

    /// Record an event, returning the evicted one if the history was full
    pub fn push(&mut self, event: E) -> Option<E> {
        if self.capacity == 0 {
            return Some(event);
        }
        let evicted = if self.events.len() == self.capacity {
            self.events.pop_front()
        } else {
            None
        };
        self.events.push_back(event);
        evicted
    }

    /// Copy of the retained events, oldest first
    pub fn snapshot(&self) -> Vec<E> {
        self.events.iter().cloned().collect()
    }

    /// Retained events matching a predicate, oldest first
    pub fn filtered<F>(&self, mut predicate: F) -> Vec<E>
    where
        F: FnMut(&E) -> bool,
    {
        self.events.iter().filter(|e| predicate(e)).cloned().collect()
    }

    /// Number of retained events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing is retained
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Maximum number of retained events
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every retained event
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
