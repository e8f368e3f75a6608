//! Bounded per-session event buffer
//!
//! Each session keeps only its most recent events; the oldest are evicted
//! first once the cap is reached. The cap keeps every recompute O(1) in
//! practice and bounds per-session memory regardless of stream length.

use std::collections::VecDeque;

use crate::types::InteractionEvent;

/// Maximum number of events retained per session.
pub const MAX_BUFFERED_EVENTS: usize = 100;

/// FIFO ring of the most recent interaction events.
#[derive(Debug, Clone, Default)]
pub struct EventBuffer {
    events: VecDeque<InteractionEvent>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self {
            events: VecDeque::with_capacity(MAX_BUFFERED_EVENTS),
        }
    }

    /// Append an event, evicting the oldest one when the buffer is full.
    pub fn push(&mut self, event: InteractionEvent) {
        if self.events.len() == MAX_BUFFERED_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate events in arrival order (oldest first).
    pub fn iter(&self) -> impl Iterator<Item = &InteractionEvent> {
        self.events.iter()
    }
}
