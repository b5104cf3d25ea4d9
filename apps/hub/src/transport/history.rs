use std::collections::VecDeque;

use super::message::Envelope;

/// Number of inbound messages retained by a channel
pub const MESSAGE_HISTORY_CAPACITY: usize = 100;

/// Bounded FIFO of received messages, oldest evicted first
#[derive(Debug, Clone)]
pub struct MessageHistory {
    entries: VecDeque<Envelope>,
    capacity: usize,
}

impl MessageHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, envelope: Envelope) {
        self.entries.push_back(envelope);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn last(&self) -> Option<&Envelope> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Envelope> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for MessageHistory {
    fn default() -> Self {
        Self::new(MESSAGE_HISTORY_CAPACITY)
    }
}
