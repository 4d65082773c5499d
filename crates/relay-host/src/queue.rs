//! Result relay queue
//!
//! A strict FIFO buffer holding serialized intermediate tool outputs. The
//! dispatcher enqueues every parsed content item a tool returns and, for
//! calls after the first in a batch, dequeues the head into the next call's
//! `content` argument. Single-threaded access is assumed; the queue itself
//! does no locking.

use std::collections::VecDeque;

#[derive(Debug)]
pub struct RelayQueue<T> {
    items: VecDeque<T>,
}

impl<T> RelayQueue<T> {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    /// Append a value at the tail
    pub fn enqueue(&mut self, value: T) {
        self.items.push_back(value);
    }

    /// Remove and return the head value, or None if empty
    pub fn dequeue(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Return the head value without removing it, or None if empty
    pub fn peek(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Discard all contents
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T> Default for RelayQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
