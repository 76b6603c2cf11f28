// src/queue/deferred.rs
//! Bounded backlog of requests that exhausted their immediate retries.
//! Items leave on success or after the absolute retry ceiling; a full
//! backlog rejects the newcomer so the caller can count it as failed.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::queue::FetchRequest;

#[derive(Debug, Clone)]
pub struct DeferredItem {
    pub request: FetchRequest,
    /// Attempts made so far, across immediate retries and drains.
    pub attempts: u32,
    pub next_eligible_unix: u64,
    pub reason: String,
}

pub struct DeferredBacklog {
    max_len: usize,
    items: Mutex<VecDeque<DeferredItem>>,
}

impl DeferredBacklog {
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len,
            items: Mutex::new(VecDeque::new()),
        }
    }

    /// Admit an item. Returns false when the backlog is full, in which case
    /// the caller must count the request as permanently failed.
    pub fn push(&self, item: DeferredItem) -> bool {
        let mut items = self.items.lock().expect("backlog lock poisoned");
        if items.len() >= self.max_len {
            return false;
        }
        items.push_back(item);
        true
    }

    /// Oldest item first.
    pub fn pop_front(&self) -> Option<DeferredItem> {
        self.items.lock().expect("backlog lock poisoned").pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().expect("backlog lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
