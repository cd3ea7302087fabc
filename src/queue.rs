//! Cancellable, timeout-aware handoff queue from the network event loop to
//! a blocking test thread.

use crate::error::FixError;
use crate::message::Message;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

struct Inner {
    items: VecDeque<Message>,
    cancelled: bool,
}

/// A thread-safe FIFO that a test thread can block on with a deadline, and
/// that any thread can cancel to unblock every current and future waiter.
pub struct MessageQueue {
    inner: Mutex<Inner>,
    condvar: Condvar,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                cancelled: false,
            }),
            condvar: Condvar::new(),
        }
    }

    /// Enqueue a message; never blocks.
    pub fn add(&self, message: Message) {
        let mut inner = self.inner.lock().unwrap();
        inner.items.push_back(message);
        self.condvar.notify_all();
    }

    /// Block until a message is available, `timeout` elapses, or the queue
    /// is cancelled.
    pub fn wait_for_message(&self, title: &str, timeout: Duration) -> Result<Message, FixError> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock().unwrap();
        loop {
            if inner.cancelled {
                return Err(FixError::Interrupted);
            }
            if let Some(msg) = inner.items.pop_front() {
                return Ok(msg);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(FixError::Timeout(title.to_string()));
            }
            let (guard, timeout_result) = self
                .condvar
                .wait_timeout(inner, deadline - now)
                .unwrap();
            inner = guard;
            if timeout_result.timed_out() && inner.items.is_empty() && !inner.cancelled {
                return Err(FixError::Timeout(title.to_string()));
            }
        }
    }

    /// Unblock all current and future waiters with `Interrupted`. Idempotent.
    pub fn cancel(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.cancelled = true;
        self.condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.lock().unwrap().cancelled
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn wait_for_message_times_out_on_empty_queue() {
        let queue = MessageQueue::new();
        let err = queue
            .wait_for_message("test", Duration::from_millis(50))
            .unwrap_err();
        assert!(matches!(err, FixError::Timeout(_)));
    }

    #[test]
    fn add_then_wait_returns_immediately() {
        let queue = MessageQueue::new();
        queue.add(Message::new());
        let msg = queue.wait_for_message("test", Duration::from_secs(1)).unwrap();
        assert_eq!(msg.len(), 0);
    }

    #[test]
    fn cancel_unblocks_existing_waiter() {
        let queue = Arc::new(MessageQueue::new());
        let q2 = Arc::clone(&queue);
        let handle = thread::spawn(move || q2.wait_for_message("test", Duration::from_secs(5)));
        thread::sleep(Duration::from_millis(50));
        queue.cancel();
        let result = handle.join().unwrap();
        assert!(matches!(result, Err(FixError::Interrupted)));
    }

    #[test]
    fn cancel_then_wait_fails_immediately() {
        let queue = MessageQueue::new();
        queue.cancel();
        let err = queue
            .wait_for_message("test", Duration::from_secs(5))
            .unwrap_err();
        assert!(matches!(err, FixError::Interrupted));
    }
}
