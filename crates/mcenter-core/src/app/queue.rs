//! Dispatch queue: the FIFO buffer in front of the worker pool.
//!
//! Design:
//! - Starts paused. Items pushed while paused accumulate in arrival order.
//! - `next()` hands out one item at a time and counts it as running until the
//!   worker calls `finish()`.
//! - Unbounded: `push` never blocks and never fails.

use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Notify;

use crate::domain::WorkItem;

struct QueueState {
    pending: VecDeque<WorkItem>,
    paused: bool,
    running: usize,
}

pub struct DispatchQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                paused: true,
                running: 0,
            }),
            notify: Notify::new(),
        }
    }

    pub fn push(&self, item: WorkItem) {
        let paused = {
            let mut state = self.state.lock();
            state.pending.push_back(item);
            state.paused
        };
        if !paused {
            self.notify.notify_one();
        }
    }

    pub fn pause(&self) {
        self.state.lock().paused = true;
    }

    pub fn resume(&self) {
        self.state.lock().paused = false;
        // every idle worker re-checks the buffer
        self.notify.notify_waiters();
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    /// Items waiting for a worker.
    pub fn len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items currently checked out by workers.
    pub fn running(&self) -> usize {
        self.state.lock().running
    }

    /// Waits until the queue is running and has an item.
    ///
    /// Cancel-safe: an item is only removed in the same poll that returns it.
    pub async fn next(&self) -> WorkItem {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock();
                if !state.paused
                    && let Some(item) = state.pending.pop_front()
                {
                    state.running += 1;
                    let more = !state.pending.is_empty();
                    drop(state);
                    if more {
                        // pass the baton so a burst is not served by one worker
                        self.notify.notify_one();
                    }
                    return item;
                }
            }

            notified.await;
        }
    }

    /// The worker is done with the item it took from `next()`.
    pub fn finish(&self) {
        let mut state = self.state.lock();
        state.running = state.running.saturating_sub(1);
    }
}

impl Default for DispatchQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessageId;
    use std::time::Duration;

    fn item(n: u32) -> WorkItem {
        WorkItem::new(
            MessageId::new(format!("m{n}")),
            "test",
            serde_json::json!({ "index": n }),
            None,
        )
    }

    #[tokio::test]
    async fn starts_paused_and_buffers() {
        let queue = DispatchQueue::new();
        queue.push(item(1));
        queue.push(item(2));

        assert!(queue.is_paused());
        assert_eq!(queue.len(), 2);

        let res = tokio::time::timeout(Duration::from_millis(50), queue.next()).await;
        assert!(res.is_err(), "paused queue must not hand out items");
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn resume_releases_in_arrival_order() {
        let queue = DispatchQueue::new();
        queue.push(item(1));
        queue.push(item(2));
        queue.resume();

        let first = queue.next().await;
        let second = queue.next().await;
        assert_eq!(first.id.as_str(), "m1");
        assert_eq!(second.id.as_str(), "m2");
        assert_eq!(queue.running(), 2);
        assert!(queue.is_empty());

        queue.finish();
        queue.finish();
        assert_eq!(queue.running(), 0);
    }

    #[tokio::test]
    async fn resume_wakes_a_waiting_consumer() {
        let queue = std::sync::Arc::new(DispatchQueue::new());
        let waiter = tokio::spawn({
            let queue = queue.clone();
            async move { queue.next().await }
        });

        queue.push(item(7));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        queue.resume();
        let got = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.id.as_str(), "m7");
    }

    #[tokio::test]
    async fn pause_holds_new_items() {
        let queue = DispatchQueue::new();
        queue.resume();
        queue.pause();
        queue.push(item(1));

        let res = tokio::time::timeout(Duration::from_millis(50), queue.next()).await;
        assert!(res.is_err());
        assert_eq!(queue.len(), 1);
    }
}
