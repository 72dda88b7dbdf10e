use async_trait::async_trait;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::queue::DispatchQueue;
use crate::domain::WorkItem;

/// What a worker does with one item. Implemented by the dispatcher.
#[async_trait]
pub trait Work: Send + Sync {
    async fn run(&self, item: WorkItem);
}

/// Worker group handle.
/// - `request_shutdown` stops workers from taking new items
/// - `shutdown_and_join` also waits for the item each worker is on
pub struct WorkerPool {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `n` workers (at least one) on `handle`.
    pub fn spawn(n: usize, queue: Arc<DispatchQueue>, work: Arc<dyn Work>, handle: &Handle) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let n = n.max(1);
        let mut joins = Vec::with_capacity(n);
        for worker_id in 0..n {
            let q = Arc::clone(&queue);
            let w = Arc::clone(&work);
            let mut rx = shutdown_rx.clone();

            joins.push(handle.spawn(async move {
                worker_loop(worker_id, q, w, &mut rx).await;
            }));
        }

        Self { shutdown_tx, joins }
    }

    pub fn size(&self) -> usize {
        self.joins.len()
    }

    /// Does not cancel in-flight dispatches; workers stop after their current item.
    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for j in self.joins {
            let _ = j.await;
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<DispatchQueue>,
    work: Arc<dyn Work>,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let item = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            item = queue.next() => item,
        };

        tracing::debug!(worker_id, id = %item.id, name = %item.name, "worker picked item");
        work.run(item).await;
        queue.finish();
    }
    tracing::debug!(worker_id, "worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessageId;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Records the highest number of items it saw in flight at once.
    #[derive(Default)]
    struct Probe {
        current: AtomicUsize,
        peak: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Work for Probe {
        async fn run(&self, item: WorkItem) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.seen.lock().push(item.id.to_string());
            self.current.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn item(n: usize) -> WorkItem {
        WorkItem::new(MessageId::new(format!("m{n}")), "test", serde_json::json!(n), None)
    }

    #[tokio::test]
    async fn concurrency_is_bounded_by_pool_size() {
        let queue = Arc::new(DispatchQueue::new());
        let probe = Arc::new(Probe::default());
        let pool = WorkerPool::spawn(2, queue.clone(), probe.clone(), &Handle::current());

        for n in 0..6 {
            queue.push(item(n));
        }
        queue.resume();

        tokio::time::timeout(Duration::from_secs(2), async {
            while probe.seen.lock().len() < 6 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(probe.peak.load(Ordering::SeqCst), 2);
        pool.shutdown_and_join().await;
    }

    #[tokio::test]
    async fn zero_workers_is_clamped_to_one() {
        let queue = Arc::new(DispatchQueue::new());
        let pool = WorkerPool::spawn(0, queue, Arc::new(Probe::default()), &Handle::current());
        assert_eq!(pool.size(), 1);
        pool.shutdown_and_join().await;
    }
}
