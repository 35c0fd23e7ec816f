//! The close-side background callback FIFO. A bounded `tokio::sync::mpsc` channel drained by one
//! long-lived worker task; `flush` sends a drain marker through the same
//! channel and awaits it, guaranteeing FIFO completion-before-return.

use std::future::Future;
use std::pin::Pin;

use ayati_domain::trace::TraceEvent;
use tokio::sync::{mpsc, oneshot};

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

enum Item {
    Job(Job),
    Drain(oneshot::Sender<()>),
}

pub struct BackgroundQueue {
    tx: mpsc::Sender<Item>,
}

impl BackgroundQueue {
    pub fn spawn(capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<Item>(capacity);
        tokio::spawn(async move {
            while let Some(item) = rx.recv().await {
                match item {
                    Item::Job(job) => job.await,
                    Item::Drain(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });
        Self { tx }
    }

    /// Enqueue a close-callback. Failures are logged and swallowed — never propagated to the caller.
    pub fn enqueue<F>(&self, session_id: String, turns: usize, job: F)
    where
        F: Future<Output = Result<(), Box<dyn std::error::Error + Send + Sync>>> + Send + 'static,
    {
        let wrapped: Job = Box::pin(async move {
            let ok = match job.await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(session_id = %session_id, error = %e, "background close callback failed");
                    false
                }
            };
            TraceEvent::BackgroundTaskCompleted { session_id, turns, ok }.emit();
        });
        if self.tx.try_send(Item::Job(wrapped)).is_err() {
            tracing::warn!("background queue full or closed, dropping close callback");
        }
    }

    /// Block until every job enqueued before this call has completed.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Item::Drain(done_tx)).await.is_ok() {
            let _ = done_rx.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn callbacks_run_in_fifo_order_and_flush_waits() {
        let queue = BackgroundQueue::spawn(16);
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        for i in 0..5 {
            let order = order.clone();
            queue.enqueue(format!("s{i}"), 2, async move {
                order.lock().push(i);
                Ok(())
            });
        }
        queue.flush().await;
        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn failed_callback_does_not_block_the_queue() {
        let queue = BackgroundQueue::spawn(16);
        let ran = Arc::new(AtomicUsize::new(0));

        queue.enqueue("fails".into(), 2, async move { Err("boom".into()) });
        let ran2 = ran.clone();
        queue.enqueue("succeeds".into(), 2, async move {
            ran2.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        queue.flush().await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
