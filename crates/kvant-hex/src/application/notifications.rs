//! Best-effort post-creation notifications.
//!
//! Services push a [`Notification`] onto a [`NotificationQueue`] and return
//! immediately. A single worker task drains the queue and hands each item to a
//! [`NotificationSink`]. Delivery is attempted at most once: errors and panics
//! inside the sink are logged and dropped, nothing is retried, and the caller
//! never observes the outcome.

use async_trait::async_trait;
use kvant_types::domain::order::OrderId;
use kvant_types::domain::user::UserId;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Welcome {
        user_id: UserId,
        name: String,
        email: String,
    },
    OrderCreated {
        user_id: UserId,
        order_id: OrderId,
        product: String,
    },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Welcome { .. } => "welcome",
            Notification::OrderCreated { .. } => "order_created",
        }
    }
}

#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    async fn deliver(&self, notification: Notification) -> anyhow::Result<()>;
}

/// Writes notifications to the log instead of sending them anywhere.
#[derive(Debug, Default, Clone)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, notification: Notification) -> anyhow::Result<()> {
        match notification {
            Notification::Welcome { user_id, name, email } => {
                tracing::info!(user_id, %email, "sending welcome email to {}", name);
            }
            Notification::OrderCreated {
                user_id,
                order_id,
                product,
            } => {
                tracing::info!(user_id, order_id, %product, "notifying user about new order");
            }
        }
        Ok(())
    }
}

/// Pending notifications beyond this are dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Clone, Debug)]
pub struct NotificationQueue {
    tx: mpsc::Sender<Notification>,
}

impl NotificationQueue {
    /// Spawns the worker on the current tokio runtime. The worker exits once
    /// every queue handle has been dropped.
    pub fn start<S: NotificationSink>(sink: S) -> (Self, JoinHandle<()>) {
        Self::start_with_capacity(sink, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn start_with_capacity<S: NotificationSink>(
        sink: S,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run_worker(Arc::new(sink), rx));
        (Self { tx }, worker)
    }

    /// Never blocks and never fails the caller. A full queue drops the item.
    pub fn enqueue(&self, notification: Notification) {
        match self.tx.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(n)) => {
                tracing::warn!(kind = n.kind(), "notification queue full, dropping notification");
            }
            Err(TrySendError::Closed(n)) => {
                tracing::warn!(kind = n.kind(), "notification worker is gone, dropping notification");
            }
        }
    }
}

async fn run_worker<S: NotificationSink>(sink: Arc<S>, mut rx: mpsc::Receiver<Notification>) {
    while let Some(notification) = rx.recv().await {
        let kind = notification.kind();
        let sink = sink.clone();
        // Own task per delivery so a panicking sink cannot take the worker down.
        match tokio::spawn(async move { sink.deliver(notification).await }).await {
            Ok(Ok(())) => tracing::debug!(kind, "notification delivered"),
            Ok(Err(e)) => tracing::warn!(kind, error = %e, "notification failed, dropping"),
            Err(e) => tracing::warn!(kind, error = %e, "notification task panicked, dropping"),
        }
    }
    tracing::debug!("notification queue closed");
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    struct Flaky;

    #[async_trait]
    impl NotificationSink for Flaky {
        async fn deliver(&self, notification: Notification) -> anyhow::Result<()> {
            match notification {
                Notification::Welcome { ref name, .. } if name == "panic" => panic!("boom"),
                Notification::Welcome { ref name, .. } if name == "fail" => {
                    anyhow::bail!("smtp down")
                }
                _ => Ok(()),
            }
        }
    }

    fn welcome(name: &str) -> Notification {
        Notification::Welcome {
            user_id: 1,
            name: name.into(),
            email: "a@x.com".into(),
        }
    }

    #[tokio::test]
    async fn delivers_in_enqueue_order() {
        let sink = RecordingSink::default();
        let (queue, worker) = NotificationQueue::start(sink.clone());
        queue.enqueue(welcome("a"));
        queue.enqueue(Notification::OrderCreated {
            user_id: 1,
            order_id: 9,
            product: "Book".into(),
        });
        drain(queue, worker).await;

        let seen = sink.snapshot();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], welcome("a"));
        assert_eq!(seen[1].kind(), "order_created");
    }

    #[tokio::test]
    async fn worker_survives_errors_and_panics() {
        let (queue, worker) = NotificationQueue::start(Flaky);
        queue.enqueue(welcome("panic"));
        queue.enqueue(welcome("fail"));
        queue.enqueue(welcome("ok"));
        drain(queue, worker).await;
    }

    /// Blocks every delivery until the gate opens.
    struct Gated {
        started: Arc<tokio::sync::Notify>,
        gate: Arc<tokio::sync::Semaphore>,
        inner: RecordingSink,
    }

    #[async_trait]
    impl NotificationSink for Gated {
        async fn deliver(&self, notification: Notification) -> anyhow::Result<()> {
            self.started.notify_one();
            let _permit = self.gate.acquire().await?;
            self.inner.deliver(notification).await
        }
    }

    #[tokio::test]
    async fn slow_sink_makes_enqueue_drop_instead_of_growing() {
        let started = Arc::new(tokio::sync::Notify::new());
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        let recorded = RecordingSink::default();
        let (queue, worker) = NotificationQueue::start_with_capacity(
            Gated {
                started: started.clone(),
                gate: gate.clone(),
                inner: recorded.clone(),
            },
            1,
        );

        queue.enqueue(welcome("in-flight"));
        started.notified().await;
        // One slot left in the channel; the rest are dropped without blocking.
        queue.enqueue(welcome("queued"));
        queue.enqueue(welcome("dropped-1"));
        queue.enqueue(welcome("dropped-2"));

        gate.add_permits(10);
        drain(queue, worker).await;
        assert_eq!(recorded.snapshot(), vec![welcome("in-flight"), welcome("queued")]);
    }

    #[tokio::test]
    async fn enqueue_after_worker_stopped_is_silent() {
        let (queue, worker) = NotificationQueue::start(LogSink);
        worker.abort();
        let _ = worker.await;
        queue.enqueue(welcome("late"));
    }
}
