use futures::stream::{self, Stream};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::error;

/// A live view of a collection, delivering the full latest snapshot on every
/// change. Intermediate states may be skipped; the final state always lands.
///
/// Call [`Subscription::cancel`] to stop and release every underlying
/// listener. Dropping the handle aborts the background task instead.
pub struct Subscription<T> {
    receiver: watch::Receiver<Vec<T>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl<T: Clone + Send + Sync + 'static> Subscription<T> {
    pub(crate) fn new(
        receiver: watch::Receiver<Vec<T>>,
        shutdown: oneshot::Sender<()>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            receiver,
            shutdown: Some(shutdown),
            task: Some(task),
        }
    }

    /// The most recent snapshot, without waiting.
    pub fn current(&self) -> Vec<T> {
        self.receiver.borrow().clone()
    }

    /// Waits for the next change. `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<Vec<T>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Waits until a snapshot satisfies `predicate`, checking the current one first.
    pub async fn wait_for<F>(&mut self, mut predicate: F) -> Option<Vec<T>>
    where
        F: FnMut(&[T]) -> bool,
    {
        let snapshot = self.receiver.borrow_and_update().clone();
        if predicate(&snapshot) {
            return Some(snapshot);
        }
        loop {
            let snapshot = self.next().await?;
            if predicate(&snapshot) {
                return Some(snapshot);
            }
        }
    }

    /// Stops the feed and waits until its listeners are released.
    pub async fn cancel(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    error!(error = ?e, "Subscription task failed");
                }
            }
        }
    }

    /// Turns the subscription into a stream of snapshots. Dropping the
    /// stream drops the subscription.
    pub fn into_stream(self) -> impl Stream<Item = Vec<T>> + Send {
        stream::unfold(self, |mut subscription| async move {
            let snapshot = subscription.next().await?;
            Some((snapshot, subscription))
        })
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
