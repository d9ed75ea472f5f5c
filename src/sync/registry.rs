use std::collections::HashMap;

use tokio::task::JoinHandle;
use tracing::debug;

/// Keyed set of cancellable feed tasks.
///
/// Replacing or removing a key aborts its task; dropping the registry aborts
/// everything still registered.
#[derive(Default)]
pub struct SubscriptionRegistry {
    feeds: HashMap<String, JoinHandle<()>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.feeds.contains_key(key)
    }

    pub fn insert(&mut self, key: String, task: JoinHandle<()>) {
        if let Some(previous) = self.feeds.insert(key, task) {
            previous.abort();
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        match self.feeds.remove(key) {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.feeds.keys()
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    /// Aborts every feed and waits for each task to finish unwinding.
    pub async fn shutdown(&mut self) {
        for (key, task) in self.feeds.drain() {
            task.abort();
            let _ = task.await;
            debug!(key = %key, "Feed released");
        }
    }
}

impl Drop for SubscriptionRegistry {
    fn drop(&mut self) {
        for task in self.feeds.values() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::pending;

    #[tokio::test]
    async fn test_replace_and_remove_abort_tasks() {
        let mut registry = SubscriptionRegistry::new();
        let (guard, released) = tokio::sync::oneshot::channel::<()>();
        registry.insert(
            "alice".into(),
            tokio::spawn(async move {
                let _guard = guard;
                pending::<()>().await
            }),
        );
        registry.insert("alice".into(), tokio::spawn(pending::<()>()));

        // The replaced task is dropped, taking its sender with it.
        assert!(released.await.is_err());
        assert_eq!(registry.len(), 1);

        assert!(registry.remove("alice"));
        assert!(!registry.remove("alice"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_drains() {
        let mut registry = SubscriptionRegistry::new();
        registry.insert("alice".into(), tokio::spawn(pending::<()>()));
        registry.insert("bob".into(), tokio::spawn(pending::<()>()));
        registry.shutdown().await;
        assert!(registry.is_empty());
    }
}
