use std::collections::VecDeque;
use std::fmt;

use tokio::sync::Mutex;

/// Unbounded FIFO queue drained by polling clients.
///
/// Producers never block and nothing is dropped; a reader that stops polling
/// lets the queue grow without limit.
pub struct Mailbox<T> {
    inner: Mutex<VecDeque<T>>,
}

impl<T> Mailbox<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Mutex::new(VecDeque::new()) }
    }

    pub async fn push(&self, item: T) {
        self.inner.lock().await.push_back(item);
    }

    /// Remove and return the oldest item, or `None` when the queue is empty.
    pub async fn pop(&self) -> Option<T> {
        self.inner.lock().await.pop_front()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Mailbox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox").finish_non_exhaustive()
    }
}
