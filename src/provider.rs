//! Concrete providers: wall clock, outbound HTTP, and the loopback position
//! store with its change feed.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use http::{Request, Response};
use serde_json::json;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use tracker_core::{
    ChangeMessage, ChangeStream, Clock, DocumentStore, Error, HttpRequest, PositionDocument,
    UpsertOutcome,
};
use uuid::Uuid;

const MEMORY_SCHEME: &str = "memory://";

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Outbound HTTP over `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl HttpRequest for HttpClient {
    async fn fetch(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        let request = reqwest::Request::try_from(request).context("building request")?;
        let url = request.url().clone();
        let response =
            self.client.execute(request).await.with_context(|| format!("calling {url}"))?;

        let mut builder = Response::builder().status(response.status());
        for (name, value) in response.headers() {
            builder = builder.header(name, value);
        }
        let body = response.bytes().await.context("reading response body")?;
        builder.body(body).context("building response")
    }
}

/// Where store writes are published.
#[derive(Debug, Clone)]
pub struct StoreTarget {
    pub db: String,
    pub collection: String,
    pub topic_prefix: String,
}

impl StoreTarget {
    #[must_use]
    pub fn topic(&self) -> String {
        format!("{}.{}.{}", self.topic_prefix, self.db, self.collection)
    }
}

/// Open the position store named by `uri` together with its change feed.
///
/// Only the in-process `memory://` store is available.
///
/// # Errors
///
/// Returns [`Error::Store`] for any other scheme.
pub fn connect(
    uri: &str, target: StoreTarget, clock: impl Clock + 'static,
) -> tracker_core::Result<(MemoryStore, MemoryChangeStream)> {
    let Some(name) = uri.strip_prefix(MEMORY_SCHEME) else {
        return Err(Error::Store(format!("unsupported store uri: {uri}")));
    };

    let (sender, receiver) = mpsc::unbounded_channel();
    let store = MemoryStore {
        document_id: Uuid::new_v4().simple().to_string(),
        topic: target.topic(),
        target,
        clock: Arc::new(clock),
        current: Mutex::new(None),
        feed: sender,
        closed: AtomicBool::new(false),
    };
    info!(store = %name, topic = %store.topic, "connected to position store");

    Ok((store, MemoryChangeStream { receiver }))
}

/// Single-document store that publishes a change message for every write
/// that modifies the document.
pub struct MemoryStore {
    document_id: String,
    target: StoreTarget,
    topic: String,
    clock: Arc<dyn Clock>,
    current: Mutex<Option<PositionDocument>>,
    feed: mpsc::UnboundedSender<ChangeMessage>,
    closed: AtomicBool,
}

impl MemoryStore {
    /// Copy of the stored document, if one has been written.
    pub async fn current(&self) -> Option<PositionDocument> {
        self.current.lock().await.clone()
    }

    fn change_message(&self, document: &PositionDocument, op: &str) -> Result<ChangeMessage> {
        let mut after = serde_json::to_value(document).context("serializing document")?;
        after["_id"] = json!({ "$oid": self.document_id });

        let ts_ms = self.clock.now_millis();
        let envelope = json!({
            "after": after.to_string(),
            "op": op,
            "source": {
                "db": self.target.db,
                "collection": self.target.collection,
                "ts_ms": ts_ms,
            },
            "ts_ms": ts_ms,
        });
        let payload = serde_json::to_vec(&envelope).context("serializing change envelope")?;

        Ok(ChangeMessage::new(self.topic.clone(), Some(&payload)))
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("document_id", &self.document_id)
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

impl DocumentStore for MemoryStore {
    async fn upsert(&self, document: &PositionDocument) -> Result<UpsertOutcome> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(anyhow!("store connection closed"));
        }

        let mut current = self.current.lock().await;
        let matched = current.is_some();
        if current.as_ref() == Some(document) {
            return Ok(UpsertOutcome { matched, modified: false });
        }

        let op = if matched { "u" } else { "c" };
        let message = self.change_message(document, op)?;
        *current = Some(document.clone());

        // the document is written even when nobody is listening
        if self.feed.send(message).is_err() {
            warn!(monotonic_counter.unpublished_changes = 1, topic = %self.topic);
        }
        debug!(driver = %document.driver_name, op, "position document written");

        Ok(UpsertOutcome { matched, modified: true })
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!(topic = %self.topic, "position store closed");
        }
        Ok(())
    }
}

/// Receiving side of the [`MemoryStore`] change feed.
#[derive(Debug)]
pub struct MemoryChangeStream {
    receiver: mpsc::UnboundedReceiver<ChangeMessage>,
}

impl ChangeStream for MemoryChangeStream {
    async fn recv(&mut self) -> Option<ChangeMessage> {
        self.receiver.recv().await
    }

    async fn close(&mut self) -> Result<()> {
        self.receiver.close();
        Ok(())
    }
}
