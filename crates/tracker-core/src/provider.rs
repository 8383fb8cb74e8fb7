//! # Provider
//!
//! Provider defines external data interfaces for the tracker crates.

use anyhow::Result;
use bytes::Bytes;
use http::{Request, Response};
use serde::{Deserialize, Serialize};

/// The `HttpRequest` trait defines the behavior for calling out to HTTP services.
pub trait HttpRequest: Send + Sync {
    /// Make outbound HTTP request.
    fn fetch(&self, request: Request<Bytes>)
    -> impl Future<Output = Result<Response<Bytes>>> + Send;
}

/// The `Clock` trait supplies wall-clock time so that timestamps can be
/// controlled in tests.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// The "current position" document held by the external store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDocument {
    pub driver_name: String,
    pub lat: f64,
    pub lng: f64,
    pub optimal: bool,
}

/// Result of a single-document upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// An existing document was matched.
    pub matched: bool,

    /// At least one field changed value.
    pub modified: bool,
}

/// The `DocumentStore` trait defines writes to the external position store.
pub trait DocumentStore: Send + Sync {
    /// Set the fields of the single position document, creating it if absent.
    fn upsert(&self, document: &PositionDocument)
    -> impl Future<Output = Result<UpsertOutcome>> + Send;

    /// Release the store connection.
    fn close(&self) -> impl Future<Output = Result<()>> + Send;
}

/// A raw message delivered by the change-capture stream.
#[derive(Clone, Debug)]
pub struct ChangeMessage {
    pub topic: String,

    /// Message value. `None` for tombstones.
    pub payload: Option<Vec<u8>>,
}

impl ChangeMessage {
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: Option<&[u8]>) -> Self {
        Self { topic: topic.into(), payload: payload.map(<[u8]>::to_vec) }
    }
}

/// The `ChangeStream` trait defines the consuming side of the change-capture
/// pipeline.
pub trait ChangeStream: Send {
    /// Wait for the next message. Returns `None` once the stream has ended.
    fn recv(&mut self) -> impl Future<Output = Option<ChangeMessage>> + Send;

    /// Disconnect from the stream.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}
