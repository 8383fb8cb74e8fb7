use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};
use tracker_core::{Error, HttpRequest, Result};

/// Where and how to register the connector.
#[derive(Debug, Clone)]
pub struct RegistrationSettings {
    /// Base URL of the connector control plane, e.g. `http://debezium-connect:8083`.
    pub url: String,

    /// JSON connector definition, posted as-is.
    pub document: Bytes,

    /// Total attempts before giving up. Zero is treated as one.
    pub max_attempts: u32,

    /// Fixed pause between attempts.
    pub retry_delay: Duration,
}

/// How a successful registration concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Registered,
    AlreadyRegistered,
}

/// Read a connector definition from disk, checking that it is valid JSON.
///
/// # Errors
///
/// Returns an error when the file cannot be read or is not JSON.
pub fn read_document(path: impl AsRef<Path>) -> Result<Bytes> {
    let path = path.as_ref();
    let raw = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice::<Value>(&raw)
        .map_err(|e| Error::InvalidFormat(format!("{}: {e}", path.display())))?;
    Ok(Bytes::from(raw))
}

/// POST the connector definition to `{url}/connectors`, retrying until it is
/// accepted or the attempt cap is reached.
///
/// # Errors
///
/// Returns [`Error::Registration`] with the last failure once every attempt
/// has been used.
pub async fn register<P: HttpRequest>(
    provider: &P, settings: &RegistrationSettings,
) -> Result<Registration> {
    let endpoint = format!("{}/connectors", settings.url.trim_end_matches('/'));
    let max_attempts = settings.max_attempts.max(1);
    let mut last_failure = String::new();

    for attempt in 1..=max_attempts {
        match attempt_once(provider, &endpoint, &settings.document).await {
            Ok(outcome) => {
                match outcome {
                    Registration::Registered => info!(endpoint = %endpoint, "connector registered"),
                    Registration::AlreadyRegistered => {
                        warn!(endpoint = %endpoint, "connector already exists, skipping");
                    }
                }
                return Ok(outcome);
            }
            Err(e) => {
                let failure = format!("{e:#}");
                warn!(
                    monotonic_counter.registration_failures = 1,
                    endpoint = %endpoint,
                    attempt,
                    max_attempts,
                    error = %failure
                );
                last_failure = failure;
            }
        }

        if attempt < max_attempts {
            tokio::time::sleep(settings.retry_delay).await;
        }
    }

    error!(endpoint = %endpoint, max_attempts, "giving up on connector registration");
    Err(Error::Registration(format!("{endpoint} after {max_attempts} attempts: {last_failure}")))
}

async fn attempt_once<P: HttpRequest>(
    provider: &P, endpoint: &str, document: &Bytes,
) -> anyhow::Result<Registration> {
    let request = http::Request::builder()
        .method(Method::POST)
        .uri(endpoint)
        .header(CONTENT_TYPE, "application/json")
        .header(ACCEPT, "application/json")
        .body(document.clone())
        .context("building registration request")?;

    let response = provider.fetch(request).await.context("sending registration request")?;
    let status = response.status();

    if status.is_success() {
        return Ok(Registration::Registered);
    }

    let body = response.into_body();
    if status == StatusCode::CONFLICT && conflict_message(&body).contains("already exists") {
        return Ok(Registration::AlreadyRegistered);
    }

    bail!("status {status}: {}", String::from_utf8_lossy(&body))
}

#[derive(Deserialize)]
struct ConflictBody {
    #[serde(default)]
    message: String,
}

fn conflict_message(body: &[u8]) -> String {
    serde_json::from_slice::<ConflictBody>(body).map(|b| b.message).unwrap_or_default()
}
