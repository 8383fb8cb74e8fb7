use anyhow::Context;
use driver_routes::RoutePoint;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracker_core::{Error, Result};

/// A driver position observed on the change stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionEvent {
    pub driver_name: String,
    pub lat: f64,
    pub lng: f64,
    pub optimal: bool,
    pub source_timestamp_millis: i64,
}

impl PositionEvent {
    #[must_use]
    pub const fn point(&self) -> RoutePoint {
        RoutePoint::new(self.lat, self.lng)
    }
}

/// A decoded change-capture message: the new position plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub position: PositionEvent,
    pub db: String,
    pub collection: String,
}

impl TryFrom<&[u8]> for ChangeEvent {
    type Error = Error;

    fn try_from(payload: &[u8]) -> Result<Self> {
        let envelope: Envelope =
            serde_json::from_slice(payload).context("deserializing change envelope")?;

        // `after` normally arrives as a JSON-encoded string; tolerate an object too
        let after: After = match envelope.after {
            Some(Value::String(raw)) => {
                serde_json::from_str(&raw).context("deserializing `after` document")?
            }
            Some(value @ Value::Object(_)) => {
                serde_json::from_value(value).context("deserializing `after` document")?
            }
            Some(Value::Null) | None => return Err(Error::MissingField("after".to_string())),
            Some(other) => {
                return Err(Error::InvalidFormat(format!("unexpected `after` value: {other}")));
            }
        };

        let source = envelope.source.ok_or_else(|| Error::MissingField("source".to_string()))?;
        let ts_ms = envelope.ts_ms.ok_or_else(|| Error::MissingField("ts_ms".to_string()))?;

        Ok(Self {
            position: PositionEvent {
                driver_name: after.driver_name,
                lat: after.lat,
                lng: after.lng,
                optimal: after.optimal,
                source_timestamp_millis: ts_ms,
            },
            db: source.db,
            collection: source.collection,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    after: Option<Value>,
    source: Option<Source>,
    ts_ms: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Source {
    #[serde(default)]
    db: String,
    #[serde(default)]
    collection: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct After {
    driver_name: String,
    lat: f64,
    lng: f64,
    #[serde(default)]
    optimal: bool,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tracker_core::Error;

    use super::ChangeEvent;

    fn envelope(after: &serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "after": after,
            "source": {"db": "delivery", "collection": "drivers"},
            "ts_ms": 1_700_000_000_000_i64,
        }))
        .expect("should serialize")
    }

    #[test]
    fn double_encoded_after() {
        let after = json!({
            "_id": {"$oid": "65f1c0ffee"},
            "driverName": "Driver Bob",
            "lat": 51.5,
            "lng": -0.1,
            "optimal": true,
        });
        let payload = envelope(&json!(after.to_string()));

        let event = ChangeEvent::try_from(payload.as_slice()).expect("should decode");
        assert_eq!(event.position.driver_name, "Driver Bob");
        assert_eq!(event.position.source_timestamp_millis, 1_700_000_000_000);
        assert!(event.position.optimal);
        assert_eq!(event.db, "delivery");
        assert_eq!(event.collection, "drivers");
    }

    #[test]
    fn object_after() {
        let payload = envelope(&json!({"driverName": "Driver Bob", "lat": 51.5, "lng": -0.1}));
        let event = ChangeEvent::try_from(payload.as_slice()).expect("should decode");
        assert!(!event.position.optimal);
    }

    #[test]
    fn null_after() {
        let payload = envelope(&json!(null));
        let err = ChangeEvent::try_from(payload.as_slice()).expect_err("should fail");
        assert_eq!(err, Error::MissingField("after".to_string()));
    }

    #[test]
    fn unparseable_after() {
        let payload = envelope(&json!("{not json"));
        let err = ChangeEvent::try_from(payload.as_slice()).expect_err("should fail");
        assert!(err.to_string().contains("deserializing `after` document"), "{err}");
    }

    #[test]
    fn missing_timestamp() {
        let payload = serde_json::to_vec(&json!({
            "after": json!({"driverName": "A", "lat": 1.0, "lng": 2.0}).to_string(),
            "source": {"db": "d", "collection": "c"},
        }))
        .expect("should serialize");
        let err = ChangeEvent::try_from(payload.as_slice()).expect_err("should fail");
        assert_eq!(err, Error::MissingField("ts_ms".to_string()));
    }

    #[test]
    fn not_json() {
        let err = ChangeEvent::try_from(b"garbage".as_slice()).expect_err("should fail");
        assert!(matches!(err, Error::Internal(_)), "{err}");
    }
}
