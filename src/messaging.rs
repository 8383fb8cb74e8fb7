//! Change-stream consumer feeding the trip aggregator.

use tracing::{error, info, warn};
use tracker_core::{ChangeMessage, ChangeStream, Error};
use trip_telemetry::Aggregator;

const SERVICE: &str = "delivery-tracker";

/// Consume `stream` until it ends or `shutdown` resolves.
///
/// Only messages on `topic` are applied; a message that fails to process is
/// logged and skipped.
pub async fn consume<S, F>(stream: &mut S, aggregator: &Aggregator, topic: &str, shutdown: F)
where
    S: ChangeStream,
    F: Future<Output = ()> + Send,
{
    info!(topic = %topic, service = %SERVICE, "change stream consumer started");
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            () = &mut shutdown => {
                info!(service = %SERVICE, "change stream consumer stopping");
                break;
            }
            message = stream.recv() => {
                let Some(message) = message else {
                    info!(service = %SERVICE, "change stream ended");
                    break;
                };
                handle(aggregator, topic, &message).await;
            }
        }
    }
}

async fn handle(aggregator: &Aggregator, topic: &str, message: &ChangeMessage) {
    if message.topic != topic {
        warn!(monotonic_counter.unhandled_topics = 1, topic = %message.topic, service = %SERVICE);
        return;
    }

    match aggregator.process(message.payload.as_deref()).await {
        Ok(record) => {
            info!(
                monotonic_counter.messages_processed = 1,
                driver = %record.driver_name,
                ts_ms = record.ts_ms,
                service = %SERVICE
            );
        }
        Err(Error::UnknownDriver(driver)) => {
            warn!(
                monotonic_counter.unknown_drivers = 1,
                driver = %driver,
                service = %SERVICE,
                "no route for driver, event dropped"
            );
        }
        Err(e) => {
            error!(
                monotonic_counter.processing_errors = 1,
                error = %e,
                topic = %message.topic,
                service = %SERVICE
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use driver_routes::RouteTable;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tracker_core::{ChangeMessage, ChangeStream};
    use trip_telemetry::Aggregator;

    use super::consume;

    const TOPIC: &str = "dbserver1.delivery.drivers";
    const OTHER_TOPIC: &str = "dbserver1.delivery.depots";

    // Finite stream: ends once the queued messages are drained.
    struct ScriptedStream(VecDeque<ChangeMessage>);

    impl ChangeStream for ScriptedStream {
        async fn recv(&mut self) -> Option<ChangeMessage> {
            self.0.pop_front()
        }

        async fn close(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn position(driver: &str, ts_ms: i64) -> Vec<u8> {
        let after = json!({"driverName": driver, "lat": 51.5, "lng": -0.09, "optimal": true});
        serde_json::to_vec(&json!({
            "after": after.to_string(),
            "source": {"db": "delivery", "collection": "drivers"},
            "ts_ms": ts_ms,
        }))
        .expect("should serialize")
    }

    #[tokio::test]
    async fn routes_by_topic_and_skips_failures() {
        let routes = RouteTable::builtin().expect("builtin routes");
        let aggregator = Aggregator::new(Arc::new(routes));

        let mut stream = ScriptedStream(VecDeque::from([
            ChangeMessage::new(TOPIC, Some(position("Driver Bob", 0).as_slice())),
            ChangeMessage::new(OTHER_TOPIC, Some(position("Driver Alice", 0).as_slice())),
            ChangeMessage::new(TOPIC, None),
            ChangeMessage::new(TOPIC, Some(b"not json".as_slice())),
            ChangeMessage::new(TOPIC, Some(position("Driver Nobody", 10).as_slice())),
            ChangeMessage::new(TOPIC, Some(position("Driver Bob", 30_000).as_slice())),
        ]));

        consume(&mut stream, &aggregator, TOPIC, std::future::pending()).await;

        let trips = aggregator.snapshot().await;
        assert_eq!(trips.len(), 1);
        assert_eq!(trips["Driver Bob"].time_elapsed, "0m 30s");

        assert!(aggregator.pop().await.is_some());
        assert!(aggregator.pop().await.is_some());
        assert!(aggregator.pop().await.is_none());
    }

    #[tokio::test]
    async fn stops_on_shutdown() {
        let routes = RouteTable::builtin().expect("builtin routes");
        let aggregator = Aggregator::new(Arc::new(routes));
        let mut stream = ScriptedStream(VecDeque::from([ChangeMessage::new(
            TOPIC,
            Some(position("Driver Bob", 0).as_slice()),
        )]));

        // shutdown already signalled, so nothing is consumed
        consume(&mut stream, &aggregator, TOPIC, std::future::ready(())).await;
        assert!(aggregator.snapshot().await.is_empty());
    }
}
