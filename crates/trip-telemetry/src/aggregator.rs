use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

use driver_routes::RouteTable;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};
use tracker_core::{Error, Mailbox, Result};

use crate::event::ChangeEvent;
use crate::trip_state::TripState;

/// Trip state for every tracked driver, keyed by driver name.
pub type TripStates = BTreeMap<String, TripState>;

/// Per-driver summary included in every telemetry record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverProgress {
    pub name: String,
    pub time_elapsed: String,
    pub distance_covered_km: f64,
}

/// Snapshot pushed to the consumer-side queue after each processed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub lat: f64,
    pub lng: f64,
    #[serde(rename = "driverName")]
    pub driver_name: String,
    pub optimal: bool,
    pub db: String,
    pub collection: String,
    pub ts_ms: i64,
    #[serde(rename = "driversTimeAndDist")]
    pub drivers: Vec<DriverProgress>,
}

/// Consumes position change events and owns the per-driver trip state.
///
/// Readers only ever receive copies of the state; it is mutated solely by
/// [`Aggregator::apply`] and cleared by [`Aggregator::reset`].
#[derive(Debug)]
pub struct Aggregator {
    routes: Arc<RouteTable>,
    trips: Mutex<TripStates>,
    outbox: Mailbox<TelemetryRecord>,
}

impl Aggregator {
    #[must_use]
    pub fn new(routes: Arc<RouteTable>) -> Self {
        Self { routes, trips: Mutex::new(TripStates::new()), outbox: Mailbox::new() }
    }

    /// Decode a raw change message and apply it.
    ///
    /// # Errors
    ///
    /// Returns an error when the payload is absent or malformed, or the driver
    /// is not in the route table. Trip state is left untouched in every error
    /// case.
    pub async fn process(&self, payload: Option<&[u8]>) -> Result<TelemetryRecord> {
        let Some(payload) = payload else {
            return Err(Error::MissingField("message value".to_string()));
        };
        let event = ChangeEvent::try_from(payload)?;
        self.apply(event).await
    }

    /// Fold one event into the trip state and queue the resulting snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDriver`] when a first event names a driver that
    /// has no route.
    pub async fn apply(&self, event: ChangeEvent) -> Result<TelemetryRecord> {
        let ChangeEvent { position, db, collection } = event;

        let drivers = {
            let mut trips = self.trips.lock().await;

            match trips.entry(position.driver_name.clone()) {
                Entry::Occupied(mut entry) => entry.get_mut().advance(&position),
                Entry::Vacant(entry) => {
                    let Some(home) = self.routes.home(&position.driver_name) else {
                        return Err(Error::UnknownDriver(position.driver_name));
                    };
                    info!(driver = %position.driver_name, "tracking new driver");
                    entry.insert(TripState::start(&position, home));
                }
            }

            trips
                .iter()
                .map(|(name, state)| DriverProgress {
                    name: name.clone(),
                    time_elapsed: state.time_elapsed.clone(),
                    distance_covered_km: state.distance_covered_km,
                })
                .collect()
        };

        let record = TelemetryRecord {
            lat: position.lat,
            lng: position.lng,
            driver_name: position.driver_name,
            optimal: position.optimal,
            db,
            collection,
            ts_ms: position.source_timestamp_millis,
            drivers,
        };
        debug!(driver = %record.driver_name, ts_ms = record.ts_ms, "telemetry record queued");

        self.outbox.push(record.clone()).await;
        Ok(record)
    }

    /// Copy of the current trip state for every driver.
    pub async fn snapshot(&self) -> TripStates {
        self.trips.lock().await.clone()
    }

    /// Forget every driver. The next event for any driver starts a new trip.
    pub async fn reset(&self) {
        let mut trips = self.trips.lock().await;
        if !trips.is_empty() {
            info!(drivers = trips.len(), "trip state reset");
        }
        trips.clear();
    }

    /// Pop the oldest queued telemetry record.
    pub async fn pop(&self) -> Option<TelemetryRecord> {
        self.outbox.pop().await
    }
}
