//! # Delivery tracker
//!
//! Simulates delivery drivers moving along fixed routes and reports live trip
//! telemetry derived from the change stream of their position document.
//!
//! A delivery run writes each waypoint of a pre-shuffled schedule to the
//! position store. Every write that changes the document is published on the
//! change feed, consumed by the [`trip_telemetry::Aggregator`], and exposed to
//! polling clients through the HTTP endpoints in [`http`].

pub mod config;
pub mod http;
pub mod messaging;
pub mod provider;

pub use self::config::Config;
