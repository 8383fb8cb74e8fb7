//! Delivery dispatch
//!
//! Replays a driver schedule into the position store one write at a time so
//! that change capture observes each waypoint as a discrete event.

mod orchestrator;

pub use self::orchestrator::*;
