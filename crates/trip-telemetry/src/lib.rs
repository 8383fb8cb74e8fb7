//! Trip telemetry
//!
//! Decodes change-capture messages for the driver position document and folds
//! them into per-driver trip state: elapsed time since the first sighting and
//! distance from the driver's home reference.

mod aggregator;
mod event;
mod trip_state;

pub use self::aggregator::*;
pub use self::event::*;
pub use self::trip_state::*;
