//! Driver routes
//!
//! Static route definitions for the simulated couriers, the great-circle
//! distance between two points, and the randomised schedule that replays every
//! driver's chosen path as one interleaved sequence.

mod point;
mod route;
mod schedule;

pub use self::point::*;
pub use self::route::*;
pub use self::schedule::*;
