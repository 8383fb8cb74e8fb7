use driver_routes::{RoutePoint, distance_km};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::event::PositionEvent;

/// Accumulated metrics for one driver's run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripState {
    /// Timestamp (ms) of the first event seen for the driver.
    pub start_time: i64,
    pub last_update_time: i64,
    /// Elapsed time since `start_time`, formatted as `"Xm Ys"`.
    pub time_elapsed: String,
    /// Distance from `start_coord` to the current position. Not cumulative.
    pub distance_covered_km: f64,
    /// Home/destination reference: last point of the driver's optimal path.
    pub start_coord: RoutePoint,
    pub last_coord: RoutePoint,
    pub initial_driver_start: RoutePoint,
    /// Distance from the first observed position to `start_coord`.
    pub total_dist_km: f64,
    pub optimal: bool,
}

impl TripState {
    /// State for a driver's first observed event.
    #[must_use]
    pub fn start(event: &PositionEvent, home: RoutePoint) -> Self {
        let here = event.point();
        Self {
            start_time: event.source_timestamp_millis,
            last_update_time: event.source_timestamp_millis,
            time_elapsed: format_elapsed(0),
            distance_covered_km: 0.0,
            start_coord: home,
            last_coord: here,
            initial_driver_start: here,
            total_dist_km: distance_km(here, home),
            optimal: event.optimal,
        }
    }

    /// Fold a subsequent event into the state.
    ///
    /// Events older than `last_update_time` are applied as they arrive.
    pub fn advance(&mut self, event: &PositionEvent) {
        let now = event.source_timestamp_millis;
        if now < self.last_update_time {
            warn!(
                driver = %event.driver_name,
                timestamp = now,
                last_update_time = self.last_update_time,
                "out-of-order position event"
            );
        }

        self.last_update_time = now;
        self.time_elapsed = format_elapsed(now.saturating_sub(self.start_time));
        self.last_coord = event.point();
        self.distance_covered_km = distance_km(self.start_coord, self.last_coord);
    }
}

/// Format a millisecond duration as whole minutes and remaining seconds.
///
/// Negative durations (an event older than the driver's first) render as
/// `"0m 0s"`.
#[must_use]
pub fn format_elapsed(elapsed_ms: i64) -> String {
    let total_secs = elapsed_ms.max(0) / 1000;
    format!("{}m {}s", total_secs / 60, total_secs % 60)
}

#[cfg(test)]
mod tests {
    use driver_routes::RoutePoint;
    use pretty_assertions::assert_eq;

    use super::{TripState, format_elapsed};
    use crate::event::PositionEvent;

    fn event(ts: i64, lat: f64) -> PositionEvent {
        PositionEvent {
            driver_name: "Driver Bob".to_string(),
            lat,
            lng: -0.1,
            optimal: false,
            source_timestamp_millis: ts,
        }
    }

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(0), "0m 0s");
        assert_eq!(format_elapsed(999), "0m 0s");
        assert_eq!(format_elapsed(125_000), "2m 5s");
        assert_eq!(format_elapsed(3_600_000), "60m 0s");
        assert_eq!(format_elapsed(-5_000), "0m 0s");
    }

    #[test]
    fn first_event() {
        let home = RoutePoint::new(51.5, -0.1);
        let state = TripState::start(&event(1_000, 51.51), home);

        assert_eq!(state.start_time, 1_000);
        assert_eq!(state.last_update_time, 1_000);
        assert_eq!(state.time_elapsed, "0m 0s");
        assert_eq!(state.start_coord, home);
        assert_eq!(state.initial_driver_start, RoutePoint::new(51.51, -0.1));
        assert_eq!(state.last_coord, state.initial_driver_start);
        assert!((state.total_dist_km - 1.112).abs() < 0.01);
        assert!(!state.optimal);
    }

    #[test]
    fn advance_recomputes() {
        let home = RoutePoint::new(51.5, -0.1);
        let mut state = TripState::start(&event(0, 51.52), home);
        state.advance(&event(125_000, 51.51));

        assert_eq!(state.start_time, 0);
        assert_eq!(state.last_update_time, 125_000);
        assert_eq!(state.time_elapsed, "2m 5s");
        assert_eq!(state.last_coord, RoutePoint::new(51.51, -0.1));
        // distance from home to current position, not path length
        assert!((state.distance_covered_km - 1.112).abs() < 0.01);
        assert_eq!(state.initial_driver_start, RoutePoint::new(51.52, -0.1));
    }

    #[test]
    fn out_of_order_is_applied() {
        let mut state = TripState::start(&event(10_000, 51.5), RoutePoint::new(51.5, -0.1));
        state.advance(&event(70_000, 51.5));
        state.advance(&event(40_000, 51.5));

        assert_eq!(state.last_update_time, 40_000);
        assert_eq!(state.time_elapsed, "0m 30s");
    }

    // Timestamps come straight off the wire, so extremes must not overflow.
    #[test]
    fn extreme_timestamps() {
        let mut state = TripState::start(&event(i64::MIN + 1, 51.5), RoutePoint::new(51.5, -0.1));
        state.advance(&event(i64::MAX, 51.5));

        assert_eq!(state.last_update_time, i64::MAX);
        assert_eq!(state.time_elapsed, format_elapsed(i64::MAX));

        state.advance(&event(i64::MIN, 51.5));
        assert_eq!(state.time_elapsed, "0m 0s");
    }
}
