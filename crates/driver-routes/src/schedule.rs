use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::route::DriverRoute;

/// Per-driver record of whether the optimal path was chosen.
pub type PathSelections = BTreeMap<String, bool>;

/// One point of a driver's chosen path, ready to be written to the store.
///
/// Timestamps are assigned when the point is emitted, not when the schedule is
/// built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub optimal: bool,
}

/// The interleaved replay order for a delivery run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    waypoints: Vec<Waypoint>,
    selections: PathSelections,
}

impl Schedule {
    #[must_use]
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    #[must_use]
    pub const fn selections(&self) -> &PathSelections {
        &self.selections
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}

/// Choose a path for every driver with a fair coin flip and merge the chosen
/// paths into one sequence.
///
/// Restricted to any one driver, the result is that driver's chosen path in
/// its original order. The order across drivers is drawn from `rng`.
pub fn build_schedule<R: Rng + ?Sized>(routes: &[DriverRoute], rng: &mut R) -> Schedule {
    let mut selections = PathSelections::new();
    let mut paths = Vec::with_capacity(routes.len());

    for route in routes {
        let optimal = rng.random_bool(0.5);
        selections.insert(route.name.clone(), optimal);

        let path: Vec<Waypoint> = route
            .path(optimal)
            .iter()
            .map(|point| Waypoint {
                name: route.name.clone(),
                lat: point.lat,
                lng: point.lng,
                optimal,
            })
            .collect();
        debug!(driver = %route.name, optimal, points = path.len(), "selected path");
        paths.push(path);
    }

    let waypoints = interleave(paths, rng);
    Schedule { waypoints, selections }
}

/// Order-preserving random merge.
///
/// At each step one of the sequences that still has items is picked uniformly
/// (not weighted by how many items remain) and its next item is emitted.
pub fn interleave<T, R: Rng + ?Sized>(lists: Vec<Vec<T>>, rng: &mut R) -> Vec<T> {
    let total = lists.iter().map(Vec::len).sum();
    let mut merged = Vec::with_capacity(total);

    let mut cursors: Vec<_> = lists.into_iter().map(IntoIterator::into_iter).collect();
    let mut active: Vec<usize> = (0..cursors.len()).filter(|&i| cursors[i].len() > 0).collect();

    while !active.is_empty() {
        let slot = rng.random_range(0..active.len());
        let source = active[slot];

        if let Some(item) = cursors[source].next() {
            merged.push(item);
        }
        if cursors[source].len() == 0 {
            active.swap_remove(slot);
        }
    }

    merged
}
