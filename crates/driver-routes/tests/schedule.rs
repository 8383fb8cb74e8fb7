#![allow(missing_docs)]

use std::collections::HashSet;

use driver_routes::{DriverRoute, RoutePoint, RouteTable, Waypoint, build_schedule};
use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn routes() -> Vec<DriverRoute> {
    let points = |base: f64, n: usize| -> Vec<RoutePoint> {
        (0..n).map(|i| RoutePoint::new(base + i as f64 * 0.001, -0.1 - i as f64 * 0.001)).collect()
    };

    vec![
        DriverRoute {
            name: "Driver Ann".to_string(),
            optimal_path: points(51.0, 4),
            deviated_path: points(52.0, 6),
        },
        DriverRoute {
            name: "Driver Ben".to_string(),
            optimal_path: points(53.0, 3),
            deviated_path: points(54.0, 7),
        },
        DriverRoute {
            name: "Driver Cat".to_string(),
            optimal_path: points(55.0, 5),
            deviated_path: points(56.0, 2),
        },
    ]
}

fn chosen(route: &DriverRoute, optimal: bool) -> Vec<Waypoint> {
    route
        .path(optimal)
        .iter()
        .map(|p| Waypoint { name: route.name.clone(), lat: p.lat, lng: p.lng, optimal })
        .collect()
}

// Restricted to one driver, the schedule is exactly that driver's chosen path.
#[test]
fn order_preserved() {
    let routes = routes();

    for seed in 0..50 {
        let mut rng = StdRng::seed_from_u64(seed);
        let schedule = build_schedule(&routes, &mut rng);

        for route in &routes {
            let optimal = schedule.selections()[&route.name];
            let restricted: Vec<Waypoint> = schedule
                .waypoints()
                .iter()
                .filter(|w| w.name == route.name)
                .cloned()
                .collect();
            assert_eq!(restricted, chosen(route, optimal), "seed {seed}");
        }
    }
}

// Schedule length equals the sum of chosen path lengths and no point repeats.
#[test]
fn full_coverage() {
    let routes = routes();

    for seed in 0..50 {
        let mut rng = StdRng::seed_from_u64(seed);
        let schedule = build_schedule(&routes, &mut rng);

        let expected: usize =
            routes.iter().map(|r| r.path(schedule.selections()[&r.name]).len()).sum();
        assert_eq!(schedule.len(), expected);

        let unique: HashSet<(String, u64, u64)> = schedule
            .waypoints()
            .iter()
            .map(|w| (w.name.clone(), w.lat.to_bits(), w.lng.to_bits()))
            .collect();
        assert_eq!(unique.len(), expected);
    }
}

#[test]
fn selection_recorded_per_driver() {
    let routes = routes();
    let mut rng = StdRng::seed_from_u64(9);
    let schedule = build_schedule(&routes, &mut rng);

    assert_eq!(schedule.selections().len(), routes.len());
    for waypoint in schedule.waypoints() {
        assert_eq!(waypoint.optimal, schedule.selections()[&waypoint.name]);
    }
}

// Both paths get picked over many runs, and the interleaving is re-drawn.
#[test]
fn redrawn_each_call() {
    let routes = routes();
    let mut rng = StdRng::seed_from_u64(42);

    let mut orders = HashSet::new();
    let mut picked_optimal = HashSet::new();
    for _ in 0..40 {
        let schedule = build_schedule(&routes, &mut rng);
        let order: Vec<String> = schedule.waypoints().iter().map(|w| w.name.clone()).collect();
        orders.insert(order);
        picked_optimal.insert(schedule.selections()["Driver Ann"]);
    }

    assert!(orders.len() > 1);
    assert_eq!(picked_optimal.len(), 2);
}

#[test]
fn builtin_routes_schedule() {
    let table = RouteTable::builtin().expect("should load bundled routes");
    let mut rng = StdRng::seed_from_u64(7);
    let schedule = build_schedule(table.routes(), &mut rng);

    assert_eq!(schedule.selections().len(), table.len());
    assert!(!schedule.is_empty());
}
