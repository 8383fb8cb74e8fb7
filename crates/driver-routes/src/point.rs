use serde::{Deserialize, Serialize};

/// Mean Earth radius used by [`distance_km`].
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub lat: f64,
    pub lng: f64,
}

impl RoutePoint {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Great-circle distance between two points, in kilometres (haversine).
#[must_use]
pub fn distance_km(a: RoutePoint, b: RoutePoint) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::{RoutePoint, distance_km};

    const TOLERANCE_KM: f64 = 0.01;

    #[test]
    fn identity() {
        let point = RoutePoint::new(51.504_148, -0.095_272);
        assert!(distance_km(point, point).abs() < f64::EPSILON);
    }

    #[test]
    fn symmetric() {
        let bridge = RoutePoint::new(51.507_877, -0.087_732);
        let tower = RoutePoint::new(51.505_456, -0.075_356);
        assert!((distance_km(bridge, tower) - distance_km(tower, bridge)).abs() < f64::EPSILON);
    }

    // One kilometre due north along a meridian.
    #[test]
    fn one_kilometre() {
        let start = RoutePoint::new(51.5, -0.1);
        let end = RoutePoint::new(51.5 + 0.008_993_216, -0.1);
        assert!((distance_km(start, end) - 1.0).abs() < TOLERANCE_KM);
    }

    // One degree of longitude on the equator.
    #[test]
    fn equator_degree() {
        let dist = distance_km(RoutePoint::new(0.0, 0.0), RoutePoint::new(0.0, 1.0));
        assert!((dist - 111.195).abs() < TOLERANCE_KM);
    }
}
