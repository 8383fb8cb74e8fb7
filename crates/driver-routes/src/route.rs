use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracker_core::{Error, Result};

use crate::point::RoutePoint;

const BUILTIN_ROUTES: &str = include_str!("../data/drivers.json");

/// A courier and the two candidate paths it may follow on a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverRoute {
    pub name: String,
    pub optimal_path: Vec<RoutePoint>,
    pub deviated_path: Vec<RoutePoint>,
}

impl DriverRoute {
    /// The driver's home/destination reference: the last point of the optimal path.
    #[must_use]
    pub fn home(&self) -> Option<RoutePoint> {
        self.optimal_path.last().copied()
    }

    /// The path chosen for a run.
    #[must_use]
    pub fn path(&self, optimal: bool) -> &[RoutePoint] {
        if optimal { &self.optimal_path } else { &self.deviated_path }
    }
}

/// Static, read-only table of driver routes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteTable {
    routes: Vec<DriverRoute>,
}

impl RouteTable {
    /// Build a table from route definitions.
    ///
    /// # Errors
    ///
    /// Returns an error when a driver name is repeated or a driver has an
    /// empty optimal path (it would have no home reference).
    pub fn new(routes: Vec<DriverRoute>) -> Result<Self> {
        let mut seen = HashSet::new();
        for route in &routes {
            if !seen.insert(route.name.as_str()) {
                return Err(Error::InvalidFormat(format!("duplicate driver {}", route.name)));
            }
            if route.optimal_path.is_empty() {
                return Err(Error::InvalidFormat(format!("empty optimal path for {}", route.name)));
            }
        }
        Ok(Self { routes })
    }

    /// The route table shipped with the service.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled dataset is malformed.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_ROUTES.as_bytes())
    }

    /// Parse a JSON array of driver routes.
    ///
    /// # Errors
    ///
    /// Returns an error when the payload is not a valid route array or fails
    /// validation.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let routes: Vec<DriverRoute> = serde_json::from_slice(bytes)?;
        Self::new(routes)
    }

    /// Load a route table from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("reading routes from {}", path.display()))?;
        Self::from_json(&bytes)
    }

    #[must_use]
    pub fn routes(&self) -> &[DriverRoute] {
        &self.routes
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DriverRoute> {
        self.routes.iter().find(|route| route.name == name)
    }

    /// Home reference for a driver, or `None` if the driver is unknown.
    #[must_use]
    pub fn home(&self, name: &str) -> Option<RoutePoint> {
        self.get(name).and_then(DriverRoute::home)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
