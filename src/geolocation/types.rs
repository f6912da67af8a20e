//! Geolocation data structures.

use serde::Serialize;

use crate::models::Coordinates;

/// A validated geolocation lookup result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoLocation {
    /// Network address the service saw for this client
    pub network_address: String,
    pub country: String,
    pub city: Option<String>,
    pub region: Option<String>,
    /// UTC offset if reported, else the zone id, else `"Unknown"`
    pub timezone: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoLocation {
    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::new(self.latitude, self.longitude)
    }
}
