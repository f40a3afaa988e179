use serde::{Deserialize, Serialize};

/// A single motorcycle parking space as shown on the map.
///
/// Coordinates are always finite; use [`ParkingPoint::new`] to build one from
/// untrusted values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingPoint {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl ParkingPoint {
    /// Returns `None` unless both coordinates are finite.
    #[must_use]
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Option<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        Some(Self {
            name: name.into(),
            latitude,
            longitude,
        })
    }

    /// `(latitude, longitude)`, the order map libraries expect.
    #[must_use]
    pub fn position(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    /// Six-decimal coordinate label used in popups.
    #[must_use]
    pub fn coordinate_label(&self) -> String {
        format!("{:.6}, {:.6}", self.latitude, self.longitude)
    }

    /// Case-insensitive substring match on the name. An empty term matches everything.
    #[must_use]
    pub fn matches_name(&self, term: &str) -> bool {
        let term = term.trim();
        term.is_empty() || self.name.to_lowercase().contains(&term.to_lowercase())
    }

    /// Great-circle distance in metres from `(latitude, longitude)` (haversine).
    #[must_use]
    pub fn distance_m(&self, latitude: f64, longitude: f64) -> f64 {
        const EARTH_RADIUS_M: f64 = 6_371_008.8;
        let (phi1, phi2) = (self.latitude.to_radians(), latitude.to_radians());
        let d_phi = (latitude - self.latitude).to_radians();
        let d_lambda = (longitude - self.longitude).to_radians();
        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }
}
