use serde::{Deserialize, Serialize};

/// Mean earth radius used for great-circle distances
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// A geocoded position, optionally carrying a human readable label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub label: String,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            label: String::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Haversine distance in kilometres
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }

    /// Apply a displacement, keeping the label
    pub fn offset(&self, displacement: &Displacement) -> GeoPoint {
        GeoPoint {
            lat: self.lat + displacement.d_lat,
            lng: self.lng + displacement.d_lng,
            label: self.label.clone(),
        }
    }
}

/// Per-tick movement in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Displacement {
    pub d_lat: f64,
    pub d_lng: f64,
}

impl Displacement {
    pub fn new(d_lat: f64, d_lng: f64) -> Self {
        Self { d_lat, d_lng }
    }

    pub fn is_finite(&self) -> bool {
        self.d_lat.is_finite() && self.d_lng.is_finite()
    }

    /// True when both components stay inside `±bound` degrees
    pub fn is_within(&self, bound: f64) -> bool {
        self.is_finite() && self.d_lat.abs() <= bound && self.d_lng.abs() <= bound
    }
}
