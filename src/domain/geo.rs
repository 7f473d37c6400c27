// Geo-point domain model
use serde::{Deserialize, Serialize};

/// Used for the prediction dropdown when the reference dataset cannot be read.
pub const FALLBACK_LOCATION_NAMES: [&str; 10] = [
    "Agra Fort, India",
    "Bangalore, India",
    "Bhopal, India",
    "Chandigarh, India",
    "Chennai, India",
    "India Gate, Delhi, India",
    "Kolkata, India",
    "Lucknow, India",
    "Mumbai, India",
    "Taj Mahal, India",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }

    /// "lat, lon" with four decimals, as shown in the live table
    pub fn coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_format() {
        let point = GeoPoint::new("Mumbai Central", 19.076, 72.8777);
        assert_eq!(point.coordinates(), "19.0760, 72.8777");
    }

    #[test]
    fn test_fallback_names_are_sorted() {
        let mut sorted = FALLBACK_LOCATION_NAMES.to_vec();
        sorted.sort();
        assert_eq!(sorted, FALLBACK_LOCATION_NAMES.to_vec());
    }
}
