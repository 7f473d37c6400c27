// Live flow telemetry domain models
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use super::geo::GeoPoint;

/// Column names of the cached live table. Downstream readers rely on these.
pub mod columns {
    pub const LOCATION_NAME: &str = "Location Name";
    pub const COORDINATES: &str = "Coordinates";
    pub const CURRENT_SPEED: &str = "Current Speed (km/h)";
    pub const FREE_FLOW_SPEED: &str = "Free Flow Speed (km/h)";
    pub const CURRENT_TRAVEL_TIME: &str = "Current Travel Time (s)";
    pub const FREE_FLOW_TRAVEL_TIME: &str = "Free Flow Travel Time (s)";
    pub const CONGESTION_LEVEL: &str = "Congestion Level";
    pub const CONFIDENCE: &str = "Confidence";

    pub const ALL: [&str; 8] = [
        LOCATION_NAME,
        COORDINATES,
        CURRENT_SPEED,
        FREE_FLOW_SPEED,
        CURRENT_TRAVEL_TIME,
        FREE_FLOW_TRAVEL_TIME,
        CONGESTION_LEVEL,
        CONFIDENCE,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CongestionLevel {
    Low,
    Moderate,
    High,
}

impl CongestionLevel {
    /// High below half the free-flow speed, Moderate below 80%, otherwise Low.
    pub fn classify(current_speed: f64, free_flow_speed: f64) -> Self {
        if current_speed < free_flow_speed * 0.5 {
            CongestionLevel::High
        } else if current_speed < free_flow_speed * 0.8 {
            CongestionLevel::Moderate
        } else {
            CongestionLevel::Low
        }
    }
}

/// Raw readings for the flow segment nearest to a point, in source units.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowSegment {
    pub current_speed: f64,
    pub free_flow_speed: f64,
    pub current_travel_time: f64,
    pub free_flow_travel_time: f64,
    pub confidence: f64,
}

/// One row of the live table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowSample {
    #[serde(rename = "Location Name")]
    pub location_name: String,
    #[serde(rename = "Coordinates")]
    pub coordinates: String,
    #[serde(rename = "Current Speed (km/h)")]
    pub current_speed: f64,
    #[serde(rename = "Free Flow Speed (km/h)")]
    pub free_flow_speed: f64,
    #[serde(rename = "Current Travel Time (s)")]
    pub current_travel_time: f64,
    #[serde(rename = "Free Flow Travel Time (s)")]
    pub free_flow_travel_time: f64,
    #[serde(rename = "Congestion Level")]
    pub congestion_level: CongestionLevel,
    #[serde(rename = "Confidence", serialize_with = "serialize_confidence")]
    pub confidence: f64,
}

impl FlowSample {
    pub fn from_segment(point: &GeoPoint, segment: FlowSegment) -> Self {
        Self {
            location_name: point.name.clone(),
            coordinates: point.coordinates(),
            current_speed: segment.current_speed,
            free_flow_speed: segment.free_flow_speed,
            current_travel_time: segment.current_travel_time,
            free_flow_travel_time: segment.free_flow_travel_time,
            congestion_level: CongestionLevel::classify(
                segment.current_speed,
                segment.free_flow_speed,
            ),
            confidence: segment.confidence,
        }
    }

    /// Seconds lost against free-flow conditions; negative when faster.
    pub fn delay_seconds(&self) -> f64 {
        self.current_travel_time - self.free_flow_travel_time
    }
}

pub fn format_confidence(confidence: f64) -> String {
    format!("{:.0}%", confidence * 100.0)
}

fn serialize_confidence<S: Serializer>(confidence: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_confidence(*confidence))
}

/// The latest complete batch. Replaced wholesale, never merged.
#[derive(Debug, Clone, Serialize)]
pub struct FlowSnapshot {
    pub fetched_at: DateTime<Utc>,
    pub rows: Vec<FlowSample>,
}

impl FlowSnapshot {
    pub fn new(rows: Vec<FlowSample>) -> Self {
        Self {
            fetched_at: Utc::now(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(CongestionLevel::classify(20.0, 60.0), CongestionLevel::High);
        assert_eq!(CongestionLevel::classify(40.0, 60.0), CongestionLevel::Moderate);
        assert_eq!(CongestionLevel::classify(55.0, 60.0), CongestionLevel::Low);
        assert_eq!(CongestionLevel::classify(70.0, 60.0), CongestionLevel::Low);
    }

    #[test]
    fn test_classify_boundaries_take_non_strict_branch() {
        // exactly half -> Moderate, exactly 80% -> Low
        assert_eq!(CongestionLevel::classify(50.0, 100.0), CongestionLevel::Moderate);
        assert_eq!(CongestionLevel::classify(80.0, 100.0), CongestionLevel::Low);
    }

    #[test]
    fn test_classify_missing_readings_is_low() {
        assert_eq!(CongestionLevel::classify(0.0, 0.0), CongestionLevel::Low);
    }

    #[test]
    fn test_classify_ratio_sweep() {
        let free_flow = 64.0;
        for step in 0..=160u32 {
            let current = free_flow * step as f64 / 100.0;
            let expected = if step < 50 {
                CongestionLevel::High
            } else if step < 80 {
                CongestionLevel::Moderate
            } else {
                CongestionLevel::Low
            };
            assert_eq!(
                CongestionLevel::classify(current, free_flow),
                expected,
                "{step}% of free flow"
            );
        }
    }

    #[test]
    fn test_sample_serializes_with_stable_columns() {
        let point = GeoPoint::new("Kolkata", 22.5726, 88.3639);
        let sample = FlowSample::from_segment(
            &point,
            FlowSegment {
                current_speed: 18.0,
                free_flow_speed: 40.0,
                current_travel_time: 300.0,
                free_flow_travel_time: 140.0,
                confidence: 0.93,
            },
        );

        let value = serde_json::to_value(&sample).unwrap();
        let object = value.as_object().unwrap();
        for column in columns::ALL {
            assert!(object.contains_key(column), "missing column {column}");
        }
        assert_eq!(object[columns::CONFIDENCE], "93%");
        assert_eq!(object[columns::CONGESTION_LEVEL], "High");
        assert_eq!(object[columns::COORDINATES], "22.5726, 88.3639");
        assert_eq!(sample.delay_seconds(), 160.0);
    }

    #[test]
    fn test_serialized_field_order_matches_columns() {
        let sample = FlowSample::from_segment(
            &GeoPoint::new("Varanasi", 25.3176, 82.9739),
            FlowSegment::default(),
        );

        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.serialize(&sample).unwrap();
        let bytes = wtr.into_inner().unwrap();

        let mut rdr = csv::Reader::from_reader(bytes.as_slice());
        let header: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(header, columns::ALL.to_vec());
    }
}
