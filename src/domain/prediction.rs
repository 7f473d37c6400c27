// Inference pipeline: request encoding, model calls, output decoding
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::encoding::{LabelEncoder, OneHotEncoder};
use super::error::{EncodingError, InferenceError};
use super::model::{ForestClassifier, ForestRegressor};

pub const DATE_COLUMN: &str = "date";
pub const TIME_COLUMN: &str = "time";

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    pub location_name: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl PredictionRequest {
    pub fn date_label(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    pub fn time_label(&self) -> String {
        self.time.format("%H:%M").to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrafficLevel {
    Low,
    Medium,
    High,
}

impl TrafficLevel {
    fn parse(label: &str) -> Result<Self, InferenceError> {
        match label {
            "Low" => Ok(TrafficLevel::Low),
            "Medium" => Ok(TrafficLevel::Medium),
            "High" => Ok(TrafficLevel::High),
            other => Err(InferenceError::UnknownLevel(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    pub traffic_level: TrafficLevel,
    pub vehicle_count: u64,
}

/// What to do with a date or time the label encoder has never seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnseenLabelPolicy {
    /// Encode as class 0 and carry on (lossy).
    #[default]
    FallbackZero,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    TrafficModel,
    VehicleModel,
    LocationEncoder,
    DateEncoder,
    TimeEncoder,
    TrafficLabelDecoder,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::TrafficModel => "traffic level model",
            ArtifactKind::VehicleModel => "vehicle count model",
            ArtifactKind::LocationEncoder => "location one-hot encoder",
            ArtifactKind::DateEncoder => "date label encoder",
            ArtifactKind::TimeEncoder => "time label encoder",
            ArtifactKind::TrafficLabelDecoder => "traffic level label decoder",
        };
        f.write_str(name)
    }
}

/// The six fitted artifacts. Built once, shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub traffic_model: ForestClassifier,
    pub vehicle_model: ForestRegressor,
    pub location_encoder: OneHotEncoder,
    pub date_encoder: LabelEncoder,
    pub time_encoder: LabelEncoder,
    pub traffic_label_decoder: LabelEncoder,
    pub unseen_label_policy: UnseenLabelPolicy,
}

impl Artifacts {
    /// Width the models should have been trained on.
    pub fn expected_feature_count(&self) -> usize {
        self.location_encoder.width() + 2
    }

    /// Shape drift between independently exported artifacts.
    pub fn consistency_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let expected = self.expected_feature_count();
        if self.traffic_model.n_features() != expected {
            warnings.push(format!(
                "traffic level model expects {} features, encoders produce {}",
                self.traffic_model.n_features(),
                expected
            ));
        }
        if self.vehicle_model.n_features() != expected {
            warnings.push(format!(
                "vehicle count model expects {} features, encoders produce {}",
                self.vehicle_model.n_features(),
                expected
            ));
        }
        let decoder_classes = self.traffic_label_decoder.classes().len();
        if self.traffic_model.n_classes() != decoder_classes {
            warnings.push(format!(
                "traffic level model has {} classes, label decoder has {}",
                self.traffic_model.n_classes(),
                decoder_classes
            ));
        }
        warnings
    }

    fn encode_label(
        &self,
        encoder: &LabelEncoder,
        name: &str,
        label: &str,
    ) -> Result<f64, EncodingError> {
        match encoder.transform(name, label) {
            Ok(index) => Ok(index as f64),
            Err(e) if self.unseen_label_policy == UnseenLabelPolicy::FallbackZero => {
                tracing::warn!("{}; encoding as 0", e);
                Ok(0.0)
            }
            Err(e) => Err(e),
        }
    }
}

/// Location one-hot columns, then the encoded date, then the encoded time.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatureVector {
    pub columns: Vec<String>,
    pub values: Vec<f64>,
}

pub fn encode_request(
    artifacts: &Artifacts,
    request: &PredictionRequest,
) -> Result<EncodedFeatureVector, InferenceError> {
    let mut columns = artifacts.location_encoder.feature_names();
    let mut values = artifacts.location_encoder.transform(&request.location_name)?;

    let date = artifacts.encode_label(&artifacts.date_encoder, DATE_COLUMN, &request.date_label())?;
    let time = artifacts.encode_label(&artifacts.time_encoder, TIME_COLUMN, &request.time_label())?;

    columns.push(DATE_COLUMN.to_string());
    values.push(date);
    columns.push(TIME_COLUMN.to_string());
    values.push(time);

    Ok(EncodedFeatureVector { columns, values })
}

/// Encodes the request, runs both models and decodes the results.
pub fn predict(
    artifacts: &Artifacts,
    request: &PredictionRequest,
) -> Result<PredictionResult, InferenceError> {
    let features = encode_request(artifacts, request)?;

    let class = artifacts
        .traffic_model
        .predict(&features.columns, &features.values)?;
    let label = artifacts
        .traffic_label_decoder
        .inverse_transform(class)
        .map_err(|_| InferenceError::ClassCount {
            index: class,
            len: artifacts.traffic_label_decoder.classes().len(),
        })?;
    let traffic_level = TrafficLevel::parse(label)?;

    let raw_count = artifacts
        .vehicle_model
        .predict(&features.columns, &features.values)?;
    if !raw_count.is_finite() {
        return Err(InferenceError::NonFinite);
    }
    // truncate toward zero, never below zero
    let vehicle_count = raw_count.max(0.0).trunc() as u64;

    Ok(PredictionResult {
        traffic_level,
        vehicle_count,
    })
}
