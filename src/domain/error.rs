// Error taxonomy shared by the telemetry aggregator and the inference pipeline
use std::path::PathBuf;
use thiserror::Error;

use super::prediction::ArtifactKind;

/// Failure fetching flow data for a single geo-point. Never aborts a batch.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("flow API responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request to flow API failed: {0}")]
    Transport(String),
    #[error("could not decode flow API response: {0}")]
    Decode(String),
}

/// Closed-vocabulary encoder failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EncodingError {
    #[error("label '{label}' was not seen when fitting the {encoder} encoder")]
    UnseenLabel { encoder: String, label: String },
    #[error("class index {index} is outside the {len} known classes")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Error)]
pub enum ArtifactLoadErrorKind {
    #[error("could not read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse artifact: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid artifact: {0}")]
    Invalid(String),
}

/// Fatal for the pipeline: names the artifact and file that failed.
#[derive(Debug, Error)]
#[error("failed to load {artifact} from {}: {kind}", .path.display())]
pub struct ArtifactLoadError {
    pub artifact: ArtifactKind,
    pub path: PathBuf,
    #[source]
    pub kind: ArtifactLoadErrorKind,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum InferenceError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error("{model} expects {expected} features but received {actual}")]
    ShapeMismatch {
        model: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{model} was trained on columns {expected:?} but received {actual:?}")]
    FeatureNames {
        model: &'static str,
        expected: Vec<String>,
        actual: Vec<String>,
    },
    #[error("classifier produced class {index} but the decoder knows {len} classes")]
    ClassCount { index: usize, len: usize },
    #[error("decoded traffic level '{0}' is not one of Low, Medium, High")]
    UnknownLevel(String),
    #[error("regressor produced a non-finite vehicle count")]
    NonFinite,
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("could not read reference dataset {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed reference dataset row: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: cannot parse timestamp '{value}'")]
    Timestamp { row: usize, value: String },
    #[error("reference dataset task failed: {0}")]
    Task(String),
}
