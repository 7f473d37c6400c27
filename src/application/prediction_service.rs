// Prediction service - Owns the artifact lifecycle and serves predictions
use crate::application::flow_repository::ArtifactSource;
use crate::domain::error::InferenceError;
use crate::domain::prediction::{self, Artifacts, PredictionRequest, PredictionResult};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Uninitialized -> Loading -> Ready | LoadFailed. LoadFailed is terminal.
#[derive(Debug, Clone)]
pub enum PipelineState {
    Uninitialized,
    Loading,
    Ready(Arc<Artifacts>),
    LoadFailed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineStatus {
    Uninitialized,
    Loading,
    Ready {
        feature_count: usize,
        locations: Vec<String>,
    },
    LoadFailed { reason: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum PredictionError {
    #[error("models are not loaded ({0:?})")]
    NotReady(PipelineStatus),
    #[error("prediction error: {0}")]
    Inference(#[from] InferenceError),
}

#[derive(Clone)]
pub struct PredictionService {
    source: Arc<dyn ArtifactSource>,
    state: Arc<RwLock<PipelineState>>,
}

impl PredictionService {
    pub fn new(source: Arc<dyn ArtifactSource>) -> Self {
        Self {
            source,
            state: Arc::new(RwLock::new(PipelineState::Uninitialized)),
        }
    }

    /// Loads all six artifacts once. Later calls report the settled state
    /// without touching the disk again, so a failed load is never retried.
    pub async fn load_artifacts(&self) -> PipelineStatus {
        {
            let mut state = self.state.write().await;
            if !matches!(*state, PipelineState::Uninitialized) {
                return status_of(&state);
            }
            *state = PipelineState::Loading;
        }

        let source = self.source.clone();
        let loaded = tokio::task::spawn_blocking(move || source.load())
            .await
            .map_err(|e| format!("artifact loading task failed: {}", e))
            .and_then(|r| r.map_err(|e| e.to_string()));

        let next = match loaded {
            Ok(artifacts) => {
                for warning in artifacts.consistency_warnings() {
                    tracing::warn!("Artifact shape drift: {}", warning);
                }
                tracing::info!(
                    "Loaded prediction artifacts ({} locations, {} features)",
                    artifacts.location_encoder.width(),
                    artifacts.expected_feature_count()
                );
                PipelineState::Ready(Arc::new(artifacts))
            }
            Err(reason) => {
                tracing::error!("Error loading models: {}", reason);
                PipelineState::LoadFailed(reason)
            }
        };

        let status = status_of(&next);
        *self.state.write().await = next;
        status
    }

    pub async fn status(&self) -> PipelineStatus {
        status_of(&*self.state.read().await)
    }

    pub async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, PredictionError> {
        let artifacts = match &*self.state.read().await {
            PipelineState::Ready(artifacts) => artifacts.clone(),
            other => return Err(PredictionError::NotReady(status_of(other))),
        };

        prediction::predict(&artifacts, request).map_err(|e| {
            tracing::warn!(
                "Prediction failed for {} at {} {}: {}",
                request.location_name,
                request.date_label(),
                request.time_label(),
                e
            );
            PredictionError::from(e)
        })
    }
}

fn status_of(state: &PipelineState) -> PipelineStatus {
    match state {
        PipelineState::Uninitialized => PipelineStatus::Uninitialized,
        PipelineState::Loading => PipelineStatus::Loading,
        PipelineState::Ready(artifacts) => PipelineStatus::Ready {
            feature_count: artifacts.expected_feature_count(),
            locations: artifacts.location_encoder.categories().to_vec(),
        },
        PipelineState::LoadFailed(reason) => PipelineStatus::LoadFailed {
            reason: reason.clone(),
        },
    }
}
