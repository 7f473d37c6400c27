// Live traffic service - Polls the flow API for every configured point
use crate::application::flow_repository::FlowRepository;
use crate::application::flow_store::FlowStore;
use crate::domain::error::FetchError;
use crate::domain::flow::{FlowSample, FlowSnapshot};
use crate::domain::geo::GeoPoint;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointFailure {
    pub location_name: String,
    pub error: String,
}

/// Result of one pass over the points. Samples keep the input point order.
#[derive(Debug, Default)]
pub struct FetchBatch {
    pub samples: Vec<FlowSample>,
    pub failures: Vec<PointFailure>,
}

/// What a refresh left behind. `snapshot` is `None` when nothing was fetched,
/// in which case the previous cache is untouched.
#[derive(Debug)]
pub struct RefreshOutcome {
    pub snapshot: Option<Arc<FlowSnapshot>>,
    pub failures: Vec<PointFailure>,
}

#[derive(Clone)]
pub struct LiveTrafficService {
    repository: Arc<dyn FlowRepository>,
    store: FlowStore,
    points: Vec<GeoPoint>,
    max_concurrency: usize,
}

impl LiveTrafficService {
    pub fn new(
        repository: Arc<dyn FlowRepository>,
        store: FlowStore,
        points: Vec<GeoPoint>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            repository,
            store,
            points,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Fetch every point; one failing point never stops the others.
    pub async fn fetch_all(&self, points: &[GeoPoint]) -> FetchBatch {
        let results: Vec<(GeoPoint, Result<_, FetchError>)> = stream::iter(points.to_vec())
            .map(|point| {
                let repo = self.repository.clone();
                async move {
                    let result = repo.fetch_flow(&point).await;
                    (point, result)
                }
            })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let mut batch = FetchBatch::default();
        for (point, result) in results {
            match result {
                Ok(segment) => batch.samples.push(FlowSample::from_segment(&point, segment)),
                Err(e) => {
                    tracing::warn!("Error fetching flow data for {}: {}", point.name, e);
                    batch.failures.push(PointFailure {
                        location_name: point.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        batch
    }

    /// Fetch the configured points and replace the cache if anything came back.
    pub async fn refresh(&self) -> RefreshOutcome {
        let start_time = Instant::now();
        let batch = self.fetch_all(&self.points).await;

        tracing::info!(
            "Fetched {} of {} points in {} ms ({} failed)",
            batch.samples.len(),
            self.points.len(),
            start_time.elapsed().as_millis(),
            batch.failures.len()
        );

        let snapshot = if batch.samples.is_empty() {
            tracing::warn!("No live data fetched; keeping previous cache");
            None
        } else {
            Some(self.store.replace(batch.samples).await)
        };

        RefreshOutcome {
            snapshot,
            failures: batch.failures,
        }
    }

    pub async fn latest(&self) -> Option<Arc<FlowSnapshot>> {
        self.store.latest().await
    }
}
