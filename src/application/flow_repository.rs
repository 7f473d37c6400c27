// Repository traits for external data the services consume
use crate::domain::analytics::HistoricalRecord;
use crate::domain::error::{ArtifactLoadError, DatasetError, FetchError};
use crate::domain::flow::FlowSegment;
use crate::domain::geo::GeoPoint;
use crate::domain::prediction::Artifacts;
use async_trait::async_trait;

#[async_trait]
pub trait FlowRepository: Send + Sync {
    /// Live readings for the flow segment nearest to the point
    async fn fetch_flow(&self, point: &GeoPoint) -> Result<FlowSegment, FetchError>;
}

/// Source of the six fitted artifacts. Loading is blocking I/O.
pub trait ArtifactSource: Send + Sync {
    fn load(&self) -> Result<Artifacts, ArtifactLoadError>;
}

/// Historical reference rows (location names, hourly trends)
pub trait ReferenceRepository: Send + Sync {
    fn load_records(&self) -> Result<Vec<HistoricalRecord>, DatasetError>;

    /// Only the `location_name` column; other columns are never parsed.
    fn load_location_names(&self) -> Result<Vec<String>, DatasetError>;
}
