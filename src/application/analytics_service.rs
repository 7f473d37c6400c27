// Analytics service - Reports over the cached live table and historical data
use crate::application::flow_repository::ReferenceRepository;
use crate::application::flow_store::FlowStore;
use crate::domain::analytics::{
    self, HistoricalRecord, HourlyStat, LiveKpis, LocationDelay,
};
use crate::domain::error::DatasetError;
use crate::domain::geo::FALLBACK_LOCATION_NAMES;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HourlySection {
    Stats(Vec<HourlyStat>),
    Error(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub kpis: LiveKpis,
    pub delays: Vec<LocationDelay>,
    pub hourly: HourlySection,
}

#[derive(Clone)]
pub struct AnalyticsService {
    store: FlowStore,
    reference: Arc<dyn ReferenceRepository>,
}

impl AnalyticsService {
    pub fn new(store: FlowStore, reference: Arc<dyn ReferenceRepository>) -> Self {
        Self { store, reference }
    }

    /// `None` until a live refresh has populated the cache.
    pub async fn report(&self) -> Option<AnalyticsReport> {
        let snapshot = self.store.latest().await?;

        let hourly = match self.load_records().await {
            Ok(records) => HourlySection::Stats(analytics::hourly_stats(&records)),
            Err(e) => {
                tracing::error!("Could not load historical analytics: {}", e);
                HourlySection::Error(e.to_string())
            }
        };

        Some(AnalyticsReport {
            kpis: analytics::live_kpis(&snapshot),
            delays: analytics::location_delays(&snapshot),
            hourly,
        })
    }

    /// Sorted unique locations from the reference dataset, or the fixed list.
    /// Only the location column is read, so bad timestamps or numeric cells
    /// elsewhere in the file do not matter here.
    pub async fn location_options(&self) -> Vec<String> {
        let reference = self.reference.clone();
        let names = tokio::task::spawn_blocking(move || reference.load_location_names())
            .await
            .map_err(|e| DatasetError::Task(e.to_string()))
            .and_then(|r| r);

        match names {
            Ok(names) if !names.is_empty() => names
                .into_iter()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            Ok(_) => fallback_locations(),
            Err(e) => {
                tracing::warn!("Using fallback location list: {}", e);
                fallback_locations()
            }
        }
    }

    async fn load_records(&self) -> Result<Vec<HistoricalRecord>, DatasetError> {
        let reference = self.reference.clone();
        tokio::task::spawn_blocking(move || reference.load_records())
            .await
            .map_err(|e| DatasetError::Task(e.to_string()))?
    }
}

fn fallback_locations() -> Vec<String> {
    FALLBACK_LOCATION_NAMES.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::flow::{FlowSample, FlowSegment};
    use crate::domain::geo::GeoPoint;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    struct MemoryReference(Option<Vec<HistoricalRecord>>);

    fn missing_file() -> DatasetError {
        DatasetError::Io {
            path: PathBuf::from("vehicle_data.csv"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        }
    }

    impl ReferenceRepository for MemoryReference {
        fn load_records(&self) -> Result<Vec<HistoricalRecord>, DatasetError> {
            self.0.clone().ok_or_else(missing_file)
        }

        fn load_location_names(&self) -> Result<Vec<String>, DatasetError> {
            let records = self.0.as_ref().ok_or_else(missing_file)?;
            Ok(records.iter().map(|r| r.location_name.clone()).collect())
        }
    }

    /// Location column is readable but every full row fails on its timestamp.
    struct BadTimestamps;

    impl ReferenceRepository for BadTimestamps {
        fn load_records(&self) -> Result<Vec<HistoricalRecord>, DatasetError> {
            Err(DatasetError::Timestamp {
                row: 2,
                value: "bad".to_string(),
            })
        }

        fn load_location_names(&self) -> Result<Vec<String>, DatasetError> {
            Ok(vec!["Pune, India".to_string(), "Agra, India".to_string()])
        }
    }

    fn record(location: &str, hour: u32) -> HistoricalRecord {
        HistoricalRecord {
            location_name: location.to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            current_speed: Some(30.0),
            current_travel_time: Some(90.0),
            free_flow_travel_time: Some(60.0),
        }
    }

    async fn populated_store() -> FlowStore {
        let store = FlowStore::new();
        let segment = FlowSegment {
            current_speed: 12.0,
            free_flow_speed: 40.0,
            current_travel_time: 200.0,
            free_flow_travel_time: 100.0,
            confidence: 0.9,
        };
        store
            .replace(vec![FlowSample::from_segment(
                &GeoPoint::new("Lucknow", 26.8467, 80.9462),
                segment,
            )])
            .await;
        store
    }

    #[tokio::test]
    async fn test_no_report_without_live_data() {
        let service = AnalyticsService::new(FlowStore::new(), Arc::new(MemoryReference(Some(vec![]))));
        assert!(service.report().await.is_none());
    }

    #[tokio::test]
    async fn test_report_combines_live_and_history() {
        let reference = MemoryReference(Some(vec![record("Bhopal, India", 9), record("Bhopal, India", 9)]));
        let service = AnalyticsService::new(populated_store().await, Arc::new(reference));

        let report = service.report().await.unwrap();
        assert_eq!(report.kpis.high_congestion_count, 1);
        assert_eq!(report.delays[0].delay_seconds, 100.0);
        match report.hourly {
            HourlySection::Stats(stats) => {
                assert_eq!(stats.len(), 1);
                assert_eq!(stats[0].avg_delay, Some(30.0));
            }
            HourlySection::Error(e) => panic!("unexpected error {}", e),
        }
    }

    #[tokio::test]
    async fn test_history_failure_is_isolated() {
        let service = AnalyticsService::new(populated_store().await, Arc::new(MemoryReference(None)));
        let report = service.report().await.unwrap();
        assert_eq!(report.kpis.sample_count, 1);
        assert!(matches!(report.hourly, HourlySection::Error(_)));
    }

    #[tokio::test]
    async fn test_location_options() {
        let reference = MemoryReference(Some(vec![
            record("Mumbai, India", 1),
            record("Chennai, India", 2),
            record("Mumbai, India", 3),
        ]));
        let service = AnalyticsService::new(FlowStore::new(), Arc::new(reference));
        assert_eq!(service.location_options().await, vec!["Chennai, India", "Mumbai, India"]);

        let service = AnalyticsService::new(FlowStore::new(), Arc::new(MemoryReference(None)));
        assert_eq!(service.location_options().await.len(), 10);
    }

    #[tokio::test]
    async fn test_bad_timestamp_only_fails_hourly_section() {
        let service = AnalyticsService::new(populated_store().await, Arc::new(BadTimestamps));

        assert_eq!(
            service.location_options().await,
            vec!["Agra, India", "Pune, India"]
        );
        let report = service.report().await.unwrap();
        assert_eq!(report.delays.len(), 1);
        assert!(matches!(report.hourly, HourlySection::Error(_)));
    }

    #[tokio::test]
    async fn test_location_options_from_csv_with_bad_row() {
        use crate::infrastructure::reference_dataset::CsvReferenceRepository;
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"location_name,timestamp,currentSpeed,currentTravelTime,freeFlowTravelTime\n\
              \"Mumbai, India\",03-04-2024 08:30,22,310,170\n\
              \"Pune, India\",bad,,,\n",
        )
        .unwrap();

        let reference = CsvReferenceRepository::new(file.path().to_path_buf());
        let service = AnalyticsService::new(FlowStore::new(), Arc::new(reference));
        assert_eq!(
            service.location_options().await,
            vec!["Mumbai, India", "Pune, India"]
        );
    }
}
