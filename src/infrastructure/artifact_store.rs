// Loads the six exported model/encoder artifacts from a directory
use crate::application::flow_repository::ArtifactSource;
use crate::domain::error::{ArtifactLoadError, ArtifactLoadErrorKind};
use crate::domain::prediction::{ArtifactKind, Artifacts};
use crate::infrastructure::config::ArtifactSettings;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    settings: ArtifactSettings,
}

impl FileArtifactStore {
    pub fn new(settings: ArtifactSettings) -> Self {
        Self { settings }
    }

    pub fn path_of(&self, kind: ArtifactKind) -> PathBuf {
        let file = match kind {
            ArtifactKind::TrafficModel => &self.settings.traffic_model,
            ArtifactKind::VehicleModel => &self.settings.vehicle_model,
            ArtifactKind::LocationEncoder => &self.settings.location_encoder,
            ArtifactKind::DateEncoder => &self.settings.date_encoder,
            ArtifactKind::TimeEncoder => &self.settings.time_encoder,
            ArtifactKind::TrafficLabelDecoder => &self.settings.traffic_label_decoder,
        };
        self.settings.dir.join(file)
    }

    fn read<T: DeserializeOwned>(&self, kind: ArtifactKind) -> Result<T, ArtifactLoadError> {
        let path = self.path_of(kind);
        read_artifact(&path).map_err(|kind_err| ArtifactLoadError {
            artifact: kind,
            path,
            kind: kind_err,
        })
    }
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactLoadErrorKind> {
    let text = std::fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Err(ArtifactLoadErrorKind::Invalid("file is empty".to_string()));
    }
    let value = serde_json::from_str(&text)?;
    Ok(value)
}

impl ArtifactSource for FileArtifactStore {
    /// Stops at the first artifact that fails.
    fn load(&self) -> Result<Artifacts, ArtifactLoadError> {
        let artifacts = Artifacts {
            traffic_model: self.read(ArtifactKind::TrafficModel)?,
            vehicle_model: self.read(ArtifactKind::VehicleModel)?,
            location_encoder: self.read(ArtifactKind::LocationEncoder)?,
            date_encoder: self.read(ArtifactKind::DateEncoder)?,
            time_encoder: self.read(ArtifactKind::TimeEncoder)?,
            traffic_label_decoder: self.read(ArtifactKind::TrafficLabelDecoder)?,
            unseen_label_policy: self.settings.unseen_label_policy,
        };

        tracing::info!("Loaded artifacts from {}", self.settings.dir.display());
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::prediction::{PredictionRequest, TrafficLevel, predict};
    use chrono::{NaiveDate, NaiveTime};
    use std::fs;

    const FILES: [(ArtifactKind, &str); 6] = [
        (
            ArtifactKind::TrafficModel,
            r#"{"n_features": 4, "n_classes": 3, "trees": [[
                {"feature": 1, "threshold": 0.5, "left": 1, "right": 2},
                {"value": [0.0, 1.0, 0.0]},
                {"value": [1.0, 0.0, 0.0]}
            ]]}"#,
        ),
        (
            ArtifactKind::VehicleModel,
            r#"{"n_features": 4, "feature_names": [
                "location_name_Chennai, India", "location_name_Mumbai, India", "date", "time"
            ], "trees": [[{"value": [57.6]}]]}"#,
        ),
        (
            ArtifactKind::LocationEncoder,
            r#"{"feature": "location_name", "categories": ["Chennai, India", "Mumbai, India"]}"#,
        ),
        (ArtifactKind::DateEncoder, r#"{"classes": ["2024-03-15"]}"#),
        (ArtifactKind::TimeEncoder, r#"{"classes": ["09:00"]}"#),
        (ArtifactKind::TrafficLabelDecoder, r#"{"classes": ["High", "Low", "Medium"]}"#),
    ];

    fn write_all(dir: &Path, store: &FileArtifactStore) {
        for (kind, body) in FILES {
            fs::write(store.path_of(kind), body).unwrap();
        }
        assert!(dir.exists());
    }

    fn store_in(dir: &Path) -> FileArtifactStore {
        FileArtifactStore::new(ArtifactSettings {
            dir: dir.to_path_buf(),
            ..ArtifactSettings::default()
        })
    }

    #[test]
    fn test_loads_all_six_and_predicts() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        write_all(dir.path(), &store);

        let artifacts = store.load().unwrap();
        assert!(artifacts.consistency_warnings().is_empty());

        let result = predict(
            &artifacts,
            &PredictionRequest {
                location_name: "Mumbai, India".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
                time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            },
        )
        .unwrap();
        assert_eq!(result.traffic_level, TrafficLevel::High);
        assert_eq!(result.vehicle_count, 57);
    }

    #[test]
    fn test_missing_file_names_the_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        write_all(dir.path(), &store);
        fs::remove_file(store.path_of(ArtifactKind::TimeEncoder)).unwrap();

        let err = store.load().unwrap_err();
        assert_eq!(err.artifact, ArtifactKind::TimeEncoder);
        assert!(err.path.ends_with("time_encoder.json"));
        assert!(matches!(err.kind, ArtifactLoadErrorKind::Io(_)));
        assert!(err.to_string().contains("time label encoder"));
    }

    #[test]
    fn test_invalid_artifact_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        write_all(dir.path(), &store);
        fs::write(
            store.path_of(ArtifactKind::TrafficLabelDecoder),
            r#"{"classes": ["Low", "Low"]}"#,
        )
        .unwrap();

        let err = store.load().unwrap_err();
        assert_eq!(err.artifact, ArtifactKind::TrafficLabelDecoder);
        assert!(matches!(err.kind, ArtifactLoadErrorKind::Parse(_)));
    }

    #[test]
    fn test_empty_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        write_all(dir.path(), &store);
        fs::write(store.path_of(ArtifactKind::TrafficModel), "\n").unwrap();

        let err = store.load().unwrap_err();
        assert_eq!(err.artifact, ArtifactKind::TrafficModel);
        assert!(matches!(err.kind, ArtifactLoadErrorKind::Invalid(_)));
    }
}
