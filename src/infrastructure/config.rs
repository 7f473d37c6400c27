use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::domain::geo::GeoPoint;
use crate::domain::prediction::UnseenLabelPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct TrafficConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub tomtom: TomTomSettings,
    #[serde(default)]
    pub artifacts: ArtifactSettings,
    #[serde(default)]
    pub dataset: DatasetSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TomTomSettings {
    #[serde(default = "default_flow_url_template")]
    pub flow_url_template: String,
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_flow_url_template() -> String {
    "https://api.tomtom.com/traffic/services/4/flowSegmentData/absolute/10/json?key=${key}&point=${lat},${lon}"
        .to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_concurrency() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ArtifactSettings {
    pub dir: PathBuf,
    pub traffic_model: String,
    pub vehicle_model: String,
    pub location_encoder: String,
    pub date_encoder: String,
    pub time_encoder: String,
    pub traffic_label_decoder: String,
    pub unseen_label_policy: UnseenLabelPolicy,
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("artifacts"),
            traffic_model: "traffic_level_model.json".to_string(),
            vehicle_model: "vehicle_count_model.json".to_string(),
            location_encoder: "location_ohe.json".to_string(),
            date_encoder: "date_encoder.json".to_string(),
            time_encoder: "time_encoder.json".to_string(),
            traffic_label_decoder: "traffic_label_encoder.json".to_string(),
            unseen_label_policy: UnseenLabelPolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatasetSettings {
    pub path: PathBuf,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("vehicle_data.csv"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PointsConfig {
    #[serde(default)]
    pub points: Vec<GeoPoint>,
}

/// `config/traffic.toml`, overridden by `TRAFFIC__SECTION__KEY` variables
pub fn load_traffic_config() -> anyhow::Result<TrafficConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/traffic"))
        .add_source(config::Environment::with_prefix("TRAFFIC").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn load_points_config() -> anyhow::Result<PointsConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/points"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Replace template variables in a URL template
pub fn prepare_url(template: &str, vars: &HashMap<String, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("${{{}}}", key);
        result = result.replace(&placeholder, value);
    }
    result
}
