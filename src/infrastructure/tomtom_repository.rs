// TomTom flow segment API client
use crate::application::flow_repository::FlowRepository;
use crate::domain::error::FetchError;
use crate::domain::flow::FlowSegment;
use crate::domain::geo::GeoPoint;
use crate::infrastructure::config::{prepare_url, TomTomSettings};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TomTomRepository {
    client: reqwest::Client,
    url_template: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct FlowSegmentResponse {
    #[serde(rename = "flowSegmentData", default)]
    flow_segment_data: FlowSegmentData,
}

/// Absent fields read as zero rather than failing the point.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FlowSegmentData {
    current_speed: f64,
    free_flow_speed: f64,
    current_travel_time: f64,
    free_flow_travel_time: f64,
    confidence: f64,
}

impl TomTomRepository {
    pub fn new(settings: &TomTomSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if settings.api_key.is_empty() {
            tracing::warn!("TomTom API key is empty; set TRAFFIC__TOMTOM__API_KEY");
        }

        Ok(Self {
            client,
            url_template: settings.flow_url_template.clone(),
            api_key: settings.api_key.clone(),
        })
    }

    fn build_flow_url(&self, point: &GeoPoint) -> String {
        let mut vars = HashMap::new();
        vars.insert("key".to_string(), urlencoding::encode(&self.api_key).into_owned());
        vars.insert("lat".to_string(), point.latitude.to_string());
        vars.insert("lon".to_string(), point.longitude.to_string());
        prepare_url(&self.url_template, &vars)
    }
}

pub(crate) fn parse_flow_body(body: &str) -> Result<FlowSegment, FetchError> {
    let response: FlowSegmentResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    let data = response.flow_segment_data;

    Ok(FlowSegment {
        current_speed: data.current_speed,
        free_flow_speed: data.free_flow_speed,
        current_travel_time: data.current_travel_time,
        free_flow_travel_time: data.free_flow_travel_time,
        confidence: data.confidence,
    })
}

#[async_trait]
impl FlowRepository for TomTomRepository {
    async fn fetch_flow(&self, point: &GeoPoint) -> Result<FlowSegment, FetchError> {
        let url = self.build_flow_url(point);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.without_url().to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.without_url().to_string()))?;

        tracing::debug!("Flow segment for {}: {} bytes", point.name, body.len());
        parse_flow_body(&body)
    }
}
