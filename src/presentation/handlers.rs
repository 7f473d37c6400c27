// HTTP request handlers
use crate::application::live_traffic_service::PointFailure;
use crate::application::prediction_service::PredictionError;
use crate::domain::flow::{FlowSample, FlowSnapshot, columns};
use crate::domain::prediction::{PredictionRequest, PredictionResult};
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::State,
    extract::rejection::JsonRejection,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unavailable(String),
    Unprocessable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m),
            ApiError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<PredictionError> for ApiError {
    fn from(e: PredictionError) -> Self {
        match e {
            PredictionError::NotReady(_) => ApiError::Unavailable(e.to_string()),
            PredictionError::Inference(_) => ApiError::Unprocessable(e.to_string()),
        }
    }
}

const NO_LIVE_DATA: &str = "No live data available. Refresh the live data first.";

#[derive(Deserialize)]
pub struct PredictBody {
    pub location_name: String,
    pub date: String,
    pub time: String,
}

impl PredictBody {
    fn into_request(self) -> Result<PredictionRequest, ApiError> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
            .map_err(|_| ApiError::BadRequest(format!("date '{}' is not YYYY-MM-DD", self.date)))?;
        let time = NaiveTime::parse_from_str(self.time.trim(), "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(self.time.trim(), "%H:%M:%S"))
            .map_err(|_| ApiError::BadRequest(format!("time '{}' is not HH:MM", self.time)))?;

        Ok(PredictionRequest {
            location_name: self.location_name,
            date,
            time,
        })
    }
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub rows: Vec<FlowSample>,
    pub errors: Vec<PointFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Location choices for the prediction form
pub async fn list_locations(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let locations = state.analytics_service.location_options().await;
    Json(json!({ "locations": locations }))
}

/// Fetch all points now and replace the cached table
pub async fn refresh_live(State(state): State<Arc<AppState>>) -> Json<RefreshResponse> {
    let outcome = state.live_service.refresh().await;

    let response = match outcome.snapshot {
        Some(snapshot) => RefreshResponse {
            rows: snapshot.rows.clone(),
            errors: outcome.failures,
            warning: None,
        },
        None => RefreshResponse {
            rows: Vec::new(),
            errors: outcome.failures,
            warning: Some("No data fetched. Please check API connection.".to_string()),
        },
    };
    Json(response)
}

async fn latest_snapshot(state: &AppState) -> Result<Arc<FlowSnapshot>, ApiError> {
    state
        .live_service
        .latest()
        .await
        .ok_or_else(|| ApiError::NotFound(NO_LIVE_DATA.to_string()))
}

/// Latest cached live table
pub async fn live_table(State(state): State<Arc<AppState>>) -> Result<Json<FlowSnapshot>, ApiError> {
    let snapshot = latest_snapshot(&state).await?;
    Ok(Json(snapshot.as_ref().clone()))
}

/// Latest cached live table as CSV
pub async fn live_table_csv(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let snapshot = latest_snapshot(&state).await?;
    let body = snapshot_to_csv(&snapshot).map_err(ApiError::Internal)?;

    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], body).into_response())
}

pub(crate) fn snapshot_to_csv(snapshot: &FlowSnapshot) -> Result<String, String> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    wtr.write_record(columns::ALL).map_err(|e| e.to_string())?;
    for row in &snapshot.rows {
        wtr.serialize(row).map_err(|e| e.to_string())?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.to_string())?;
    String::from_utf8(bytes).map_err(|e| e.to_string())
}

/// KPIs, delays and hourly trends
pub async fn analytics(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .analytics_service
        .report()
        .await
        .ok_or_else(|| ApiError::NotFound(NO_LIVE_DATA.to_string()))?;
    Ok(Json(report))
}

/// Inference pipeline state
pub async fn prediction_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.prediction_service.status().await)
}

/// Predict traffic level and vehicle count
pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: Result<Json<PredictBody>, JsonRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request = body.into_request()?;

    let result = state.prediction_service.predict(&request).await?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::flow::FlowSegment;
    use crate::domain::geo::GeoPoint;

    #[test]
    fn test_predict_body_parsing() {
        let body = PredictBody {
            location_name: "Mumbai, India".to_string(),
            date: "2024-03-15".to_string(),
            time: "09:00".to_string(),
        };
        let request = body.into_request().ok().unwrap();
        assert_eq!(request.date_label(), "2024-03-15");
        assert_eq!(request.time_label(), "09:00");

        let with_seconds = PredictBody {
            location_name: "Mumbai, India".to_string(),
            date: "2024-03-15".to_string(),
            time: "17:45:30".to_string(),
        };
        assert_eq!(with_seconds.into_request().ok().unwrap().time_label(), "17:45");

        let bad = PredictBody {
            location_name: "Mumbai, India".to_string(),
            date: "15/03/2024".to_string(),
            time: "09:00".to_string(),
        };
        assert!(matches!(bad.into_request(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_csv_export_uses_stable_header() {
        let snapshot = FlowSnapshot::new(vec![FlowSample::from_segment(
            &GeoPoint::new("Chandigarh", 30.7333, 76.7794),
            FlowSegment {
                current_speed: 45.0,
                free_flow_speed: 50.0,
                current_travel_time: 100.0,
                free_flow_travel_time: 90.0,
                confidence: 0.88,
            },
        )]);

        let csv = snapshot_to_csv(&snapshot).unwrap();
        let mut lines = csv.lines();
        let header: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(header, columns::ALL.to_vec());
        assert_eq!(
            lines.next().unwrap(),
            "Chandigarh,\"30.7333, 76.7794\",45.0,50.0,100.0,90.0,Low,88%"
        );
    }
}
