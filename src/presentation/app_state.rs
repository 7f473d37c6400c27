// Application state for HTTP handlers
use crate::application::analytics_service::AnalyticsService;
use crate::application::live_traffic_service::LiveTrafficService;
use crate::application::prediction_service::PredictionService;

#[derive(Clone)]
pub struct AppState {
    pub live_service: LiveTrafficService,
    pub prediction_service: PredictionService,
    pub analytics_service: AnalyticsService,
}
