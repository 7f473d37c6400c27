// Application layer - Use cases over the domain
pub mod analytics_service;
pub mod flow_repository;
pub mod flow_store;
pub mod live_traffic_service;
pub mod prediction_service;
