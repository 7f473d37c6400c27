// Infrastructure layer - External dependencies and adapters
pub mod artifact_store;
pub mod config;
pub mod reference_dataset;
pub mod tomtom_repository;
