// Domain layer - Pure types and transformations
pub mod analytics;
pub mod encoding;
pub mod error;
pub mod flow;
pub mod geo;
pub mod model;
pub mod prediction;
