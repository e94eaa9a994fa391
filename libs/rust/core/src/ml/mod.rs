//! Numeric building blocks for the training pipeline.
pub mod forest;
pub mod matrix;
pub mod metrics;
pub mod preprocess;
pub mod split;
pub mod stats;

pub use forest::{RandomForestRegressor, Regressor};
pub use matrix::Matrix;
pub use preprocess::FeatureTransformer;
