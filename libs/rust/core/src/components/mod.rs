//! Training stages. Each stage reads the previous stage's artifact from disk
//! and writes its own outputs under the run's [`RunLayout`](crate::layout::RunLayout).
pub mod evaluation;
pub mod ingestion;
pub mod pusher;
pub mod trainer;
pub mod transformation;
pub mod validation;

pub use evaluation::ModelEvaluation;
pub use ingestion::DataIngestion;
pub use pusher::ModelPusher;
pub use trainer::ModelTrainer;
pub use transformation::{add_rul_column, prepare_frame, DataTransformation};
pub use validation::{DataValidation, ValidationReport};
