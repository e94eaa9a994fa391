pub mod batch;
pub mod training;

pub use batch::start_batch_prediction;
pub use training::{run_training, start_training_pipeline};
