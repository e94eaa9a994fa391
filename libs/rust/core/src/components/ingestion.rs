use tracing::{info, instrument};

use crate::artifacts::DataIngestionArtifact;
use crate::config::IngestionConfig;
use crate::error::{Result, RulError};
use crate::layout::RunLayout;
use crate::ml::split::train_test_split;
use crate::store::Collection;

pub struct DataIngestion<'a> {
    cfg: &'a IngestionConfig,
    layout: &'a RunLayout,
}

impl<'a> DataIngestion<'a> {
    pub fn new(cfg: &'a IngestionConfig, layout: &'a RunLayout) -> Self { Self { cfg, layout } }

    /// Export the collection to the feature store CSV and split it into train/test files.
    #[instrument(skip_all, fields(collection = source.name()))]
    pub fn run(&self, source: &Collection) -> Result<DataIngestionArtifact> {
        let frame = source.to_frame()?;
        if frame.height() == 0 { return Err(RulError::invalid(format!("collection `{}` is empty", source.name()))); }
        let feature_store_file_path = self.layout.feature_store_file();
        frame.write_csv(&feature_store_file_path)?;
        let (train, test) = train_test_split(&frame, self.cfg.test_size, self.cfg.random_state)?;
        let (train_file_path, test_file_path) = (self.layout.train_file(), self.layout.test_file());
        train.write_csv(&train_file_path)?;
        test.write_csv(&test_file_path)?;
        info!(rows = frame.height(), cols = frame.width(), train = train.height(), test = test.height(), "data ingested");
        Ok(DataIngestionArtifact { feature_store_file_path, train_file_path, test_file_path })
    }
}
