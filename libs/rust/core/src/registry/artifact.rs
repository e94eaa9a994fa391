use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, RulError};

/// Encode `value` with bincode and write it in one call, creating parent directories.
pub fn save_object<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| RulError::io(dir, e))?;
    }
    let bytes = bincode::serialize(value)?;
    fs::write(path, &bytes).map_err(|e| RulError::io(path, e))?;
    debug!(path = %path.display(), bytes = bytes.len(), "object saved");
    Ok(())
}

pub fn load_object<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    if !path.exists() { return Err(RulError::ArtifactNotFound(path.to_path_buf())); }
    let bytes = fs::read(path).map_err(|e| RulError::io(path, e))?;
    Ok(bincode::deserialize(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::ml::{FeatureTransformer, Matrix, RandomForestRegressor, Regressor};

    #[test]
    fn transformer_and_model_survive_disk() {
        let dir = tempfile::tempdir().unwrap();
        let frame = Frame::from_rows(vec!["s_2".into(), "RUL".into()], &[vec![1.0, 3.0], vec![2.0, 2.0], vec![3.0, 1.0], vec![4.0, 0.0]]).unwrap();
        let t = FeatureTransformer::fit(&frame, "RUL", 0.0).unwrap();
        let (x, y) = t.transform(&frame).unwrap().split_last_column().unwrap();
        let mut m = RandomForestRegressor::new(5).with_random_state(3);
        m.fit(&x, &y).unwrap();

        let tp = dir.path().join("0/transformer/transformer.pkl");
        let mp = dir.path().join("0/model/model.pkl");
        save_object(&tp, &t).unwrap();
        save_object(&mp, &m).unwrap();
        let t2: FeatureTransformer = load_object(&tp).unwrap();
        let m2: RandomForestRegressor = load_object(&mp).unwrap();
        assert_eq!(t2.feature_names(), t.feature_names());
        let sample = Matrix::from_rows(&[vec![0.25], vec![0.75]]).unwrap();
        assert_eq!(m2.predict(&sample).unwrap(), m.predict(&sample).unwrap());
    }

    #[test]
    fn missing_file_is_artifact_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let r: Result<FeatureTransformer> = load_object(dir.path().join("nope.pkl"));
        assert!(matches!(r, Err(RulError::ArtifactNotFound(_))));
    }
}
