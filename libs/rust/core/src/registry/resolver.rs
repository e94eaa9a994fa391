use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::artifact::{load_object, save_object};
use super::{ArtifactKind, Version};
use crate::config::RegistryConfig;
use crate::error::{Result, RulError};
use crate::ml::{FeatureTransformer, RandomForestRegressor};

/// A promoted version together with the two artifacts stored under it.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub version: Version,
    pub transformer: FeatureTransformer,
    pub model: RandomForestRegressor,
}

/// Handle on the registry root. Versions are recomputed from the directory
/// listing on every call; nothing is cached.
#[derive(Debug, Clone)]
pub struct ModelResolver {
    root: PathBuf,
    transformer_dir: String,
    model_dir: String,
}

impl ModelResolver {
    pub fn new(cfg: &RegistryConfig) -> Result<Self> {
        fs::create_dir_all(&cfg.root).map_err(|e| RulError::io(&cfg.root, e))?;
        Ok(Self { root: cfg.root.clone(), transformer_dir: cfg.transformer_dir_name.clone(), model_dir: cfg.model_dir_name.clone() })
    }

    pub fn root(&self) -> &Path { &self.root }

    /// Every version directory, ascending. Plain files under the root are ignored.
    pub fn versions(&self) -> Result<Vec<Version>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(|e| RulError::io(&self.root, e))? {
            let entry = entry.map_err(|e| RulError::io(&self.root, e))?;
            if !entry.file_type().map_err(|e| RulError::io(entry.path(), e))?.is_dir() { continue; }
            let name = entry.file_name().to_string_lossy().into_owned();
            match parse_version(&name) {
                Ok(v) => out.push(v),
                Err(reason) => return Err(self.invalid_state(name, reason)),
            }
        }
        out.sort();
        Ok(out)
    }

    pub fn latest_version(&self) -> Result<Option<Version>> { Ok(self.versions()?.pop()) }

    pub fn next_version(&self) -> Result<Version> {
        match self.latest_version()? {
            None => Ok(Version(0)),
            Some(latest) => latest.next().ok_or_else(|| self.invalid_state(latest.to_string(), "is the largest representable version")),
        }
    }

    fn invalid_state(&self, name: String, reason: &'static str) -> RulError {
        RulError::InvalidRegistryState { root: self.root.clone(), name, reason }
    }

    pub fn path_for(&self, version: Version, kind: ArtifactKind) -> PathBuf {
        let dir = match kind { ArtifactKind::Transformer => &self.transformer_dir, ArtifactKind::Model => &self.model_dir };
        self.root.join(version.to_string()).join(dir).join(kind.file_name())
    }

    pub fn latest_path(&self, kind: ArtifactKind) -> Result<PathBuf> {
        let v = self.latest_version()?.ok_or_else(|| RulError::ArtifactNotFound(self.root.clone()))?;
        Ok(self.path_for(v, kind))
    }

    pub fn next_path(&self, kind: ArtifactKind) -> Result<PathBuf> { Ok(self.path_for(self.next_version()?, kind)) }

    pub fn latest_transformer_path(&self) -> Result<PathBuf> { self.latest_path(ArtifactKind::Transformer) }
    pub fn latest_model_path(&self) -> Result<PathBuf> { self.latest_path(ArtifactKind::Model) }

    /// Load both artifacts of the latest version, or `None` on an empty registry.
    pub fn load_latest(&self) -> Result<Option<RegistryEntry>> {
        let Some(version) = self.latest_version()? else { return Ok(None) };
        let transformer = load_object(self.path_for(version, ArtifactKind::Transformer))?;
        let model = load_object(self.path_for(version, ArtifactKind::Model))?;
        Ok(Some(RegistryEntry { version, transformer, model }))
    }

    /// Write the pair under a freshly allocated version and return it.
    ///
    /// The version directory is claimed with a single `create_dir`, so a
    /// concurrent writer that picked the same number fails here instead of
    /// overwriting.
    pub fn promote(&self, transformer: &FeatureTransformer, model: &RandomForestRegressor) -> Result<Version> {
        self.promote_as(self.next_version()?, transformer, model)
    }

    fn promote_as(&self, version: Version, transformer: &FeatureTransformer, model: &RandomForestRegressor) -> Result<Version> {
        let dir = self.root.join(version.to_string());
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                warn!(dir = %dir.display(), "version directory already present");
                return Err(self.invalid_state(version.to_string(), "already exists"));
            }
            Err(e) => return Err(RulError::io(&dir, e)),
        }
        save_object(self.path_for(version, ArtifactKind::Transformer), transformer)?;
        save_object(self.path_for(version, ArtifactKind::Model), model)?;
        info!(%version, root = %self.root.display(), "model promoted");
        Ok(version)
    }
}

fn parse_version(name: &str) -> std::result::Result<Version, &'static str> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) { return Err("is not a version number"); }
    name.parse().map(Version).map_err(|_| "exceeds the largest representable version")
}
