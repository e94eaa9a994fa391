//! Versioned model registry.
//!
//! Layout on disk: `<root>/<version>/transformer/transformer.pkl` and
//! `<root>/<version>/model/model.pkl`, where `<version>` is a plain integer.
//! Promotion always writes a brand new `latest + 1` directory; populated
//! versions are never rewritten.
pub mod artifact;
pub mod gate;
pub mod resolver;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use artifact::{load_object, save_object};
pub use gate::{EvaluationResult, PromotionGate};
pub use resolver::{ModelResolver, RegistryEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(pub u64);

impl Version {
    /// `None` once `u64::MAX` is reached.
    pub fn next(self) -> Option<Version> { self.0.checked_add(1).map(Version) }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind { Transformer, Model }

impl ArtifactKind {
    pub fn file_name(self) -> &'static str {
        match self { ArtifactKind::Transformer => "transformer.pkl", ArtifactKind::Model => "model.pkl" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_stops_at_the_top() {
        assert_eq!(Version(4).next(), Some(Version(5)));
        assert_eq!(Version(u64::MAX).next(), None);
    }
}
