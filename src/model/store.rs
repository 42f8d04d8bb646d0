//! Access to the model artifact, either re-read per request or held in memory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use strum::{Display, EnumString};
use tracing::{error, info};

use super::ModelArtifact;
use crate::error::ModelError;

/// How the artifact is obtained for each request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ModelMode {
    /// Read the file on every request; replacing it on disk takes effect immediately.
    #[default]
    Reload,
    /// Read once at startup and share the parsed model.
    Preload,
}

#[derive(Debug, Clone)]
enum Source {
    Reload,
    Preloaded(Option<Arc<ModelArtifact>>),
}

/// Hands out the classifier to request handlers.
#[derive(Debug, Clone)]
pub struct ModelStore {
    path: PathBuf,
    source: Source,
}

impl ModelStore {
    /// Create a store for `path`. In [`ModelMode::Preload`] the artifact is read now;
    /// a failed read is logged and every later request reports the model unavailable.
    pub async fn open(path: impl Into<PathBuf>, mode: ModelMode) -> Self {
        let path = path.into();
        match mode {
            ModelMode::Reload => Self::reloading(path),
            ModelMode::Preload => match ModelArtifact::load(&path).await {
                Ok(artifact) => {
                    info!(path = %path.display(), "model preloaded");
                    Self::preloaded(path, artifact)
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "failed to preload model");
                    Self {
                        path,
                        source: Source::Preloaded(None),
                    }
                }
            },
        }
    }

    /// Store that re-reads `path` for every request.
    pub fn reloading(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            source: Source::Reload,
        }
    }

    /// Store serving an already loaded artifact.
    pub fn preloaded(path: impl Into<PathBuf>, artifact: ModelArtifact) -> Self {
        Self {
            path: path.into(),
            source: Source::Preloaded(Some(Arc::new(artifact))),
        }
    }

    /// Artifact location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mode this store runs in.
    pub fn mode(&self) -> ModelMode {
        match self.source {
            Source::Reload => ModelMode::Reload,
            Source::Preloaded(_) => ModelMode::Preload,
        }
    }

    /// Obtain the classifier for one request.
    pub async fn get(&self) -> Result<Arc<ModelArtifact>, ModelError> {
        match &self.source {
            Source::Reload => ModelArtifact::load(&self.path).await.map(Arc::new),
            Source::Preloaded(Some(artifact)) => Ok(Arc::clone(artifact)),
            Source::Preloaded(None) => Err(ModelError::NotLoaded {
                path: self.path.clone(),
            }),
        }
    }
}
