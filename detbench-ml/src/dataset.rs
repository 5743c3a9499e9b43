//! Dataset descriptor consumed by the training framework (`data.yml`).

use crate::config::DatasetConfig;
use crate::error::BenchError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Split directories, class count and class names, in the framework's YAML schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    pub train: PathBuf,
    pub val: PathBuf,
    pub test: PathBuf,
    pub nc: usize,
    pub names: Vec<String>,
}

impl DatasetDescriptor {
    /// Build a descriptor with absolute split paths under `workspace`.
    ///
    /// The split directories are not required to exist yet.
    pub fn from_config(config: &DatasetConfig, workspace: &Path) -> Result<Self, BenchError> {
        if config.class_names.is_empty() {
            return Err(BenchError::invalid_input("dataset has no class names"));
        }
        let data_dir = std::path::absolute(workspace.join(&config.data_dir))?;
        Ok(Self {
            train: data_dir.join("train"),
            val: data_dir.join("val"),
            test: data_dir.join("test"),
            nc: config.class_count(),
            names: config.class_names.clone(),
        })
    }

    pub fn render(&self) -> Result<String, BenchError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Write the descriptor, replacing any previous file.
    pub fn write(&self, path: &Path) -> Result<(), BenchError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render()?)?;
        info!(path = %path.display(), classes = self.nc, "Wrote dataset descriptor");
        Ok(())
    }
}
