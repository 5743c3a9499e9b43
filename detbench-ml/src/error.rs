//! Error types for the detbench-ml crate.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for pipeline and analysis operations.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Framework error: {0}")]
    Framework(String),

    #[error("Step '{step}' failed ({status}): {command}")]
    StepFailed {
        step: String,
        command: String,
        status: String,
    },

    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Error loading results file {}: {message}", path.display())]
    ResultsLoad { path: PathBuf, message: String },

    #[error("Plot error: {0}")]
    Plot(String),

    #[error("Report error: {0}")]
    Report(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl BenchError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn framework(msg: impl Into<String>) -> Self {
        Self::Framework(msg.into())
    }

    pub fn plot(msg: impl Into<String>) -> Self {
        Self::Plot(msg.into())
    }

    pub fn report(msg: impl Into<String>) -> Self {
        Self::Report(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn results_load(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::ResultsLoad {
            path: path.into(),
            message: msg.into(),
        }
    }
}
