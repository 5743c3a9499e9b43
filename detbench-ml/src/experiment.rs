//! Training experiment tracking.

use crate::error::BenchError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One entry of the training sweep: how long to train and what to call the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentSpec {
    pub epochs: u32,
    pub name: String,
}

impl ExperimentSpec {
    pub fn new(epochs: u32, name: &str) -> Result<Self, BenchError> {
        if epochs == 0 {
            return Err(BenchError::invalid_input("epochs must be positive"));
        }
        if name.trim().is_empty() {
            return Err(BenchError::invalid_input("experiment name must not be empty"));
        }
        Ok(Self {
            epochs,
            name: name.to_string(),
        })
    }

    /// Directory the framework writes this run's metrics and weights to.
    pub fn train_dir(&self, framework_dir: &Path) -> PathBuf {
        train_dir(framework_dir, &self.name)
    }

    pub fn best_weights(&self, framework_dir: &Path) -> PathBuf {
        best_weights(framework_dir, &self.name)
    }
}

pub fn train_dir(framework_dir: &Path, name: &str) -> PathBuf {
    framework_dir.join("runs").join("train").join(name)
}

pub fn best_weights(framework_dir: &Path, name: &str) -> PathBuf {
    train_dir(framework_dir, name).join("weights").join("best.pt")
}

/// Experiment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentStatus {
    Pending,
    Running,
    Completed,
    Failed,
    /// Never started because an earlier step failed.
    Skipped,
}

/// Outcome of one experiment within a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentRecord {
    pub spec: ExperimentSpec,
    pub status: ExperimentStatus,
    pub train_dir: PathBuf,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl ExperimentRecord {
    pub fn new(spec: ExperimentSpec, framework_dir: &Path) -> Self {
        let train_dir = spec.train_dir(framework_dir);
        Self {
            spec,
            status: ExperimentStatus::Pending,
            train_dir,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    pub fn start(&mut self) {
        self.status = ExperimentStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn finish(&mut self, result: &Result<(), BenchError>) {
        self.finished_at = Some(Utc::now());
        match result {
            Ok(()) => self.status = ExperimentStatus::Completed,
            Err(e) => {
                self.status = ExperimentStatus::Failed;
                self.error = Some(e.to_string());
            }
        }
    }
}

/// Summary of a whole pipeline run, persisted as JSON next to the framework's runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub framework_installed: bool,
    pub descriptor: Option<PathBuf>,
    pub experiments: Vec<ExperimentRecord>,
    pub evaluated: Option<String>,
    pub evaluation_status: ExperimentStatus,
    /// The error that stopped the run, if any.
    #[serde(default)]
    pub error: Option<String>,
}

impl PipelineReport {
    pub fn new(specs: &[ExperimentSpec], framework_dir: &Path) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            framework_installed: false,
            descriptor: None,
            experiments: specs
                .iter()
                .cloned()
                .map(|s| ExperimentRecord::new(s, framework_dir))
                .collect(),
            evaluated: None,
            evaluation_status: ExperimentStatus::Pending,
            error: None,
        }
    }

    pub fn find(&self, name: &str) -> Option<&ExperimentRecord> {
        self.experiments.iter().find(|e| e.spec.name == name)
    }

    pub fn list_by_status(&self, status: ExperimentStatus) -> Vec<&ExperimentRecord> {
        self.experiments
            .iter()
            .filter(|e| e.status == status)
            .collect()
    }

    /// Mark every experiment that never started as skipped.
    pub fn skip_pending(&mut self) {
        for exp in &mut self.experiments {
            if exp.status == ExperimentStatus::Pending {
                exp.status = ExperimentStatus::Skipped;
            }
        }
        if self.evaluation_status == ExperimentStatus::Pending {
            self.evaluation_status = ExperimentStatus::Skipped;
        }
    }

    pub fn is_success(&self) -> bool {
        self.evaluation_status == ExperimentStatus::Completed
            && self
                .experiments
                .iter()
                .all(|e| e.status == ExperimentStatus::Completed)
    }

    pub fn load(path: &Path) -> Result<Self, BenchError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), BenchError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &content)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_rejects_zero_epochs() {
        assert!(ExperimentSpec::new(0, "exp").is_err());
        assert!(ExperimentSpec::new(10, "  ").is_err());
        assert!(ExperimentSpec::new(10, "exp").is_ok());
    }

    #[test]
    fn test_weights_path_layout() {
        let spec = ExperimentSpec::new(30, "experiment_30_epochs").unwrap();
        let weights = spec.best_weights(Path::new("/ws/yolov5"));
        assert_eq!(
            weights,
            PathBuf::from("/ws/yolov5/runs/train/experiment_30_epochs/weights/best.pt")
        );
    }

    #[test]
    fn test_record_lifecycle() {
        let spec = ExperimentSpec::new(5, "short").unwrap();
        let mut rec = ExperimentRecord::new(spec, Path::new("yolov5"));
        assert_eq!(rec.status, ExperimentStatus::Pending);
        rec.start();
        assert_eq!(rec.status, ExperimentStatus::Running);
        rec.finish(&Err(BenchError::framework("boom")));
        assert_eq!(rec.status, ExperimentStatus::Failed);
        assert!(rec.error.as_deref().unwrap().contains("boom"));
        assert!(rec.finished_at.is_some());
    }

    #[test]
    fn test_report_save_and_skip() {
        let dir = tempfile::tempdir().unwrap();
        let specs = vec![
            ExperimentSpec::new(1, "a").unwrap(),
            ExperimentSpec::new(2, "b").unwrap(),
        ];
        let mut report = PipelineReport::new(&specs, dir.path());
        report.experiments[0].finish(&Ok(()));
        report.skip_pending();
        assert_eq!(report.list_by_status(ExperimentStatus::Skipped).len(), 1);
        assert_eq!(report.evaluation_status, ExperimentStatus::Skipped);
        assert!(!report.is_success());

        let path = dir.path().join("runs").join("pipeline.json");
        report.save(&path).unwrap();
        let loaded = PipelineReport::load(&path).unwrap();
        assert_eq!(
            loaded.find("b").map(|e| e.status),
            Some(ExperimentStatus::Skipped)
        );
    }
}
