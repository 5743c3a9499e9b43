//! Training pipeline driver.
//!
//! Ensures the framework checkout exists, writes the dataset descriptor, trains
//! every configured experiment in order and evaluates the configured target.
//! The first failing step aborts the run; later steps are recorded as skipped.

use crate::config::BenchConfig;
use crate::dataset::DatasetDescriptor;
use crate::error::BenchError;
use crate::experiment::{ExperimentSpec, ExperimentStatus, PipelineReport, best_weights};
use crate::runtime::{StepCommand, StepExecutor};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File name of the run summary written under `<framework>/runs/`.
pub const PIPELINE_REPORT_FILE: &str = "detbench_pipeline.json";

/// Written into the checkout once its requirements installed cleanly.
pub const INSTALL_MARKER: &str = ".detbench_installed";

/// Stage of the pipeline a planned command belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    Clone,
    Install,
    Train(ExperimentSpec),
    Evaluate(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub kind: StepKind,
    pub command: StepCommand,
}

/// A run that stopped early, with the report of what happened up to that point.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct PipelineFailure {
    pub report: Box<PipelineReport>,
    #[source]
    pub source: BenchError,
}

pub struct Pipeline {
    config: BenchConfig,
    workspace: PathBuf,
}

impl Pipeline {
    pub fn new(config: BenchConfig, workspace: PathBuf) -> Result<Self, BenchError> {
        config.validate()?;
        Ok(Self { config, workspace })
    }

    pub fn framework_dir(&self) -> PathBuf {
        self.workspace.join(&self.config.framework.dir)
    }

    pub fn descriptor_path(&self) -> Result<PathBuf, BenchError> {
        Ok(std::path::absolute(
            self.workspace.join(&self.config.dataset.descriptor),
        )?)
    }

    pub fn framework_cloned(&self) -> bool {
        self.framework_dir().exists()
    }

    /// The checkout exists and its requirements installed successfully.
    pub fn framework_installed(&self) -> bool {
        self.install_marker().is_file()
    }

    fn install_marker(&self) -> PathBuf {
        self.framework_dir().join(INSTALL_MARKER)
    }

    pub fn report_path(&self) -> PathBuf {
        self.framework_dir().join("runs").join(PIPELINE_REPORT_FILE)
    }

    fn clone_step(&self) -> PlannedStep {
        let fw = &self.config.framework;
        let dir = self.framework_dir();
        // Clone into the configured directory name rather than the repo's default.
        let target = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "yolov5".to_string());
        let parent = dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.workspace.clone());
        PlannedStep {
            kind: StepKind::Clone,
            command: StepCommand::new("clone framework", &fw.git, parent)
                .args(["clone", fw.repo_url.as_str(), target.as_str()]),
        }
    }

    fn install_step(&self) -> PlannedStep {
        PlannedStep {
            kind: StepKind::Install,
            command: StepCommand::new(
                "install requirements",
                &self.config.framework.pip,
                self.framework_dir(),
            )
            .args(["install", "-r", "requirements.txt"]),
        }
    }

    fn train_step(&self, spec: &ExperimentSpec, descriptor: &Path) -> PlannedStep {
        let training = &self.config.training;
        PlannedStep {
            kind: StepKind::Train(spec.clone()),
            command: StepCommand::new(
                format!("train {}", spec.name),
                &self.config.framework.python,
                self.framework_dir(),
            )
            .arg("train.py")
            .args(["--img".to_string(), training.image_size.to_string()])
            .args(["--batch".to_string(), training.batch_size.to_string()])
            .args(["--epochs".to_string(), spec.epochs.to_string()])
            .args(["--data".to_string(), descriptor.display().to_string()])
            .args(["--weights", training.weights.as_str()])
            .args(["--name", spec.name.as_str()]),
        }
    }

    fn evaluate_step(&self, descriptor: &Path) -> PlannedStep {
        let training = &self.config.training;
        let weights = best_weights(&self.framework_dir(), &training.evaluate);
        PlannedStep {
            kind: StepKind::Evaluate(training.evaluate.clone()),
            command: StepCommand::new(
                format!("evaluate {}", training.evaluate),
                &self.config.framework.python,
                self.framework_dir(),
            )
            .arg("val.py")
            .args(["--data".to_string(), descriptor.display().to_string()])
            .args(["--weights".to_string(), weights.display().to_string()])
            .args(["--task", training.eval_task.as_str()]),
        }
    }

    /// The ordered subprocess steps a run would execute right now.
    ///
    /// Clone is planned when the checkout is missing, install until it has succeeded once.
    pub fn plan(&self) -> Result<Vec<PlannedStep>, BenchError> {
        let descriptor = self.descriptor_path()?;
        let mut steps = Vec::new();
        if !self.framework_cloned() {
            steps.push(self.clone_step());
        }
        if !self.framework_installed() {
            steps.push(self.install_step());
        }
        for spec in &self.config.training.experiments {
            steps.push(self.train_step(spec, &descriptor));
        }
        steps.push(self.evaluate_step(&descriptor));
        Ok(steps)
    }

    /// Execute the pipeline, persisting a [`PipelineReport`] whatever the outcome.
    ///
    /// On failure the report is returned with the error, so callers never need
    /// the file on disk.
    pub async fn run(&self, executor: &dyn StepExecutor) -> Result<PipelineReport, PipelineFailure> {
        info!("Initializing pipeline");
        let framework_dir = self.framework_dir();
        let mut report = PipelineReport::new(&self.config.training.experiments, &framework_dir);

        let outcome = self.run_steps(executor, &mut report).await;
        if let Err(e) = &outcome {
            report.skip_pending();
            report.error = Some(e.to_string());
        }
        report.finished_at = Some(Utc::now());

        // Without a checkout there is nowhere sensible to leave the report.
        if framework_dir.exists() {
            if let Err(e) = report.save(&self.report_path()) {
                warn!(error = %e, "Failed to write pipeline report");
            }
        }

        match outcome {
            Ok(()) => Ok(report),
            Err(source) => Err(PipelineFailure {
                report: Box::new(report),
                source,
            }),
        }
    }

    async fn run_steps(
        &self,
        executor: &dyn StepExecutor,
        report: &mut PipelineReport,
    ) -> Result<(), BenchError> {
        self.ensure_framework(executor).await?;
        report.framework_installed = true;

        let descriptor_path = self.descriptor_path()?;
        DatasetDescriptor::from_config(&self.config.dataset, &self.workspace)?
            .write(&descriptor_path)?;
        report.descriptor = Some(descriptor_path.clone());

        for idx in 0..report.experiments.len() {
            let spec = report.experiments[idx].spec.clone();
            info!(epochs = spec.epochs, name = %spec.name, "Starting training");
            let step = self.train_step(&spec, &descriptor_path);
            report.experiments[idx].start();
            let result = executor.execute(&step.command).await;
            report.experiments[idx].finish(&result);
            result?;
        }

        let step = self.evaluate_step(&descriptor_path);
        info!(model = %self.config.training.evaluate, "Evaluating model on test set");
        report.evaluated = Some(self.config.training.evaluate.clone());
        report.evaluation_status = ExperimentStatus::Running;
        match executor.execute(&step.command).await {
            Ok(()) => report.evaluation_status = ExperimentStatus::Completed,
            Err(e) => {
                report.evaluation_status = ExperimentStatus::Failed;
                return Err(e);
            }
        }

        info!("Pipeline finished");
        Ok(())
    }

    async fn ensure_framework(&self, executor: &dyn StepExecutor) -> Result<(), BenchError> {
        let dir = self.framework_dir();
        if self.framework_installed() {
            info!(path = %dir.display(), "Framework already installed");
            return Ok(());
        }
        if dir.exists() {
            info!(path = %dir.display(), "Framework checkout present, requirements not installed");
        } else {
            info!(url = %self.config.framework.repo_url, "Cloning framework repository");
            let clone = self.clone_step();
            std::fs::create_dir_all(&clone.command.cwd)?;
            executor.execute(&clone.command).await?;
            if !dir.exists() {
                return Err(BenchError::framework(format!(
                    "clone finished but {} does not exist",
                    dir.display()
                )));
            }
        }
        executor.execute(&self.install_step().command).await?;
        std::fs::write(self.install_marker(), Utc::now().to_rfc3339())?;
        Ok(())
    }
}
