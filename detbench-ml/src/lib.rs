//! # detbench-ml: YOLOv5 experiment orchestration and results analysis
//!
//! Two independent workflows share this crate:
//!
//! 1. **Pipeline**: make sure the YOLOv5 checkout exists, write the dataset
//!    descriptor, train each configured experiment and evaluate one of them.
//!    All model work happens in the framework's own Python entry points; this
//!    crate only sequences the subprocesses and stops at the first failure.
//! 2. **Analysis**: read two runs' `results.csv`, draw per-metric comparison
//!    charts, tabulate final values, collect confusion matrices and render a
//!    markdown summary.

pub mod analysis;
pub mod config;
pub mod dataset;
pub mod error;
pub mod experiment;
pub mod pipeline;
pub mod runtime;

pub use analysis::{AnalysisRequest, AnalysisSummary, analyze};
pub use config::{BenchConfig, load_config};
pub use error::BenchError;
pub use experiment::{ExperimentSpec, ExperimentStatus, PipelineReport};
pub use pipeline::{Pipeline, PipelineFailure};
pub use runtime::{ProcessExecutor, StepCommand, StepExecutor};
