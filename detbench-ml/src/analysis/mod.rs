//! Training results analysis: charts, the comparison table, copied artifacts and the report.

pub mod artifacts;
pub mod metrics;
pub mod plot;
pub mod report;
pub mod results;
pub mod table;

pub use artifacts::copy_confusion_matrices;
pub use metrics::{TRACKED_METRICS, TrackedMetric};
pub use plot::{PlotOptions, create_comparison_plots};
pub use report::generate_analysis_report;
pub use results::{MetricsTable, load_run_results};
pub use table::{Change, ComparisonRow, ComparisonTable, Direction};

use crate::error::BenchError;
use std::path::PathBuf;
use tracing::info;

/// Inputs for comparing two trained models.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub first_train: PathBuf,
    pub second_train: PathBuf,
    pub first_val: PathBuf,
    pub second_val: PathBuf,
    pub save_dir: PathBuf,
    pub first_name: String,
    pub second_name: String,
    pub plot: PlotOptions,
}

/// What an analysis run produced.
#[derive(Debug, Clone)]
pub struct AnalysisSummary {
    pub plots: Vec<PathBuf>,
    pub table: ComparisonTable,
    pub confusion_matrices: Vec<PathBuf>,
    pub report: PathBuf,
}

/// Load both runs' results and produce every analysis artifact.
///
/// Fails before writing anything if either results file cannot be loaded.
pub fn analyze(req: &AnalysisRequest) -> Result<AnalysisSummary, BenchError> {
    let first = load_run_results(&req.first_train)?;
    let second = load_run_results(&req.second_train)?;
    info!(
        first_epochs = first.len(),
        second_epochs = second.len(),
        "Loaded training results"
    );

    std::fs::create_dir_all(&req.save_dir)?;

    let plots = create_comparison_plots(
        &first,
        &second,
        &req.first_name,
        &req.second_name,
        &req.save_dir,
        &req.plot,
    )?;

    let table = ComparisonTable::build(&first, &second, &req.first_name, &req.second_name);

    let confusion_matrices = copy_confusion_matrices(
        &req.first_val,
        &req.second_val,
        &req.first_name,
        &req.second_name,
        &req.save_dir,
    )?;

    let report = generate_analysis_report(&req.first_name, &req.second_name, &table, &req.save_dir)?;

    Ok(AnalysisSummary {
        plots,
        table,
        confusion_matrices,
        report,
    })
}
