//! Integration tests for the results analysis workflow.
//!
//! Builds two fake training/validation run directories in the layout YOLOv5
//! produces and checks every artifact `analyze` writes.

use detbench_ml::analysis::{AnalysisRequest, Direction, PlotOptions, analyze};
use detbench_ml::BenchError;
use pretty_assertions::assert_eq;
use std::path::Path;

// ── Fixtures ────────────────────────────────────────────────────────────

const HEADER: &str = "               epoch,      train/box_loss,      train/obj_loss,      train/cls_loss,   metrics/precision,      metrics/recall,     metrics/mAP_0.5,metrics/mAP_0.5:0.95";

fn write_results(dir: &Path, rows: &[[f64; 8]]) {
    std::fs::create_dir_all(dir).unwrap();
    let mut text = String::from(HEADER);
    text.push('\n');
    for row in rows {
        let cells: Vec<String> = row.iter().map(|v| format!("{v:>20}")).collect();
        text.push_str(&cells.join(","));
        text.push('\n');
    }
    std::fs::write(dir.join("results.csv"), text).unwrap();
}

fn write_matrix(dir: &Path) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join("confusion_matrix.png"), b"\x89PNG fake").unwrap();
}

struct Runs {
    _root: tempfile::TempDir,
    request: AnalysisRequest,
}

fn runs() -> Runs {
    let root = tempfile::tempdir().unwrap();
    let base = root.path();
    write_results(
        &base.join("train30"),
        &[
            [0.0, 0.110, 0.045, 0.020, 0.10, 0.20, 0.15, 0.05],
            [1.0, 0.080, 0.040, 0.015, 0.40, 0.45, 0.42, 0.20],
        ],
    );
    write_results(
        &base.join("train60"),
        &[
            [0.0, 0.108, 0.044, 0.021, 0.12, 0.22, 0.16, 0.06],
            [1.0, 0.070, 0.036, 0.012, 0.50, 0.55, 0.52, 0.28],
            [2.0, 0.060, 0.032, 0.010, 0.60, 0.63, 0.61, 0.33],
        ],
    );
    write_matrix(&base.join("val30"));
    write_matrix(&base.join("val60"));

    let request = AnalysisRequest {
        first_train: base.join("train30"),
        second_train: base.join("train60"),
        first_val: base.join("val30"),
        second_val: base.join("val60"),
        save_dir: base.join("results").join("analysis_output"),
        first_name: "30 Epochs".into(),
        second_name: "60 Epochs".into(),
        plot: PlotOptions {
            width: 400,
            height: 300,
            font_path: None,
        },
    };
    Runs {
        _root: root,
        request,
    }
}

// ── Tests ───────────────────────────────────────────────────────────────

#[test]
fn test_analyze_produces_every_artifact() {
    let runs = runs();
    let summary = analyze(&runs.request).unwrap();

    assert_eq!(summary.plots.len(), 7);
    for plot in &summary.plots {
        assert!(std::fs::metadata(plot).unwrap().len() > 0, "{}", plot.display());
    }

    assert_eq!(summary.confusion_matrices.len(), 2);
    assert!(
        runs.request
            .save_dir
            .join("confusion_matrix_60_Epochs.png")
            .exists()
    );

    assert_eq!(
        summary.report,
        runs.request.save_dir.parent().unwrap().join("analysis_summary.md")
    );
    let report = std::fs::read_to_string(&summary.report).unwrap();
    assert!(report.contains("30 Epochs"));
    assert!(report.contains("60 Epochs"));
    assert!(report.contains("![metrics mAP 0.5](analysis_output/metrics_mAP_0.5_comparison.png)"));
    assert!(report.contains("### 30 Epochs Confusion Matrix"));
}

#[test]
fn test_comparison_uses_final_epoch_values() {
    let runs = runs();
    let summary = analyze(&runs.request).unwrap();

    let box_loss = summary.table.row("train/box_loss").unwrap();
    assert_eq!(box_loss.first, 0.080);
    assert_eq!(box_loss.second, 0.060);
    assert_eq!(box_loss.change.direction, Direction::Decrease);
    assert_eq!(box_loss.change.to_string(), "25.00% decrease");

    let precision = summary.table.row("metrics/precision").unwrap();
    assert_eq!(precision.change.direction, Direction::Increase);
    assert_eq!(precision.change.to_string(), "50.00% increase");
    assert!(summary.table.rows.iter().all(|r| r.improved()));
}

#[test]
fn test_unreadable_results_fail_before_writing() {
    let runs = runs();
    std::fs::write(
        runs.request.second_train.join("results.csv"),
        "epoch,train/box_loss\n0,0.09,0.01\n",
    )
    .unwrap();

    let err = analyze(&runs.request).unwrap_err();
    assert!(matches!(err, BenchError::ResultsLoad { .. }));
    assert!(!runs.request.save_dir.exists());
}

#[test]
fn test_missing_columns_are_skipped() {
    let runs = runs();
    std::fs::write(
        runs.request.first_train.join("results.csv"),
        "epoch,train/box_loss\n0,0.09\n1,0.08\n",
    )
    .unwrap();

    let summary = analyze(&runs.request).unwrap();
    assert_eq!(summary.plots.len(), 1);
    assert_eq!(summary.table.rows.len(), 1);
    assert!(
        !runs
            .request
            .save_dir
            .join("metrics_recall_comparison.png")
            .exists()
    );
}

#[test]
fn test_text_columns_do_not_block_analysis() {
    let runs = runs();
    let path = runs.request.second_train.join("results.csv");
    let mut text = std::fs::read_to_string(&path).unwrap();
    text = text
        .lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                format!("{line},note")
            } else {
                format!("{line},run-{i}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    std::fs::write(&path, text).unwrap();

    let summary = analyze(&runs.request).unwrap();
    assert_eq!(summary.plots.len(), 7);
    assert_eq!(summary.table.rows.len(), 7);
}
