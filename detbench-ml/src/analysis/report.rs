//! Markdown analysis report.

use super::artifacts::confusion_matrix_name;
use super::metrics::{REPORT_METRICS, TrackedMetric};
use super::table::ComparisonTable;
use crate::error::BenchError;
use handlebars::Handlebars;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

pub const REPORT_FILE: &str = "analysis_summary.md";

const TEMPLATE: &str = r#"# YOLO Model Training Analysis: {{first}} vs {{second}}

## Executive Summary
This report compares two YOLO object detection models, **{{first}}** and **{{second}}**, trained on the same dataset with different training durations. It covers final performance metrics, learning curves and confusion matrices to help pick a training length for this task.

## Performance Metrics Comparison
Final-epoch values for both models. Changes are relative to {{first}}.

{{#if has_rows}}
{{table}}
{{else}}
_No tracked metrics were present in both results files._
{{/if}}

## Key Performance Visualizations

{{#each images}}
![{{alt}}]({{path}})

{{/each}}
## Confusion Matrices

{{#each matrices}}
### {{name}} Confusion Matrix
![{{name}} Confusion Matrix]({{path}})

{{/each}}
## Key Observations

1. **Detection Accuracy**: {{#if accuracy_improved}}{{second}} reaches higher mAP, precision and recall than {{first}}.{{else}}{{second}} does not improve on {{first}} across every accuracy metric; see the table above for the metrics that regressed.{{/if}}

2. **Loss Reduction**: {{#if losses_decreased}}Every tracked loss component (box, object and classification) is lower for {{second}}.{{else}}Not every tracked loss component is lower for {{second}}.{{/if}}

3. **Training Dynamics**: {{second}} improves on {{improved}} of {{compared}} compared metrics. The learning curves show whether the extra epochs still pay off or have flattened out.

4. **Overfitting Assessment**: Compare the validation curves against the training losses. Training loss that keeps falling while validation metrics stall is the usual sign of overfitting.

## Recommendations

1. **Model Selection**: {{#if second_preferred}}Prefer {{second}} for deployment.{{else}}Prefer {{first}} unless the metrics where {{second}} leads matter more for this task.{{/if}}

2. **Data Augmentation**: Broader augmentation should improve robustness further.

3. **Hyperparameter Tuning**: Revisit the learning-rate schedule, batch size and optimizer settings in light of the curves above.

4. **Extended Training**: Try longer runs to find the point of diminishing returns.

5. **Edge Case Evaluation**: Evaluate both models on difficult scenes and rare classes before rollout.

6. **Early Stopping**: Stop future runs on validation metrics rather than a fixed epoch count.

## Conclusion
{{#if second_preferred}}Training {{second}} beyond {{first}} produced measurable gains on most tracked metrics, which justifies the extra compute. {{second}} is the recommended model.{{else}}The additional training for {{second}} did not produce consistent gains over {{first}}. Investigate the regressions before committing to longer runs.{{/if}}

*Analysis generated on {{date}}*
"#;

/// Report file and the link prefix from the report's directory to `save_dir`.
///
/// The report normally sits next to `save_dir`. Paths without a final name
/// (`..`, `out/..`) are resolved first; a directory with no parent gets the
/// report inside it.
fn report_location(save_dir: &Path) -> (PathBuf, String) {
    let resolved = if save_dir.file_name().is_none() {
        std::fs::canonicalize(save_dir).unwrap_or_else(|_| save_dir.to_path_buf())
    } else {
        save_dir.to_path_buf()
    };
    match (resolved.parent(), resolved.file_name()) {
        (Some(parent), Some(name)) => (
            parent.join(REPORT_FILE),
            name.to_string_lossy().into_owned(),
        ),
        _ => (resolved.join(REPORT_FILE), ".".to_string()),
    }
}

/// Where the report for `save_dir` is written: next to it, not inside it.
pub fn report_path(save_dir: &Path) -> PathBuf {
    report_location(save_dir).0
}

/// Render the markdown report without writing it.
pub fn render_report(
    first_name: &str,
    second_name: &str,
    table: &ComparisonTable,
    save_dir: &Path,
    date: &str,
) -> Result<String, BenchError> {
    let (_, prefix) = report_location(save_dir);

    let images: Vec<_> = REPORT_METRICS
        .iter()
        .filter_map(|key| TrackedMetric::lookup(key))
        .filter(|m| save_dir.join(m.plot_file_name()).exists())
        .map(|m| {
            json!({
                "alt": m.file_stem().replace('_', " "),
                "path": format!("{prefix}/{}", m.plot_file_name()),
            })
        })
        .collect();

    let matrices: Vec<_> = [first_name, second_name]
        .iter()
        .filter(|name| save_dir.join(confusion_matrix_name(name)).exists())
        .map(|name| {
            json!({
                "name": name,
                "path": format!("{prefix}/{}", confusion_matrix_name(name)),
            })
        })
        .collect();

    let accuracy: Vec<_> = table.rows.iter().filter(|r| !r.metric.is_loss()).collect();
    let losses: Vec<_> = table.rows.iter().filter(|r| r.metric.is_loss()).collect();
    let improved = table.rows.iter().filter(|r| r.improved()).count();

    let ctx = json!({
        "first": first_name,
        "second": second_name,
        "has_rows": !table.is_empty(),
        "table": table.to_markdown(),
        "images": images,
        "matrices": matrices,
        "accuracy_improved": !accuracy.is_empty() && accuracy.iter().all(|r| r.improved()),
        "losses_decreased": !losses.is_empty() && losses.iter().all(|r| r.improved()),
        "improved": improved,
        "compared": table.rows.len(),
        "second_preferred": improved * 2 > table.rows.len(),
        "date": date,
    });

    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(false);
    handlebars.register_escape_fn(handlebars::no_escape);
    Ok(handlebars.render_template(TEMPLATE, &ctx)?)
}

/// Write `analysis_summary.md` into the parent of `save_dir`.
pub fn generate_analysis_report(
    first_name: &str,
    second_name: &str,
    table: &ComparisonTable,
    save_dir: &Path,
) -> Result<PathBuf, BenchError> {
    let date = chrono::Local::now().format("%Y-%m-%d").to_string();
    let content = render_report(first_name, second_name, table, save_dir, &date)?;
    let path = report_path(save_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, content)
        .map_err(|e| BenchError::report(format!("failed to write {}: {e}", path.display())))?;
    info!(path = %path.display(), "Generated analysis report");
    Ok(path)
}
