//! Copies evaluation artifacts next to the generated plots.

use crate::error::BenchError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CONFUSION_MATRIX_FILE: &str = "confusion_matrix.png";

/// `Model 2` -> `Model_2`.
pub fn model_slug(model_name: &str) -> String {
    model_name.replace(' ', "_")
}

/// Output file name for a model's confusion matrix.
pub fn confusion_matrix_name(model_name: &str) -> String {
    format!("confusion_matrix_{}.png", model_slug(model_name))
}

/// Copy each validation directory's confusion matrix into `save_dir`.
///
/// Directories without a confusion matrix are skipped. Returns the copied paths.
pub fn copy_confusion_matrices(
    first_val: &Path,
    second_val: &Path,
    first_name: &str,
    second_name: &str,
    save_dir: &Path,
) -> Result<Vec<PathBuf>, BenchError> {
    std::fs::create_dir_all(save_dir)?;
    let mut copied = Vec::new();
    for (val_dir, name) in [(first_val, first_name), (second_val, second_name)] {
        let source = val_dir.join(CONFUSION_MATRIX_FILE);
        if !source.is_file() {
            debug!(path = %source.display(), "No confusion matrix, skipping");
            continue;
        }
        let dest = save_dir.join(confusion_matrix_name(name));
        std::fs::copy(&source, &dest)?;
        info!(path = %dest.display(), "Copied confusion matrix");
        copied.push(dest);
    }
    Ok(copied)
}
