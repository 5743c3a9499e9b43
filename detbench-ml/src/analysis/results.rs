//! Per-epoch metrics table read from a training run's `results.csv`.

use crate::error::BenchError;
use std::path::Path;
use tracing::debug;

/// File name the framework writes per-epoch metrics to.
pub const RESULTS_FILE: &str = "results.csv";

/// Column-oriented view of a results CSV.
///
/// Headers are stored trimmed; the framework pads them with spaces for alignment.
/// Columns holding any non-numeric cell are kept as text and have no numeric values.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsTable {
    columns: Vec<String>,
    values: Vec<Option<Vec<f64>>>,
    rows: usize,
}

impl MetricsTable {
    /// Parse CSV text. Empty cells become NaN; a column with any other
    /// non-numeric cell is treated as text. Only structural problems (no
    /// header, ragged rows) are errors.
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, BenchError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
        if columns.is_empty() || columns.iter().all(String::is_empty) {
            return Err(BenchError::invalid_input("results file has no header row"));
        }

        let mut values: Vec<Option<Vec<f64>>> = vec![Some(Vec::new()); columns.len()];
        let mut rows = 0;
        for (line, record) in rdr.records().enumerate() {
            let record = record?;
            for (col, cell) in record.iter().enumerate() {
                let Some(series) = values[col].as_mut() else {
                    continue;
                };
                if cell.is_empty() {
                    series.push(f64::NAN);
                    continue;
                }
                match cell.parse::<f64>() {
                    Ok(v) => series.push(v),
                    Err(_) => {
                        debug!(
                            column = %columns[col],
                            row = line + 1,
                            cell,
                            "Non-numeric cell, treating column as text"
                        );
                        values[col] = None;
                    }
                }
            }
            rows += 1;
        }

        Ok(Self {
            columns,
            values,
            rows,
        })
    }

    /// Load a CSV file, reporting any failure as [`BenchError::ResultsLoad`].
    pub fn load(path: &Path) -> Result<Self, BenchError> {
        let file =
            std::fs::File::open(path).map_err(|e| BenchError::results_load(path, e.to_string()))?;
        Self::from_reader(file).map_err(|e| match e {
            BenchError::InvalidInput(msg) => BenchError::results_load(path, msg),
            other => BenchError::results_load(path, other.to_string()),
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Whether `name` is present as a numeric column.
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|i| self.values[i].as_deref())
    }

    /// Epoch numbers, or row indices when the table has no `epoch` column.
    pub fn epochs(&self) -> Vec<f64> {
        match self.column("epoch") {
            Some(col) => col.to_vec(),
            None => (0..self.rows).map(|i| i as f64).collect(),
        }
    }

    /// Value of `name` in the final row.
    pub fn last(&self, name: &str) -> Option<f64> {
        self.column(name).and_then(|c| c.last().copied())
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

/// Load `results.csv` from a training run directory.
pub fn load_run_results(run_dir: &Path) -> Result<MetricsTable, BenchError> {
    MetricsTable::load(&run_dir.join(RESULTS_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
               epoch,      train/box_loss,      train/obj_loss,   metrics/precision
                   0,            0.11452,             0.04215,            0.00123
                   1,            0.09871,             0.03994,            0.15501
";

    #[test]
    fn test_headers_are_trimmed() {
        let table = MetricsTable::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(
            table.columns(),
            &["epoch", "train/box_loss", "train/obj_loss", "metrics/precision"]
        );
        for col in table.columns() {
            assert_eq!(col.trim(), col);
        }
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_column_access() {
        let table = MetricsTable::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.column("train/box_loss"), Some(&[0.11452, 0.09871][..]));
        assert_eq!(table.last("metrics/precision"), Some(0.15501));
        assert!(table.column("metrics/recall").is_none());
        assert_eq!(table.epochs(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_missing_epoch_column_uses_row_index() {
        let table = MetricsTable::from_reader("a,b\n1,2\n3,4\n5,6\n".as_bytes()).unwrap();
        assert_eq!(table.epochs(), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_empty_cells_become_nan() {
        let table = MetricsTable::from_reader("epoch,x\n0,\n".as_bytes()).unwrap();
        assert!(table.last("x").unwrap().is_nan());
    }

    #[test]
    fn test_text_column_is_not_numeric() {
        let table = MetricsTable::from_reader(
            "epoch,metrics/precision,note\n0,0.5,ok\n1,0.6,\n".as_bytes(),
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.columns(), &["epoch", "metrics/precision", "note"]);
        assert_eq!(table.last("metrics/precision"), Some(0.6));
        assert!(!table.has_column("note"));
        assert!(table.column("note").is_none());
    }

    #[test]
    fn test_late_text_cell_drops_column() {
        let table =
            MetricsTable::from_reader("epoch,x\n0,1.5\n1,2.5\n2,diverged\n".as_bytes()).unwrap();
        assert!(table.column("x").is_none());
        assert_eq!(table.epochs(), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_missing_header_is_an_error() {
        assert!(MetricsTable::from_reader("".as_bytes()).is_err());
    }

    #[test]
    fn test_ragged_rows_are_an_error() {
        assert!(MetricsTable::from_reader("epoch,x\n0,1,2\n".as_bytes()).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_run_results(dir.path()).unwrap_err();
        assert!(matches!(err, BenchError::ResultsLoad { .. }));
    }
}
