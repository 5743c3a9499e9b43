//! Final-epoch comparison table between two runs.

use super::metrics::{TRACKED_METRICS, TrackedMetric};
use super::results::MetricsTable;
use serde::Serialize;
use std::fmt;

/// How the second run's value moved relative to the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Increase,
    Decrease,
    Unchanged,
    /// One of the values is NaN.
    Undefined,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Increase => "increase",
            Direction::Decrease => "decrease",
            Direction::Unchanged => "no change",
            Direction::Undefined => "undefined",
        })
    }
}

/// Relative change from a baseline value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Change {
    /// Magnitude in percent of the baseline; `None` when the baseline is zero
    /// or either value is NaN.
    pub percent: Option<f64>,
    pub direction: Direction,
}

impl Change {
    pub fn between(baseline: f64, value: f64) -> Self {
        if baseline.is_nan() || value.is_nan() {
            return Self {
                percent: None,
                direction: Direction::Undefined,
            };
        }
        let direction = if value > baseline {
            Direction::Increase
        } else if value < baseline {
            Direction::Decrease
        } else {
            Direction::Unchanged
        };
        let percent = if baseline == 0.0 {
            None
        } else {
            Some(((value - baseline) / baseline.abs() * 100.0).abs())
        };
        Self { percent, direction }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.percent, self.direction) {
            (_, Direction::Unchanged) => write!(f, "0.00% no change"),
            (_, Direction::Undefined) => write!(f, "n/a"),
            (Some(p), dir) => write!(f, "{p:.2}% {dir}"),
            (None, dir) => write!(f, "n/a ({dir} from zero)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub metric: TrackedMetric,
    pub first: f64,
    pub second: f64,
    pub change: Change,
}

impl ComparisonRow {
    pub fn new(metric: TrackedMetric, first: f64, second: f64) -> Self {
        Self {
            metric,
            first,
            second,
            change: Change::between(first, second),
        }
    }

    /// Whether the second run is better on this metric (lower loss, higher ratio).
    pub fn improved(&self) -> bool {
        match self.change.direction {
            Direction::Decrease => self.metric.is_loss(),
            Direction::Increase => !self.metric.is_loss(),
            _ => false,
        }
    }

    fn cells(&self) -> [String; 4] {
        [
            self.metric.title.to_string(),
            self.metric.format_value(self.first),
            self.metric.format_value(self.second),
            self.change.to_string(),
        ]
    }
}

/// Final values of every tracked metric present in both runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonTable {
    pub first_name: String,
    pub second_name: String,
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonTable {
    pub fn build(
        first: &MetricsTable,
        second: &MetricsTable,
        first_name: &str,
        second_name: &str,
    ) -> Self {
        let rows = TRACKED_METRICS
            .iter()
            .filter_map(|m| {
                let a = first.last(m.key)?;
                let b = second.last(m.key)?;
                Some(ComparisonRow::new(*m, a, b))
            })
            .collect();
        Self {
            first_name: first_name.to_string(),
            second_name: second_name.to_string(),
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, key: &str) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.metric.key == key)
    }

    fn headers(&self) -> [String; 4] {
        [
            "Metric".to_string(),
            self.first_name.clone(),
            self.second_name.clone(),
            "Change".to_string(),
        ]
    }

    fn widths(cells: &[[String; 4]]) -> [usize; 4] {
        let mut widths = [0usize; 4];
        for row in cells {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }
        widths
    }

    fn all_cells(&self) -> Vec<[String; 4]> {
        let mut cells = Vec::with_capacity(self.rows.len() + 1);
        cells.push(self.headers());
        cells.extend(self.rows.iter().map(ComparisonRow::cells));
        cells
    }

    /// GitHub-flavoured pipe table.
    pub fn to_markdown(&self) -> String {
        let cells: Vec<[String; 4]> = self
            .all_cells()
            .into_iter()
            .map(|row| row.map(|c| c.replace('|', "\\|")))
            .collect();
        let widths = Self::widths(&cells);
        let line = |row: &[String; 4]| {
            let padded: Vec<String> = row.iter().zip(widths).map(|(c, w)| pad(c, w)).collect();
            format!("| {} |", padded.join(" | "))
        };
        let rule: Vec<String> = widths
            .iter()
            .map(|w| format!(":{}", "-".repeat(w + 1)))
            .collect();

        let mut out = Vec::with_capacity(cells.len() + 1);
        out.push(line(&cells[0]));
        out.push(format!("|{}|", rule.join("|")));
        out.extend(cells[1..].iter().map(line));
        out.join("\n")
    }
}

fn pad(s: &str, width: usize) -> String {
    let len = s.chars().count();
    format!("{s}{}", " ".repeat(width.saturating_sub(len)))
}

impl fmt::Display for ComparisonTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells = self.all_cells();
        let widths = Self::widths(&cells);
        for row in &cells {
            let padded: Vec<String> = row.iter().zip(widths).map(|(c, w)| pad(c, w)).collect();
            writeln!(f, "{}", padded.join("  ").trim_end())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table(csv: &str) -> MetricsTable {
        MetricsTable::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_loss_decrease_is_positive() {
        let row = ComparisonRow::new(TrackedMetric::lookup("train/box_loss").unwrap(), 0.05, 0.04);
        assert_eq!(row.change.direction, Direction::Decrease);
        let pct = row.change.percent.unwrap();
        assert!((pct - 20.0).abs() < 1e-9);
        assert!(row.improved());
        assert_eq!(row.change.to_string(), "20.00% decrease");
    }

    #[test]
    fn test_accuracy_increase_is_positive() {
        let row = ComparisonRow::new(TrackedMetric::lookup("metrics/recall").unwrap(), 0.5, 0.6);
        assert_eq!(row.change.direction, Direction::Increase);
        assert!(row.change.percent.unwrap() > 0.0);
        assert!(row.improved());
        assert_eq!(row.change.to_string(), "20.00% increase");
    }

    #[test]
    fn test_worse_values_are_not_improvements() {
        let loss = ComparisonRow::new(TrackedMetric::lookup("train/obj_loss").unwrap(), 0.02, 0.03);
        assert_eq!(loss.change.direction, Direction::Increase);
        assert!(!loss.improved());

        let map = ComparisonRow::new(TrackedMetric::lookup("metrics/mAP_0.5").unwrap(), 0.8, 0.4);
        assert_eq!(map.change.to_string(), "50.00% decrease");
        assert!(!map.improved());
    }

    #[test]
    fn test_zero_baseline_has_no_percentage() {
        let change = Change::between(0.0, 0.3);
        assert_eq!(change.percent, None);
        assert_eq!(change.direction, Direction::Increase);
        assert_eq!(change.to_string(), "n/a (increase from zero)");
        assert_eq!(Change::between(0.0, 0.0).to_string(), "0.00% no change");
        assert_eq!(Change::between(f64::NAN, 1.0).to_string(), "n/a");
    }

    #[test]
    fn test_build_skips_missing_columns() {
        let a = table("epoch,metrics/precision,train/box_loss\n0,0.1,0.09\n1,0.4,0.05\n");
        let b = table("epoch,metrics/precision\n0,0.2\n1,0.5\n");
        let cmp = ComparisonTable::build(&a, &b, "30 epochs", "60 epochs");
        assert_eq!(cmp.rows.len(), 1);
        let row = cmp.row("metrics/precision").unwrap();
        assert_eq!(row.first, 0.4);
        assert_eq!(row.second, 0.5);
        assert!(cmp.row("train/box_loss").is_none());
    }

    #[test]
    fn test_markdown_layout() {
        let a = table("epoch,metrics/precision\n0,0.4\n");
        let b = table("epoch,metrics/precision\n0,0.5\n");
        let md = ComparisonTable::build(&a, &b, "Model 1", "Model 2").to_markdown();
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "| Metric    | Model 1 | Model 2 | Change          |"
        );
        assert_eq!(
            lines[1],
            "|:----------|:--------|:--------|:----------------|"
        );
        assert_eq!(
            lines[2],
            "| Precision | 0.400   | 0.500   | 25.00% increase |"
        );
    }

    #[test]
    fn test_markdown_escapes_pipes() {
        let a = table("epoch,metrics/recall\n0,0.4\n");
        let md = ComparisonTable::build(&a, &a, "a|b", "c").to_markdown();
        assert!(md.contains("a\\|b"));
    }
}
