//! The fixed catalogue of metrics compared between two training runs.

/// A metric column tracked across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedMetric {
    /// Column name in `results.csv`.
    pub key: &'static str,
    /// Display title.
    pub title: &'static str,
}

pub const TRACKED_METRICS: [TrackedMetric; 7] = [
    TrackedMetric::new("metrics/mAP_0.5", "mAP@0.5"),
    TrackedMetric::new("metrics/mAP_0.5:0.95", "mAP@0.5:0.95"),
    TrackedMetric::new("metrics/precision", "Precision"),
    TrackedMetric::new("metrics/recall", "Recall"),
    TrackedMetric::new("train/box_loss", "Box Loss"),
    TrackedMetric::new("train/obj_loss", "Object Loss"),
    TrackedMetric::new("train/cls_loss", "Classification Loss"),
];

/// Subset embedded in the markdown report, in display order.
pub const REPORT_METRICS: [&str; 4] = [
    "metrics/mAP_0.5",
    "metrics/precision",
    "metrics/recall",
    "train/box_loss",
];

impl TrackedMetric {
    pub const fn new(key: &'static str, title: &'static str) -> Self {
        Self { key, title }
    }

    pub fn lookup(key: &str) -> Option<Self> {
        TRACKED_METRICS.iter().copied().find(|m| m.key == key)
    }

    /// Lower is better.
    pub fn is_loss(&self) -> bool {
        self.key.contains("loss")
    }

    /// Ratio metrics in `[0, 1]`: mAP, precision, recall.
    pub fn is_bounded(&self) -> bool {
        ["mAP", "precision", "recall"]
            .iter()
            .any(|s| self.key.contains(s))
    }

    /// Three decimals for ratios, four for everything else.
    pub fn format_value(&self, value: f64) -> String {
        if self.is_bounded() {
            format!("{value:.3}")
        } else {
            format!("{value:.4}")
        }
    }

    /// `metrics/mAP_0.5` -> `metrics_mAP_0.5`.
    pub fn file_stem(&self) -> String {
        self.key.replace('/', "_")
    }

    pub fn plot_file_name(&self) -> String {
        format!("{}_comparison.png", self.file_stem())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let box_loss = TrackedMetric::lookup("train/box_loss").unwrap();
        assert!(box_loss.is_loss());
        assert!(!box_loss.is_bounded());

        let map = TrackedMetric::lookup("metrics/mAP_0.5:0.95").unwrap();
        assert!(!map.is_loss());
        assert!(map.is_bounded());
    }

    #[test]
    fn test_format_precision() {
        let recall = TrackedMetric::lookup("metrics/recall").unwrap();
        assert_eq!(recall.format_value(0.123456), "0.123");
        let cls = TrackedMetric::lookup("train/cls_loss").unwrap();
        assert_eq!(cls.format_value(0.123456), "0.1235");
    }

    #[test]
    fn test_plot_file_name() {
        let m = TrackedMetric::lookup("metrics/mAP_0.5").unwrap();
        assert_eq!(m.plot_file_name(), "metrics_mAP_0.5_comparison.png");
    }

    #[test]
    fn test_report_metrics_are_tracked() {
        for key in REPORT_METRICS {
            assert!(TrackedMetric::lookup(key).is_some(), "{key}");
        }
    }
}
