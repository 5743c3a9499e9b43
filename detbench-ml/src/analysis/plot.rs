//! Per-metric line charts comparing two runs epoch by epoch.

use super::metrics::{TRACKED_METRICS, TrackedMetric};
use super::results::MetricsTable;
use crate::error::BenchError;
use plotters::prelude::*;
use plotters::style::{FontStyle, register_font};
use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tracing::{debug, info, warn};

const FONT: &str = "sans-serif";

const FONT_CANDIDATES: [&str; 8] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Font lookup results keyed by the requested font path (`None` = system probe).
static FONT_READY: OnceLock<Mutex<HashMap<Option<PathBuf>, bool>>> = OnceLock::new();

/// Rendering options for comparison charts.
#[derive(Debug, Clone)]
pub struct PlotOptions {
    pub width: u32,
    pub height: u32,
    /// TrueType font for chart text; common system fonts are probed when unset
    /// or unreadable. Fonts are registered process-wide, so the most recently
    /// loaded font is used for all charts drawn afterwards.
    pub font_path: Option<PathBuf>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
            font_path: None,
        }
    }
}

/// Register a TrueType font for chart text. Returns whether text can be drawn.
///
/// Each distinct `preferred` path is resolved once per process.
fn ensure_font(preferred: Option<&Path>) -> bool {
    let cache = FONT_READY.get_or_init(|| Mutex::new(HashMap::new()));
    let mut cache = cache.lock().unwrap_or_else(|e| e.into_inner());
    let key = preferred.map(Path::to_path_buf);
    if let Some(&ready) = cache.get(&key) {
        return ready;
    }
    let ready = register_first_font(preferred);
    cache.insert(key, ready);
    ready
}

fn register_first_font(preferred: Option<&Path>) -> bool {
    let candidates = preferred
        .into_iter()
        .map(Path::to_path_buf)
        .chain(FONT_CANDIDATES.iter().map(PathBuf::from));
    for path in candidates {
        let Ok(bytes) = std::fs::read(&path) else {
            continue;
        };
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        if register_font(FONT, FontStyle::Normal, bytes).is_ok() {
            debug!(font = %path.display(), "Registered chart font");
            return true;
        }
    }
    warn!("No usable TrueType font found; charts will be drawn without text");
    false
}

struct Series<'a> {
    name: &'a str,
    points: Vec<(f64, f64)>,
    color: RGBColor,
}

impl<'a> Series<'a> {
    fn new(table: &MetricsTable, metric: &TrackedMetric, name: &'a str, color: RGBColor) -> Self {
        let points = table
            .epochs()
            .into_iter()
            .zip(table.column(metric.key).unwrap_or_default().iter().copied())
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .collect();
        Self {
            name,
            points,
            color,
        }
    }
}

fn plot_err(e: impl std::fmt::Display) -> BenchError {
    BenchError::plot(e.to_string())
}

fn span(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

fn axis_ranges(metric: &TrackedMetric, series: &[Series<'_>]) -> (Range<f64>, Range<f64>) {
    let all = || series.iter().flat_map(|s| s.points.iter().copied());

    let x = match span(all().map(|(x, _)| x)) {
        Some((lo, hi)) if hi > lo => lo..hi,
        Some((lo, _)) => lo..lo + 1.0,
        None => 0.0..1.0,
    };

    let y = if metric.is_bounded() {
        0.0..1.0
    } else {
        match span(all().map(|(_, y)| y)) {
            Some((lo, hi)) if hi > lo => {
                let pad = (hi - lo) * 0.05;
                (lo - pad)..(hi + pad)
            }
            Some((lo, _)) => (lo - 0.5)..(lo + 0.5),
            None => 0.0..1.0,
        }
    };
    (x, y)
}

fn draw_comparison(
    path: &Path,
    metric: &TrackedMetric,
    series: &[Series<'_>],
    opts: &PlotOptions,
    with_text: bool,
) -> Result<(), BenchError> {
    let root = BitMapBackend::new(path, (opts.width, opts.height)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let (x_range, y_range) = axis_ranges(metric, series);
    let mut builder = ChartBuilder::on(&root);
    builder.margin(24);
    if with_text {
        builder
            .caption(format!("{} Comparison", metric.title), (FONT, 32))
            .x_label_area_size(56)
            .y_label_area_size(84);
    }
    let mut chart = builder
        .build_cartesian_2d(x_range, y_range)
        .map_err(plot_err)?;

    let percent = |v: &f64| format!("{:.0}%", v * 100.0);
    let plain = |v: &f64| format!("{v:.3}");
    {
        let mut mesh = chart.configure_mesh();
        mesh.light_line_style(BLACK.mix(0.05))
            .bold_line_style(BLACK.mix(0.15));
        if with_text {
            mesh.x_desc("Epoch")
                .y_desc(metric.title)
                .label_style((FONT, 18))
                .axis_desc_style((FONT, 20));
            if metric.is_bounded() {
                mesh.y_label_formatter(&percent);
            } else {
                mesh.y_label_formatter(&plain);
            }
        } else {
            mesh.x_labels(0).y_labels(0);
        }
        mesh.draw().map_err(plot_err)?;
    }

    for s in series {
        let style = s.color.stroke_width(3);
        chart
            .draw_series(LineSeries::new(s.points.iter().copied(), style))
            .map_err(plot_err)?
            .label(s.name)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 24, y)], style));

        if !with_text {
            continue;
        }
        if let Some(&(x, y)) = s.points.last() {
            let text_style = (FONT, 18).into_font().color(&s.color);
            chart
                .draw_series(std::iter::once(
                    EmptyElement::at((x, y)) + Text::new(metric.format_value(y), (6, -8), text_style),
                ))
                .map_err(plot_err)?;
        }
    }

    if with_text {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK.mix(0.4))
            .label_font((FONT, 18))
            .draw()
            .map_err(plot_err)?;
    }

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Render one PNG per tracked metric present in both tables.
///
/// Metrics missing from either table are skipped. Returns the written paths.
pub fn create_comparison_plots(
    first: &MetricsTable,
    second: &MetricsTable,
    first_name: &str,
    second_name: &str,
    save_dir: &Path,
    opts: &PlotOptions,
) -> Result<Vec<PathBuf>, BenchError> {
    std::fs::create_dir_all(save_dir)?;
    let with_text = ensure_font(opts.font_path.as_deref());

    let mut created = Vec::new();
    for metric in TRACKED_METRICS.iter() {
        if !(first.has_column(metric.key) && second.has_column(metric.key)) {
            debug!(metric = metric.key, "Metric missing from a results table, skipping plot");
            continue;
        }
        let series = [
            Series::new(first, metric, first_name, BLUE),
            Series::new(second, metric, second_name, RED),
        ];
        let path = save_dir.join(metric.plot_file_name());
        draw_comparison(&path, metric, &series, opts, with_text)?;
        info!(path = %path.display(), "Created plot");
        created.push(path);
    }
    Ok(created)
}
