//! Line, bar and comparison charts written as PNG files

use super::canvas::{text_height, text_width, Canvas, BLACK, BLUE, GRID, ORANGE, WHITE};
use crate::error::{Result, TabflowError};
use crate::preprocessing::{is_numeric_dtype, text_values};
use image::Rgb;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

const MARGIN_LEFT: i64 = 70;
const MARGIN_RIGHT: i64 = 20;
const MARGIN_TOP: i64 = 40;
const MARGIN_BOTTOM: i64 = 50;

/// File name of the actual-vs-predicted chart
pub const COMPARISON_FILE: &str = "prediction_comparison.png";

/// Renderer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Directory charts are written into (created on demand)
    pub output_dir: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Points shown in the comparison chart
    pub comparison_preview: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            width: 800,
            height: 500,
            comparison_preview: 50,
        }
    }
}

impl RenderConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_comparison_preview(mut self, n: usize) -> Self {
        self.comparison_preview = n;
        self
    }
}

/// Requested chart style for a column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    /// Line for numeric columns, bar otherwise
    #[default]
    Auto,
    Line,
    Bar,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartKind::Auto => write!(f, "auto"),
            ChartKind::Line => write!(f, "line"),
            ChartKind::Bar => write!(f, "bar"),
        }
    }
}

impl FromStr for ChartKind {
    type Err = TabflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ChartKind::Auto),
            "line" | "trend" => Ok(ChartKind::Line),
            "bar" => Ok(ChartKind::Bar),
            other => Err(TabflowError::ConfigError(format!(
                "unknown chart kind '{}' (expected auto, line or bar)",
                other
            ))),
        }
    }
}

/// Replace every character outside `[A-Za-z0-9_.-]` with `_`
pub fn sanitize_file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "column".to_string()
    } else {
        stem
    }
}

/// Renders charts into the configured output directory
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    config: RenderConfig,
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

impl ChartRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Line chart for numeric columns, frequency bars otherwise
    pub fn plot_series(&self, df: &DataFrame, column: &str) -> Result<PathBuf> {
        self.plot_series_as(df, column, ChartKind::Auto)
    }

    pub fn plot_series_as(&self, df: &DataFrame, column: &str, kind: ChartKind) -> Result<PathBuf> {
        self.plot_series_inner(df, column, kind)
            .map_err(TabflowError::into_render)
    }

    fn plot_series_inner(&self, df: &DataFrame, column: &str, kind: ChartKind) -> Result<PathBuf> {
        let col = df
            .column(column)
            .map_err(|_| TabflowError::RenderError(format!("column '{}' not found", column)))?;
        let series = col.as_materialized_series();
        if series.len() == series.null_count() {
            return Err(TabflowError::RenderError(format!(
                "column '{}' has no non-missing values",
                column
            )));
        }

        let numeric = is_numeric_dtype(series.dtype());
        let kind = match kind {
            ChartKind::Auto if numeric => ChartKind::Line,
            ChartKind::Auto => ChartKind::Bar,
            ChartKind::Line if !numeric => {
                return Err(TabflowError::RenderError(format!(
                    "cannot draw a line chart of non-numeric column '{}'",
                    column
                )))
            }
            other => other,
        };

        let stem = sanitize_file_stem(column);
        match kind {
            ChartKind::Bar => {
                let bars = if numeric {
                    numeric_frequencies(series)?
                } else {
                    text_frequencies(series)?
                };
                let path = self.path_for(&format!("{}_bar.png", stem))?;
                let mut canvas = self.blank()?;
                self.draw_bar_chart(&mut canvas, &format!("{} FREQUENCY", column), &bars);
                self.write(&canvas, &path)?;
                Ok(path)
            }
            _ => {
                let values: Vec<Option<f64>> = series
                    .cast(&DataType::Float64)?
                    .f64()?
                    .into_iter()
                    .collect();
                let path = self.path_for(&format!("{}_trend.png", stem))?;
                let mut canvas = self.blank()?;
                self.draw_line_chart(
                    &mut canvas,
                    &format!("{} TREND", column),
                    &[(values.as_slice(), BLUE, "")],
                );
                self.write(&canvas, &path)?;
                Ok(path)
            }
        }
    }

    /// Overlay held-out targets and predictions, truncated to the preview length
    pub fn plot_comparison(&self, actual: &[f64], predicted: &[f64]) -> Result<PathBuf> {
        self.plot_comparison_inner(actual, predicted)
            .map_err(TabflowError::into_render)
    }

    fn plot_comparison_inner(&self, actual: &[f64], predicted: &[f64]) -> Result<PathBuf> {
        if actual.is_empty() || predicted.is_empty() {
            return Err(TabflowError::RenderError(
                "comparison needs non-empty actual and predicted series".to_string(),
            ));
        }

        let n = self.config.comparison_preview.max(1);
        let actual: Vec<Option<f64>> = actual.iter().take(n).map(|v| Some(*v)).collect();
        let predicted: Vec<Option<f64>> = predicted.iter().take(n).map(|v| Some(*v)).collect();

        let path = self.path_for(COMPARISON_FILE)?;
        let mut canvas = self.blank()?;
        self.draw_line_chart(
            &mut canvas,
            "ACTUAL VS PREDICTED",
            &[
                (actual.as_slice(), BLUE, "ACTUAL"),
                (predicted.as_slice(), ORANGE, "PREDICTED"),
            ],
        );
        self.write(&canvas, &path)?;
        Ok(path)
    }

    fn path_for(&self, file_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.config.output_dir)?;
        Ok(self.config.output_dir.join(file_name))
    }

    fn blank(&self) -> Result<Canvas> {
        let (w, h) = (self.config.width as i64, self.config.height as i64);
        if w < MARGIN_LEFT + MARGIN_RIGHT + 20 || h < MARGIN_TOP + MARGIN_BOTTOM + 20 {
            return Err(TabflowError::RenderError(format!(
                "image size {}x{} is too small",
                w, h
            )));
        }
        Ok(Canvas::new(self.config.width, self.config.height, WHITE))
    }

    fn write(&self, canvas: &Canvas, path: &Path) -> Result<()> {
        canvas.save(path)?;
        info!(path = %path.display(), "Chart written");
        Ok(())
    }

    fn plot_area(&self) -> (i64, i64, i64, i64) {
        let w = self.config.width as i64 - MARGIN_LEFT - MARGIN_RIGHT;
        let h = self.config.height as i64 - MARGIN_TOP - MARGIN_BOTTOM;
        (MARGIN_LEFT, MARGIN_TOP, w, h)
    }

    fn draw_frame(&self, canvas: &mut Canvas, title: &str, y_min: f64, y_max: f64) {
        let (x0, y0, w, h) = self.plot_area();

        let title_scale = 2;
        let tx = (canvas.width() as i64 - text_width(title, title_scale)) / 2;
        canvas.text(tx.max(4), 12, title, title_scale, BLACK);

        for i in 1..4 {
            let gy = y0 + h * i / 4;
            canvas.line(x0 + 1, gy, x0 + w - 1, gy, 1, GRID);
        }

        canvas.line(x0, y0, x0, y0 + h, 1, BLACK);
        canvas.line(x0, y0 + h, x0 + w, y0 + h, 1, BLACK);

        for (value, y) in [(y_max, y0), (y_min, y0 + h)] {
            let label = format_value(value);
            let lx = x0 - 6 - text_width(&label, 1);
            canvas.text(lx.max(2), y - text_height(1) / 2, &label, 1, BLACK);
            canvas.line(x0 - 4, y, x0, y, 1, BLACK);
        }
    }

    fn draw_line_chart(
        &self,
        canvas: &mut Canvas,
        title: &str,
        series: &[(&[Option<f64>], Rgb<u8>, &str)],
    ) {
        let present = series.iter().flat_map(|(values, _, _)| values.iter().flatten());
        let (lo, hi) = padded_range(present.copied());
        self.draw_frame(canvas, title, lo, hi);

        let (x0, y0, w, h) = self.plot_area();
        let n_points = series.iter().map(|(v, _, _)| v.len()).max().unwrap_or(0);
        let to_x = |i: usize| {
            if n_points <= 1 {
                x0 + w / 2
            } else {
                x0 + (i as f64 / (n_points - 1) as f64 * (w - 1) as f64).round() as i64
            }
        };
        let to_y = |v: f64| y0 + h - ((v - lo) / (hi - lo) * h as f64).round() as i64;

        for (values, color, _) in series {
            let mut prev: Option<(i64, i64)> = None;
            for (i, value) in values.iter().enumerate() {
                // Missing and non-finite points are left out of the line
                let Some(v) = value.filter(|v| v.is_finite()) else { continue };
                let point = (to_x(i), to_y(v));
                match prev {
                    Some((px, py)) => canvas.line(px, py, point.0, point.1, 2, *color),
                    None => canvas.fill_rect(point.0 - 2, point.1 - 2, 5, 5, *color),
                }
                prev = Some(point);
            }
        }

        let last = n_points.saturating_sub(1).to_string();
        canvas.text(x0, y0 + h + 8, "0", 1, BLACK);
        canvas.text(x0 + w - text_width(&last, 1), y0 + h + 8, &last, 1, BLACK);

        let labelled: Vec<_> = series.iter().filter(|(_, _, l)| !l.is_empty()).collect();
        if !labelled.is_empty() {
            let label_w = labelled.iter().map(|(_, _, l)| text_width(l, 1)).max().unwrap_or(0);
            let box_w = 8 + 16 + 6 + label_w + 8;
            let box_h = 8 + labelled.len() as i64 * 14;
            let bx = x0 + w - box_w - 6;
            let by = y0 + 6;
            canvas.fill_rect(bx, by, box_w, box_h, WHITE);
            canvas.stroke_rect(bx, by, box_w, box_h, BLACK);
            for (row, (_, color, label)) in labelled.iter().enumerate() {
                let ry = by + 6 + row as i64 * 14;
                canvas.fill_rect(bx + 8, ry, 16, 7, *color);
                canvas.text(bx + 30, ry, label, 1, BLACK);
            }
        }
    }

    fn draw_bar_chart(&self, canvas: &mut Canvas, title: &str, bars: &[(String, usize)]) {
        let max_count = bars.iter().map(|(_, c)| *c).max().unwrap_or(0) as f64;
        self.draw_frame(canvas, title, 0.0, max_count.max(1.0));

        let (x0, y0, w, h) = self.plot_area();
        let n = bars.len().max(1) as i64;
        let slot = (w / n).max(1);
        let bar_w = (slot * 3 / 4).max(1);
        let max_chars = ((slot + 1) / 6).max(0) as usize;

        for (i, (label, count)) in bars.iter().enumerate() {
            let bh = (*count as f64 / max_count.max(1.0) * h as f64).round() as i64;
            let bx = x0 + i as i64 * slot + (slot - bar_w) / 2;
            canvas.fill_rect(bx, y0 + h - bh, bar_w, bh, BLUE);

            if max_chars > 0 {
                let text: String = label.chars().take(max_chars).collect();
                let tx = bx + (bar_w - text_width(&text, 1)) / 2;
                canvas.text(tx, y0 + h + 8, &text, 1, BLACK);
            }
        }
        debug!(bars = bars.len(), "Bar chart drawn");
    }
}

/// Counts per distinct text value, sorted by label
fn text_frequencies(series: &Series) -> Result<Vec<(String, usize)>> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for value in text_values(series)?.into_iter().flatten() {
        *counts.entry(value).or_insert(0) += 1;
    }
    Ok(counts.into_iter().collect())
}

/// Counts per distinct numeric value, sorted by value
fn numeric_frequencies(series: &Series) -> Result<Vec<(String, usize)>> {
    let mut values: Vec<f64> = series
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .flatten()
        .collect();
    values.sort_by(|a, b| a.total_cmp(b));

    let mut bars: Vec<(f64, usize)> = Vec::new();
    for v in values {
        match bars.last_mut() {
            Some((last, count)) if *last == v => *count += 1,
            _ => bars.push((v, 1)),
        }
    }
    Ok(bars.into_iter().map(|(v, c)| (format_value(v), c)).collect())
}

/// Min/max of the values, widened when flat so the scale is never degenerate
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    if hi - lo < 1e-12 {
        let pad = (lo.abs() * 0.05).max(0.5);
        return (lo - pad, hi + pad);
    }
    (lo, hi)
}

/// Compact axis label
fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e9 {
        format!("{}", v as i64)
    } else if v.abs() >= 1e5 || v.abs() < 1e-3 {
        format!("{:.2e}", v)
    } else {
        let s = format!("{:.3}", v);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer(dir: &Path) -> ChartRenderer {
        ChartRenderer::new(RenderConfig::new(dir).with_size(320, 200))
    }

    #[test]
    fn test_sanitize_file_stem() {
        assert_eq!(sanitize_file_stem("Unit Price ($)"), "Unit_Price____");
        assert_eq!(sanitize_file_stem("sales-2024.v2"), "sales-2024.v2");
        assert_eq!(sanitize_file_stem("../etc"), ".._etc");
        assert_eq!(sanitize_file_stem(""), "column");
    }

    #[test]
    fn test_chart_kind_parse() {
        assert_eq!("LINE".parse::<ChartKind>().unwrap(), ChartKind::Line);
        assert_eq!("bar".parse::<ChartKind>().unwrap(), ChartKind::Bar);
        assert!("pie".parse::<ChartKind>().is_err());
        assert_eq!(ChartKind::Auto.to_string(), "auto");
    }

    #[test]
    fn test_numeric_column_gets_trend_chart() {
        let dir = tempfile::tempdir().unwrap();
        let df = df!("units" => &[Some(3.0), None, Some(5.0), Some(4.0)]).unwrap();
        let path = renderer(dir.path()).plot_series(&df, "units").unwrap();
        assert_eq!(path.file_name().unwrap(), "units_trend.png");
        assert_eq!(image::image_dimensions(&path).unwrap(), (320, 200));
    }

    #[test]
    fn test_infinite_values_are_skipped_in_trend() {
        let dir = tempfile::tempdir().unwrap();
        let df = df!("v" => &[1.0, f64::INFINITY, 2.0, f64::NEG_INFINITY, f64::NAN]).unwrap();
        let path = renderer(dir.path()).plot_series(&df, "v").unwrap();
        assert_eq!(image::image_dimensions(&path).unwrap(), (320, 200));

        let path = renderer(dir.path())
            .plot_comparison(&[1.0, f64::INFINITY], &[f64::NAN, 2.0])
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_text_column_gets_bar_chart() {
        let dir = tempfile::tempdir().unwrap();
        let df = df!("region" => &["n", "s", "n"]).unwrap();
        let path = renderer(dir.path()).plot_series(&df, "region").unwrap();
        assert_eq!(path.file_name().unwrap(), "region_bar.png");
        assert!(path.exists());
    }

    #[test]
    fn test_forced_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let df = df!("units" => &[1i64, 1, 2], "region" => &["a", "b", "a"]).unwrap();
        let r = renderer(dir.path());

        let path = r.plot_series_as(&df, "units", ChartKind::Bar).unwrap();
        assert_eq!(path.file_name().unwrap(), "units_bar.png");

        let err = r.plot_series_as(&df, "region", ChartKind::Line).unwrap_err();
        assert!(matches!(err, TabflowError::RenderError(_)));
    }

    #[test]
    fn test_render_errors() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path());
        let df = df!("empty" => &[None::<f64>, None]).unwrap();

        assert!(matches!(
            r.plot_series(&df, "missing"),
            Err(TabflowError::RenderError(_))
        ));
        assert!(matches!(
            r.plot_series(&df, "empty"),
            Err(TabflowError::RenderError(_))
        ));
        assert!(matches!(
            r.plot_comparison(&[], &[1.0]),
            Err(TabflowError::RenderError(_))
        ));
    }

    #[test]
    fn test_comparison_chart_has_legend_colours() {
        let dir = tempfile::tempdir().unwrap();
        let actual: Vec<f64> = (0..80).map(|i| i as f64).collect();
        let predicted: Vec<f64> = actual.iter().map(|v| v * 0.9 + 1.0).collect();

        let path = renderer(dir.path()).plot_comparison(&actual, &predicted).unwrap();
        assert_eq!(path.file_name().unwrap(), COMPARISON_FILE);

        let img = image::open(&path).unwrap().to_rgb8();
        let has = |c: Rgb<u8>| img.pixels().any(|p| *p == c);
        assert!(has(BLUE));
        assert!(has(ORANGE));
    }

    #[test]
    fn test_too_small_image_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let r = ChartRenderer::new(RenderConfig::new(dir.path()).with_size(50, 50));
        let df = df!("a" => &[1.0, 2.0]).unwrap();
        assert!(matches!(r.plot_series(&df, "a"), Err(TabflowError::RenderError(_))));
    }

    #[test]
    fn test_padded_range_and_labels() {
        assert_eq!(padded_range([2.0, 2.0].into_iter()), (1.5, 2.5));
        assert_eq!(padded_range(std::iter::empty()), (0.0, 1.0));
        assert_eq!(format_value(12.0), "12");
        assert_eq!(format_value(0.25), "0.25");
        assert_eq!(format_value(15_000_000.0), "15000000");
        assert_eq!(format_value(0.00015), "1.50e-4");
    }
}
