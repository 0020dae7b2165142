//! Comparative charts.
//!
//! Every series file is loaded and validated before anything is written,
//! so a missing or malformed input never leaves a partial chart behind.
//! The chart is an SVG with one colour per series, in input order: a
//! translucent band from min to max, a solid bar at the mean, a tick at the
//! median and one dot per sample.

use crate::io;
use crate::stats::Summary;
use std::fmt::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;
use vfs_bench_core::{BackendId, Error, Result};

/// Seaborn "deep" palette.
const COLORS: [&str; 10] = [
    "#4c72b0", "#dd8452", "#55a868", "#c44e52", "#8172b3",
    "#937860", "#da8bc3", "#8c8c8c", "#ccb974", "#64b5cd",
];

const WIDTH: f64 = 720.0;
const HEIGHT: f64 = 420.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 200.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;
const Y_TICKS: usize = 5;

/// A labeled result file contributing to a chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphSeries {
    /// Display label, independent of the backend stored in the file.
    pub label: String,
    /// Result file path.
    pub path: PathBuf,
}

impl GraphSeries {
    /// Create a series.
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }
}

impl FromStr for GraphSeries {
    type Err = Error;

    /// Parse `label=path`, splitting at the first `=`.
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('=') {
            Some((label, path)) if !label.is_empty() && !path.is_empty() => {
                Ok(Self::new(label, path))
            }
            _ => Err(Error::invalid_input(format!(
                "series `{}` is not of the form LABEL=PATH",
                s
            ))),
        }
    }
}

/// A loaded series with its statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSummary {
    /// Display label.
    pub label: String,
    /// Backend recorded in the file.
    pub backend_id: BackendId,
    /// Samples in seconds, in recorded order.
    pub durations: Vec<f64>,
    /// Statistics over the samples.
    pub summary: Summary,
}

/// Load every series, failing on the first unreadable or malformed file.
pub fn load_series(series: &[GraphSeries]) -> Result<Vec<SeriesSummary>> {
    if series.is_empty() {
        return Err(Error::invalid_input("at least one series is required"));
    }
    series
        .iter()
        .map(|s| {
            let set = io::read_result_set(&s.path)?;
            let durations = set.durations();
            let summary = Summary::from_samples(&durations).ok_or_else(|| Error::MalformedResult {
                path: s.path.clone(),
                reason: "no durations".to_string(),
            })?;
            Ok(SeriesSummary {
                label: s.label.clone(),
                backend_id: set.backend_id(),
                durations,
                summary,
            })
        })
        .collect()
}

/// Load `series` and write a comparison chart to `output`.
pub fn render(series: &[GraphSeries], output: &Path, title: &str) -> Result<Vec<SeriesSummary>> {
    let summaries = load_series(series)?;
    let svg = render_svg(&summaries, title)?;
    io::write_atomic(output, svg.as_bytes())?;
    info!(output = %output.display(), series = summaries.len(), "rendered chart");
    Ok(summaries)
}

/// Render loaded series as an SVG document.
pub fn render_svg(summaries: &[SeriesSummary], title: &str) -> Result<String> {
    let mut svg = String::new();
    write_svg(&mut svg, summaries, title).map_err(|e| Error::Render(e.to_string()))?;
    Ok(svg)
}

fn write_svg(out: &mut String, summaries: &[SeriesSummary], title: &str) -> fmt::Result {
    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let bottom = MARGIN_TOP + plot_h;

    let max = summaries
        .iter()
        .map(|s| s.summary.max)
        .fold(0.0_f64, f64::max);
    let step = tick_step(max);
    let y_max = step * Y_TICKS as f64;
    let y = |value: f64| bottom - value / y_max * plot_h;

    writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif" font-size="11">"#,
        w = WIDTH,
        h = HEIGHT
    )?;
    writeln!(out, r#"<rect width="100%" height="100%" fill="white"/>"#)?;
    writeln!(
        out,
        r#"<text x="{:.1}" y="24" text-anchor="middle" font-size="13">{}</text>"#,
        MARGIN_LEFT + plot_w / 2.0,
        escape(title)
    )?;

    // y axis, grid and tick labels
    writeln!(out, r#"<g class="axis">"#)?;
    for i in 0..=Y_TICKS {
        let value = step * i as f64;
        let py = y(value);
        writeln!(
            out,
            r##"<line x1="{x0:.1}" y1="{py:.1}" x2="{x1:.1}" y2="{py:.1}" stroke="#e5e5e5"/>"##,
            x0 = MARGIN_LEFT,
            x1 = MARGIN_LEFT + plot_w,
            py = py
        )?;
        writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end" dominant-baseline="middle">{}</text>"#,
            MARGIN_LEFT - 6.0,
            py,
            format_tick(value, step)
        )?;
    }
    writeln!(
        out,
        r##"<line x1="{x:.1}" y1="{top:.1}" x2="{x:.1}" y2="{bottom:.1}" stroke="#333"/>"##,
        x = MARGIN_LEFT,
        top = MARGIN_TOP,
        bottom = bottom
    )?;
    writeln!(
        out,
        r##"<line x1="{x0:.1}" y1="{y:.1}" x2="{x1:.1}" y2="{y:.1}" stroke="#333"/>"##,
        x0 = MARGIN_LEFT,
        x1 = MARGIN_LEFT + plot_w,
        y = bottom
    )?;
    writeln!(
        out,
        r#"<text transform="translate(20 {:.1}) rotate(-90)" text-anchor="middle">duration (s)</text>"#,
        MARGIN_TOP + plot_h / 2.0
    )?;
    writeln!(out, "</g>")?;

    let slot = plot_w / summaries.len() as f64;
    let bar_w = (slot * 0.5).min(80.0);
    for (i, series) in summaries.iter().enumerate() {
        let color = COLORS[i % COLORS.len()];
        let cx = MARGIN_LEFT + slot * (i as f64 + 0.5);
        let left = cx - bar_w / 2.0;
        let s = &series.summary;

        writeln!(
            out,
            r#"<g class="series" data-label="{}" data-backend="{}">"#,
            escape(&series.label),
            series.backend_id
        )?;
        writeln!(
            out,
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}" fill-opacity="0.25"/>"#,
            left,
            y(s.max),
            bar_w,
            (y(s.min) - y(s.max)).max(1.0),
            color
        )?;
        writeln!(
            out,
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}" fill-opacity="0.75"/>"#,
            cx - bar_w / 4.0,
            y(s.mean),
            bar_w / 2.0,
            bottom - y(s.mean),
            color
        )?;
        writeln!(
            out,
            r#"<line x1="{:.1}" y1="{py:.1}" x2="{:.1}" y2="{py:.1}" stroke="{}" stroke-width="2"/>"#,
            left,
            left + bar_w,
            color,
            py = y(s.median)
        )?;
        for sample in &series.durations {
            writeln!(
                out,
                r##"<circle cx="{:.1}" cy="{:.1}" r="2.5" fill="{}" fill-opacity="0.75" stroke="#333" stroke-width="0.5"/>"##,
                cx,
                y(*sample),
                color
            )?;
        }
        writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
            cx,
            bottom + 18.0,
            escape(&series.label)
        )?;
        writeln!(out, "</g>")?;
    }

    // legend
    let legend_x = MARGIN_LEFT + plot_w + 20.0;
    writeln!(out, r#"<g class="legend">"#)?;
    for (i, series) in summaries.iter().enumerate() {
        let ly = MARGIN_TOP + 20.0 * i as f64;
        writeln!(
            out,
            r#"<rect x="{:.1}" y="{:.1}" width="12" height="12" fill="{}" fill-opacity="0.75"/>"#,
            legend_x,
            ly,
            COLORS[i % COLORS.len()]
        )?;
        writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}">{} (mean {} s)</text>"#,
            legend_x + 18.0,
            ly + 10.0,
            escape(&series.label),
            format_tick(series.summary.mean, step / 100.0)
        )?;
    }
    writeln!(out, "</g>")?;
    writeln!(out, "</svg>")
}

/// A round tick step (1, 2 or 5 times a power of ten) so that
/// `Y_TICKS` steps cover `max`.
fn tick_step(max: f64) -> f64 {
    if max <= 0.0 || !max.is_finite() {
        return 1.0 / Y_TICKS as f64;
    }
    let raw = max / Y_TICKS as f64;
    let magnitude = 10f64.powi(raw.log10().floor() as i32);
    let normalized = raw / magnitude;
    let nice = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

fn format_tick(value: f64, step: f64) -> String {
    let decimals = (-step.log10().floor()).max(0.0) as usize;
    format!("{:.*}", decimals, value)
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}
