//! Markdown output generation for comparison summaries.
//!
//! This module renders the statistics behind a chart as a markdown table,
//! optionally relative to a baseline series.

use crate::graph::SeriesSummary;
use std::fmt::Write;
use vfs_bench_core::{Error, Result};

/// Generate a markdown summary of loaded series.
///
/// When `baseline` names one of the series, an extra column shows how each
/// mean differs from the baseline mean (positive means slower).
pub fn generate_summary(series: &[SeriesSummary], baseline: Option<&str>) -> Result<String> {
    let baseline = match baseline {
        Some(label) => Some(
            series
                .iter()
                .find(|s| s.label == label)
                .ok_or_else(|| {
                    Error::invalid_input(format!("baseline `{}` is not one of the series", label))
                })?,
        ),
        None => None,
    };

    let mut output = String::new();

    writeln!(output, "# Benchmark Summary").unwrap();
    writeln!(output).unwrap();
    writeln!(output, "Generated: {}", chrono::Utc::now().to_rfc3339()).unwrap();
    writeln!(output).unwrap();
    writeln!(output, "## Results").unwrap();
    writeln!(output).unwrap();
    write!(
        output,
        "| Series | Backend | Runs | Mean (s) | Median (s) | Std dev (s) | Min (s) | Max (s) |"
    )
    .unwrap();
    match baseline {
        Some(base) => writeln!(output, " vs {} |", base.label).unwrap(),
        None => writeln!(output).unwrap(),
    }
    write!(output, "|--------|---------|------|----------|------------|-------------|---------|---------|").unwrap();
    match baseline {
        Some(_) => writeln!(output, "------|").unwrap(),
        None => writeln!(output).unwrap(),
    }

    for s in series {
        let stats = &s.summary;
        write!(
            output,
            "| {} | {} | {} | {:.6} | {:.6} | {:.6} | {:.6} | {:.6} |",
            s.label, s.backend_id, stats.count, stats.mean, stats.median, stats.std_dev, stats.min, stats.max
        )
        .unwrap();
        match baseline {
            Some(base) => {
                let relative = stats
                    .relative_to(&base.summary)
                    .map(|r| format!("{:+.1}%", r * 100.0))
                    .unwrap_or_else(|| "n/a".to_string());
                writeln!(output, " {} |", relative).unwrap();
            }
            None => writeln!(output).unwrap(),
        }
    }

    writeln!(output).unwrap();
    writeln!(output, "---").unwrap();
    writeln!(output, "Total series: {}", series.len()).unwrap();

    Ok(output)
}
