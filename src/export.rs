use crate::models::{DocumentResult, FieldRecord};
use crate::utils::{DeedError, Result};
use chrono::{DateTime, Local};
use clap::ValueEnum;
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::fs;
use std::path::{Path, PathBuf};

pub const EMPTY_CSV_MESSAGE: &str = "No results to export.\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Batch timestamp as used in result file names, e.g. `20240131_142501`.
pub fn batch_timestamp(now: &DateTime<Local>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

pub fn results_path(output_dir: &Path, timestamp: &str, format: ExportFormat) -> PathBuf {
    output_dir.join(format!("results_{}.{}", timestamp, format.extension()))
}

pub fn to_json(results: &DocumentResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(results)?)
}

/// One header row then one row per page. With no pages the output is a
/// single notice line instead.
pub fn to_csv(results: &DocumentResult) -> String {
    if results.is_empty() {
        return EMPTY_CSV_MESSAGE.to_string();
    }

    let mut output = String::new();
    let header: Vec<String> = ["source_file", "page", "confidence_avg", "confidence_threshold"]
        .iter()
        .chain(FieldRecord::KEYS.iter())
        .map(|h| escape_csv(h))
        .collect();
    output.push_str(&header.join(","));
    output.push('\n');

    for result in results {
        let mut row = vec![
            escape_csv(&result.source_file),
            result.page.to_string(),
            format!("{:?}", result.confidence_avg),
            format!("{:?}", result.confidence_threshold),
        ];
        row.extend(result.fields.entries().iter().map(|(_, value)| escape_csv(value)));
        let _ = writeln!(output, "{}", row.join(","));
    }
    output
}

/// Write the batch results to `results_<timestamp>.<ext>` in `output_dir`.
pub fn write_results(
    results: &DocumentResult,
    format: ExportFormat,
    output_dir: &Path,
    timestamp: &str,
) -> Result<PathBuf> {
    let contents = match format {
        ExportFormat::Json => to_json(results)?,
        ExportFormat::Csv => to_csv(results),
    };
    let path = results_path(output_dir, timestamp, format);
    fs::write(&path, contents)
        .map_err(|e| DeedError::Export(format!("Failed to write {}: {}", path.display(), e)))?;
    info!("Wrote {} page results to {:?}", results.len(), path);
    Ok(path)
}

fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
