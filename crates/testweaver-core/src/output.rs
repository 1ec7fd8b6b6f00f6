//! JSON run report written next to the generated tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::model::{display_path, GenerationResult, GenerationStatistics};

/// Report file name inside the output directory.
pub const REPORT_FILE_NAME: &str = "test-generation-report.json";

/// Values of `output.reportFormats` that produce a report.
pub const SUPPORTED_REPORT_FORMATS: &[&str] = &["json"];

/// Configured report formats that have no writer, in configured order.
pub fn unsupported_report_formats(formats: &[String]) -> Vec<&str> {
    formats
        .iter()
        .map(|f| f.as_str())
        .filter(|f| {
            !SUPPORTED_REPORT_FORMATS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(f.trim()))
        })
        .collect()
}

/// Whether a JSON report was asked for. Unsupported formats are logged.
pub fn json_report_requested(formats: &[String]) -> bool {
    for format in unsupported_report_formats(formats) {
        warn!("Report format '{format}' is not supported, only json reports are written");
    }
    formats.iter().any(|f| f.trim().eq_ignore_ascii_case("json"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportFile {
    pub file_path: String,
    pub source_file_path: String,
    pub framework: String,
    pub test_cases: usize,
    pub is_new_file: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub success: bool,
    pub files_generated: usize,
    pub test_cases: usize,
    pub errors: usize,
    pub warnings: usize,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: String,
    pub project_path: String,
    pub summary: ReportSummary,
    pub statistics: GenerationStatistics,
    /// Test case count per target class.
    pub classes: BTreeMap<String, usize>,
    pub files: Vec<ReportFile>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Summarise a finished run.
pub fn build_report(result: &GenerationResult, project_path: &Path) -> RunReport {
    let mut classes = BTreeMap::new();
    for case in &result.test_cases {
        *classes.entry(case.target_class.clone()).or_insert(0) += 1;
    }
    let files = result
        .generated_files
        .iter()
        .map(|f| ReportFile {
            file_path: display_path(&f.file_path),
            source_file_path: display_path(&f.source_file_path),
            framework: f.framework.clone(),
            test_cases: f.test_cases.len(),
            is_new_file: f.is_new_file,
        })
        .collect();

    RunReport {
        generated_at: Utc::now().to_rfc3339(),
        project_path: display_path(project_path),
        summary: ReportSummary {
            success: result.success,
            files_generated: result.generated_files.len(),
            test_cases: result.test_cases.len(),
            errors: result.errors.len(),
            warnings: result.warnings.len(),
            duration_ms: result.duration_ms,
        },
        statistics: result.statistics.clone(),
        classes,
        files,
        errors: result.errors.clone(),
        warnings: result.warnings.clone(),
    }
}

pub fn report_path(output_dir: &Path) -> PathBuf {
    output_dir.join(REPORT_FILE_NAME)
}

pub fn write_output(report: &RunReport, output_path: &Path) -> std::io::Result<()> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report).map_err(std::io::Error::other)?;
    std::fs::write(output_path, json)
}
