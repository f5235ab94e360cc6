use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use restock_core::config::LoadOptions;
use restock_core::report::{ProductFailure, Report, ReportRow};
use serde::Serialize;
use tracing::info;

use crate::commands::{load_config, with_service, CommandResult};

#[derive(Debug, Serialize)]
struct ReportOutput<'a> {
    rows: &'a [ReportRow],
    failures: &'a [ProductFailure],
    #[serde(skip_serializing_if = "Option::is_none")]
    output_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    csv: Option<String>,
}

/// Builds the replenishment report and exports it as CSV, to `output` when
/// given and inline in the payload otherwise.
pub fn run(options: LoadOptions, output: Option<PathBuf>) -> CommandResult {
    let config = match load_config("report", options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let report =
        match with_service("report", &config, |service| async move { service.build_report().await })
        {
            Ok(report) => report,
            Err(result) => return result,
        };

    let (output_path, csv) = match output {
        Some(path) => match write_report(&report, &path) {
            Ok(()) => (Some(path.display().to_string()), None),
            Err(message) => return CommandResult::failure("report", "export", message, 3),
        },
        None => match report.to_csv_string() {
            Ok(csv) => (None, Some(csv)),
            Err(error) => return CommandResult::failure("report", "export", error.to_string(), 3),
        },
    };

    let message = match &output_path {
        Some(path) => format!("wrote {} report rows to {path}", report.rows.len()),
        None => format!("{} report rows", report.rows.len()),
    };
    let message = if report.failures.is_empty() {
        message
    } else {
        format!("{message} ({} products failed)", report.failures.len())
    };

    let payload =
        ReportOutput { rows: &report.rows, failures: &report.failures, output_path, csv };
    CommandResult::success_with_data("report", message, &payload)
}

fn write_report(report: &Report, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|error| format!("could not create `{}`: {error}", parent.display()))?;
    }
    let file = File::create(path)
        .map_err(|error| format!("could not create `{}`: {error}", path.display()))?;
    report.write_csv(BufWriter::new(file)).map_err(|error| error.to_string())?;

    info!(
        event_name = "cli.report.exported",
        path = %path.display(),
        rows = report.rows.len(),
        failures = report.failures.len(),
        "replenishment report exported"
    );
    Ok(())
}
