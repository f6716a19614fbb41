//! # damage_cli - Road Flood Damage Runner
//!
//! Runs one configured damage analysis over a segment file and writes the
//! result table.
//!
//! Usage:
//!   damage_cli --config damages.json --segments segments.csv --output damages.csv
//!
//! Without `--output` the result is written next to the input as
//! `<segments>_damages.csv`. A JSON run summary goes to stdout.
//!
//! On failure a JSON error report goes to stderr. The exit code is 2 when
//! the input data is at fault and 1 for every other failure.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use damage_core::analysis::{risk_totals, run_damages};
use damage_core::config::load_config;
use damage_core::file_io::{load_segments, save_segments};
use damage_core::DamageError;

#[derive(Debug, Serialize)]
struct RunSummary {
    name: String,
    generated_at: DateTime<Utc>,
    damage_curve: String,
    risk_mode: String,
    rows: usize,
    damaged_rows: usize,
    columns_added: Vec<String>,
    total_risk: BTreeMap<String, f64>,
    output: PathBuf,
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn default_output(segments: &Path) -> PathBuf {
    let stem = segments
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "segments".to_string());
    segments.with_file_name(format!("{}_damages.csv", stem))
}

#[derive(Debug, Serialize)]
struct ErrorReport {
    code: &'static str,
    data_error: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<DamageError>,
}

impl ErrorReport {
    fn from_error(err: &anyhow::Error) -> Self {
        let damage = err.downcast_ref::<DamageError>();
        ErrorReport {
            code: damage.map(DamageError::error_code).unwrap_or("CLI_ERROR"),
            data_error: damage.is_some_and(DamageError::is_data_error),
            message: format!("{:#}", err),
            details: damage.cloned(),
        }
    }

    fn exit_code(&self) -> u8 {
        if self.data_error {
            2
        } else {
            1
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("Usage: damage_cli --config <json> --segments <csv> [--output <csv>]");
        return ExitCode::SUCCESS;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let report = ErrorReport::from_error(&err);
            log::error!("{} ({})", report.message, report.code);
            match serde_json::to_string_pretty(&report) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("{}", report.message),
            }
            ExitCode::from(report.exit_code())
        }
    }
}

fn run(args: &[String]) -> Result<()> {
    let Some(config_path) = arg_value(args, "--config").map(PathBuf::from) else {
        bail!("missing --config <json>");
    };
    let Some(segments_path) = arg_value(args, "--segments").map(PathBuf::from) else {
        bail!("missing --segments <csv>");
    };
    let output_path = arg_value(args, "--output")
        .map(PathBuf::from)
        .unwrap_or_else(|| default_output(&segments_path));

    let config = load_config(&config_path)
        .with_context(|| format!("Cannot load configuration {}", config_path.display()))?;

    let report = config.validate();
    for issue in &report.issues {
        log::error!("{}: {}", issue.field, issue.reason);
    }
    report
        .into_result()
        .with_context(|| format!("Configuration {} is invalid", config_path.display()))?;

    let table = load_segments(&segments_path, config.csv_separator, &config.hazard_prefix)
        .with_context(|| format!("Cannot load segments {}", segments_path.display()))?;

    let table = run_damages(&config, table)
        .with_context(|| format!("Analysis '{}' failed", config.name))?;

    save_segments(&table, &output_path, config.csv_separator)
        .with_context(|| format!("Cannot write results to {}", output_path.display()))?;

    let summary = RunSummary {
        name: config.name.clone(),
        generated_at: Utc::now(),
        damage_curve: config.damage_curve.code().to_string(),
        risk_mode: config.risk_calculation_mode.code().to_string(),
        rows: table.len(),
        damaged_rows: table.damaged_rows(),
        columns_added: table
            .output_columns()
            .iter()
            .chain(table.quantile_columns())
            .cloned()
            .collect(),
        total_risk: risk_totals(&table),
        output: output_path,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_errors_exit_with_2() {
        let err = anyhow::Error::new(DamageError::missing_field("length")).context("Cannot load segments s.csv");
        let report = ErrorReport::from_error(&err);
        assert_eq!(report.code, "MISSING_FIELD");
        assert!(report.data_error);
        assert_eq!(report.exit_code(), 2);
        assert!(report.message.starts_with("Cannot load segments s.csv"));
    }

    #[test]
    fn test_other_errors_exit_with_1() {
        let err = anyhow::Error::new(DamageError::not_implemented("damage curve", "XYZ"));
        let report = ErrorReport::from_error(&err);
        assert_eq!(report.code, "NOT_IMPLEMENTED");
        assert_eq!(report.exit_code(), 1);

        let plain = ErrorReport::from_error(&anyhow::anyhow!("missing --config <json>"));
        assert_eq!(plain.code, "CLI_ERROR");
        assert!(plain.details.is_none());
        assert_eq!(plain.exit_code(), 1);
    }

    #[test]
    fn test_default_output_next_to_input() {
        assert_eq!(
            default_output(Path::new("data/segments.csv")),
            PathBuf::from("data/segments_damages.csv")
        );
    }
}
