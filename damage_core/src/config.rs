//! # Analysis Configuration
//!
//! The settings of one damage analysis, stored as JSON.
//!
//! ## Example
//!
//! ```json
//! {
//!   "name": "flood damages",
//!   "event_type": "return_period",
//!   "damage_curve": "HZ",
//!   "risk_calculation_mode": "cut_from_year",
//!   "risk_calculation_year": 25,
//!   "country": "NL"
//! }
//! ```
//!
//! Unset fields take their defaults: representative percentage 100, hazard
//! prefix `F`, separator `,`, no risk calculation.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::calculations::damage::DEFAULT_REPRESENTATIVE_PERCENTAGE;
use crate::calculations::{DamageCurveKind, RiskCalculationMode, RiskMode};
use crate::errors::{DamageError, DamageResult};
use crate::events::EventType;
use crate::lookup::library;
use crate::tabular;

pub const DEFAULT_HAZARD_PREFIX: &str = "F";
pub const DEFAULT_CSV_SEPARATOR: char = ',';

fn default_representative_percentage() -> f64 {
    DEFAULT_REPRESENTATIVE_PERCENTAGE
}

fn default_hazard_prefix() -> String {
    DEFAULT_HAZARD_PREFIX.to_string()
}

fn default_csv_separator() -> char {
    DEFAULT_CSV_SEPARATOR
}

/// Settings of a damage analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamagesConfig {
    /// Analysis name, used in logs and summaries
    pub name: String,

    pub event_type: EventType,

    pub damage_curve: DamageCurveKind,

    #[serde(default)]
    pub risk_calculation_mode: RiskCalculationMode,

    /// Cutoff or triangle end year, depending on the risk mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_calculation_year: Option<u32>,

    /// Max damage percentage between the OSdaMage lower (0) and upper (100)
    /// bound used for the representative damage
    #[serde(default = "default_representative_percentage")]
    pub representative_damage_percentage: f64,

    #[serde(default = "default_hazard_prefix")]
    pub hazard_prefix: String,

    /// Country code for default lane counts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    /// Folder with one sub-folder per manual damage function
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage_functions_folder: Option<PathBuf>,

    #[serde(default = "default_csv_separator")]
    pub csv_separator: char,
}

impl DamagesConfig {
    pub fn new(name: impl Into<String>, event_type: EventType, damage_curve: DamageCurveKind) -> Self {
        DamagesConfig {
            name: name.into(),
            event_type,
            damage_curve,
            risk_calculation_mode: RiskCalculationMode::None,
            risk_calculation_year: None,
            representative_damage_percentage: DEFAULT_REPRESENTATIVE_PERCENTAGE,
            hazard_prefix: default_hazard_prefix(),
            country: None,
            damage_functions_folder: None,
            csv_separator: DEFAULT_CSV_SEPARATOR,
        }
    }

    /// Builder: set the risk mode and its year
    pub fn with_risk(mut self, mode: RiskCalculationMode, year: Option<u32>) -> Self {
        self.risk_calculation_mode = mode;
        self.risk_calculation_year = year;
        self
    }

    /// The risk policy to apply, `None` when no risk is requested
    pub fn risk_mode(&self) -> DamageResult<Option<RiskMode>> {
        self.risk_calculation_mode.to_risk_mode(self.risk_calculation_year)
    }

    /// Collect every problem with this configuration
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        if self.name.trim().is_empty() {
            report.push("name", "Analysis name is empty");
        }
        if self.hazard_prefix.trim().is_empty() || self.hazard_prefix.contains('_') {
            report.push(
                "hazard_prefix",
                format!("'{}' is not a single column name token", self.hazard_prefix),
            );
        }
        if self.damage_curve == DamageCurveKind::Manual && self.damage_functions_folder.is_none() {
            report.push(
                "damage_functions_folder",
                "Manual damage curves need a damage functions folder",
            );
        }
        match (self.risk_calculation_mode, self.risk_calculation_year) {
            (RiskCalculationMode::CutFromYear, None) => {
                report.push("risk_calculation_year", "cut_from_year mode needs a year")
            }
            (RiskCalculationMode::TriangleToNullYear, None) => {
                report.push("risk_calculation_year", "triangle_to_null_year mode needs a year")
            }
            (RiskCalculationMode::TriangleToNullYear, Some(0)) => report.push(
                "risk_calculation_year",
                "triangle_to_null_year mode needs a year greater than 0",
            ),
            _ => {}
        }
        if self.risk_calculation_mode != RiskCalculationMode::None && self.event_type == EventType::Event {
            log::warn!(
                "Risk calculation mode '{}' is ignored for independent events",
                self.risk_calculation_mode.code()
            );
        }
        if let Some(country) = &self.country {
            match library() {
                Ok(lib) => {
                    let code = country.trim().to_uppercase();
                    if !lib.countries().contains(&code.as_str()) {
                        report.push(
                            "country",
                            format!("'{}' is not one of {}", country, lib.countries().join(", ")),
                        );
                    }
                }
                Err(e) => report.push("country", format!("Lane defaults unavailable: {}", e)),
            }
        }
        if let Err(e) = tabular::delimiter(self.csv_separator) {
            report.push("csv_separator", e.to_string());
        }
        if !self.representative_damage_percentage.is_finite() {
            report.push(
                "representative_damage_percentage",
                format!("{} is not a finite number", self.representative_damage_percentage),
            );
        }

        report
    }
}

/// One configuration problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub reason: String,
}

/// Every problem found in a configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn push(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.issues.push(ValidationIssue {
            field: field.into(),
            reason: reason.into(),
        });
    }

    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// `Ok` when valid, otherwise an `InvalidInput` error naming every issue
    pub fn into_result(self) -> DamageResult<()> {
        if self.is_valid() {
            return Ok(());
        }
        let fields: Vec<&str> = self.issues.iter().map(|i| i.field.as_str()).collect();
        let reasons: Vec<String> = self
            .issues
            .iter()
            .map(|i| format!("{}: {}", i.field, i.reason))
            .collect();
        Err(DamageError::invalid_input("config", fields.join(", "), reasons.join("; ")))
    }
}

/// Selector fields are closed enumerations; an unknown value is reported as
/// `NotImplemented` rather than as a JSON shape problem
fn check_selectors(value: &serde_json::Value) -> DamageResult<()> {
    let selector = |field: &str| value.get(field).and_then(serde_json::Value::as_str);
    if let Some(s) = selector("event_type") {
        EventType::from_str_flexible(s)?;
    }
    if let Some(s) = selector("damage_curve") {
        DamageCurveKind::from_str_flexible(s)?;
    }
    if let Some(s) = selector("risk_calculation_mode") {
        RiskCalculationMode::from_str_flexible(s)?;
    }
    Ok(())
}

/// Read a configuration from a JSON file
pub fn load_config(path: &Path) -> DamageResult<DamagesConfig> {
    let mut file = File::open(path).map_err(|e| {
        DamageError::file_error("open", path.display().to_string(), e.to_string())
    })?;

    let mut contents = String::new();
    file.read_to_string(&mut contents).map_err(|e| {
        DamageError::file_error("read", path.display().to_string(), e.to_string())
    })?;

    let value: serde_json::Value =
        serde_json::from_str(&contents).map_err(|e| DamageError::SerializationError {
            reason: format!("Invalid JSON in {}: {}", path.display(), e),
        })?;
    check_selectors(&value)?;

    let config: DamagesConfig =
        serde_json::from_value(value).map_err(|e| DamageError::SerializationError {
            reason: format!("Invalid configuration in {}: {}", path.display(), e),
        })?;

    log::debug!("Loaded configuration '{}' from {}", config.name, path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;
    use std::fs;

    fn fields(report: &ValidationReport) -> Vec<&str> {
        report.issues.iter().map(|i| i.field.as_str()).collect()
    }

    #[test]
    fn test_defaults_from_minimal_json() {
        let json = r#"{"name": "a", "event_type": "return_period", "damage_curve": "HZ"}"#;
        let config: DamagesConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.event_type, EventType::ReturnPeriod);
        assert_eq!(config.damage_curve, DamageCurveKind::Huizinga);
        assert_eq!(config.risk_calculation_mode, RiskCalculationMode::None);
        assert_eq!(config.representative_damage_percentage, 100.0);
        assert_eq!(config.hazard_prefix, "F");
        assert_eq!(config.csv_separator, ',');
        assert!(config.validate().is_valid());
        assert_eq!(config.risk_mode().unwrap(), None);
    }

    #[test]
    fn test_full_json() {
        let json = r#"{
            "name": "b",
            "event_type": "return_period",
            "damage_curve": "OSD",
            "risk_calculation_mode": "cut_from_year",
            "risk_calculation_year": 25,
            "representative_damage_percentage": 50,
            "hazard_prefix": "G",
            "country": "nl",
            "csv_separator": ";"
        }"#;
        let config: DamagesConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.risk_mode().unwrap(), Some(RiskMode::CutFromYear(25)));
        assert_eq!(config.csv_separator, ';');
        assert!(config.validate().is_valid());
    }

    #[test]
    fn test_validation_lists_every_issue() {
        let mut config = DamagesConfig::new(" ", EventType::ReturnPeriod, DamageCurveKind::Manual)
            .with_risk(RiskCalculationMode::TriangleToNullYear, Some(0));
        config.country = Some("XX".to_string());
        config.representative_damage_percentage = f64::NAN;

        let report = config.validate();
        assert_eq!(
            fields(&report),
            vec![
                "name",
                "damage_functions_folder",
                "risk_calculation_year",
                "country",
                "representative_damage_percentage"
            ]
        );
        assert!(matches!(report.into_result(), Err(DamageError::InvalidInput { .. })));
    }

    #[test]
    fn test_cut_from_without_year() {
        let mut config = DamagesConfig::new("c", EventType::ReturnPeriod, DamageCurveKind::Huizinga)
            .with_risk(RiskCalculationMode::CutFromYear, None);
        config.csv_separator = '¦';
        assert_eq!(fields(&config.validate()), vec!["risk_calculation_year", "csv_separator"]);
        assert!(matches!(config.risk_mode(), Err(DamageError::MissingField { .. })));
    }

    #[test]
    fn test_load_config_file() {
        let path = temp_dir().join("roadrisk_test_config.json");
        let config = DamagesConfig::new("file", EventType::Event, DamageCurveKind::Huizinga);
        fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded, config);

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_config(&path), Err(DamageError::SerializationError { .. })));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_unknown_selectors_in_file_are_not_implemented() {
        let path = temp_dir().join("roadrisk_test_config_selectors.json");

        fs::write(&path, r#"{"name":"a","event_type":"return_period","damage_curve":"XYZ"}"#).unwrap();
        match load_config(&path) {
            Err(DamageError::NotImplemented { selector, value }) => {
                assert_eq!(selector, "damage curve");
                assert_eq!(value, "XYZ");
            }
            other => panic!("expected NotImplemented, got {:?}", other),
        }

        fs::write(
            &path,
            r#"{"name":"a","event_type":"return_period","damage_curve":"HZ","risk_calculation_mode":"integral"}"#,
        )
        .unwrap();
        assert!(matches!(load_config(&path), Err(DamageError::NotImplemented { .. })));

        fs::write(&path, r#"{"name":"a","event_type":"storm","damage_curve":"HZ"}"#).unwrap();
        assert!(matches!(load_config(&path), Err(DamageError::NotImplemented { .. })));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_selectors_accept_flexible_spellings() {
        let json = r#"{
            "name": "c",
            "event_type": "Return Period",
            "damage_curve": "osd",
            "risk_calculation_mode": "triangle-to-null"
        }"#;
        let config: DamagesConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.event_type, EventType::ReturnPeriod);
        assert_eq!(config.damage_curve, DamageCurveKind::OsdaMage);
        assert_eq!(config.risk_calculation_mode, RiskCalculationMode::TriangleToNullYear);

        let saved = serde_json::to_value(&config).unwrap();
        assert_eq!(saved["damage_curve"], "OSD");
        assert_eq!(saved["risk_calculation_mode"], "triangle_to_null_year");
    }
}
