//! # Unit Types
//!
//! Type-safe wrappers for the units that appear in damage inputs. Hazard
//! severity is carried in meters and max damage in currency per meter of road
//! once a table has been constructed; the source units are only ever seen at
//! construction time.
//!
//! ## Canonical Units
//!
//! - Hazard severity (water depth): meters (m)
//! - Max damage: currency per meter of road length (e.g. euro/m)
//!
//! ## Example
//!
//! ```rust
//! use damage_core::units::{Centimeters, Meters, EuroPerKm, EuroPerMeter};
//!
//! let depth: Meters = Centimeters(150.0).into();
//! assert_eq!(depth.0, 1.5);
//!
//! let cost: EuroPerMeter = EuroPerKm(350_000.0).into();
//! assert_eq!(cost.0, 350.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{DamageError, DamageResult};

// ============================================================================
// Severity Units
// ============================================================================

/// Hazard severity in meters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Meters(pub f64);

/// Hazard severity in centimeters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Centimeters(pub f64);

/// Hazard severity in millimeters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Millimeters(pub f64);

impl From<Centimeters> for Meters {
    fn from(cm: Centimeters) -> Self {
        Meters(cm.0 / 100.0)
    }
}

impl From<Millimeters> for Meters {
    fn from(mm: Millimeters) -> Self {
        Meters(mm.0 / 1000.0)
    }
}

/// Unit label of a severity column, as found in curve files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeverityUnit {
    #[serde(rename = "m")]
    Meters,
    #[serde(rename = "cm")]
    Centimeters,
    #[serde(rename = "mm")]
    Millimeters,
}

impl SeverityUnit {
    /// Parse a unit label such as `cm`, `m` or `depth (cm)`.
    ///
    /// A label with a parenthesised part uses the text between the parentheses.
    pub fn from_label(label: &str) -> DamageResult<Self> {
        let trimmed = label.trim();
        let inner = match (trimmed.find('('), trimmed.rfind(')')) {
            (Some(open), Some(close)) if open < close => &trimmed[open + 1..close],
            _ => trimmed,
        };
        match inner.trim().to_lowercase().as_str() {
            "m" | "meter" | "meters" | "metre" | "metres" => Ok(SeverityUnit::Meters),
            "cm" | "centimeter" | "centimeters" => Ok(SeverityUnit::Centimeters),
            "mm" | "millimeter" | "millimeters" => Ok(SeverityUnit::Millimeters),
            _ => Err(DamageError::invalid_input(
                "severity unit",
                label,
                "Supported severity units are m, cm and mm",
            )),
        }
    }

    /// Convert a severity value in this unit to meters
    pub fn to_meters(self, value: f64) -> Meters {
        match self {
            SeverityUnit::Meters => Meters(value),
            SeverityUnit::Centimeters => Centimeters(value).into(),
            SeverityUnit::Millimeters => Millimeters(value).into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            SeverityUnit::Meters => "m",
            SeverityUnit::Centimeters => "cm",
            SeverityUnit::Millimeters => "mm",
        }
    }
}

impl std::fmt::Display for SeverityUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Cost Units
// ============================================================================

/// Max damage in currency per meter of road
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EuroPerMeter(pub f64);

/// Max damage in currency per kilometer of road
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EuroPerKm(pub f64);

impl From<EuroPerKm> for EuroPerMeter {
    fn from(per_km: EuroPerKm) -> Self {
        EuroPerMeter(per_km.0 / 1000.0)
    }
}

/// Length part of a cost unit label (`euro/m`, `euro/km`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LengthUnit {
    #[serde(rename = "m")]
    Meter,
    #[serde(rename = "km")]
    Kilometer,
}

/// A `<currency>/<length>` unit label from a max damage file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostUnit {
    pub currency: String,
    pub length: LengthUnit,
}

impl CostUnit {
    /// The canonical unit all max damage tables are stored in
    pub fn canonical() -> Self {
        CostUnit {
            currency: "euro".to_string(),
            length: LengthUnit::Meter,
        }
    }

    /// Parse a label such as `euro/m` or `euro/km`
    pub fn from_label(label: &str) -> DamageResult<Self> {
        let (currency, length) = label.trim().split_once('/').ok_or_else(|| {
            DamageError::invalid_input(
                "cost unit",
                label,
                "Expected a '<currency>/<length>' label such as 'euro/m'",
            )
        })?;
        let length = match length.trim().to_lowercase().as_str() {
            "m" => LengthUnit::Meter,
            "km" => LengthUnit::Kilometer,
            _ => {
                return Err(DamageError::invalid_input(
                    "cost unit",
                    label,
                    "Only per-meter and per-kilometer max damages are supported",
                ))
            }
        };
        Ok(CostUnit {
            currency: currency.trim().to_string(),
            length,
        })
    }

    /// Convert a value in this unit to the per-meter equivalent
    pub fn to_per_meter(&self, value: f64) -> EuroPerMeter {
        match self.length {
            LengthUnit::Meter => EuroPerMeter(value),
            LengthUnit::Kilometer => EuroPerKm(value).into(),
        }
    }

    /// True when values in this unit are already per meter
    pub fn is_per_meter(&self) -> bool {
        self.length == LengthUnit::Meter
    }
}

impl std::fmt::Display for CostUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let length = match self.length {
            LengthUnit::Meter => "m",
            LengthUnit::Kilometer => "km",
        };
        write!(f, "{}/{}", self.currency, length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centimeters_to_meters() {
        let depth: Meters = Centimeters(50.0).into();
        assert_eq!(depth.0, 0.5);
        assert_eq!(SeverityUnit::Millimeters.to_meters(250.0), Meters(0.25));
    }

    #[test]
    fn test_per_km_to_per_m() {
        let cost: EuroPerMeter = EuroPerKm(175_000.0).into();
        assert_eq!(cost.0, 175.0);
    }

    #[test]
    fn test_severity_unit_labels() {
        assert_eq!(SeverityUnit::from_label("cm").unwrap(), SeverityUnit::Centimeters);
        assert_eq!(SeverityUnit::from_label(" M ").unwrap(), SeverityUnit::Meters);
        assert_eq!(
            SeverityUnit::from_label("depth (cm)").unwrap(),
            SeverityUnit::Centimeters
        );
        assert!(SeverityUnit::from_label("ft").is_err());
    }

    #[test]
    fn test_cost_unit_labels() {
        let unit = CostUnit::from_label("euro/km").unwrap();
        assert_eq!(unit.length, LengthUnit::Kilometer);
        assert_eq!(unit.to_per_meter(2000.0), EuroPerMeter(2.0));
        assert!(!unit.is_per_meter());
        assert_eq!(unit.to_string(), "euro/km");

        assert_eq!(CostUnit::from_label("euro/m").unwrap(), CostUnit::canonical());
        assert!(CostUnit::from_label("euro/yard").is_err());
        assert!(CostUnit::from_label("euro").is_err());
    }

    #[test]
    fn test_serialization() {
        let depth = Meters(1.25);
        let json = serde_json::to_string(&depth).unwrap();
        assert_eq!(json, "1.25");
        let unit_json = serde_json::to_string(&SeverityUnit::Centimeters).unwrap();
        assert_eq!(unit_json, "\"cm\"");
    }
}
