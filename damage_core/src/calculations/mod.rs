//! # Damage and Risk Calculations
//!
//! The computation stages, in pipeline order:
//!
//! - [`cleanup`] - road type remapping, lane cleanup, exposure mask
//! - [`damage`] - per-event damage with one [`DamageCurveKind`]
//! - [`shaper`] - per-curve return period frames built from damage columns
//! - [`risk`] - annualized risk by trapezoidal integration
//!
//! Every stage takes a [`SegmentTable`](crate::segments::SegmentTable) by
//! value and returns it, so stages compose as plain function calls.

pub mod cleanup;
pub mod damage;
pub mod risk;
pub mod shaper;

use serde::{Deserialize, Serialize};

use crate::errors::{DamageError, DamageResult};

pub use damage::SegmentDamageCalculator;
pub use risk::{RiskCalculationMode, RiskIntegrator, RiskMode};
pub use shaper::{IntegrationFrame, IntegrationShaper};

/// Damage estimation method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum DamageCurveKind {
    /// Single calibrated Huizinga curve
    #[serde(rename = "HZ")]
    Huizinga,
    /// OSdaMage curves C1..C6 with max damage uncertainty quantiles
    #[serde(rename = "OSD")]
    OsdaMage,
    /// User-supplied damage functions
    #[serde(rename = "MAN")]
    Manual,
}

impl DamageCurveKind {
    pub const ALL: [DamageCurveKind; 3] = [
        DamageCurveKind::Huizinga,
        DamageCurveKind::OsdaMage,
        DamageCurveKind::Manual,
    ];

    /// Selector code used in configuration files
    pub fn code(&self) -> &'static str {
        match self {
            DamageCurveKind::Huizinga => "HZ",
            DamageCurveKind::OsdaMage => "OSD",
            DamageCurveKind::Manual => "MAN",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DamageCurveKind::Huizinga => "Huizinga curves",
            DamageCurveKind::OsdaMage => "OSdaMage functions",
            DamageCurveKind::Manual => "manual damage functions",
        }
    }

    /// Parse a selector (`HZ`, `OSD`, `MAN`, case-insensitive)
    pub fn from_str_flexible(s: &str) -> DamageResult<Self> {
        match s.trim().to_uppercase().as_str() {
            "HZ" | "HUIZINGA" => Ok(DamageCurveKind::Huizinga),
            "OSD" | "OSDAMAGE" => Ok(DamageCurveKind::OsdaMage),
            "MAN" | "MANUAL" => Ok(DamageCurveKind::Manual),
            _ => Err(DamageError::not_implemented("damage curve", s)),
        }
    }
}

impl TryFrom<String> for DamageCurveKind {
    type Error = DamageError;

    fn try_from(s: String) -> DamageResult<Self> {
        Self::from_str_flexible(&s)
    }
}

impl std::fmt::Display for DamageCurveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}
