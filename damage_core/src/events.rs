//! # Events and Column Naming
//!
//! Hazard data arrives as one column per (event, statistic), named
//! `<prefix>_<event>_<stat>`, e.g. `F_RP100_me` (mean water depth for the
//! 100-year return period) or `F_EV1_fr` (inundated fraction of event 1).
//!
//! The set of events is either a list of named events or a list of return
//! periods. Both expose the same labels to the damage calculation; only the
//! return-period variant carries the numeric years needed for risk
//! integration.
//!
//! Output columns follow fixed conventions, built by the helpers at the
//! bottom of this module.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::{DamageError, DamageResult};

/// Statistic suffix for mean hazard severity
pub const STAT_MEAN: &str = "me";
/// Statistic suffix for the exposed fraction of a segment
pub const STAT_FRACTION: &str = "fr";

/// How hazard events should be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum EventType {
    /// Independent named events (`EV1`, `EV2`, ...)
    Event,
    /// Events with a return period (`RP10`, `RP100`, ...)
    ReturnPeriod,
}

impl EventType {
    pub fn from_str_flexible(s: &str) -> DamageResult<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "event" | "events" => Ok(EventType::Event),
            "return_period" | "return_periods" | "rp" => Ok(EventType::ReturnPeriod),
            _ => Err(DamageError::not_implemented("event type", s)),
        }
    }
}

impl TryFrom<String> for EventType {
    type Error = DamageError;

    fn try_from(s: String) -> DamageResult<Self> {
        Self::from_str_flexible(&s)
    }
}

/// A return period label with its recurrence interval in years
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnPeriod {
    pub label: String,
    pub years: f64,
}

impl ReturnPeriod {
    /// Parse a label such as `RP100`
    pub fn from_label(label: &str) -> DamageResult<Self> {
        let years = label
            .strip_prefix("RP")
            .and_then(|y| y.parse::<f64>().ok())
            .filter(|y| y.is_finite() && *y > 0.0)
            .ok_or_else(|| {
                DamageError::invalid_input(
                    "return period",
                    label,
                    "Return period events must be labelled 'RP<years>', e.g. 'RP100'",
                )
            })?;
        Ok(ReturnPeriod {
            label: label.to_string(),
            years,
        })
    }

    /// Annual exceedance frequency
    pub fn frequency(&self) -> f64 {
        1.0 / self.years
    }
}

/// The events a damage calculation iterates over
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "events")]
pub enum EventSet {
    Events(Vec<String>),
    ReturnPeriods(Vec<ReturnPeriod>),
}

impl EventSet {
    /// Collect the distinct events from hazard column names.
    ///
    /// Fails when no event can be found, or when return periods are requested
    /// and a label is not of the form `RP<years>`.
    pub fn from_hazard_columns(event_type: EventType, columns: &[String]) -> DamageResult<Self> {
        let labels: BTreeSet<String> = columns
            .iter()
            .filter_map(|c| HazardColumn::parse(c))
            .map(|hc| hc.event)
            .collect();

        if labels.is_empty() {
            return Err(DamageError::precondition(match event_type {
                EventType::Event => "No event columns present in hazard data",
                EventType::ReturnPeriod => "No return period columns present in hazard data",
            }));
        }

        match event_type {
            EventType::Event => Ok(EventSet::Events(labels.into_iter().collect())),
            EventType::ReturnPeriod => {
                let mut rps = labels
                    .iter()
                    .map(|l| ReturnPeriod::from_label(l))
                    .collect::<DamageResult<Vec<_>>>()?;
                rps.sort_by(|a, b| a.years.total_cmp(&b.years));
                Ok(EventSet::ReturnPeriods(rps))
            }
        }
    }

    /// Uniform accessor: the event labels as they appear in column names
    pub fn labels(&self) -> Vec<&str> {
        match self {
            EventSet::Events(events) => events.iter().map(|e| e.as_str()).collect(),
            EventSet::ReturnPeriods(rps) => rps.iter().map(|rp| rp.label.as_str()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            EventSet::Events(events) => events.len(),
            EventSet::ReturnPeriods(rps) => rps.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn event_type(&self) -> EventType {
        match self {
            EventSet::Events(_) => EventType::Event,
            EventSet::ReturnPeriods(_) => EventType::ReturnPeriod,
        }
    }
}

/// A parsed `<prefix>_<event>_<stat>` hazard column name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HazardColumn {
    pub prefix: String,
    pub event: String,
    pub stat: String,
}

impl HazardColumn {
    /// Returns `None` for names with fewer than three `_`-separated parts
    pub fn parse(name: &str) -> Option<Self> {
        let parts: Vec<&str> = name.split('_').collect();
        if parts.len() < 3 || parts.iter().any(|p| p.is_empty()) {
            return None;
        }
        Some(HazardColumn {
            prefix: parts[0].to_string(),
            event: parts[1].to_string(),
            stat: parts[parts.len() - 1].to_string(),
        })
    }
}

/// Distinct statistic suffixes among hazard columns
pub fn hazard_stats(columns: &[String]) -> BTreeSet<String> {
    columns
        .iter()
        .filter_map(|c| HazardColumn::parse(c))
        .map(|hc| hc.stat)
        .collect()
}

// ============================================================================
// Column naming conventions
// ============================================================================

/// `<prefix>_<event>_<stat>`
pub fn hazard_column(prefix: &str, event: &str, stat: &str) -> String {
    format!("{}_{}_{}", prefix, event, stat)
}

/// `dam_<event>_<curve>`, used by the Huizinga and manual strategies
pub fn damage_column(event: &str, curve: &str) -> String {
    format!("dam_{}_{}", event, curve)
}

/// `dam_<pct>_<curve>_<event>`, OSdaMage damage at one max damage quantile
pub fn quantile_damage_column(percentage: u8, curve: &str, event: &str) -> String {
    format!("dam_{}_{}_{}", percentage, curve, event)
}

/// `dam_<curve>_<event>_quartiles`, key of the OSdaMage quantile tuple
pub fn quartiles_key(curve: &str, event: &str) -> String {
    format!("dam_{}_{}_quartiles", curve, event)
}

/// `dam_<curve>_<event>_representative`
pub fn representative_column(curve: &str, event: &str) -> String {
    format!("dam_{}_{}_representative", curve, event)
}

/// `risk_<curve>`
pub fn risk_column(curve: &str) -> String {
    format!("risk_{}", curve)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_return_periods_from_columns() {
        let columns = cols(&["F_RP100_me", "F_RP100_fr", "F_RP10_me", "F_RP10_fr"]);
        let set = EventSet::from_hazard_columns(EventType::ReturnPeriod, &columns).unwrap();
        assert_eq!(set.labels(), vec!["RP10", "RP100"]);
        match set {
            EventSet::ReturnPeriods(rps) => {
                assert_eq!(rps[0].years, 10.0);
                assert_eq!(rps[1].frequency(), 0.01);
            }
            _ => panic!("expected return periods"),
        }
    }

    #[test]
    fn test_named_events_from_columns() {
        let columns = cols(&["F_EV2_me", "F_EV1_me", "F_EV1_fr"]);
        let set = EventSet::from_hazard_columns(EventType::Event, &columns).unwrap();
        assert_eq!(set.labels(), vec!["EV1", "EV2"]);
        assert_eq!(set.event_type(), EventType::Event);
    }

    #[test]
    fn test_no_events_fails() {
        let result = EventSet::from_hazard_columns(EventType::Event, &[]);
        assert!(matches!(result, Err(DamageError::Precondition { .. })));
    }

    #[test]
    fn test_bad_return_period_label() {
        let columns = cols(&["F_EV1_me"]);
        assert!(EventSet::from_hazard_columns(EventType::ReturnPeriod, &columns).is_err());
    }

    #[test]
    fn test_hazard_stats() {
        let columns = cols(&["F_RP10_me", "F_RP10_fr", "F_RP10_mi", "length"]);
        let stats = hazard_stats(&columns);
        assert!(stats.contains(STAT_MEAN));
        assert!(stats.contains(STAT_FRACTION));
        assert_eq!(stats.len(), 3);
    }

    #[test]
    fn test_column_names() {
        assert_eq!(hazard_column("F", "RP10", "me"), "F_RP10_me");
        assert_eq!(damage_column("RP10", "HZ"), "dam_RP10_HZ");
        assert_eq!(quantile_damage_column(25, "C3", "EV1"), "dam_25_C3_EV1");
        assert_eq!(representative_column("C5", "RP100"), "dam_C5_RP100_representative");
        assert_eq!(risk_column("HZ"), "risk_HZ");
    }

    #[test]
    fn test_event_type_parsing() {
        assert_eq!(EventType::from_str_flexible("return_period").unwrap(), EventType::ReturnPeriod);
        assert_eq!(EventType::from_str_flexible("Event").unwrap(), EventType::Event);
        assert!(matches!(
            EventType::from_str_flexible("storm"),
            Err(DamageError::NotImplemented { .. })
        ));
    }
}
