//! # Segment Table
//!
//! The road segments of a network together with their hazard attributes and
//! every column the damage and risk stages add.
//!
//! ## Structure
//!
//! ```text
//! SegmentTable
//! ├── hazard_prefix: "F"
//! ├── hazard_columns: [F_RP10_me, F_RP10_fr, ...]
//! ├── output_columns: [dam_RP10_HZ, ..., risk_HZ]   (creation order)
//! ├── quantile_columns: [dam_C1_RP10_quartiles, ...]
//! ├── attribute_columns: pass-through input columns
//! └── segments: Vec<Segment>
//!     ├── infra_type / road_type
//!     ├── raw_lanes / lanes
//!     ├── length_m
//!     ├── hazard: column -> value
//!     ├── outputs: column -> value
//!     └── quantiles: key -> [f64; 5]
//! ```
//!
//! A value that is absent from a segment's map is null. Stages take the table
//! by value and hand it back, so a caller never observes a half-updated table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{DamageError, DamageResult};
use crate::events::{hazard_column, HazardColumn, STAT_FRACTION, STAT_MEAN};
use crate::road_types::RoadType;

/// Lane count as it was found in the input, before cleanup
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LaneValue {
    #[default]
    Missing,
    Number(f64),
    Text(String),
}

impl LaneValue {
    /// Interpret a raw text cell: empty means missing, numbers are kept as
    /// numbers, anything else is kept as text for cleanup
    pub fn from_cell(cell: &str) -> Self {
        let trimmed = cell.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") || trimmed.eq_ignore_ascii_case("none") {
            return LaneValue::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) => LaneValue::Number(v),
            Err(_) => LaneValue::Text(trimmed.to_string()),
        }
    }
}

impl std::fmt::Display for LaneValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LaneValue::Missing => Ok(()),
            LaneValue::Number(v) => write!(f, "{}", v),
            LaneValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One road element
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    /// Raw infrastructure type (OSM `highway`)
    pub infra_type: String,
    /// Canonical road type, set during cleanup
    pub road_type: Option<RoadType>,
    /// Lane data as found in the input
    pub raw_lanes: LaneValue,
    /// Cleaned lane count in `[1, 6]`, set during cleanup
    pub lanes: Option<u8>,
    /// Segment length in meters
    pub length_m: f64,
    /// Hazard values keyed by column name; absent means null
    pub hazard: BTreeMap<String, f64>,
    /// Computed values keyed by column name; absent means null
    pub outputs: BTreeMap<String, f64>,
    /// OSdaMage damage at the 0/25/50/75/100% max damage quantiles
    pub quantiles: BTreeMap<String, [f64; 5]>,
    /// Pass-through input attributes
    pub attributes: BTreeMap<String, String>,
}

impl Segment {
    pub fn new(id: impl Into<String>, infra_type: impl Into<String>, raw_lanes: LaneValue, length_m: f64) -> Self {
        Segment {
            id: id.into(),
            infra_type: infra_type.into(),
            raw_lanes,
            length_m,
            ..Default::default()
        }
    }

    /// Builder: add one hazard value
    pub fn with_hazard(mut self, column: impl Into<String>, value: f64) -> Self {
        self.hazard.insert(column.into(), value);
        self
    }

    /// Builder: add mean severity and exposed fraction for an event
    pub fn with_event(self, prefix: &str, event: &str, mean_m: f64, fraction: f64) -> Self {
        self.with_hazard(hazard_column(prefix, event, STAT_MEAN), mean_m)
            .with_hazard(hazard_column(prefix, event, STAT_FRACTION), fraction)
    }

    pub fn hazard_value(&self, column: &str) -> Option<f64> {
        self.hazard.get(column).copied().filter(|v| v.is_finite())
    }

    pub fn output(&self, column: &str) -> Option<f64> {
        self.outputs.get(column).copied().filter(|v| v.is_finite())
    }

    /// Canonical road type, failing if cleanup has not run
    pub fn require_road_type(&self) -> DamageResult<RoadType> {
        self.road_type
            .ok_or_else(|| DamageError::missing_field(format!("road_type (segment '{}')", self.id)))
    }

    /// Cleaned lane count, failing if cleanup has not run
    pub fn require_lanes(&self) -> DamageResult<u8> {
        self.lanes
            .ok_or_else(|| DamageError::missing_field(format!("lanes (segment '{}')", self.id)))
    }
}

/// Road segments with hazard data and computed columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentTable {
    pub hazard_prefix: String,
    segments: Vec<Segment>,
    hazard_columns: Vec<String>,
    output_columns: Vec<String>,
    quantile_columns: Vec<String>,
    attribute_columns: Vec<String>,
}

impl SegmentTable {
    pub fn new(hazard_prefix: impl Into<String>) -> Self {
        SegmentTable {
            hazard_prefix: hazard_prefix.into(),
            segments: Vec::new(),
            hazard_columns: Vec::new(),
            output_columns: Vec::new(),
            quantile_columns: Vec::new(),
            attribute_columns: Vec::new(),
        }
    }

    /// Build a table from segments, registering the hazard columns they carry
    pub fn from_segments(hazard_prefix: impl Into<String>, segments: Vec<Segment>) -> Self {
        let mut table = SegmentTable::new(hazard_prefix);
        for segment in segments {
            table.push(segment);
        }
        table
    }

    /// Append a segment
    pub fn push(&mut self, segment: Segment) {
        for column in segment.hazard.keys() {
            register(&mut self.hazard_columns, column);
        }
        for column in segment.attributes.keys() {
            register(&mut self.attribute_columns, column);
        }
        for column in segment.outputs.keys() {
            register(&mut self.output_columns, column);
        }
        for column in segment.quantiles.keys() {
            register(&mut self.quantile_columns, column);
        }
        self.segments.push(segment);
    }

    /// Declare a hazard column even if no segment carries a value for it
    pub fn register_hazard_column(&mut self, column: impl Into<String>) {
        register(&mut self.hazard_columns, &column.into());
    }

    /// Declare a pass-through column, keeping input order
    pub fn register_attribute_column(&mut self, column: impl Into<String>) {
        register(&mut self.attribute_columns, &column.into());
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segments_mut(&mut self) -> &mut [Segment] {
        &mut self.segments
    }

    pub fn segment(&self, row: usize) -> Option<&Segment> {
        self.segments.get(row)
    }

    /// Hazard columns whose names follow `<prefix>_<event>_<stat>` for this
    /// table's prefix
    pub fn hazard_columns(&self) -> Vec<String> {
        self.hazard_columns
            .iter()
            .filter(|c| {
                HazardColumn::parse(c)
                    .map(|hc| hc.prefix == self.hazard_prefix)
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    pub fn output_columns(&self) -> &[String] {
        &self.output_columns
    }

    pub fn attribute_columns(&self) -> &[String] {
        &self.attribute_columns
    }

    /// Output columns starting with `prefix`
    pub fn output_columns_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.output_columns
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Write an output value (or null) and register the column
    pub fn set_output(&mut self, row: usize, column: &str, value: Option<f64>) -> DamageResult<()> {
        let len = self.segments.len();
        let segment = self.segments.get_mut(row).ok_or_else(|| DamageError::Internal {
            message: format!("row {} out of range for table with {} rows", row, len),
        })?;
        match value {
            Some(v) => {
                segment.outputs.insert(column.to_string(), v);
            }
            None => {
                segment.outputs.remove(column);
            }
        }
        register(&mut self.output_columns, column);
        Ok(())
    }

    /// Write a quantile tuple (or null) and register its key
    pub fn set_quantiles(&mut self, row: usize, key: &str, value: Option<[f64; 5]>) -> DamageResult<()> {
        let len = self.segments.len();
        let segment = self.segments.get_mut(row).ok_or_else(|| DamageError::Internal {
            message: format!("row {} out of range for table with {} rows", row, len),
        })?;
        match value {
            Some(v) => {
                segment.quantiles.insert(key.to_string(), v);
            }
            None => {
                segment.quantiles.remove(key);
            }
        }
        register(&mut self.quantile_columns, key);
        Ok(())
    }

    /// Quantile tuple keys in creation order
    pub fn quantile_columns(&self) -> &[String] {
        &self.quantile_columns
    }

    /// Register an output column without writing any value
    pub fn register_output_column(&mut self, column: &str) {
        register(&mut self.output_columns, column);
    }

    /// Output value of a row, `None` when null or the row does not exist
    pub fn output(&self, row: usize, column: &str) -> Option<f64> {
        self.segments.get(row).and_then(|s| s.output(column))
    }

    /// Number of rows with at least one `dam_` value
    pub fn damaged_rows(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| s.outputs.keys().any(|k| k.starts_with("dam_")))
            .count()
    }
}

fn register(columns: &mut Vec<String>, column: &str) {
    if !columns.iter().any(|c| c == column) {
        columns.push(column.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SegmentTable {
        SegmentTable::from_segments(
            "F",
            vec![
                Segment::new("1", "motorway", LaneValue::Number(2.0), 100.0)
                    .with_event("F", "RP10", 0.5, 0.8),
                Segment::new("2", "residential", LaneValue::Missing, 50.0),
            ],
        )
    }

    #[test]
    fn test_lane_value_from_cell() {
        assert_eq!(LaneValue::from_cell(""), LaneValue::Missing);
        assert_eq!(LaneValue::from_cell("nan"), LaneValue::Missing);
        assert_eq!(LaneValue::from_cell(" 3 "), LaneValue::Number(3.0));
        assert_eq!(LaneValue::from_cell("2;3"), LaneValue::Text("2;3".to_string()));
    }

    #[test]
    fn test_hazard_columns_registered() {
        let table = sample();
        assert_eq!(table.hazard_columns(), vec!["F_RP10_fr", "F_RP10_me"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_hazard_columns_filtered_by_prefix() {
        let mut table = sample();
        table.register_hazard_column("G_RP10_me");
        assert!(!table.hazard_columns().contains(&"G_RP10_me".to_string()));
    }

    #[test]
    fn test_set_and_clear_output() {
        let mut table = sample();
        table.set_output(0, "dam_RP10_HZ", Some(12.5)).unwrap();
        assert_eq!(table.output(0, "dam_RP10_HZ"), Some(12.5));
        assert_eq!(table.output(1, "dam_RP10_HZ"), None);
        assert_eq!(table.output_columns(), &["dam_RP10_HZ".to_string()]);
        assert_eq!(table.damaged_rows(), 1);

        table.set_output(0, "dam_RP10_HZ", None).unwrap();
        assert_eq!(table.output(0, "dam_RP10_HZ"), None);
        assert!(table.set_output(5, "dam_RP10_HZ", Some(1.0)).is_err());
    }

    #[test]
    fn test_out_of_range_writes_name_row_count() {
        let mut table = sample();
        match table.set_output(7, "dam_RP10_HZ", Some(1.0)) {
            Err(DamageError::Internal { message }) => {
                assert!(message.contains("row 7"));
                assert!(message.contains("with 2 rows"));
            }
            other => panic!("expected Internal error, got {:?}", other),
        }
        let quantiles = table.set_quantiles(2, "dam_C1_RP10_quartiles", Some([0.0; 5]));
        assert!(matches!(quantiles, Err(DamageError::Internal { .. })));

        table.set_quantiles(1, "dam_C1_RP10_quartiles", Some([1.0, 2.0, 3.0, 4.0, 5.0])).unwrap();
        assert_eq!(table.quantile_columns(), &["dam_C1_RP10_quartiles".to_string()]);
        assert!(table.output_columns().is_empty());
    }

    #[test]
    fn test_require_fields_before_cleanup() {
        let table = sample();
        let segment = table.segment(0).unwrap();
        assert!(matches!(segment.require_road_type(), Err(DamageError::MissingField { .. })));
        assert!(segment.require_lanes().is_err());
    }
}
