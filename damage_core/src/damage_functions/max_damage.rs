//! Max Damage Tables
//!
//! Max damage per road type and lane count, stored per meter of road.
//!
//! File layout (`;` separated):
//!
//! ```text
//! Road_type \ lanes;1;2;3;4;5;6
//! unit;euro/km;euro/km;euro/km;euro/km;euro/km;euro/km
//! motorway;175000;350000;450000;550000;650000;750000
//! trunk;175000;300000;400000;475000;575000;650000
//! ```
//!
//! All columns must share one unit. Tables declared per kilometer are divided
//! by 1000 on construction.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{DamageError, DamageResult};
use crate::tabular;
use crate::units::CostUnit;

/// Max damage matrix, road type label x lane count, in currency per meter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaxDamageTable {
    pub name: String,
    /// Unit the values were declared in before conversion
    pub source_unit: CostUnit,
    values: BTreeMap<String, BTreeMap<u8, f64>>,
}

impl MaxDamageTable {
    /// Build a table from rows of `(road type label, [(lanes, value)])` in
    /// `source_unit`
    pub fn from_rows<I, L>(name: impl Into<String>, rows: I, source_unit: CostUnit) -> DamageResult<Self>
    where
        I: IntoIterator<Item = (String, L)>,
        L: IntoIterator<Item = (u8, f64)>,
    {
        let name = name.into();
        let mut values: BTreeMap<String, BTreeMap<u8, f64>> = BTreeMap::new();

        for (road_type, lanes) in rows {
            let mut per_lane = BTreeMap::new();
            for (lane, value) in lanes {
                if !value.is_finite() || value < 0.0 {
                    return Err(DamageError::format(
                        &name,
                        format!("max damage for {} with {} lanes is {}", road_type, lane, value),
                    ));
                }
                per_lane.insert(lane, source_unit.to_per_meter(value).0);
            }
            values.insert(road_type, per_lane);
        }
        if values.is_empty() {
            return Err(DamageError::format(&name, "max damage table has no rows"));
        }
        if !source_unit.is_per_meter() {
            log::info!(
                "Max damage data '{}' was converted from {} to {}",
                name,
                source_unit,
                CostUnit::canonical()
            );
        }

        Ok(MaxDamageTable {
            name,
            source_unit,
            values,
        })
    }

    /// Load a max damage table from a delimited file, named after the file stem
    pub fn from_csv(path: &Path, sep: char) -> DamageResult<Self> {
        let source = path.display().to_string();
        let mut reader = tabular::open(path, sep)?;
        let header = tabular::header(&mut reader, &source)?;
        let records = tabular::records(&mut reader, &source)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| source.clone());

        let lanes = header
            .iter()
            .skip(1)
            .map(|h| {
                h.parse::<u8>().map_err(|_| {
                    DamageError::format(&source, format!("lane column '{}' is not a lane count", h))
                })
            })
            .collect::<DamageResult<Vec<u8>>>()?;
        if lanes.is_empty() {
            return Err(DamageError::format(&source, "no lane columns found"));
        }

        let (unit_row, data_rows) = records
            .split_first()
            .ok_or_else(|| DamageError::format(&source, "missing unit row"))?;
        if unit_row.get(0).map(str::to_lowercase).as_deref() != Some("unit") {
            return Err(DamageError::format(&source, "second row must start with 'unit'"));
        }
        let mut unit_labels: Vec<&str> = unit_row.iter().skip(1).collect();
        unit_labels.dedup();
        if unit_labels.len() != 1 {
            return Err(DamageError::format(
                &source,
                format!("columns have different units: {:?}", unit_labels),
            ));
        }
        let unit = CostUnit::from_label(unit_labels[0])
            .map_err(|e| DamageError::format(&source, e.to_string()))?;

        let mut rows = Vec::with_capacity(data_rows.len());
        for row in data_rows {
            let road_type = row.get(0).unwrap_or_default();
            if row.len() != lanes.len() + 1 {
                return Err(DamageError::format(
                    &source,
                    format!(
                        "row '{}' has {} values, expected {}",
                        road_type,
                        row.len().saturating_sub(1),
                        lanes.len()
                    ),
                ));
            }
            let values = row
                .iter()
                .skip(1)
                .zip(&lanes)
                .map(|(cell, &lane)| {
                    cell.parse::<f64>()
                        .map(|v| (lane, v))
                        .map_err(|_| DamageError::format(&source, format!("'{}' is not a number", cell)))
                })
                .collect::<DamageResult<Vec<_>>>()?;
            rows.push((road_type.to_string(), values));
        }

        Self::from_rows(name, rows, unit)
    }

    /// Max damage per meter for a road type label and lane count
    pub fn lookup(&self, road_type: &str, lanes: u8) -> DamageResult<f64> {
        self.values
            .get(road_type)
            .and_then(|per_lane| per_lane.get(&lanes))
            .copied()
            .ok_or_else(|| {
                DamageError::unknown_key(
                    format!("max damage table '{}'", self.name),
                    format!("{}/{}", road_type, lanes),
                )
            })
    }

    /// True when the table has a row for this label
    pub fn has_road_type(&self, road_type: &str) -> bool {
        self.values.contains_key(road_type)
    }

    /// Road type labels in the table
    pub fn road_types(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }
}
