//! # Integration Shapers
//!
//! Turn the per-event damage columns of a table into one frame per
//! vulnerability curve, with return periods as columns (descending) and
//! segments as rows.
//!
//! Each damage method names its columns differently:
//!
//! | Shaper     | Column                               | Curve      |
//! |------------|--------------------------------------|------------|
//! | `Huizinga` | `dam_RP100_HZ`                       | `HZ`       |
//! | `OsdaMage` | `dam_C3_RP100_representative`        | `C3`       |
//! | `Manual`   | `dam_RP100_<prefix>`                 | `<prefix>` |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{DamageError, DamageResult};
use crate::lookup::HUIZINGA_CURVE;
use crate::segments::SegmentTable;

use super::DamageCurveKind;

/// Damage per return period for the rows of one curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationFrame {
    pub curve: String,
    /// Return periods in years, descending
    pub return_periods: Vec<f64>,
    /// `(table row, damage per return period)`; `None` is null
    pub rows: Vec<(usize, Vec<Option<f64>>)>,
}

impl IntegrationFrame {
    pub fn min_return_period(&self) -> Option<f64> {
        self.return_periods.last().copied()
    }

    pub fn max_return_period(&self) -> Option<f64> {
        self.return_periods.first().copied()
    }
}

/// Column naming convention of a damage method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrationShaper {
    Huizinga,
    OsdaMage,
    Manual,
}

impl IntegrationShaper {
    pub fn for_kind(kind: DamageCurveKind) -> Self {
        match kind {
            DamageCurveKind::Huizinga => IntegrationShaper::Huizinga,
            DamageCurveKind::OsdaMage => IntegrationShaper::OsdaMage,
            DamageCurveKind::Manual => IntegrationShaper::Manual,
        }
    }

    /// `(curve, return period)` of a damage column following this
    /// convention
    pub fn parse_column(&self, column: &str) -> Option<(String, f64)> {
        let parts: Vec<&str> = column.split('_').collect();
        if parts.first() != Some(&"dam") {
            return None;
        }
        match self {
            IntegrationShaper::Huizinga => match parts.as_slice() {
                [_, rp, curve] if *curve == HUIZINGA_CURVE => {
                    parse_return_period(rp).map(|years| (curve.to_string(), years))
                }
                _ => None,
            },
            IntegrationShaper::OsdaMage => match parts.as_slice() {
                [_, curve, rp, "representative"] => {
                    parse_return_period(rp).map(|years| (curve.to_string(), years))
                }
                _ => None,
            },
            IntegrationShaper::Manual => {
                if parts.len() < 3 {
                    return None;
                }
                parse_return_period(parts[1]).map(|years| (parts[2..].join("_"), years))
            }
        }
    }

    /// Distinct return periods found in the table's damage columns,
    /// ascending
    pub fn return_periods(&self, table: &SegmentTable) -> DamageResult<Vec<f64>> {
        let mut years: Vec<f64> = table
            .output_columns()
            .iter()
            .filter_map(|c| self.parse_column(c).map(|(_, years)| years))
            .collect();
        years.sort_by(f64::total_cmp);
        years.dedup();
        if years.is_empty() {
            return Err(DamageError::precondition("No damage column with a return period found"));
        }
        Ok(years)
    }

    /// One frame per curve over the selected return periods.
    ///
    /// A frame holds the rows with at least one damage value for its curve.
    pub fn reshape(
        &self,
        table: &SegmentTable,
        return_periods: &[f64],
    ) -> DamageResult<BTreeMap<String, IntegrationFrame>> {
        let mut columns: BTreeMap<String, Vec<(f64, String)>> = BTreeMap::new();
        for column in table.output_columns() {
            if let Some((curve, years)) = self.parse_column(column) {
                if return_periods.contains(&years) {
                    columns.entry(curve).or_default().push((years, column.clone()));
                }
            }
        }

        let mut frames = BTreeMap::new();
        for (curve, mut curve_columns) in columns {
            curve_columns.sort_by(|a, b| b.0.total_cmp(&a.0));
            let rows = table
                .segments()
                .iter()
                .enumerate()
                .filter_map(|(row, segment)| {
                    let values: Vec<Option<f64>> =
                        curve_columns.iter().map(|(_, c)| segment.output(c)).collect();
                    values.iter().any(Option::is_some).then_some((row, values))
                })
                .collect();
            let frame = IntegrationFrame {
                curve: curve.clone(),
                return_periods: curve_columns.iter().map(|(years, _)| *years).collect(),
                rows,
            };
            log::debug!(
                "Reshaped curve '{}': {} return periods, {} rows",
                curve,
                frame.return_periods.len(),
                frame.rows.len()
            );
            frames.insert(curve, frame);
        }
        Ok(frames)
    }
}

fn parse_return_period(label: &str) -> Option<f64> {
    label
        .strip_prefix("RP")
        .and_then(|y| y.parse::<f64>().ok())
        .filter(|y| y.is_finite() && *y > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segments::{LaneValue, Segment};

    fn table_with(columns: &[(&str, &[Option<f64>])]) -> SegmentTable {
        let rows = columns[0].1.len();
        let mut table = SegmentTable::from_segments(
            "F",
            (0..rows)
                .map(|i| Segment::new(i.to_string(), "primary", LaneValue::Missing, 1.0))
                .collect(),
        );
        for (column, values) in columns {
            for (row, value) in values.iter().enumerate() {
                table.set_output(row, column, *value).unwrap();
            }
        }
        table
    }

    #[test]
    fn test_parse_columns() {
        let hz = IntegrationShaper::Huizinga;
        assert_eq!(hz.parse_column("dam_RP100_HZ"), Some(("HZ".to_string(), 100.0)));
        assert_eq!(hz.parse_column("dam_EV1_HZ"), None);
        assert_eq!(hz.parse_column("risk_HZ"), None);

        let osd = IntegrationShaper::OsdaMage;
        assert_eq!(
            osd.parse_column("dam_C3_RP50_representative"),
            Some(("C3".to_string(), 50.0))
        );
        assert_eq!(osd.parse_column("dam_25_C3_RP50"), None);

        let man = IntegrationShaper::Manual;
        assert_eq!(man.parse_column("dam_RP10_Al"), Some(("Al".to_string(), 10.0)));
    }

    #[test]
    fn test_return_periods_sorted_distinct() {
        let table = table_with(&[
            ("dam_RP100_HZ", &[Some(1.0)]),
            ("dam_RP10_HZ", &[Some(1.0)]),
            ("dam_RP1000_HZ", &[None]),
        ]);
        let rps = IntegrationShaper::Huizinga.return_periods(&table).unwrap();
        assert_eq!(rps, vec![10.0, 100.0, 1000.0]);
    }

    #[test]
    fn test_no_return_period_column_fails() {
        let table = table_with(&[("dam_EV1_HZ", &[Some(1.0)])]);
        assert!(IntegrationShaper::Huizinga.return_periods(&table).is_err());
    }

    #[test]
    fn test_reshape_descending_and_row_subset() {
        let table = table_with(&[
            ("dam_RP10_Al", &[Some(1.0), None, Some(3.0)]),
            ("dam_RP100_Al", &[Some(2.0), None, None]),
            ("dam_RP10_Be", &[None, Some(5.0), None]),
        ]);
        let shaper = IntegrationShaper::Manual;
        let rps = shaper.return_periods(&table).unwrap();
        let frames = shaper.reshape(&table, &rps).unwrap();

        let al = &frames["Al"];
        assert_eq!(al.return_periods, vec![100.0, 10.0]);
        assert_eq!(al.rows, vec![(0, vec![Some(2.0), Some(1.0)]), (2, vec![None, Some(3.0)])]);
        assert_eq!(al.min_return_period(), Some(10.0));

        let be = &frames["Be"];
        assert_eq!(be.rows, vec![(1, vec![Some(5.0)])]);
    }
}
