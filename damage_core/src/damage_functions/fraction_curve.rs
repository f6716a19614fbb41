//! Damage Fraction Curves
//!
//! A damage fraction curve maps hazard severity (water depth) to the fraction
//! of the max damage that is incurred. It is the same for every road type and
//! lane count.
//!
//! Severities are converted to meters when the curve is built and the points
//! never change afterwards. Evaluation is piecewise linear inside the data
//! range and flat outside it:
//!
//! ```text
//! fraction
//!   1.0 |                 ________
//!       |            ____/
//!       |       ____/
//!       |  ____/
//!   0.0 |_/___________________________ severity (m)
//!        min                  max
//! ```
//!
//! ## Example
//!
//! ```rust
//! use damage_core::damage_functions::DamageFractionCurve;
//! use damage_core::units::SeverityUnit;
//!
//! let curve = DamageFractionCurve::from_table(
//!     "example",
//!     &[(0.0, 0.0), (50.0, 0.25), (100.0, 0.42)],
//!     SeverityUnit::Centimeters,
//! ).unwrap();
//!
//! assert_eq!(curve.evaluate(0.5), 0.25);
//! assert_eq!(curve.evaluate(3.0), 0.42); // clamped above the data range
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{DamageError, DamageResult};
use crate::numeric::lerp;
use crate::tabular;
use crate::units::SeverityUnit;

/// One point of a damage fraction curve, severity in meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub severity_m: f64,
    pub fraction: f64,
}

/// One `(severity, fraction)` row of a curve file, severity in the file's unit
#[derive(Debug, Deserialize)]
struct CurveRecord(f64, f64);

/// Severity to damage fraction curve with severities stored in meters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageFractionCurve {
    /// Curve name (file stem or library key)
    pub name: String,
    /// Unit the severities were declared in before conversion
    pub source_unit: SeverityUnit,
    points: Vec<CurvePoint>,
}

impl DamageFractionCurve {
    /// Build a curve from `(severity, fraction)` pairs in `source_unit`.
    ///
    /// Fails with a format error when the table is empty, a value is not
    /// finite, severities are not strictly increasing, or a fraction falls
    /// outside `[0, 1]`.
    pub fn from_table(
        name: impl Into<String>,
        data: &[(f64, f64)],
        source_unit: SeverityUnit,
    ) -> DamageResult<Self> {
        let name = name.into();
        if data.is_empty() {
            return Err(DamageError::format(&name, "damage curve has no points"));
        }

        let mut points: Vec<CurvePoint> = Vec::with_capacity(data.len());
        for &(severity, fraction) in data {
            if !severity.is_finite() || !fraction.is_finite() {
                return Err(DamageError::format(
                    &name,
                    format!("non-numeric point ({}, {})", severity, fraction),
                ));
            }
            if !(0.0..=1.0).contains(&fraction) {
                return Err(DamageError::format(
                    &name,
                    format!("damage fraction {} at severity {} is outside [0, 1]", fraction, severity),
                ));
            }
            let severity_m = source_unit.to_meters(severity).0;
            if let Some(prev) = points.last() {
                if severity_m <= prev.severity_m {
                    return Err(DamageError::format(
                        &name,
                        format!("severities must be strictly increasing, {} follows {}", severity, prev.severity_m),
                    ));
                }
            }
            points.push(CurvePoint { severity_m, fraction });
        }

        if source_unit != SeverityUnit::Meters {
            log::debug!(
                "Damage curve '{}': severities converted from {} to m",
                name,
                source_unit
            );
        }

        Ok(DamageFractionCurve {
            name,
            source_unit,
            points,
        })
    }

    /// Load a curve from a delimited file.
    ///
    /// The first row holds free-text headers, the first data row holds the
    /// unit of the severity column (e.g. `cm`), the remaining rows hold the
    /// `(severity, fraction)` pairs. The curve is named after the file stem.
    ///
    /// ```text
    /// depth;damage
    /// cm;% of total construction costs
    /// 0;0
    /// 50;0.25
    /// 100;0.42
    /// ```
    pub fn from_csv(path: &Path, sep: char) -> DamageResult<Self> {
        let source = path.display().to_string();
        let mut reader = tabular::open(path, sep)?;
        tabular::header(&mut reader, &source)?;
        let records = tabular::records(&mut reader, &source)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| source.clone());

        let (unit_row, data_rows) = records
            .split_first()
            .ok_or_else(|| DamageError::format(&source, "missing unit row"))?;
        let unit_label = unit_row
            .get(0)
            .ok_or_else(|| DamageError::format(&source, "missing unit label"))?;
        let unit = SeverityUnit::from_label(unit_label)
            .map_err(|e| DamageError::format(&source, e.to_string()))?;

        let data = data_rows
            .iter()
            .map(|row| {
                if row.len() < 2 {
                    return Err(DamageError::format(
                        &source,
                        format!("expected two columns, found {:?}", row.iter().collect::<Vec<_>>()),
                    ));
                }
                let record: CurveRecord = row.deserialize(None).map_err(|e| {
                    DamageError::format(&source, format!("row {:?}: {}", row.iter().collect::<Vec<_>>(), e))
                })?;
                Ok((record.0, record.1))
            })
            .collect::<DamageResult<Vec<_>>>()?;

        let curve = Self::from_table(name, &data, unit)?;
        log::info!(
            "Loaded damage curve '{}' from {} ({} points, source unit {})",
            curve.name,
            source,
            curve.points.len(),
            unit
        );
        Ok(curve)
    }

    /// Build the evaluation function of this curve.
    ///
    /// The returned closure borrows the curve's points; it is equivalent to
    /// [`DamageFractionCurve::evaluate`].
    pub fn build_interpolator(&self) -> impl Fn(f64) -> f64 + '_ {
        move |severity| self.evaluate(severity)
    }

    /// Damage fraction at a severity in meters.
    ///
    /// Below the first point the first fraction applies, above the last point
    /// the last fraction applies. A non-finite severity means no hazard and
    /// evaluates like the lowest severity.
    pub fn evaluate(&self, severity_m: f64) -> f64 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        if !severity_m.is_finite() || severity_m <= first.severity_m {
            return first.fraction;
        }
        if severity_m >= last.severity_m {
            return last.fraction;
        }
        let upper = self.points.partition_point(|p| p.severity_m < severity_m);
        let (a, b) = (self.points[upper - 1], self.points[upper]);
        lerp(a.severity_m, a.fraction, b.severity_m, b.fraction, severity_m)
    }

    /// Points in meters
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Severity range covered by the data, in meters
    pub fn severity_range(&self) -> (f64, f64) {
        (
            self.points[0].severity_m,
            self.points[self.points.len() - 1].severity_m,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;
    use std::fs;

    fn hz_like() -> DamageFractionCurve {
        DamageFractionCurve::from_table(
            "HZ",
            &[(0.0, 0.0), (50.0, 0.25), (100.0, 0.42), (150.0, 0.55), (600.0, 1.0)],
            SeverityUnit::Centimeters,
        )
        .unwrap()
    }

    #[test]
    fn test_units_converted_to_meters() {
        let curve = hz_like();
        assert_eq!(curve.points()[1].severity_m, 0.5);
        assert_eq!(curve.severity_range(), (0.0, 6.0));
    }

    #[test]
    fn test_interpolation_inside_range() {
        let curve = hz_like();
        assert!((curve.evaluate(0.25) - 0.125).abs() < 1e-12);
        assert!((curve.evaluate(0.75) - 0.335).abs() < 1e-12);
        assert_eq!(curve.evaluate(1.0), 0.42);
    }

    #[test]
    fn test_clamping_outside_range() {
        let curve = DamageFractionCurve::from_table(
            "offset",
            &[(10.0, 0.1), (20.0, 0.3)],
            SeverityUnit::Centimeters,
        )
        .unwrap();
        assert_eq!(curve.evaluate(-5.0), 0.1);
        assert_eq!(curve.evaluate(0.0), 0.1);
        assert_eq!(curve.evaluate(100.0), 0.3);
        assert_eq!(curve.evaluate(f64::NAN), 0.1);
    }

    #[test]
    fn test_clamping_invariant_under_unit_scaling() {
        let in_cm = DamageFractionCurve::from_table(
            "cm",
            &[(20.0, 0.2), (80.0, 0.6)],
            SeverityUnit::Centimeters,
        )
        .unwrap();
        let in_m = DamageFractionCurve::from_table("m", &[(0.2, 0.2), (0.8, 0.6)], SeverityUnit::Meters)
            .unwrap();
        for severity in [-1.0, 0.0, 0.1, 0.5, 0.9, 10.0] {
            assert!((in_cm.evaluate(severity) - in_m.evaluate(severity)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_interpolator_matches_evaluate() {
        let curve = hz_like();
        let f = curve.build_interpolator();
        assert_eq!(f(0.3), curve.evaluate(0.3));
    }

    #[test]
    fn test_rejects_non_monotonic() {
        let result = DamageFractionCurve::from_table(
            "bad",
            &[(0.0, 0.0), (50.0, 0.2), (50.0, 0.3)],
            SeverityUnit::Centimeters,
        );
        assert!(matches!(result, Err(DamageError::Format { .. })));
    }

    #[test]
    fn test_rejects_fraction_out_of_range() {
        let result =
            DamageFractionCurve::from_table("bad", &[(0.0, 0.0), (1.0, 1.5)], SeverityUnit::Meters);
        assert!(matches!(result, Err(DamageError::Format { .. })));
        assert!(DamageFractionCurve::from_table("empty", &[], SeverityUnit::Meters).is_err());
    }

    #[test]
    fn test_from_csv() {
        let path = temp_dir().join("roadrisk_test_hazard_severity_curve.csv");
        fs::write(
            &path,
            "depth;damage\ncm;% of total construction costs\n0;0\n50;0.25\n100;0.42\n",
        )
        .unwrap();

        let curve = DamageFractionCurve::from_csv(&path, ';').unwrap();
        assert_eq!(curve.name, "roadrisk_test_hazard_severity_curve");
        assert_eq!(curve.source_unit, SeverityUnit::Centimeters);
        assert_eq!(curve.evaluate(1.0), 0.42);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_from_csv_rejects_unknown_unit() {
        let path = temp_dir().join("roadrisk_test_curve_bad_unit.csv");
        fs::write(&path, "depth;damage\nft;fraction\n0;0\n1;0.5\n").unwrap();

        let result = DamageFractionCurve::from_csv(&path, ';');
        assert!(matches!(result, Err(DamageError::Format { .. })));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_from_csv_quoted_header_and_bad_number() {
        let path = temp_dir().join("roadrisk_test_curve_quoted.csv");
        fs::write(
            &path,
            "\"depth; water\";damage\n\"depth (cm)\";\"fraction; of costs\"\n\n0;0\n100;0.5\n",
        )
        .unwrap();
        let curve = DamageFractionCurve::from_csv(&path, ';').unwrap();
        assert_eq!(curve.source_unit, SeverityUnit::Centimeters);
        assert_eq!(curve.severity_range(), (0.0, 1.0));

        fs::write(&path, "depth;damage\ncm;fraction\n0;0\nhalf;0.5\n").unwrap();
        let result = DamageFractionCurve::from_csv(&path, ';');
        assert!(matches!(result, Err(DamageError::Format { .. })));

        let _ = fs::remove_file(&path);
    }
}
