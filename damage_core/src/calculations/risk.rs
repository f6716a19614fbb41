//! # Risk Integration
//!
//! Annualized risk (expected annual damage) per segment and vulnerability
//! curve, from damages at a set of return periods.
//!
//! ## Trapezoidal integration
//!
//! Return periods become exceedance frequencies `f = 1/RP` (`RP = ∞` gives
//! `f = 0`), sorted ascending:
//!
//! ```text
//! risk = Σ (f[i+1] - f[i]) × (d[i] + d[i+1]) / 2
//! ```
//!
//! ## Modes
//!
//! | Mode                | Beyond max RP      | Below min RP                   |
//! |---------------------|--------------------|--------------------------------|
//! | `Default`           | damage of max RP   | no damage                      |
//! | `CutFromYear(Y)`    | damage of max RP   | no damage below RP = Y         |
//! | `TriangleToNull(Y)` | damage of max RP   | linear to zero at RP = Y       |
//!
//! `CutFromYear` models a flood protection standard: `Y` must be above the
//! smallest return period. `TriangleToNull` models protection fading in: `Y`
//! must be below the smallest return period (`Y = 0` is read as `Y = 1`).

use serde::{Deserialize, Serialize};

use crate::errors::{DamageError, DamageResult};
use crate::events::risk_column;
use crate::numeric::{lerp, trapezoid};
use crate::segments::SegmentTable;

use super::shaper::{IntegrationFrame, IntegrationShaper};
use super::DamageCurveKind;

/// Risk calculation mode as named in configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum RiskCalculationMode {
    #[default]
    None,
    Default,
    CutFromYear,
    TriangleToNullYear,
}

impl TryFrom<String> for RiskCalculationMode {
    type Error = DamageError;

    fn try_from(s: String) -> DamageResult<Self> {
        Self::from_str_flexible(&s)
    }
}

impl RiskCalculationMode {
    pub fn from_str_flexible(s: &str) -> DamageResult<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "none" | "" => Ok(RiskCalculationMode::None),
            "default" => Ok(RiskCalculationMode::Default),
            "cut_from_year" | "cut_from" => Ok(RiskCalculationMode::CutFromYear),
            "triangle_to_null_year" | "triangle_to_null" => Ok(RiskCalculationMode::TriangleToNullYear),
            _ => Err(DamageError::not_implemented("risk calculation mode", s)),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RiskCalculationMode::None => "none",
            RiskCalculationMode::Default => "default",
            RiskCalculationMode::CutFromYear => "cut_from_year",
            RiskCalculationMode::TriangleToNullYear => "triangle_to_null_year",
        }
    }

    /// Combine with the configured year; `None` when no risk is requested
    pub fn to_risk_mode(self, year: Option<u32>) -> DamageResult<Option<RiskMode>> {
        match self {
            RiskCalculationMode::None => Ok(None),
            RiskCalculationMode::Default => Ok(Some(RiskMode::Default)),
            RiskCalculationMode::CutFromYear => year
                .map(|y| Some(RiskMode::CutFromYear(y)))
                .ok_or_else(|| DamageError::missing_field("risk_calculation_year")),
            RiskCalculationMode::TriangleToNullYear => year
                .map(|y| Some(RiskMode::TriangleToNull(y)))
                .ok_or_else(|| DamageError::missing_field("risk_calculation_year")),
        }
    }
}

/// Risk integration policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "year", rename_all = "snake_case")]
pub enum RiskMode {
    Default,
    CutFromYear(u32),
    TriangleToNull(u32),
}

impl RiskMode {
    pub fn code(&self) -> &'static str {
        match self {
            RiskMode::Default => "default",
            RiskMode::CutFromYear(_) => "cut_from_year",
            RiskMode::TriangleToNull(_) => "triangle_to_null_year",
        }
    }

    /// Fails when the year lies outside the range this mode supports for
    /// the given return periods
    pub fn check_bounds(&self, return_periods: &[f64]) -> DamageResult<()> {
        let min_rp = return_periods.iter().copied().fold(f64::INFINITY, f64::min);
        match *self {
            RiskMode::Default => Ok(()),
            RiskMode::CutFromYear(year) if f64::from(year) <= min_rp => Err(DamageError::RiskBoundary {
                mode: self.code().to_string(),
                year,
                reason: format!(
                    "return period of the cutoff ({}) <= smallest available return period ({})",
                    year, min_rp
                ),
                alternatives: "'default' or 'triangle_to_null_year' mode".to_string(),
            }),
            RiskMode::TriangleToNull(year) if year != 0 && f64::from(year) >= min_rp => {
                Err(DamageError::RiskBoundary {
                    mode: self.code().to_string(),
                    year,
                    reason: format!(
                        "return period of the triangle ({}) >= smallest available return period ({})",
                        year, min_rp
                    ),
                    alternatives: "'default' or 'cut_from_year' mode".to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Risk of one row. `return_periods` and `damages` are aligned.
    pub fn risk(&self, return_periods: &[f64], damages: &[Option<f64>]) -> DamageResult<f64> {
        self.check_bounds(return_periods)?;
        if return_periods.is_empty() {
            return Ok(0.0);
        }

        let mut points: Vec<(f64, f64)> = return_periods
            .iter()
            .copied()
            .zip(damages.iter().map(|d| d.unwrap_or(0.0)))
            .collect();
        points.sort_by(|a, b| b.0.total_cmp(&a.0));
        let (max_rp, max_damage) = points[0];

        match *self {
            RiskMode::Default => {
                points.insert(0, (f64::INFINITY, max_damage));
            }
            RiskMode::CutFromYear(year) => {
                let cutoff = f64::from(year);
                if cutoff >= max_rp {
                    return Ok(max_damage / cutoff);
                }
                if !points.iter().any(|&(rp, _)| rp == cutoff) {
                    // neighbours on both sides exist since min < cutoff < max
                    let upper = points.iter().rev().find(|&&(rp, _)| rp > cutoff);
                    let lower = points.iter().find(|&&(rp, _)| rp < cutoff);
                    if let (Some(&(rp_hi, d_hi)), Some(&(rp_lo, d_lo))) = (upper, lower) {
                        let damage = lerp(1.0 / rp_hi, d_hi, 1.0 / rp_lo, d_lo, 1.0 / cutoff);
                        points.push((cutoff, damage));
                    }
                }
                points.retain(|&(rp, _)| rp >= cutoff);
                points.insert(0, (f64::INFINITY, max_damage));
            }
            RiskMode::TriangleToNull(year) => {
                let end = if year == 0 { 1.0 } else { f64::from(year) };
                // an existing point at the end year is replaced by the zero point
                points.retain(|&(rp, _)| rp != end);
                points.insert(0, (f64::INFINITY, max_damage));
                points.push((end, 0.0));
            }
        }
        Ok(integrate_trapezoidal(&points))
    }
}

/// Trapezoidal integral of `(return period, damage)` points over
/// exceedance frequency
pub fn integrate_trapezoidal(points: &[(f64, f64)]) -> f64 {
    let mut by_frequency: Vec<(f64, f64)> = points.iter().map(|&(rp, d)| (1.0 / rp, d)).collect();
    by_frequency.sort_by(|a, b| a.0.total_cmp(&b.0));
    let (frequencies, damages): (Vec<f64>, Vec<f64>) = by_frequency.into_iter().unzip();
    trapezoid(&frequencies, &damages)
}

/// Adds `risk_<curve>` columns for every curve found in the damage columns
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskIntegrator {
    pub shaper: IntegrationShaper,
    pub mode: RiskMode,
}

impl RiskIntegrator {
    pub fn new(kind: DamageCurveKind, mode: RiskMode) -> Self {
        RiskIntegrator {
            shaper: IntegrationShaper::for_kind(kind),
            mode,
        }
    }

    pub fn run(&self, mut table: SegmentTable) -> DamageResult<SegmentTable> {
        let return_periods = self.shaper.return_periods(&table)?;
        let frames = self.shaper.reshape(&table, &return_periods)?;

        for frame in frames.values() {
            self.mode.check_bounds(&frame.return_periods)?;
            self.log_assumptions(frame);
            let column = risk_column(&frame.curve);
            let risks = frame
                .rows
                .iter()
                .map(|(row, damages)| Ok((*row, self.mode.risk(&frame.return_periods, damages)?)))
                .collect::<DamageResult<Vec<_>>>()?;

            table.register_output_column(&column);
            for (row, risk) in risks {
                table.set_output(row, &column, Some(risk))?;
            }
        }

        log::info!(
            "Risk calculation in '{}' mode finished for {} curve(s)",
            self.mode.code(),
            frames.len()
        );
        Ok(table)
    }

    fn log_assumptions(&self, frame: &IntegrationFrame) {
        let (Some(min_rp), Some(max_rp)) = (frame.min_return_period(), frame.max_return_period()) else {
            return;
        };
        match self.mode {
            RiskMode::Default => log::info!(
                "Risk for '{}' in default mode: damage beyond RP{} equals dam_RP{}, no damage below RP{}",
                frame.curve,
                max_rp,
                max_rp,
                min_rp
            ),
            RiskMode::CutFromYear(year) => log::info!(
                "Risk for '{}' in cut_from mode: damage beyond RP{} equals dam_RP{}, damage at the cutoff is \
                 interpolated, no damage below RP{}",
                frame.curve,
                max_rp,
                max_rp,
                year
            ),
            RiskMode::TriangleToNull(year) => {
                if year == 0 {
                    log::warn!("Triangle end year 0 is not a return period, RP1 is used instead");
                }
                log::info!(
                    "Risk for '{}' in triangle_to_null mode: damage beyond RP{} equals dam_RP{}, damage is 0 at RP{}",
                    frame.curve,
                    max_rp,
                    max_rp,
                    year.max(1)
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::SegmentDamageCalculator;
    use crate::events::{EventSet, EventType};
    use crate::segments::{LaneValue, Segment};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_default_closed_form() {
        let risk = RiskMode::Default
            .risk(&[100.0, 10.0], &[Some(500.0), Some(100.0)])
            .unwrap();
        // 0.5 × 0.09 × 600 + 0.5 × 0.01 × 1000
        assert!(close(risk, 32.0));
    }

    #[test]
    fn test_nulls_count_as_zero() {
        let risk = RiskMode::Default.risk(&[100.0, 10.0], &[Some(500.0), None]).unwrap();
        assert!(close(risk, 0.5 * 0.09 * 500.0 + 0.01 * 500.0));
    }

    #[test]
    fn test_default_monotonic_in_max_rp_damage() {
        let rps = [1000.0, 100.0, 10.0];
        let mut last = f64::NEG_INFINITY;
        for d_max in [0.0, 50.0, 200.0, 1000.0, 5000.0] {
            let risk = RiskMode::Default
                .risk(&rps, &[Some(d_max), Some(300.0), Some(100.0)])
                .unwrap();
            assert!(risk >= last);
            last = risk;
        }
    }

    #[test]
    fn test_cut_from_year_boundary() {
        let rps = [100.0, 50.0, 10.0];
        for year in [5, 10] {
            let result = RiskMode::CutFromYear(year).risk(&rps, &[Some(1.0), Some(1.0), Some(1.0)]);
            assert!(matches!(result, Err(DamageError::RiskBoundary { .. })));
        }
    }

    #[test]
    fn test_cut_from_existing_year_drops_smaller_rps() {
        let rps = [100.0, 50.0, 10.0];
        let damages = [Some(500.0), Some(300.0), Some(100.0)];
        let cut = RiskMode::CutFromYear(50).risk(&rps, &damages).unwrap();
        let expected = integrate_trapezoidal(&[(f64::INFINITY, 500.0), (100.0, 500.0), (50.0, 300.0)]);
        assert!(close(cut, expected));
        // 0.01 × 500 + 0.01 × 800 / 2
        assert!(close(cut, 9.0));
    }

    #[test]
    fn test_cut_from_interpolates_in_frequency() {
        let rps = [100.0, 10.0];
        let damages = [Some(500.0), Some(100.0)];
        let cut = RiskMode::CutFromYear(20).risk(&rps, &damages).unwrap();
        // f = 0.05 lies between 0.01 (500) and 0.1 (100)
        let d20 = 500.0 + (100.0 - 500.0) * (0.05 - 0.01) / (0.1 - 0.01);
        let expected = 0.01 * 500.0 + (0.05 - 0.01) * (500.0 + d20) / 2.0;
        assert!(close(cut, expected));
    }

    #[test]
    fn test_cut_from_beyond_max_rp() {
        let rps = [100.0, 10.0];
        let damages = [Some(500.0), Some(100.0)];
        assert!(close(RiskMode::CutFromYear(100).risk(&rps, &damages).unwrap(), 5.0));
        assert!(close(RiskMode::CutFromYear(250).risk(&rps, &damages).unwrap(), 2.0));
    }

    #[test]
    fn test_triangle_to_null() {
        let rps = [100.0, 10.0];
        let damages = [Some(500.0), Some(100.0)];
        let risk = RiskMode::TriangleToNull(2).risk(&rps, &damages).unwrap();
        assert!(close(risk, 32.0 + (0.5 - 0.1) * 100.0 / 2.0));

        let zero = RiskMode::TriangleToNull(0).risk(&rps, &damages).unwrap();
        let one = RiskMode::TriangleToNull(1).risk(&rps, &damages).unwrap();
        assert!(close(zero, one));

        for year in [10, 50] {
            let result = RiskMode::TriangleToNull(year).risk(&rps, &damages);
            assert!(matches!(result, Err(DamageError::RiskBoundary { .. })));
        }
    }

    #[test]
    fn test_triangle_end_year_overrides_existing_rp1() {
        let rps = [10.0, 1.0];
        let damages = [Some(10.0), Some(10.0)];
        // 0.1 × 10 + (1 - 0.1) × (10 + 0) / 2
        let risk = RiskMode::TriangleToNull(0).risk(&rps, &damages).unwrap();
        assert!(close(risk, 5.5));
        assert!(matches!(
            RiskMode::TriangleToNull(1).risk(&rps, &damages),
            Err(DamageError::RiskBoundary { year: 1, .. })
        ));

        let only_rp1 = RiskMode::TriangleToNull(0).risk(&[1.0], &[Some(8.0)]).unwrap();
        assert!(close(only_rp1, 4.0));
    }

    #[test]
    fn test_risk_mode_from_config() {
        assert_eq!(
            RiskCalculationMode::from_str_flexible("cut_from_year").unwrap(),
            RiskCalculationMode::CutFromYear
        );
        assert!(matches!(
            RiskCalculationMode::from_str_flexible("integral"),
            Err(DamageError::NotImplemented { .. })
        ));
        assert_eq!(RiskCalculationMode::None.to_risk_mode(None).unwrap(), None);
        assert_eq!(
            RiskCalculationMode::TriangleToNullYear.to_risk_mode(Some(2)).unwrap(),
            Some(RiskMode::TriangleToNull(2))
        );
        assert!(RiskCalculationMode::CutFromYear.to_risk_mode(None).is_err());
    }

    #[test]
    fn test_three_segment_scenario() {
        let table = SegmentTable::from_segments(
            "F",
            vec![
                Segment::new("1", "motorway", LaneValue::Number(2.0), 100.0)
                    .with_event("F", "RP10", 0.5, 0.8)
                    .with_event("F", "RP100", 1.5, 1.0),
                Segment::new("2", "residential", LaneValue::Number(1.0), 200.0)
                    .with_event("F", "RP10", 0.25, 0.5)
                    .with_event("F", "RP100", 1.0, 0.75),
                Segment::new("3", "service", LaneValue::Number(1.0), 50.0)
                    .with_event("F", "RP10", 0.0, 0.0)
                    .with_event("F", "RP100", 2.0, 0.4),
            ],
        );
        let events = EventSet::from_hazard_columns(EventType::ReturnPeriod, &table.hazard_columns()).unwrap();
        let table = SegmentDamageCalculator::new(DamageCurveKind::Huizinga, events)
            .run(table)
            .unwrap();
        let table = RiskIntegrator::new(DamageCurveKind::Huizinga, RiskMode::Default)
            .run(table)
            .unwrap();

        let expected_damages = [
            (350.0 * 0.25 * 0.8 * 100.0, 350.0 * 0.55 * 1.0 * 100.0),
            (75.0 * 0.125 * 0.5 * 200.0, 75.0 * 0.42 * 0.75 * 200.0),
            (0.0, 75.0 * 0.65 * 0.4 * 50.0),
        ];
        for (row, (d10, d100)) in expected_damages.iter().enumerate() {
            let dam10 = table.output(row, "dam_RP10_HZ").unwrap();
            let dam100 = table.output(row, "dam_RP100_HZ").unwrap();
            assert!((dam10 - d10).abs() < 0.01);
            assert!((dam100 - d100).abs() < 0.01);

            let expected_risk = 0.5 * (0.1 - 0.01) * (dam10 + dam100) + 0.5 * 0.01 * (2.0 * dam100);
            assert!(close(table.output(row, "risk_HZ").unwrap(), expected_risk));
        }
    }
}
