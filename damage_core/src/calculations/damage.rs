//! # Segment Damage Calculator
//!
//! Computes per-event damage for every segment of a table with one of three
//! strategies:
//!
//! | Kind  | Max damage                          | Curve(s)     | Rounding |
//! |-------|-------------------------------------|--------------|----------|
//! | `HZ`  | Huizinga table by road type, lanes  | HZ           | 2 dec.   |
//! | `OSD` | Lower/upper bound × lane correction | C1..C6       | 3 dec.   |
//! | `MAN` | User tables by infra type, lanes    | per function | 0 dec.   |
//!
//! The pipeline is fixed: preconditions, cleanup, mask, damage. Each stage
//! takes the table by value and returns it. Only rows in the mask receive
//! damage values; every other row keeps null.
//!
//! ## OSdaMage quantiles
//!
//! For each quantile level `p` in {0, 25, 50, 75, 100}:
//!
//! ```text
//! max_damage(p) = upper × p/100 + lower × (100 - p)/100
//! ```
//!
//! The five damages of a (curve, event) pair form the quantile tuple. The
//! representative damage is read off that tuple at the configured
//! percentage, extrapolating linearly beyond 0 and 100.
//!
//! ## Example
//!
//! ```rust
//! use damage_core::calculations::{DamageCurveKind, SegmentDamageCalculator};
//! use damage_core::events::{EventSet, EventType};
//! use damage_core::segments::{LaneValue, Segment, SegmentTable};
//!
//! let table = SegmentTable::from_segments("F", vec![
//!     Segment::new("1", "motorway", LaneValue::Number(2.0), 100.0)
//!         .with_event("F", "RP10", 0.5, 1.0),
//! ]);
//! let events = EventSet::from_hazard_columns(EventType::ReturnPeriod, &table.hazard_columns()).unwrap();
//!
//! let calculator = SegmentDamageCalculator::new(DamageCurveKind::Huizinga, events);
//! let table = calculator.run(table).unwrap();
//!
//! // 350 euro/m × 0.25 × 1.0 × 100 m
//! assert_eq!(table.output(0, "dam_RP10_HZ"), Some(8750.0));
//! ```

use crate::damage_functions::ManualDamageFunctionSet;
use crate::errors::{DamageError, DamageResult};
use crate::events::{
    damage_column, hazard_column, hazard_stats, quantile_damage_column, quartiles_key,
    representative_column, EventSet, STAT_FRACTION, STAT_MEAN,
};
use crate::lookup::{
    library, DamageBound, DamageCurveLibrary, HUIZINGA_CURVE, OSDAMAGE_CURVES, QUANTILE_LEVELS,
};
use crate::numeric::{interpolate_extrapolating, round_half_even};
use crate::road_types::RoadType;
use crate::segments::{Segment, SegmentTable};

use super::cleanup::{cleanup, create_mask};
use super::DamageCurveKind;

/// Default percentage at which the representative OSdaMage damage is taken
pub const DEFAULT_REPRESENTATIVE_PERCENTAGE: f64 = 100.0;

const HUIZINGA_DECIMALS: u32 = 2;
const OSDAMAGE_DECIMALS: u32 = 3;

/// One damage calculation: strategy, events and options
#[derive(Debug, Clone)]
pub struct SegmentDamageCalculator {
    pub kind: DamageCurveKind,
    pub events: EventSet,
    pub representative_damage_percentage: f64,
    /// Country code for default lanes when a table has no lane data at all
    pub country: Option<String>,
    pub manual_functions: ManualDamageFunctionSet,
}

impl SegmentDamageCalculator {
    pub fn new(kind: DamageCurveKind, events: EventSet) -> Self {
        SegmentDamageCalculator {
            kind,
            events,
            representative_damage_percentage: DEFAULT_REPRESENTATIVE_PERCENTAGE,
            country: None,
            manual_functions: ManualDamageFunctionSet::new(),
        }
    }

    pub fn with_representative_percentage(mut self, percentage: f64) -> Self {
        self.representative_damage_percentage = percentage;
        self
    }

    pub fn with_country(mut self, country: Option<String>) -> Self {
        self.country = country;
        self
    }

    pub fn with_manual_functions(mut self, functions: ManualDamageFunctionSet) -> Self {
        self.manual_functions = functions;
        self
    }

    /// Fails when there is no event or the `me`/`fr` hazard statistics are
    /// missing
    pub fn check_preconditions(&self, table: &SegmentTable) -> DamageResult<()> {
        if self.events.is_empty() {
            return Err(DamageError::precondition("No events to compute damage for"));
        }
        let stats = hazard_stats(&table.hazard_columns());
        for stat in [STAT_MEAN, STAT_FRACTION] {
            if !stats.contains(stat) {
                return Err(DamageError::precondition(format!(
                    "Hazard statistic '{}' is required but no '{}_<event>_{}' column was found",
                    stat, table.hazard_prefix, stat
                )));
            }
        }
        Ok(())
    }

    /// Run the full pipeline
    pub fn run(&self, table: SegmentTable) -> DamageResult<SegmentTable> {
        self.check_preconditions(&table)?;
        let lib = library()?;

        let table = cleanup(table, lib, self.country.as_deref())?;
        let mask = create_mask(&table);

        let table = match self.kind {
            DamageCurveKind::Huizinga => self.damage_huizinga(table, &mask, lib)?,
            DamageCurveKind::OsdaMage => self.damage_osdamage(table, &mask, lib)?,
            DamageCurveKind::Manual => self.damage_manual(table, &mask)?,
        };

        log::info!(
            "Damage calculation with {} was successful: {} event(s), {} of {} segments exposed",
            self.kind,
            self.events.len(),
            mask.len(),
            table.len()
        );
        Ok(table)
    }

    /// Huizinga max damage × HZ curve × exposed fraction × length
    pub fn damage_huizinga(
        &self,
        mut table: SegmentTable,
        mask: &[usize],
        lib: &DamageCurveLibrary,
    ) -> DamageResult<SegmentTable> {
        log_methodology_notice(self.kind);
        let curve = lib.curve(HUIZINGA_CURVE)?;
        let max_damage = lib.huizinga_max_damage();
        let prefix = table.hazard_prefix.clone();

        let events = self.events.labels();
        for event in &events {
            table.register_output_column(&damage_column(event, HUIZINGA_CURVE));
        }

        for &row in mask {
            let (road_type, lanes, exposures) = {
                let segment = segment_at(&table, row)?;
                let exposures: Vec<f64> = events
                    .iter()
                    .map(|e| exposure(segment, &prefix, e, |me| curve.evaluate(me)))
                    .collect();
                (segment.require_road_type()?, segment.require_lanes()?, exposures)
            };
            let max_dam = max_damage.lookup(road_type.code(), lanes)?;
            for (event, exposure) in events.iter().zip(exposures) {
                let damage = round_half_even(max_dam * exposure, HUIZINGA_DECIMALS);
                table.set_output(row, &damage_column(event, HUIZINGA_CURVE), Some(damage))?;
            }
        }
        Ok(table)
    }

    /// OSdaMage quantile damages for curves C1..C6.
    ///
    /// C1-C4 only apply to motorway and trunk roads, C5-C6 only to the other
    /// classes; non-applicable combinations stay null.
    pub fn damage_osdamage(
        &self,
        mut table: SegmentTable,
        mask: &[usize],
        lib: &DamageCurveLibrary,
    ) -> DamageResult<SegmentTable> {
        log_methodology_notice(self.kind);
        let prefix = table.hazard_prefix.clone();
        let events = self.events.labels();
        let levels: Vec<f64> = QUANTILE_LEVELS.iter().map(|&p| f64::from(p)).collect();

        for curve_name in OSDAMAGE_CURVES {
            for event in &events {
                for pct in QUANTILE_LEVELS {
                    table.register_output_column(&quantile_damage_column(pct, curve_name, event));
                }
                table.register_output_column(&representative_column(curve_name, event));
            }
        }

        for &row in mask {
            let segment = segment_at(&table, row)?;
            let road_type = segment.require_road_type()?;
            let lanes = segment.require_lanes()?;
            let correction = lib.lane_correction(road_type, lanes)?;
            let lower = lib.osd_bound(DamageBound::Lower, road_type) * correction;
            let upper = lib.osd_bound(DamageBound::Upper, road_type) * correction;
            let max_damages: [f64; 5] =
                QUANTILE_LEVELS.map(|p| upper * f64::from(p) / 100.0 + lower * (100.0 - f64::from(p)) / 100.0);

            let mut values: Vec<(String, String, Option<[f64; 5]>)> = Vec::new();
            for curve_name in OSDAMAGE_CURVES {
                let curve = lib.curve(curve_name)?;
                let applies = curve_applies(curve_name, road_type);
                for event in &events {
                    let tuple = applies.then(|| {
                        let exposure = exposure(segment, &prefix, event, |me| curve.evaluate(me));
                        max_damages.map(|max_dam| round_half_even(max_dam * exposure, OSDAMAGE_DECIMALS))
                    });
                    values.push((curve_name.to_string(), event.to_string(), tuple));
                }
            }

            for (curve_name, event, tuple) in values {
                for (i, pct) in QUANTILE_LEVELS.iter().enumerate() {
                    table.set_output(
                        row,
                        &quantile_damage_column(*pct, &curve_name, &event),
                        tuple.map(|t| t[i]),
                    )?;
                }
                let representative = tuple
                    .map(|t| interpolate_extrapolating(&levels, &t, self.representative_damage_percentage));
                table.set_quantiles(row, &quartiles_key(&curve_name, &event), tuple)?;
                table.set_output(row, &representative_column(&curve_name, &event), representative)?;
            }
        }
        Ok(table)
    }

    /// Every manual damage function for every event
    pub fn damage_manual(&self, table: SegmentTable, mask: &[usize]) -> DamageResult<SegmentTable> {
        let events = self.events.labels();
        self.manual_functions.compute_event_damage(table, mask, &events)
    }
}

/// Whether an OSdaMage curve applies to a road class
pub fn curve_applies(curve_name: &str, road_type: RoadType) -> bool {
    let motorway_curve = matches!(curve_name, "C1" | "C2" | "C3" | "C4");
    motorway_curve == road_type.is_motorway_class()
}

/// `curve(me) × fr × length`; zero when either hazard value is missing
fn exposure(segment: &Segment, prefix: &str, event: &str, curve: impl Fn(f64) -> f64) -> f64 {
    let mean = segment.hazard_value(&hazard_column(prefix, event, STAT_MEAN));
    let fraction = segment.hazard_value(&hazard_column(prefix, event, STAT_FRACTION));
    match (mean, fraction) {
        (Some(me), Some(fr)) => curve(me) * fr * segment.length_m,
        _ => 0.0,
    }
}

fn segment_at(table: &SegmentTable, row: usize) -> DamageResult<&Segment> {
    table.segment(row).ok_or_else(|| DamageError::Internal {
        message: format!("mask row {} out of range", row),
    })
}

fn log_methodology_notice(kind: DamageCurveKind) {
    log::warn!(
        "Damage calculations with {} are based on Van Ginkel et al. 2021: https://nhess.copernicus.org/articles/21/1011/2021/",
        kind.description()
    );
    log::warn!(
        "All damages represent the former EU-28 (before Brexit), 2015 price level in euro. \
         To convert to local currency, multiply by (price_level_XXXX / price_level_2015) and by \
         (local_GDP_per_capita / EU-28-2015-GDP_per_capita), EU-28-2015-GDP_per_capita = 39.200 euro"
    );
    log::warn!("These numbers assume that each driving direction of a motorway is mapped as a separate segment, as in OSM");
}
