//! # Damage Curve Library
//!
//! Embedded reference data for road flood damage, after Van Ginkel et al. 2021
//! (<https://nhess.copernicus.org/articles/21/1011/2021/>).
//!
//! | Table                     | Key                        | Unit      |
//! |---------------------------|----------------------------|-----------|
//! | Default lanes             | country, road type         | lanes     |
//! | Lane correction           | road type, lanes 1..6      | factor    |
//! | OSdaMage bounds           | Lower/Upper, road type     | euro/m    |
//! | Huizinga max damage       | road type, lanes 1..6      | euro/m    |
//! | Damage curves             | HZ, C1..C6                 | m -> frac |
//!
//! Huizinga values are embedded in euro/km and curves in cm; both are
//! converted once when the library is first accessed. The library is never
//! mutated afterwards.
//!
//! All damages represent the former EU-28, 2015 price level.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::damage_functions::{DamageFractionCurve, MaxDamageTable};
use crate::errors::{DamageError, DamageResult};
use crate::road_types::RoadType;
use crate::units::{CostUnit, LengthUnit, SeverityUnit};

/// Name of the Huizinga curve
pub const HUIZINGA_CURVE: &str = "HZ";

/// OSdaMage vulnerability curves, in evaluation order
pub const OSDAMAGE_CURVES: [&str; 6] = ["C1", "C2", "C3", "C4", "C5", "C6"];

/// Max damage quantile levels (percent of the way from lower to upper bound)
pub const QUANTILE_LEVELS: [u8; 5] = [0, 25, 50, 75, 100];

/// Lower or upper OSdaMage construction cost bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DamageBound {
    Lower,
    Upper,
}

// ============================================================================
// Embedded tables
// ============================================================================

/// Default lanes per country, columns in `RoadType::ALL` order
const COUNTRY_LANES: [(&str, [u8; 8]); 35] = [
    ("AL", [2, 2, 2, 2, 1, 1, 1, 1]),
    ("AT", [2, 2, 2, 2, 1, 1, 1, 1]),
    ("BE", [2, 2, 2, 2, 2, 1, 1, 1]),
    ("BG", [2, 2, 2, 2, 2, 1, 1, 1]),
    ("CH", [2, 2, 2, 2, 1, 1, 1, 1]),
    ("CZ", [2, 2, 2, 2, 2, 1, 1, 1]),
    ("DE", [2, 2, 2, 2, 2, 1, 1, 1]),
    ("DK", [2, 2, 2, 2, 2, 1, 1, 1]),
    ("EE", [1, 2, 2, 2, 2, 1, 1, 1]),
    ("EL", [2, 2, 2, 2, 2, 1, 1, 1]),
    ("ES", [2, 2, 2, 2, 2, 1, 1, 1]),
    ("FI", [2, 2, 2, 2, 2, 1, 1, 1]),
    ("FR", [2, 2, 2, 2, 2, 1, 1, 1]),
    ("HR", [2, 2, 2, 2, 2, 1, 1, 1]),
    ("HU", [2, 2, 2, 2, 2, 1, 1, 1]),
    ("IE", [2, 2, 2, 2, 1, 1, 1, 1]),
    ("IS", [2, 2, 2, 2, 1, 1, 1, 1]),
    ("IT", [2, 2, 2, 2, 2, 1, 1, 1]),
    ("LT", [2, 2, 2, 2, 2, 1, 1, 1]),
    ("LU", [2, 3, 2, 2, 2, 1, 1, 1]),
    ("LV", [1, 2, 2, 2, 2, 1, 1, 1]),
    ("LI", [1, 1, 2, 2, 2, 1, 1, 1]),
    ("ME", [1, 1, 2, 1, 2, 1, 1, 1]),
    ("MK", [2, 2, 2, 2, 2, 1, 1, 1]),
    ("NL", [2, 2, 2, 2, 1, 1, 1, 1]),
    ("NO", [2, 2, 2, 2, 1, 1, 1, 1]),
    ("PL", [2, 2, 2, 2, 2, 1, 1, 1]),
    ("PT", [2, 2, 2, 2, 2, 1, 1, 1]),
    ("RO", [2, 2, 2, 2, 2, 1, 1, 1]),
    ("RS", [2, 2, 2, 2, 2, 1, 1, 1]),
    ("SE", [2, 2, 2, 2, 2, 1, 1, 1]),
    ("SI", [2, 2, 2, 2, 2, 1, 1, 1]),
    ("SK", [2, 2, 2, 2, 2, 1, 1, 1]),
    ("TR", [3, 2, 2, 2, 2, 1, 1, 1]),
    ("UK", [3, 2, 2, 2, 2, 1, 1, 1]),
];

const MAJOR_ROAD_LANE_FACTORS: [f64; 6] = [0.75, 1.0, 1.25, 1.5, 1.75, 2.0];
const TERTIARY_LANE_FACTORS: [f64; 6] = [0.75, 1.0, 1.5, 1.75, 2.0, 2.25];
const MINOR_ROAD_LANE_FACTORS: [f64; 6] = [1.0, 1.25, 1.5, 1.75, 2.0, 2.25];

/// OSdaMage construction cost bounds (euro/m), `RoadType::ALL` order
const OSD_LOWER: [f64; 8] = [1750.0, 1250.0, 1000.0, 500.0, 200.0, 100.0, 20.0, 0.0];
const OSD_UPPER: [f64; 8] = [17500.0, 3750.0, 3000.0, 1500.0, 600.0, 300.0, 50.0, 0.0];

/// Huizinga max damage (euro/km) for lanes 1..6; `none` has no entry
const HUIZINGA_EURO_PER_KM: [(RoadType, [f64; 6]); 7] = [
    (RoadType::Motorway, [175000.0, 350000.0, 450000.0, 550000.0, 650000.0, 750000.0]),
    (RoadType::Trunk, [175000.0, 300000.0, 400000.0, 475000.0, 575000.0, 650000.0]),
    (RoadType::Primary, [125000.0, 250000.0, 325000.0, 425000.0, 500000.0, 575000.0]),
    (RoadType::Secondary, [125000.0, 225000.0, 300000.0, 400000.0, 475000.0, 550000.0]),
    (RoadType::Tertiary, [100000.0, 175000.0, 250000.0, 350000.0, 425000.0, 500000.0]),
    (RoadType::Other, [75000.0, 150000.0, 225000.0, 300000.0, 375000.0, 450000.0]),
    (RoadType::Track, [75000.0, 150000.0, 225000.0, 300000.0, 375000.0, 450000.0]),
];

const DEPTHS_C1_C4_CM: [f64; 6] = [0.0, 50.0, 100.0, 150.0, 200.0, 600.0];
const DEPTHS_C5_C6_CM: [f64; 5] = [0.0, 50.0, 100.0, 200.0, 600.0];
const DEPTHS_HZ_CM: [f64; 9] = [0.0, 50.0, 100.0, 150.0, 200.0, 300.0, 400.0, 500.0, 600.0];

// ============================================================================
// Library
// ============================================================================

/// Read-only collection of the embedded reference tables
#[derive(Debug, Clone)]
pub struct DamageCurveLibrary {
    lane_defaults: BTreeMap<String, BTreeMap<RoadType, u8>>,
    lane_correction: BTreeMap<RoadType, [f64; 6]>,
    osd_bounds: BTreeMap<(DamageBound, RoadType), f64>,
    huizinga: MaxDamageTable,
    curves: BTreeMap<String, DamageFractionCurve>,
}

static LIBRARY: Lazy<DamageResult<DamageCurveLibrary>> = Lazy::new(DamageCurveLibrary::build);

/// The process-wide damage curve library, built on first access
pub fn library() -> DamageResult<&'static DamageCurveLibrary> {
    LIBRARY.as_ref().map_err(Clone::clone)
}

impl DamageCurveLibrary {
    fn build() -> DamageResult<Self> {
        let lane_defaults = COUNTRY_LANES
            .iter()
            .map(|(country, lanes)| {
                let per_type = RoadType::ALL.iter().copied().zip(lanes.iter().copied()).collect();
                (country.to_string(), per_type)
            })
            .collect();

        let lane_correction = RoadType::ALL
            .iter()
            .map(|&rt| {
                let factors = match rt {
                    RoadType::Motorway | RoadType::Trunk | RoadType::Primary | RoadType::Secondary => {
                        MAJOR_ROAD_LANE_FACTORS
                    }
                    RoadType::Tertiary => TERTIARY_LANE_FACTORS,
                    RoadType::Other | RoadType::Track | RoadType::None => MINOR_ROAD_LANE_FACTORS,
                };
                (rt, factors)
            })
            .collect();

        let mut osd_bounds = BTreeMap::new();
        for (i, &rt) in RoadType::ALL.iter().enumerate() {
            osd_bounds.insert((DamageBound::Lower, rt), OSD_LOWER[i]);
            osd_bounds.insert((DamageBound::Upper, rt), OSD_UPPER[i]);
        }

        let huizinga_rows = HUIZINGA_EURO_PER_KM.iter().map(|(rt, values)| {
            let per_lane: Vec<(u8, f64)> = (1u8..).zip(values.iter().copied()).collect();
            (rt.code().to_string(), per_lane)
        });
        let euro_per_km = CostUnit {
            currency: "euro".to_string(),
            length: LengthUnit::Kilometer,
        };
        let huizinga = MaxDamageTable::from_rows("huizinga", huizinga_rows, euro_per_km)?;

        let curve_tables: [(&str, &[f64], &[f64]); 7] = [
            (HUIZINGA_CURVE, &DEPTHS_HZ_CM, &[0.0, 0.25, 0.42, 0.55, 0.65, 0.8, 0.9, 1.0, 1.0]),
            ("C1", &DEPTHS_C1_C4_CM, &[0.0, 0.01, 0.03, 0.075, 0.1, 0.2]),
            ("C2", &DEPTHS_C1_C4_CM, &[0.0, 0.02, 0.06, 0.1, 0.12, 0.22]),
            ("C3", &DEPTHS_C1_C4_CM, &[0.0, 0.002, 0.004, 0.025, 0.03, 0.04]),
            ("C4", &DEPTHS_C1_C4_CM, &[0.0, 0.015, 0.04, 0.2, 0.25, 0.35]),
            ("C5", &DEPTHS_C5_C6_CM, &[0.0, 0.015, 0.025, 0.035, 0.05]),
            ("C6", &DEPTHS_C5_C6_CM, &[0.0, 0.12, 0.2, 0.28, 0.35]),
        ];
        let curves = curve_tables
            .iter()
            .map(|(name, depths, fractions)| {
                let points: Vec<(f64, f64)> =
                    depths.iter().copied().zip(fractions.iter().copied()).collect();
                let curve = DamageFractionCurve::from_table(*name, &points, SeverityUnit::Centimeters)?;
                Ok((name.to_string(), curve))
            })
            .collect::<DamageResult<BTreeMap<_, _>>>()?;

        Ok(DamageCurveLibrary {
            lane_defaults,
            lane_correction,
            osd_bounds,
            huizinga,
            curves,
        })
    }

    /// Canonical road type for a raw infrastructure type
    pub fn road_type(&self, infra_type: &str) -> RoadType {
        RoadType::from_infra_type(infra_type)
    }

    /// Default lane count for a country and road type
    pub fn default_lanes(&self, country: &str, road_type: RoadType) -> DamageResult<u8> {
        self.lane_defaults
            .get(&country.trim().to_uppercase())
            .and_then(|per_type| per_type.get(&road_type))
            .copied()
            .ok_or_else(|| DamageError::unknown_key("default lanes", format!("{}/{}", country, road_type)))
    }

    /// Max damage correction factor for a lane count in `[1, 6]`
    pub fn lane_correction(&self, road_type: RoadType, lanes: u8) -> DamageResult<f64> {
        self.lane_correction
            .get(&road_type)
            .and_then(|factors| factors.get(usize::from(lanes).wrapping_sub(1)))
            .copied()
            .ok_or_else(|| {
                DamageError::unknown_key("lane correction", format!("{}/{}", road_type, lanes))
            })
    }

    /// OSdaMage construction cost bound in euro/m
    pub fn osd_bound(&self, bound: DamageBound, road_type: RoadType) -> f64 {
        self.osd_bounds.get(&(bound, road_type)).copied().unwrap_or(0.0)
    }

    /// Huizinga max damage table in euro/m
    pub fn huizinga_max_damage(&self) -> &MaxDamageTable {
        &self.huizinga
    }

    /// Damage curve by name (`HZ`, `C1`..`C6`)
    pub fn curve(&self, name: &str) -> DamageResult<&DamageFractionCurve> {
        self.curves
            .get(name)
            .ok_or_else(|| DamageError::unknown_key("damage curves", name))
    }

    /// Names of the embedded curves
    pub fn curve_names(&self) -> Vec<&str> {
        self.curves.keys().map(|k| k.as_str()).collect()
    }

    /// Country codes with default lane data
    pub fn countries(&self) -> Vec<&str> {
        self.lane_defaults.keys().map(|k| k.as_str()).collect()
    }
}
