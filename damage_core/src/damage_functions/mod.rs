//! # Damage Functions
//!
//! Building blocks for turning hazard severity into damage:
//!
//! - [`DamageFractionCurve`] - severity (m) to damage fraction
//! - [`MaxDamageTable`] - max damage per road type and lane count (euro/m)
//! - [`DamageFunction`] - a max damage table paired with a fraction curve
//! - [`ManualDamageFunctionSet`] - user-supplied damage functions read from disk

pub mod fraction_curve;
pub mod manual;
pub mod max_damage;
pub mod road_type_lane;

pub use fraction_curve::{CurvePoint, DamageFractionCurve};
pub use manual::ManualDamageFunctionSet;
pub use max_damage::MaxDamageTable;
pub use road_type_lane::{DamageFunction, MaxDamageColumn};
