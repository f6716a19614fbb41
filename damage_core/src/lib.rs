//! # damage_core - Road Flood Damage and Risk Engine
//!
//! `damage_core` estimates direct physical damage to road segments exposed to
//! a hazard (flooding) and annualizes it into expected annual damage. All
//! inputs and outputs are JSON-serializable and every failure is a structured
//! [`DamageError`].
//!
//! ## Pipeline
//!
//! ```text
//! SegmentTable ─► cleanup ─► mask ─► damage (HZ | OSD | MAN) ─► risk
//!                  road types          dam_* columns           risk_* columns
//!                  lanes
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use damage_core::analysis::run_damages;
//! use damage_core::calculations::{DamageCurveKind, RiskCalculationMode};
//! use damage_core::config::DamagesConfig;
//! use damage_core::events::EventType;
//! use damage_core::segments::{LaneValue, Segment, SegmentTable};
//!
//! let table = SegmentTable::from_segments("F", vec![
//!     Segment::new("1", "motorway", LaneValue::Number(2.0), 100.0)
//!         .with_event("F", "RP10", 0.5, 0.8)
//!         .with_event("F", "RP100", 1.5, 1.0),
//! ]);
//! let config = DamagesConfig::new("example", EventType::ReturnPeriod, DamageCurveKind::Huizinga)
//!     .with_risk(RiskCalculationMode::Default, None);
//!
//! let table = run_damages(&config, table).unwrap();
//! assert!(table.output(0, "risk_HZ").is_some());
//! ```
//!
//! ## Modules
//!
//! - [`analysis`] - Configured end-to-end runs
//! - [`calculations`] - Cleanup, damage strategies, risk integration
//! - [`config`] - Analysis settings and validation
//! - [`damage_functions`] - Damage fraction curves, max damage tables, manual sets
//! - [`lookup`] - Embedded reference data
//! - [`segments`] - The segment table
//! - [`events`] - Events, return periods and column naming
//! - [`units`] - Type-safe unit wrappers
//! - [`errors`] - Structured error types
//! - [`file_io`] - Delimited segment files with atomic saves
//! - [`tabular`] - `csv` reader and writer setup shared by every file format

pub mod analysis;
pub mod calculations;
pub mod config;
pub mod damage_functions;
pub mod errors;
pub mod events;
pub mod file_io;
pub mod lookup;
pub mod numeric;
pub mod road_types;
pub mod segments;
pub mod tabular;
pub mod units;

// Re-export commonly used types at crate root for convenience
pub use analysis::run_damages;
pub use calculations::{DamageCurveKind, RiskCalculationMode, RiskIntegrator, RiskMode, SegmentDamageCalculator};
pub use config::{load_config, DamagesConfig, ValidationReport};
pub use errors::{DamageError, DamageResult};
pub use events::{EventSet, EventType};
pub use file_io::{load_segments, save_segments};
pub use road_types::RoadType;
pub use segments::{LaneValue, Segment, SegmentTable};
