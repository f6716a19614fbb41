//! # Damage Analysis
//!
//! Runs a configured analysis over a segment table:
//!
//! ```text
//! DamagesConfig + SegmentTable
//!     │
//!     ├── validate config
//!     ├── EventSet from hazard columns
//!     ├── manual damage functions (MAN only)
//!     ├── SegmentDamageCalculator   → dam_* columns
//!     └── RiskIntegrator            → risk_* columns (return periods with a risk mode)
//! ```

use std::collections::BTreeMap;

use crate::calculations::{DamageCurveKind, RiskIntegrator, SegmentDamageCalculator};
use crate::config::DamagesConfig;
use crate::damage_functions::ManualDamageFunctionSet;
use crate::errors::{DamageError, DamageResult};
use crate::events::{EventSet, EventType};
use crate::segments::SegmentTable;

/// Run the damage pipeline and, when configured, the risk integration
pub fn run_damages(config: &DamagesConfig, table: SegmentTable) -> DamageResult<SegmentTable> {
    config.validate().into_result()?;

    if table.hazard_prefix != config.hazard_prefix {
        return Err(DamageError::precondition(format!(
            "Table was loaded with hazard prefix '{}' but the analysis uses '{}'",
            table.hazard_prefix, config.hazard_prefix
        )));
    }

    let events = EventSet::from_hazard_columns(config.event_type, &table.hazard_columns())?;
    log::info!(
        "Analysis '{}': {} with {} event(s) on {} segments",
        config.name,
        config.damage_curve.description(),
        events.len(),
        table.len()
    );

    let manual_functions = match (config.damage_curve, &config.damage_functions_folder) {
        (DamageCurveKind::Manual, Some(folder)) => ManualDamageFunctionSet::from_input_folder(folder)?,
        (DamageCurveKind::Manual, None) => {
            return Err(DamageError::missing_field("damage_functions_folder"));
        }
        _ => ManualDamageFunctionSet::new(),
    };

    let calculator = SegmentDamageCalculator::new(config.damage_curve, events)
        .with_representative_percentage(config.representative_damage_percentage)
        .with_country(config.country.clone())
        .with_manual_functions(manual_functions);
    let table = calculator.run(table)?;

    if config.event_type != EventType::ReturnPeriod {
        return Ok(table);
    }
    match config.risk_mode()? {
        Some(mode) => RiskIntegrator::new(config.damage_curve, mode).run(table),
        None => Ok(table),
    }
}

/// Sum of every `risk_<curve>` column over all segments
pub fn risk_totals(table: &SegmentTable) -> BTreeMap<String, f64> {
    table
        .output_columns_with_prefix("risk_")
        .into_iter()
        .map(|column| {
            let total: f64 = (0..table.len()).filter_map(|row| table.output(row, &column)).sum();
            let curve = column.trim_start_matches("risk_").to_string();
            (curve, total)
        })
        .collect()
}
