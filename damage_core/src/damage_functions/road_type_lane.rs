//! Damage Function by Road Type and Lane
//!
//! A user-supplied damage function: max damage differs per road type and lane
//! count, the damage fraction curve is shared by all of them.
//!
//! ```text
//! damage = max_damage(infra_type, lanes) × curve(me) × fr × length
//! ```
//!
//! rounded to whole currency units.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{DamageFractionCurve, MaxDamageTable};
use crate::errors::{DamageError, DamageResult};
use crate::events::{damage_column, hazard_column, STAT_FRACTION, STAT_MEAN};
use crate::numeric::round_half_even;
use crate::segments::SegmentTable;

/// Separator of the files in a damage function folder
pub const DAMAGE_FUNCTION_SEPARATOR: char = ';';

/// Max damage per masked row, as `(row, euro/m)`
pub type MaxDamageColumn = Vec<(usize, f64)>;

/// Max damage table plus fraction curve under one name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageFunction {
    pub name: String,
    pub max_damage: MaxDamageTable,
    pub damage_fraction: DamageFractionCurve,
}

impl DamageFunction {
    pub fn new(name: impl Into<String>, max_damage: MaxDamageTable, damage_fraction: DamageFractionCurve) -> Self {
        DamageFunction {
            name: name.into(),
            max_damage,
            damage_fraction,
        }
    }

    /// Load from a folder holding exactly one `*max_damage*.csv` and exactly
    /// one `*hazard_severity*.csv`, both `;` separated
    pub fn from_folder(name: impl Into<String>, folder: &Path) -> DamageResult<Self> {
        let name = name.into();
        let max_damage_path = find_unique_csv(folder, "max_damage")?;
        let curve_path = find_unique_csv(folder, "hazard_severity")?;

        let max_damage = MaxDamageTable::from_csv(&max_damage_path, DAMAGE_FUNCTION_SEPARATOR)?;
        let damage_fraction = DamageFractionCurve::from_csv(&curve_path, DAMAGE_FUNCTION_SEPARATOR)?;

        log::info!("Loaded damage function '{}' from {}", name, folder.display());
        Ok(Self::new(name, max_damage, damage_fraction))
    }

    /// Column tag: the first two characters of the name when it is longer
    /// than two characters, otherwise the name itself
    pub fn prefix(&self) -> &str {
        match self.name.char_indices().nth(2) {
            Some((end, _)) => &self.name[..end],
            None => &self.name,
        }
    }

    /// Look up max damage for the given rows.
    ///
    /// The table is keyed by the raw `infra_type` label; when a label is not
    /// a row of the table the canonical road type code is tried. Fails when
    /// cleanup has not populated `road_type` and `lanes`.
    pub fn apply_max_damage(&self, table: &SegmentTable, rows: &[usize]) -> DamageResult<MaxDamageColumn> {
        rows.iter()
            .map(|&row| {
                let segment = table.segment(row).ok_or_else(|| DamageError::Internal {
                    message: format!("row {} out of range", row),
                })?;
                let road_type = segment.require_road_type()?;
                let lanes = segment.require_lanes()?;
                let label = if self.max_damage.has_road_type(&segment.infra_type) {
                    segment.infra_type.as_str()
                } else {
                    road_type.code()
                };
                Ok((row, self.max_damage.lookup(label, lanes)?))
            })
            .collect()
    }

    /// Damage of one event for every row of `max_damage`, written to
    /// `dam_<event>_<prefix>`. Missing hazard values give zero damage.
    pub fn compute_event_damage(
        &self,
        mut table: SegmentTable,
        max_damage: &MaxDamageColumn,
        event: &str,
    ) -> DamageResult<SegmentTable> {
        let mean_col = hazard_column(&table.hazard_prefix, event, STAT_MEAN);
        let fraction_col = hazard_column(&table.hazard_prefix, event, STAT_FRACTION);
        let result_col = damage_column(event, self.prefix());
        let curve = self.damage_fraction.build_interpolator();

        for &(row, max_dam) in max_damage {
            let damage = match table.segment(row) {
                Some(segment) => {
                    match (segment.hazard_value(&mean_col), segment.hazard_value(&fraction_col)) {
                        (Some(me), Some(fr)) => max_dam * curve(me) * fr * segment.length_m,
                        _ => 0.0,
                    }
                }
                None => 0.0,
            };
            table.set_output(row, &result_col, Some(round_half_even(damage, 0)))?;
        }
        table.register_output_column(&result_col);
        Ok(table)
    }
}

/// The single `.csv` file in `folder` whose stem contains `part`
fn find_unique_csv(folder: &Path, part: &str) -> DamageResult<PathBuf> {
    let entries = fs::read_dir(folder).map_err(|e| {
        DamageError::file_error("read directory", folder.display().to_string(), e.to_string())
    })?;

    let mut found: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension().map(|ext| ext == "csv").unwrap_or(false)
                && path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().contains(part))
                    .unwrap_or(false)
        })
        .collect();

    if found.len() != 1 {
        return Err(DamageError::FileSearch {
            folder: folder.display().to_string(),
            pattern: part.to_string(),
            found: found.len(),
        });
    }
    Ok(found.remove(0))
}
