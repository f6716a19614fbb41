//! Manual damage function sets: one [`DamageFunction`] per sub-folder of an
//! input folder, named after the sub-folder.
//!
//! ```text
//! damage_functions/
//! ├── all_road_types/
//! │   ├── max_damage_road_types.csv
//! │   └── hazard_severity_damage_fraction.csv
//! └── paved/
//!     ├── max_damage_paved.csv
//!     └── hazard_severity_paved.csv
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::DamageFunction;
use crate::errors::{DamageError, DamageResult};
use crate::segments::SegmentTable;

/// Named damage functions, iterated in name order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManualDamageFunctionSet {
    functions: BTreeMap<String, DamageFunction>,
}

impl ManualDamageFunctionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load one damage function per immediate sub-folder of `root`
    pub fn from_input_folder(root: &Path) -> DamageResult<Self> {
        let entries = fs::read_dir(root).map_err(|e| {
            DamageError::file_error("read directory", root.display().to_string(), e.to_string())
        })?;

        let mut set = ManualDamageFunctionSet::new();
        for entry in entries {
            let path = entry
                .map_err(|e| DamageError::file_error("read directory", root.display().to_string(), e.to_string()))?
                .path();
            if !path.is_dir() {
                continue;
            }
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            set.insert(DamageFunction::from_folder(name, &path)?)?;
        }

        log::info!(
            "Loaded {} manual damage function(s) from {}: {:?}",
            set.len(),
            root.display(),
            set.names()
        );
        Ok(set)
    }

    /// Add a function. Output columns are tagged with the function's
    /// prefix, so two functions sharing a prefix are rejected.
    pub fn insert(&mut self, function: DamageFunction) -> DamageResult<()> {
        if let Some(existing) = self.functions().find(|f| f.prefix() == function.prefix()) {
            return Err(DamageError::invalid_input(
                "damage function",
                function.name.clone(),
                format!(
                    "Column prefix '{}' is already used by damage function '{}'",
                    function.prefix(),
                    existing.name
                ),
            ));
        }
        self.functions.insert(function.name.clone(), function);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&DamageFunction> {
        self.functions.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.functions.keys().map(|k| k.as_str()).collect()
    }

    pub fn functions(&self) -> impl Iterator<Item = &DamageFunction> {
        self.functions.values()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Apply every function to every event for the given rows
    pub fn compute_event_damage(
        &self,
        mut table: SegmentTable,
        rows: &[usize],
        events: &[&str],
    ) -> DamageResult<SegmentTable> {
        if self.is_empty() {
            return Err(DamageError::EmptyDamageFunctionSet);
        }
        for function in self.functions() {
            let max_damage = function.apply_max_damage(&table, rows)?;
            for event in events {
                table = function.compute_event_damage(table, &max_damage, event)?;
            }
            log::debug!("Manual damage function '{}' applied to {} event(s)", function.name, events.len());
        }
        Ok(table)
    }
}
