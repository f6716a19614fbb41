//! # File I/O Module
//!
//! Reads segment tables from delimited text and writes result tables back:
//! - **Header recognition**: id, infrastructure type, lanes and length are
//!   picked out by name, hazard columns by their prefix token
//! - **Pass-through**: every other column is kept verbatim and written back
//! - **Atomic saves**: write to `.tmp`, sync, rename to prevent partial files
//!
//! ## Input Columns
//!
//! | Header                    | Meaning                                     |
//! |---------------------------|---------------------------------------------|
//! | `id`                      | Segment identifier (row number if absent)   |
//! | `infra_type` / `highway`  | Raw OSM infrastructure type (required)      |
//! | `lanes`                   | Raw lane data, any text                     |
//! | `length` / `length_m`     | Segment length in meters (required)         |
//! | `F_RP10_me`, `F_EV1_fr`   | Hazard columns for prefix `F`               |
//! | `RP10_me`, `EV1_fr`       | Bare hazard columns, renamed to `F_RP10_me` |
//!
//! ## Example
//!
//! ```rust,no_run
//! use damage_core::file_io::{load_segments, save_segments};
//! use std::path::Path;
//!
//! let table = load_segments(Path::new("segments.csv"), ',', "F").unwrap();
//! save_segments(&table, Path::new("damages.csv"), ',').unwrap();
//! ```

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use crate::errors::{DamageError, DamageResult};
use crate::events::HazardColumn;
use crate::segments::{LaneValue, Segment, SegmentTable};
use crate::tabular;

const ID_HEADERS: [&str; 1] = ["id"];
const INFRA_TYPE_HEADERS: [&str; 2] = ["infra_type", "highway"];
const LANES_HEADERS: [&str; 1] = ["lanes"];
const LENGTH_HEADERS: [&str; 2] = ["length", "length_m"];
/// Recomputed by cleanup, never read back
const DERIVED_HEADERS: [&str; 1] = ["road_type"];

/// Role of an input column
#[derive(Debug, Clone, PartialEq)]
enum ColumnRole {
    Id,
    InfraType,
    Lanes,
    Length,
    Derived,
    Hazard(String),
    Attribute(String),
}

fn column_role(header: &str, prefix: &str) -> ColumnRole {
    let name = header.trim();
    if ID_HEADERS.contains(&name) {
        return ColumnRole::Id;
    }
    if INFRA_TYPE_HEADERS.contains(&name) {
        return ColumnRole::InfraType;
    }
    if LANES_HEADERS.contains(&name) {
        return ColumnRole::Lanes;
    }
    if LENGTH_HEADERS.contains(&name) {
        return ColumnRole::Length;
    }
    if DERIVED_HEADERS.contains(&name) {
        return ColumnRole::Derived;
    }
    if let Some(hc) = HazardColumn::parse(name) {
        if hc.prefix == prefix {
            return ColumnRole::Hazard(name.to_string());
        }
    }
    if is_bare_event_column(name) {
        return ColumnRole::Hazard(format!("{}_{}", prefix, name));
    }
    ColumnRole::Attribute(name.to_string())
}

/// `RP<number>_<stat>` or `EV<number>_<stat>` without a prefix token
fn is_bare_event_column(name: &str) -> bool {
    let mut parts = name.split('_');
    let (Some(event), Some(stat)) = (parts.next(), parts.next()) else {
        return false;
    };
    if stat.is_empty() || parts.next().is_some() {
        return false;
    }
    ["RP", "EV"].iter().any(|kind| {
        event
            .strip_prefix(kind)
            .is_some_and(|number| number.parse::<f64>().is_ok_and(|n| n.is_finite() && n >= 0.0))
    })
}

/// Load a segment table from a delimited file
pub fn load_segments(path: &Path, sep: char, hazard_prefix: &str) -> DamageResult<SegmentTable> {
    let reader = tabular::open(path, sep)?;
    let table = segments_from_reader(reader, hazard_prefix, &path.display().to_string())?;
    log::info!(
        "Loaded {} segments with {} hazard columns from {}",
        table.len(),
        table.hazard_columns().len(),
        path.display()
    );
    Ok(table)
}

/// Build a segment table from delimited text already in memory
pub fn parse_segments(contents: &str, sep: char, hazard_prefix: &str) -> DamageResult<SegmentTable> {
    let reader = tabular::reader(contents.as_bytes(), sep)?;
    segments_from_reader(reader, hazard_prefix, "input")
}

/// Build a segment table from a `csv` reader positioned before the header
pub fn segments_from_reader<R: io::Read>(
    mut reader: csv::Reader<R>,
    hazard_prefix: &str,
    source_name: &str,
) -> DamageResult<SegmentTable> {
    let header = tabular::header(&mut reader, source_name)?;
    let roles: Vec<ColumnRole> = header.iter().map(|h| column_role(h, hazard_prefix)).collect();

    if !roles.contains(&ColumnRole::InfraType) {
        return Err(DamageError::missing_field(format!(
            "{} (one of {})",
            INFRA_TYPE_HEADERS[0],
            INFRA_TYPE_HEADERS.join(", ")
        )));
    }
    if !roles.contains(&ColumnRole::Length) {
        return Err(DamageError::missing_field(format!(
            "{} (one of {})",
            LENGTH_HEADERS[0],
            LENGTH_HEADERS.join(", ")
        )));
    }

    let mut table = SegmentTable::new(hazard_prefix);
    for role in &roles {
        match role {
            ColumnRole::Hazard(column) => table.register_hazard_column(column.clone()),
            ColumnRole::Attribute(column) => table.register_attribute_column(column.clone()),
            _ => {}
        }
    }

    for (row_number, row) in reader.records().enumerate() {
        let row = row.map_err(|e| tabular::read_error(source_name, e))?;
        if row.len() != roles.len() {
            return Err(DamageError::format(
                source_name,
                format!(
                    "row {} has {} fields, header has {}",
                    row_number + 1,
                    row.len(),
                    roles.len()
                ),
            ));
        }

        let mut segment = Segment {
            id: row_number.to_string(),
            ..Default::default()
        };
        for (role, cell) in roles.iter().zip(row.iter()) {
            match role {
                ColumnRole::Id => segment.id = cell.to_string(),
                ColumnRole::InfraType => segment.infra_type = cell.to_string(),
                ColumnRole::Lanes => segment.raw_lanes = LaneValue::from_cell(cell),
                ColumnRole::Length => {
                    let length = parse_number(cell).ok_or_else(|| {
                        DamageError::invalid_input(
                            "length",
                            cell,
                            format!("Segment '{}' has no numeric length", segment.id),
                        )
                    })?;
                    segment.length_m = length;
                }
                ColumnRole::Hazard(column) => {
                    if is_null_cell(cell) {
                        continue;
                    }
                    let value = parse_number(cell).ok_or_else(|| {
                        DamageError::invalid_input(column.clone(), cell, "Hazard value is not a number")
                    })?;
                    segment.hazard.insert(column.clone(), value);
                }
                ColumnRole::Attribute(column) => {
                    segment.attributes.insert(column.clone(), cell.to_string());
                }
                ColumnRole::Derived => {}
            }
        }
        table.push(segment);
    }

    Ok(table)
}

fn is_null_cell(cell: &str) -> bool {
    let trimmed = cell.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") || trimmed.eq_ignore_ascii_case("none")
}

fn parse_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Header of a saved table: input columns followed by computed columns
pub fn output_header(table: &SegmentTable) -> Vec<String> {
    let mut header: Vec<String> = ["id", "infra_type", "road_type", "lanes", "length"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    header.extend(table.hazard_columns());
    header.extend(table.attribute_columns().iter().cloned());
    header.extend(table.output_columns().iter().cloned());
    header.extend(table.quantile_columns().iter().cloned());
    header
}

/// Cells of one segment in [`output_header`] order, empty cells for nulls
fn output_row(table: &SegmentTable, hazard_columns: &[String], segment: &Segment) -> Vec<String> {
    let mut cells = vec![
        segment.id.clone(),
        segment.infra_type.clone(),
        segment.road_type.map(|rt| rt.code().to_string()).unwrap_or_default(),
        match segment.lanes {
            Some(lanes) => lanes.to_string(),
            None => segment.raw_lanes.to_string(),
        },
        format_number(Some(segment.length_m)),
    ];
    cells.extend(hazard_columns.iter().map(|c| format_number(segment.hazard_value(c))));
    cells.extend(
        table
            .attribute_columns()
            .iter()
            .map(|c| segment.attributes.get(c).cloned().unwrap_or_default()),
    );
    cells.extend(table.output_columns().iter().map(|c| format_number(segment.output(c))));
    cells.extend(table.quantile_columns().iter().map(|c| {
        segment
            .quantiles
            .get(c)
            .map(|values| {
                let inner: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                format!("[{}]", inner.join(", "))
            })
            .unwrap_or_default()
    }));
    cells
}

/// Write a table as delimited records
pub fn write_segments<W: io::Write>(table: &SegmentTable, output: W, sep: char) -> DamageResult<W> {
    let hazard_columns = table.hazard_columns();
    let mut writer = tabular::writer(output, sep)?;

    writer.write_record(output_header(table)).map_err(tabular::write_error)?;
    for segment in table.segments() {
        writer
            .write_record(output_row(table, &hazard_columns, segment))
            .map_err(tabular::write_error)?;
    }
    writer.into_inner().map_err(tabular::write_error)
}

/// Render a table as delimited text
pub fn segments_to_string(table: &SegmentTable, sep: char) -> DamageResult<String> {
    let bytes = write_segments(table, Vec::new(), sep)?;
    String::from_utf8(bytes).map_err(tabular::write_error)
}

fn format_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Save a table with an atomic write
pub fn save_segments(table: &SegmentTable, path: &Path, sep: char) -> DamageResult<()> {
    let contents = segments_to_string(table, sep)?;

    let tmp_path = path.with_extension("csv.tmp");

    let mut tmp_file = File::create(&tmp_path).map_err(|e| {
        DamageError::file_error("create temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.write_all(contents.as_bytes()).map_err(|e| {
        DamageError::file_error("write temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.sync_all().map_err(|e| {
        DamageError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        DamageError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    log::info!("Saved {} segments to {}", table.len(), path.display());
    Ok(())
}
