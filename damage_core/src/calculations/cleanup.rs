//! # Cleanup and Mask
//!
//! The first two stages of every damage calculation.
//!
//! ## Cleanup
//!
//! 1. Remap raw `infra_type` values onto canonical road types.
//! 2. Parse lane values: numbers and numeric strings are taken as is, lists
//!    such as `"2;3"` or `"2,3"` give their largest element, anything else is
//!    treated as missing.
//! 3. Round to whole lanes (half to even).
//! 4. Fill missing lanes with the most frequent lane count of the same road
//!    type. Road types without any lane data get the rounded mean of the
//!    other road types' modes. Without any lane data at all the country
//!    default (or 1) is used.
//! 5. Replace 0 lanes by 1 and clamp to `[1, 6]`.
//!
//! The lane statistics are computed from the parsed data before any row is
//! filled in.
//!
//! ## Mask
//!
//! Damage is only computed for rows where at least one `_fr` hazard value is
//! present. Rows whose road type is `none` are left out of the mask but stay
//! in the table.

use std::collections::BTreeMap;

use crate::errors::DamageResult;
use crate::events::{HazardColumn, STAT_FRACTION};
use crate::lookup::DamageCurveLibrary;
use crate::numeric::round_half_even;
use crate::road_types::RoadType;
use crate::segments::{LaneValue, SegmentTable};

/// Lowest lane count used for damage lookups
pub const MIN_LANES: u8 = 1;
/// Highest lane count used for damage lookups
pub const MAX_LANES: u8 = 6;

/// Parse a raw lane value into a (possibly fractional) lane count.
///
/// Returns `None` for missing or unparsable values.
pub fn parse_lanes(value: &LaneValue) -> Option<f64> {
    match value {
        LaneValue::Missing => None,
        LaneValue::Number(v) => Some(*v).filter(|v| v.is_finite()),
        LaneValue::Text(text) => {
            if let Ok(v) = text.trim().parse::<f64>() {
                return Some(v).filter(|v| v.is_finite());
            }
            let sep = if text.contains(';') {
                ';'
            } else if text.contains(',') {
                ','
            } else {
                log::warn!("Lane data '{}' could not be converted to a number, it is removed", text);
                return None;
            };
            let parsed: Result<Vec<f64>, _> = text.split(sep).map(|p| p.trim().parse::<f64>()).collect();
            match parsed {
                Ok(values) if !values.is_empty() => {
                    let best = values.into_iter().fold(f64::NEG_INFINITY, f64::max);
                    log::warn!("Lane data '{}' is a list, our best guess of the lane number is {}", text, best);
                    Some(best).filter(|v| v.is_finite())
                }
                _ => {
                    log::warn!("Unexpected lane data '{}', it is removed", text);
                    None
                }
            }
        }
    }
}

/// Most frequent lane count per road type, smallest value on ties
pub fn lane_modes(observed: &[(RoadType, f64)]) -> BTreeMap<RoadType, f64> {
    let mut counts: BTreeMap<RoadType, BTreeMap<i64, usize>> = BTreeMap::new();
    for &(road_type, lanes) in observed {
        *counts
            .entry(road_type)
            .or_default()
            .entry(lanes as i64)
            .or_default() += 1;
    }
    counts
        .into_iter()
        .filter_map(|(road_type, per_value)| {
            // BTreeMap iterates ascending, so the first maximum is the smallest value
            let mut best: Option<(i64, usize)> = None;
            for (value, count) in per_value {
                if best.map(|(_, c)| count > c).unwrap_or(true) {
                    best = Some((value, count));
                }
            }
            best.map(|(value, _)| (road_type, value as f64))
        })
        .collect()
}

/// Remap road types and clean up lane data
pub fn cleanup(
    mut table: SegmentTable,
    library: &DamageCurveLibrary,
    country: Option<&str>,
) -> DamageResult<SegmentTable> {
    for segment in table.segments_mut() {
        segment.road_type = Some(library.road_type(&segment.infra_type));
    }

    let parsed: Vec<Option<f64>> = table
        .segments()
        .iter()
        .map(|s| parse_lanes(&s.raw_lanes).map(|v| round_half_even(v, 0)))
        .collect();

    let missing = parsed.iter().filter(|v| v.is_none()).count();
    let fill = if missing > 0 {
        log::warn!(
            "Of the {} road segments, only {} had lane data, so for {} the lane data will be interpolated from the existing data",
            table.len(),
            table.len() - missing,
            missing
        );
        Some(fill_values(&table, &parsed, library, country)?)
    } else {
        None
    };

    for (segment, lanes) in table.segments_mut().iter_mut().zip(parsed) {
        let road_type = segment.road_type.unwrap_or(RoadType::None);
        let lanes = match (lanes, &fill) {
            (Some(v), _) => v,
            (None, Some(fill)) => fill.get(&road_type).copied().unwrap_or(1.0),
            (None, None) => 1.0,
        };
        segment.lanes = Some(clamp_lanes(lanes));
    }

    log::debug!("Cleanup finished for {} segments", table.len());
    Ok(table)
}

/// Lane value used for rows without lane data, per road type present
fn fill_values(
    table: &SegmentTable,
    parsed: &[Option<f64>],
    library: &DamageCurveLibrary,
    country: Option<&str>,
) -> DamageResult<BTreeMap<RoadType, f64>> {
    let observed: Vec<(RoadType, f64)> = table
        .segments()
        .iter()
        .zip(parsed)
        .filter_map(|(s, lanes)| lanes.map(|l| (s.road_type.unwrap_or(RoadType::None), l)))
        .collect();
    let modes = lane_modes(&observed);

    let fallback = if modes.is_empty() {
        None
    } else {
        let mean = modes.values().sum::<f64>() / modes.len() as f64;
        Some(round_half_even(mean, 0))
    };

    let mut fill = BTreeMap::new();
    for segment in table.segments() {
        let road_type = segment.road_type.unwrap_or(RoadType::None);
        if fill.contains_key(&road_type) {
            continue;
        }
        let value = match (modes.get(&road_type), fallback, country) {
            (Some(&mode), _, _) => mode,
            (None, Some(mean), _) => mean,
            (None, None, Some(country)) => f64::from(library.default_lanes(country, road_type)?),
            (None, None, None) => 1.0,
        };
        fill.insert(road_type, value);
    }

    log::warn!("Interpolated the missing lane data as follows: {:?}", fill);
    Ok(fill)
}

fn clamp_lanes(lanes: f64) -> u8 {
    if lanes <= f64::from(MIN_LANES) {
        MIN_LANES
    } else if lanes >= f64::from(MAX_LANES) {
        MAX_LANES
    } else {
        lanes as u8
    }
}

/// Rows that receive damage: any `_fr` hazard value present, road type not
/// `none`
pub fn create_mask(table: &SegmentTable) -> Vec<usize> {
    let fraction_columns: Vec<String> = table
        .hazard_columns()
        .into_iter()
        .filter(|c| HazardColumn::parse(c).map(|hc| hc.stat == STAT_FRACTION).unwrap_or(false))
        .collect();

    let exposed: Vec<usize> = table
        .segments()
        .iter()
        .enumerate()
        .filter(|(_, s)| fraction_columns.iter().any(|c| s.hazard_value(c).is_some()))
        .map(|(row, _)| row)
        .collect();

    let mask: Vec<usize> = exposed
        .iter()
        .copied()
        .filter(|&row| {
            table
                .segment(row)
                .and_then(|s| s.road_type)
                .map(|rt| rt != RoadType::None)
                .unwrap_or(false)
        })
        .collect();

    let dropped = exposed.len() - mask.len();
    if dropped > 0 {
        log::warn!("Dropping {} rows for which the road_type is unrecognized", dropped);
    }
    log::debug!("Mask contains {} of {} rows", mask.len(), table.len());
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::library;
    use crate::segments::Segment;

    fn seg(id: &str, infra: &str, lanes: LaneValue) -> Segment {
        Segment::new(id, infra, lanes, 100.0)
    }

    #[test]
    fn test_parse_lanes() {
        assert_eq!(parse_lanes(&LaneValue::Number(2.0)), Some(2.0));
        assert_eq!(parse_lanes(&LaneValue::Text("3".into())), Some(3.0));
        assert_eq!(parse_lanes(&LaneValue::Text("2;4".into())), Some(4.0));
        assert_eq!(parse_lanes(&LaneValue::Text("1, 3".into())), Some(3.0));
        assert_eq!(parse_lanes(&LaneValue::Text("a;b".into())), None);
        assert_eq!(parse_lanes(&LaneValue::Text("many".into())), None);
        assert_eq!(parse_lanes(&LaneValue::Missing), None);
        assert_eq!(parse_lanes(&LaneValue::Number(f64::NAN)), None);
    }

    #[test]
    fn test_lane_modes_smallest_on_tie() {
        let modes = lane_modes(&[
            (RoadType::Primary, 2.0),
            (RoadType::Primary, 3.0),
            (RoadType::Primary, 3.0),
            (RoadType::Other, 1.0),
            (RoadType::Other, 2.0),
        ]);
        assert_eq!(modes[&RoadType::Primary], 3.0);
        assert_eq!(modes[&RoadType::Other], 1.0);
    }

    #[test]
    fn test_cleanup_remaps_and_imputes() {
        let lib = library().unwrap();
        let table = SegmentTable::from_segments(
            "F",
            vec![
                seg("1", "motorway_link", LaneValue::Number(3.0)),
                seg("2", "motorway", LaneValue::Missing),
                seg("3", "residential", LaneValue::Text("1".into())),
                seg("4", "tertiary", LaneValue::Missing),
                seg("5", "primary", LaneValue::Text("7;9".into())),
            ],
        );
        let table = cleanup(table, lib, None).unwrap();
        let s = table.segments();

        assert_eq!(s[0].road_type, Some(RoadType::Motorway));
        assert_eq!(s[1].lanes, Some(3)); // motorway mode
        assert_eq!(s[2].road_type, Some(RoadType::Other));
        // modes: motorway 3, other 1, primary 9 -> mean 4.33 -> 4
        assert_eq!(s[3].lanes, Some(4));
        assert_eq!(s[4].lanes, Some(6)); // clamped
    }

    #[test]
    fn test_cleanup_without_any_lane_data() {
        let lib = library().unwrap();
        let segments = vec![
            seg("1", "motorway", LaneValue::Missing),
            seg("2", "tertiary", LaneValue::Missing),
        ];

        let table = cleanup(SegmentTable::from_segments("F", segments.clone()), lib, Some("UK")).unwrap();
        assert_eq!(table.segments()[0].lanes, Some(3));
        assert_eq!(table.segments()[1].lanes, Some(2));

        let table = cleanup(SegmentTable::from_segments("F", segments), lib, None).unwrap();
        assert_eq!(table.segments()[0].lanes, Some(1));
    }

    #[test]
    fn test_lane_clamp_invariant() {
        let lib = library().unwrap();
        let raw = [
            LaneValue::Number(0.0),
            LaneValue::Number(-3.0),
            LaneValue::Number(2.5),
            LaneValue::Number(40.0),
            LaneValue::Text("x".into()),
            LaneValue::Missing,
        ];
        let segments = raw
            .iter()
            .enumerate()
            .map(|(i, l)| seg(&i.to_string(), "primary", l.clone()))
            .collect();
        let table = cleanup(SegmentTable::from_segments("F", segments), lib, None).unwrap();
        for s in table.segments() {
            let lanes = s.lanes.unwrap();
            assert!((MIN_LANES..=MAX_LANES).contains(&lanes));
        }
        // 2.5 rounds half to even
        assert_eq!(table.segments()[2].lanes, Some(2));
    }

    #[test]
    fn test_mask_uses_fraction_columns_and_drops_none() {
        let lib = library().unwrap();
        let table = SegmentTable::from_segments(
            "F",
            vec![
                seg("1", "primary", LaneValue::Number(2.0)).with_event("F", "RP10", 0.5, 1.0),
                seg("2", "primary", LaneValue::Number(2.0)).with_hazard("F_RP10_me", 0.5),
                seg("3", "steps", LaneValue::Number(1.0)).with_event("F", "RP10", 0.5, 1.0),
                seg("4", "primary", LaneValue::Number(2.0)),
            ],
        );
        let table = cleanup(table, lib, None).unwrap();
        assert_eq!(create_mask(&table), vec![0]);
        assert_eq!(table.len(), 4);
    }
}
