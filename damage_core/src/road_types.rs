//! Road Types
//!
//! Canonical road classes used by all damage tables, and the remapping of raw
//! OpenStreetMap `highway` values onto them.
//!
//! Raw values that are not listed map to [`RoadType::None`]; rows of that
//! class are kept in the network but never receive a damage estimate.

use serde::{Deserialize, Serialize};

/// Canonical road classes for which damage curves exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadType {
    Motorway,
    Trunk,
    Primary,
    Secondary,
    Tertiary,
    Other,
    Track,
    None,
}

impl RoadType {
    /// All road types, in the order used by the reference tables
    pub const ALL: [RoadType; 8] = [
        RoadType::Motorway,
        RoadType::Trunk,
        RoadType::Primary,
        RoadType::Secondary,
        RoadType::Tertiary,
        RoadType::Other,
        RoadType::Track,
        RoadType::None,
    ];

    /// Lower-case code used in tables and output files
    pub fn code(&self) -> &'static str {
        match self {
            RoadType::Motorway => "motorway",
            RoadType::Trunk => "trunk",
            RoadType::Primary => "primary",
            RoadType::Secondary => "secondary",
            RoadType::Tertiary => "tertiary",
            RoadType::Other => "other",
            RoadType::Track => "track",
            RoadType::None => "none",
        }
    }

    /// Remap a raw infrastructure type (OSM `highway` tag) to a road type.
    ///
    /// OSM sometimes stores a list such as `['primary', 'secondary']`; such
    /// values and anything not in the mapping become [`RoadType::None`].
    pub fn from_infra_type(raw: &str) -> Self {
        match raw.trim() {
            "motorway" | "motorway_link" | "motorway_junction" => RoadType::Motorway,
            "trunk" | "trunk_link" => RoadType::Trunk,
            "primary" | "primary_link" => RoadType::Primary,
            "secondary" | "secondary_link" => RoadType::Secondary,
            "tertiary" | "tertiary_link" => RoadType::Tertiary,
            "unsurfaced" | "corridor" | "trail" | "footway" | "path" | "track" => {
                RoadType::Track
            }
            "traffic_island" | "bus_guideway" | "bus_stop" | "rest_area" | "yes" | "escape"
            | "raceway" | "emergency_bay" | "construction" | "cycleway" | "living_street"
            | "pedestrian" | "residential" | "road" | "service" | "unclassified" | "crossing"
            | "mini_roundabout" | "passing_place" | "turning_circle" => RoadType::Other,
            // disused, dummy, planned, platform, razed, abandoned, services, proposed,
            // emergency_access_point, bridleway, steps, elevator, access and anything unknown
            _ => RoadType::None,
        }
    }

    /// Motorways and trunk roads use the C1-C4 OSdaMage curves, every other
    /// class uses C5-C6
    pub fn is_motorway_class(&self) -> bool {
        matches!(self, RoadType::Motorway | RoadType::Trunk)
    }
}

impl std::fmt::Display for RoadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remapping() {
        assert_eq!(RoadType::from_infra_type("motorway_link"), RoadType::Motorway);
        assert_eq!(RoadType::from_infra_type("motorway_junction"), RoadType::Motorway);
        assert_eq!(RoadType::from_infra_type("residential"), RoadType::Other);
        assert_eq!(RoadType::from_infra_type("footway"), RoadType::Track);
        assert_eq!(RoadType::from_infra_type("steps"), RoadType::None);
        assert_eq!(RoadType::from_infra_type("['primary', 'secondary']"), RoadType::None);
        assert_eq!(RoadType::from_infra_type("does_not_exist"), RoadType::None);
    }

    #[test]
    fn test_motorway_class() {
        assert!(RoadType::Motorway.is_motorway_class());
        assert!(RoadType::Trunk.is_motorway_class());
        assert!(!RoadType::Primary.is_motorway_class());
        assert!(!RoadType::Track.is_motorway_class());
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&RoadType::Secondary).unwrap();
        assert_eq!(json, "\"secondary\"");
    }
}
