//! Real Las Vegas kerb locations for realistic fixtures.
//!
//! Coordinates sourced from OpenStreetMap via Overpass API and routable with
//! the OSRM Nevada extract.

use curbside_planner::model::{Coordinate, Stop};

/// A named kerb location, optionally tagged with the street it fronts.
#[derive(Debug, Clone, Copy)]
pub struct KerbLocation {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
    pub street: Option<(&'static str, &'static str)>,
}

impl KerbLocation {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self {
            name,
            lat,
            lng,
            street: None,
        }
    }

    pub const fn on(self, street: &'static str, bearing: &'static str) -> Self {
        Self {
            street: Some((street, bearing)),
            ..self
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lng, self.lat)
    }

    pub fn to_stop(&self, stop_id: impl Into<String>, risk: f64) -> Stop {
        let stop = Stop::new(stop_id, self.lng, self.lat).with_risk(risk, 0.0, 0.0);
        match self.street {
            Some((street, bearing)) => stop.with_street(street, bearing),
            None => stop,
        }
    }
}

// ============================================================================
// Depots
// ============================================================================

pub const BASES: &[KerbLocation] = &[
    KerbLocation::new("MGM Grand", 36.1023654, -115.1688720),
    KerbLocation::new("Longhorn Casino", 36.1070664, -115.0591256),
];

// ============================================================================
// Las Vegas Blvd S, south of the Strip (northbound kerb)
// ============================================================================

pub const SOUTH_BLVD_NB: &[KerbLocation] = &[
    KerbLocation::new("Budget Suites South", 36.0366259, -115.1713361).on("Las Vegas Blvd S", "NB"),
    KerbLocation::new("Bootlegger Bistro", 36.0492047, -115.1715744).on("Las Vegas Blvd S", "NB"),
    KerbLocation::new("Buffalo Wild Wings South", 36.0543044, -115.1714860)
        .on("Las Vegas Blvd S", "NB"),
    KerbLocation::new("Denny's South", 36.0591086, -115.1717250).on("Las Vegas Blvd S", "NB"),
];

// ============================================================================
// Mid-Strip and east side, untagged
// ============================================================================

pub const MID_STRIP: &[KerbLocation] = &[
    KerbLocation::new("Gallagher's", 36.1025514, -115.1742518),
    KerbLocation::new("PBR Grill", 36.1090017, -115.1724402),
    KerbLocation::new("mon ami Gabi", 36.1128554, -115.1724137),
    KerbLocation::new("Tilted Kilt", 36.1174596, -115.1705837),
    KerbLocation::new("Oyster Bar", 36.1194951, -115.1715059),
];

pub const EAST_SIDE: &[KerbLocation] = &[
    KerbLocation::new("Pei Wei Town Square", 36.0810469, -115.1472694),
    KerbLocation::new("Tomo Sushi", 36.0992464, -115.1142123),
    KerbLocation::new("Hello Tokyo", 36.1161627, -115.0902096),
];

/// Every stop location, in a fixed order.
pub fn all_stops() -> impl Iterator<Item = &'static KerbLocation> {
    SOUTH_BLVD_NB.iter().chain(MID_STRIP).chain(EAST_SIDE)
}
