//! Domain types shared by every stage of the route pipeline.
//!
//! Stops and overrides are read-only inputs owned by external catalogs.
//! Waypoints and legs are what gets exchanged with the cost oracle, and
//! `RouteRun`/`RouteRunStop` are the persisted artifact.

use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a stop in the external catalog.
pub type StopId = String;

/// Identifier of a persisted route run.
pub type RouteRunId = i64;

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// Risk attributes materialised upstream for a stop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskScores {
    pub combined_risk_score: f64,
    pub hotspot_weight: f64,
    pub l3_urgency_weight: f64,
}

/// A service stop as read from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub stop_id: StopId,
    pub location: Coordinate,
    pub on_street_name: Option<String>,
    pub bearing_code: Option<String>,
    /// `None` when the risk snapshot has no row for this stop.
    pub risk: Option<RiskScores>,
}

impl Stop {
    pub fn new(stop_id: impl Into<StopId>, lon: f64, lat: f64) -> Self {
        Self {
            stop_id: stop_id.into(),
            location: Coordinate::new(lon, lat),
            on_street_name: None,
            bearing_code: None,
            risk: None,
        }
    }

    pub fn with_street(mut self, street: impl Into<String>, bearing: impl Into<String>) -> Self {
        self.on_street_name = Some(street.into());
        self.bearing_code = Some(bearing.into());
        self
    }

    pub fn with_risk(mut self, combined: f64, hotspot: f64, urgency: f64) -> Self {
        self.risk = Some(RiskScores {
            combined_risk_score: combined,
            hotspot_weight: hotspot,
            l3_urgency_weight: urgency,
        });
        self
    }

    /// Risk scores, zeroed when the catalog has none.
    pub fn risk_or_default(&self) -> RiskScores {
        self.risk.unwrap_or_default()
    }
}

/// Kind of manual operator override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverrideType {
    ForceInclude,
    ForceExclude,
    PriorityBump,
}

impl OverrideType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverrideType::ForceInclude => "FORCE_INCLUDE",
            OverrideType::ForceExclude => "FORCE_EXCLUDE",
            OverrideType::PriorityBump => "PRIORITY_BUMP",
        }
    }
}

impl FromStr for OverrideType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FORCE_INCLUDE" => Ok(OverrideType::ForceInclude),
            "FORCE_EXCLUDE" => Ok(OverrideType::ForceExclude),
            "PRIORITY_BUMP" => Ok(OverrideType::PriorityBump),
            other => Err(format!("unknown override type '{other}'")),
        }
    }
}

/// An operator override applied to one stop of one pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteOverride {
    pub pool_id: String,
    pub stop_id: StopId,
    pub override_type: OverrideType,
    /// Only meaningful for `PriorityBump`; missing values count as zero.
    pub value: Option<f64>,
}

impl RouteOverride {
    pub fn force_include(pool_id: impl Into<String>, stop_id: impl Into<StopId>) -> Self {
        Self::new(pool_id, stop_id, OverrideType::ForceInclude, None)
    }

    pub fn force_exclude(pool_id: impl Into<String>, stop_id: impl Into<StopId>) -> Self {
        Self::new(pool_id, stop_id, OverrideType::ForceExclude, None)
    }

    pub fn priority_bump(
        pool_id: impl Into<String>,
        stop_id: impl Into<StopId>,
        value: f64,
    ) -> Self {
        Self::new(pool_id, stop_id, OverrideType::PriorityBump, Some(value))
    }

    fn new(
        pool_id: impl Into<String>,
        stop_id: impl Into<StopId>,
        override_type: OverrideType,
        value: Option<f64>,
    ) -> Self {
        Self {
            pool_id: pool_id.into(),
            stop_id: stop_id.into(),
            override_type,
            value,
        }
    }
}

/// A stop annotated with its ranking score. Discarded after selection.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateStop {
    pub stop: Stop,
    pub effective_score: f64,
}

/// What a waypoint stands for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaypointKind {
    /// The depot sentinel. Never carries a stop id, so it cannot collide
    /// with a catalog stop.
    Depot,
    Stop(StopId),
    /// A bare coordinate with no catalog identity.
    Location,
}

/// A planning location exchanged with the cost oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub location: Coordinate,
    pub kind: WaypointKind,
    pub on_street_name: Option<String>,
    pub bearing_code: Option<String>,
}

impl Waypoint {
    pub fn depot(location: Coordinate) -> Self {
        Self {
            location,
            kind: WaypointKind::Depot,
            on_street_name: None,
            bearing_code: None,
        }
    }

    pub fn at(location: Coordinate) -> Self {
        Self {
            location,
            kind: WaypointKind::Location,
            on_street_name: None,
            bearing_code: None,
        }
    }

    pub fn stop_id(&self) -> Option<&str> {
        match &self.kind {
            WaypointKind::Stop(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_depot(&self) -> bool {
        self.kind == WaypointKind::Depot
    }
}

impl From<&Stop> for Waypoint {
    fn from(stop: &Stop) -> Self {
        Self {
            location: stop.location,
            kind: WaypointKind::Stop(stop.stop_id.clone()),
            on_street_name: stop.on_street_name.clone(),
            bearing_code: stop.bearing_code.clone(),
        }
    }
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            WaypointKind::Depot => write!(f, "depot"),
            WaypointKind::Stop(id) => write!(f, "{id}"),
            WaypointKind::Location => {
                write!(f, "{:.6},{:.6}", self.location.lon, self.location.lat)
            }
        }
    }
}

/// Travel cost of one directed hop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LegCost {
    pub distance_m: f64,
    pub duration_s: f64,
}

impl LegCost {
    pub const fn new(distance_m: f64, duration_s: f64) -> Self {
        Self {
            distance_m,
            duration_s,
        }
    }
}

impl Add for LegCost {
    type Output = LegCost;

    fn add(self, rhs: LegCost) -> LegCost {
        LegCost::new(self.distance_m + rhs.distance_m, self.duration_s + rhs.duration_s)
    }
}

impl std::iter::Sum for LegCost {
    fn sum<I: Iterator<Item = LegCost>>(iter: I) -> LegCost {
        iter.fold(LegCost::default(), Add::add)
    }
}

/// A leg between two consecutive waypoints of a trip, by position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub from_index: usize,
    pub to_index: usize,
    pub cost: LegCost,
}

/// Where the oracle must start an optimised trip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TripSource {
    #[default]
    First,
    Any,
}

/// Options for [`crate::traits::CostOracle::plan_trip`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TripOptions {
    pub source: TripSource,
}

/// Side of the road a leg lookup must arrive on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Approach {
    #[default]
    Curb,
    Unrestricted,
}

/// An optimised visiting order returned by the cost oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct TripPlan {
    pub distance_m: f64,
    pub duration_s: f64,
    pub ordered: Vec<Waypoint>,
    /// Costs for consecutive pairs of `ordered`.
    pub legs: Vec<Leg>,
}

/// Lifecycle status of a route run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteRunStatus {
    Planned,
    InProgress,
    Completed,
    Finished,
}

impl RouteRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteRunStatus::Planned => "planned",
            RouteRunStatus::InProgress => "in_progress",
            RouteRunStatus::Completed => "completed",
            RouteRunStatus::Finished => "finished",
        }
    }
}

impl FromStr for RouteRunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planned" => Ok(RouteRunStatus::Planned),
            "in_progress" => Ok(RouteRunStatus::InProgress),
            "completed" => Ok(RouteRunStatus::Completed),
            "finished" => Ok(RouteRunStatus::Finished),
            other => Err(format!("unknown route run status '{other}'")),
        }
    }
}

/// Work status of a single stop within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopStatus {
    Pending,
    InProgress,
    Done,
    Skipped,
}

impl StopStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopStatus::Pending => "pending",
            StopStatus::InProgress => "in_progress",
            StopStatus::Done => "done",
            StopStatus::Skipped => "skipped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StopStatus::Done | StopStatus::Skipped)
    }
}

impl FromStr for StopStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(StopStatus::Pending),
            "in_progress" => Ok(StopStatus::InProgress),
            "done" => Ok(StopStatus::Done),
            "skipped" => Ok(StopStatus::Skipped),
            other => Err(format!("unknown stop status '{other}'")),
        }
    }
}

/// Parent row of a route about to be committed.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRouteRun {
    pub pool_id: String,
    pub base_id: String,
    pub run_date: String,
    pub total_distance_m: f64,
    pub total_duration_s: f64,
}

/// One stop row of a route about to be committed.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRouteRunStop {
    pub stop_id: StopId,
    pub sequence: u32,
    pub planned_distance_m: f64,
    pub planned_duration_s: f64,
}

/// A persisted stop of a route run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteRunStop {
    pub route_run_id: RouteRunId,
    pub stop_id: StopId,
    pub sequence: u32,
    pub planned_distance_m: f64,
    pub planned_duration_s: f64,
    pub status: StopStatus,
    pub completed_at: Option<String>,
}

/// A persisted route, stops ordered by `sequence`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteRun {
    pub id: RouteRunId,
    pub pool_id: String,
    pub base_id: String,
    pub run_date: String,
    pub status: RouteRunStatus,
    pub total_distance_m: f64,
    pub total_duration_s: f64,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub stops: Vec<RouteRunStop>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_type_round_trips_through_str() {
        for kind in [
            OverrideType::ForceInclude,
            OverrideType::ForceExclude,
            OverrideType::PriorityBump,
        ] {
            assert_eq!(kind.as_str().parse::<OverrideType>(), Ok(kind));
        }
        assert!("BUMP".parse::<OverrideType>().is_err());
    }

    #[test]
    fn depot_waypoint_has_no_stop_id() {
        let depot = Waypoint::depot(Coordinate::new(-115.1, 36.1));
        assert!(depot.is_depot());
        assert_eq!(depot.stop_id(), None);
        assert_eq!(depot.to_string(), "depot");
    }

    #[test]
    fn waypoint_from_stop_keeps_street_metadata() {
        let stop = Stop::new("S1", 1.0, 2.0).with_street("Main St", "EB");
        let waypoint = Waypoint::from(&stop);
        assert_eq!(waypoint.stop_id(), Some("S1"));
        assert_eq!(waypoint.on_street_name.as_deref(), Some("Main St"));
        assert_eq!(waypoint.bearing_code.as_deref(), Some("EB"));
    }

    #[test]
    fn leg_costs_sum() {
        let total: LegCost = [LegCost::new(100.0, 10.0), LegCost::new(50.0, 5.0)]
            .into_iter()
            .sum();
        assert_eq!(total, LegCost::new(150.0, 15.0));
    }

    #[test]
    fn missing_risk_defaults_to_zero() {
        let stop = Stop::new("S1", 0.0, 0.0);
        assert_eq!(stop.risk_or_default(), RiskScores::default());
    }
}
