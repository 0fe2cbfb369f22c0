//! Capabilities the route pipeline consumes.
//!
//! These are intentionally minimal. Production wires them to OSRM and
//! SQLite; tests substitute deterministic in-process implementations.

use crate::error::PlanError;
use crate::model::{
    Approach, Coordinate, LegCost, NewRouteRun, NewRouteRunStop, RouteOverride, RouteRun,
    RouteRunId, Stop, StopId, TripOptions, TripPlan, Waypoint,
};

/// External routing engine answering trip and leg queries.
///
/// Implementations are treated as untrusted: any transport failure, error
/// status or empty answer must surface as [`PlanError::PlanningFailed`].
pub trait CostOracle {
    /// Optimised visiting order for `waypoints`.
    ///
    /// The returned waypoints keep their [`crate::model::WaypointKind`] but
    /// need not carry street metadata.
    fn plan_trip(&self, waypoints: &[Waypoint], options: TripOptions)
    -> Result<TripPlan, PlanError>;

    /// Cost of driving from `from` to `to`.
    fn leg_cost(&self, from: &Waypoint, to: &Waypoint, approach: Approach)
    -> Result<LegCost, PlanError>;
}

/// Read-only stop catalog joined with the risk snapshot.
pub trait RiskCatalog {
    /// Up to `limit` stops of the pool, ordered by combined risk score
    /// descending. Stops without a snapshot row carry `risk: None`.
    fn top_stops_for_pool(&self, pool_id: &str, limit: usize) -> Result<Vec<Stop>, PlanError>;

    /// The stops of the pool whose ids are listed, in any order. Unknown ids
    /// are silently absent from the result.
    fn stops_by_id(&self, pool_id: &str, stop_ids: &[StopId]) -> Result<Vec<Stop>, PlanError>;
}

/// Read-only per-pool override list.
pub trait OverrideStore {
    fn overrides_for_pool(&self, pool_id: &str) -> Result<Vec<RouteOverride>, PlanError>;
}

/// Transactional persistence boundary for route runs.
pub trait RouteStore {
    /// Coordinate of an active base, `None` when missing or inactive.
    fn find_active_base(&self, base_id: &str) -> Result<Option<Coordinate>, PlanError>;

    /// Insert the parent row and all stop rows in one transaction.
    ///
    /// Either everything is committed or nothing is visible afterwards.
    fn insert_route_run(
        &self,
        run: &NewRouteRun,
        stops: &[NewRouteRunStop],
    ) -> Result<RouteRunId, PlanError>;

    fn load_route_run(&self, id: RouteRunId) -> Result<Option<RouteRun>, PlanError>;
}
