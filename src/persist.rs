//! Final leg costs and the atomic route commit.

use std::collections::HashSet;

use crate::error::PlanError;
use crate::model::{Coordinate, LegCost, NewRouteRun, NewRouteRunStop, RouteRunId, Waypoint};
use crate::traits::RouteStore;

/// A route ready to commit: one row per stop plus authoritative totals.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalRoute {
    pub stops: Vec<NewRouteRunStop>,
    pub total: LegCost,
}

/// Pool, base and date a route is filed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteHeader {
    pub pool_id: String,
    pub base_id: String,
    pub run_date: String,
}

/// Walk `stops` from the depot, costing every leg.
///
/// Sequences are the 0-based final positions; each stop's planned cost is
/// the leg arriving at it. Every waypoint must be a distinct catalog stop.
pub fn compute_final_route<F>(
    depot: Coordinate,
    stops: &[Waypoint],
    cost: F,
) -> Result<FinalRoute, PlanError>
where
    F: Fn(&Waypoint, &Waypoint) -> Result<LegCost, PlanError>,
{
    let mut seen = HashSet::with_capacity(stops.len());
    let mut rows = Vec::with_capacity(stops.len());
    let mut total = LegCost::default();
    let mut prev = Waypoint::depot(depot);

    for (sequence, stop) in stops.iter().enumerate() {
        let Some(stop_id) = stop.stop_id() else {
            return Err(PlanError::InvalidRequest {
                reason: format!("waypoint {stop} at position {sequence} is not a catalog stop"),
            });
        };
        if !seen.insert(stop_id) {
            return Err(PlanError::InvalidRequest {
                reason: format!("stop {stop_id} appears more than once"),
            });
        }
        let sequence = u32::try_from(sequence).map_err(|_| PlanError::InvalidRequest {
            reason: "route has too many stops".to_string(),
        })?;

        let leg = cost(&prev, stop)?;
        total = total + leg;
        rows.push(NewRouteRunStop {
            stop_id: stop_id.to_string(),
            sequence,
            planned_distance_m: leg.distance_m,
            planned_duration_s: leg.duration_s,
        });
        prev = stop.clone();
    }

    Ok(FinalRoute { stops: rows, total })
}

/// Commit `route` in one transaction. Nothing is visible on failure.
pub fn persist_route<S>(
    store: &S,
    header: &RouteHeader,
    route: &FinalRoute,
) -> Result<RouteRunId, PlanError>
where
    S: RouteStore + ?Sized,
{
    let run = NewRouteRun {
        pool_id: header.pool_id.clone(),
        base_id: header.base_id.clone(),
        run_date: header.run_date.clone(),
        total_distance_m: route.total.distance_m,
        total_duration_s: route.total.duration_s,
    };

    let id = store.insert_route_run(&run, &route.stops).map_err(|err| match err {
        PlanError::PersistenceFailed { .. } => err,
        other => PlanError::persistence(other.to_string()),
    })?;

    tracing::info!(
        route_run_id = id,
        pool_id = %header.pool_id,
        stops = route.stops.len(),
        total_distance_m = route.total.distance_m,
        total_duration_s = route.total.duration_s,
        "persisted route run"
    );
    Ok(id)
}
