//! Initial visiting order from the cost oracle, anchored at the depot.

use std::collections::HashMap;

use crate::error::PlanError;
use crate::model::{Coordinate, Leg, TripOptions, TripSource, Waypoint};
use crate::traits::CostOracle;

/// The oracle's trip with the depot stripped and street metadata restored.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTrip {
    /// Stops in visiting order, depot excluded.
    pub stops: Vec<Waypoint>,
    /// Oracle totals for the depot-anchored trip. Informational only: the
    /// persisted totals are recomputed after reordering.
    pub distance_m: f64,
    pub duration_s: f64,
    pub legs: Vec<Leg>,
}

/// Ask the oracle for an open trip starting at `depot` and visiting every
/// candidate.
pub fn plan_trip<O>(
    oracle: &O,
    depot: Coordinate,
    candidates: &[Waypoint],
) -> Result<PlannedTrip, PlanError>
where
    O: CostOracle + ?Sized,
{
    let metadata: HashMap<&str, (&Option<String>, &Option<String>)> = candidates
        .iter()
        .filter_map(|w| Some((w.stop_id()?, (&w.on_street_name, &w.bearing_code))))
        .collect();

    let mut request = Vec::with_capacity(candidates.len() + 1);
    request.push(Waypoint::depot(depot));
    request.extend(candidates.iter().filter(|w| !w.is_depot()).cloned());

    let plan = oracle.plan_trip(
        &request,
        TripOptions {
            source: TripSource::First,
        },
    )?;

    let mut missing_metadata = 0;
    let stops: Vec<Waypoint> = plan
        .ordered
        .into_iter()
        .filter(|w| !w.is_depot())
        .map(|mut w| {
            let restored = w.stop_id().and_then(|id| metadata.get(id)).copied();
            match restored {
                Some((street, bearing)) => {
                    w.on_street_name = street.clone();
                    w.bearing_code = bearing.clone();
                }
                None => missing_metadata += 1,
            }
            w
        })
        .collect();

    if stops.len() < 2 {
        return Err(PlanError::planning(format!(
            "trip contained {} stops, at least two are required",
            stops.len()
        )));
    }
    if stops.len() != request.len() - 1 {
        return Err(PlanError::planning(format!(
            "trip visited {} of {} requested stops",
            stops.len(),
            request.len() - 1
        )));
    }
    if missing_metadata > 0 {
        tracing::warn!(
            missing_metadata,
            "trip stops without street metadata will not be corridor-refined"
        );
    }

    tracing::info!(
        stops = stops.len(),
        distance_m = plan.distance_m,
        duration_s = plan.duration_s,
        "planned initial trip"
    );

    Ok(PlannedTrip {
        stops,
        distance_m: plan.distance_m,
        duration_s: plan.duration_s,
        legs: plan.legs,
    })
}
