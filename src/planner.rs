//! The route construction pipeline.
//!
//! `select → plan trip → post-optimize → refine corridors → persist`, with
//! one leg cost cache shared by the post-optimizer and the final leg pass.

use std::collections::HashSet;

use crate::candidates::select_candidates;
use crate::config::PlannerConfig;
use crate::corridor::refine_corridors;
use crate::error::PlanError;
use crate::leg_cache::LegCostCache;
use crate::model::{Coordinate, LegCost, RouteRunId, Stop, StopId, Waypoint};
use crate::osrm::OsrmClient;
use crate::persist::{RouteHeader, compute_final_route, persist_route};
use crate::post_optimize::post_optimize;
use crate::traits::{CostOracle, OverrideStore, RiskCatalog, RouteStore};
use crate::trip::plan_trip;

/// What to plan: a pool's top candidates, or an explicit list of its stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequest {
    pub pool_id: String,
    pub base_id: String,
    pub run_date: String,
    /// Visit exactly these stops instead of selecting from the pool.
    pub stop_ids: Option<Vec<StopId>>,
}

impl RouteRequest {
    pub fn new(
        pool_id: impl Into<String>,
        base_id: impl Into<String>,
        run_date: impl Into<String>,
    ) -> Self {
        Self {
            pool_id: pool_id.into(),
            base_id: base_id.into(),
            run_date: run_date.into(),
            stop_ids: None,
        }
    }

    pub fn with_stops<I, S>(mut self, stop_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StopId>,
    {
        self.stop_ids = Some(stop_ids.into_iter().map(Into::into).collect());
        self
    }

    fn header(&self) -> RouteHeader {
        RouteHeader {
            pool_id: self.pool_id.clone(),
            base_id: self.base_id.clone(),
            run_date: self.run_date.clone(),
        }
    }
}

/// Outcome of a successful [`RoutePlanner::create_route_run`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRoute {
    pub route_run_id: RouteRunId,
    /// Final visiting order, depot excluded.
    pub stops: Vec<Waypoint>,
    /// Totals recomputed over the final order.
    pub total: LegCost,
    /// Relocations applied by the post-optimizer.
    pub moves: usize,
}

/// Builds and persists route runs against one cost oracle.
#[derive(Debug)]
pub struct RoutePlanner<O> {
    oracle: O,
    config: PlannerConfig,
}

impl RoutePlanner<OsrmClient> {
    /// Planner backed by the OSRM server named in `config.osrm`.
    pub fn from_config(config: PlannerConfig) -> Result<Self, PlanError> {
        let client = OsrmClient::new(config.osrm.clone())
            .map_err(|e| PlanError::planning(format!("failed to build OSRM client: {e}")))?;
        Ok(Self::new(client, config))
    }
}

impl<O> RoutePlanner<O>
where
    O: CostOracle + Sync,
{
    pub fn new(oracle: O, config: PlannerConfig) -> Self {
        Self { oracle, config }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Run the whole pipeline and commit the result.
    ///
    /// The base is resolved before any catalog or oracle work. Nothing is
    /// persisted unless every stage succeeds.
    pub fn create_route_run<S>(
        &self,
        store: &S,
        request: &RouteRequest,
    ) -> Result<PlannedRoute, PlanError>
    where
        S: RiskCatalog + OverrideStore + RouteStore + ?Sized,
    {
        let depot = resolve_depot(store, &request.base_id)?;

        let stops = match &request.stop_ids {
            Some(ids) => resolve_explicit_stops(store, &request.pool_id, ids)?,
            None => {
                let overrides = store.overrides_for_pool(&request.pool_id)?;
                select_candidates(store, &request.pool_id, &overrides, self.config.selection)?
                    .into_iter()
                    .map(|c| c.stop)
                    .collect()
            }
        };
        let candidates: Vec<Waypoint> = stops.iter().map(Waypoint::from).collect();

        let trip = plan_trip(&self.oracle, depot, &candidates)?;
        log_order("trip", &trip.stops);

        let cache = LegCostCache::new(&self.oracle);
        let cost = |a: &Waypoint, b: &Waypoint| cache.cost(a, b);

        let optimized = post_optimize(&trip.stops, cost, self.config.post_optimize)?;
        log_order("post-optimized", &optimized.stops);

        let refined = refine_corridors(&optimized.stops, self.config.corridor);
        log_order("corridor-refined", &refined);

        let route = compute_final_route(depot, &refined, cost)?;
        let route_run_id = persist_route(store, &request.header(), &route)?;

        tracing::info!(
            route_run_id,
            pool_id = %request.pool_id,
            moves = optimized.moves,
            cached_legs = cache.len(),
            remote_calls = cache.remote_calls(),
            "created route run"
        );

        Ok(PlannedRoute {
            route_run_id,
            stops: refined,
            total: route.total,
            moves: optimized.moves,
        })
    }
}

fn resolve_depot<S>(store: &S, base_id: &str) -> Result<Coordinate, PlanError>
where
    S: RouteStore + ?Sized,
{
    store
        .find_active_base(base_id)?
        .ok_or_else(|| PlanError::DepotUnavailable {
            base_id: base_id.to_string(),
        })
}

/// Look up caller-chosen stops, keeping the caller's order.
fn resolve_explicit_stops<C>(
    catalog: &C,
    pool_id: &str,
    stop_ids: &[StopId],
) -> Result<Vec<Stop>, PlanError>
where
    C: RiskCatalog + ?Sized,
{
    let mut seen = HashSet::new();
    let wanted: Vec<StopId> = stop_ids
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect();

    let mut found = catalog.stops_by_id(pool_id, &wanted)?;
    let mut ordered = Vec::with_capacity(wanted.len());
    let mut unknown = Vec::new();
    for id in &wanted {
        match found.iter().position(|s| &s.stop_id == id) {
            Some(pos) => ordered.push(found.swap_remove(pos)),
            None => unknown.push(id.as_str()),
        }
    }

    if !unknown.is_empty() {
        return Err(PlanError::InvalidRequest {
            reason: format!(
                "unknown stops in pool {pool_id}: {}",
                unknown.join(", ")
            ),
        });
    }
    if ordered.len() < 2 {
        return Err(PlanError::InsufficientCandidates {
            found: ordered.len(),
        });
    }
    Ok(ordered)
}

fn log_order(stage: &str, stops: &[Waypoint]) {
    if tracing::enabled!(tracing::Level::DEBUG) {
        let order = stops
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        tracing::debug!(stage, %order, "stop order");
    }
}
