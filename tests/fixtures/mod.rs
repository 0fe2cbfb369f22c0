//! Shared fixtures for curbside-planner integration tests.
//!
//! - Real Las Vegas kerb locations (from OpenStreetMap)
//! - A deterministic planar cost oracle
//! - Seeded in-memory SQLite stores

#![allow(dead_code)]

pub mod las_vegas_locations;

use std::sync::atomic::{AtomicUsize, Ordering};

use curbside_planner::SqliteStore;
use curbside_planner::error::PlanError;
use curbside_planner::model::{
    Approach, Coordinate, Leg, LegCost, Stop, TripOptions, TripPlan, Waypoint,
};
use curbside_planner::traits::CostOracle;

pub const POOL: &str = "P1";
pub const BASE: &str = "B1";
pub const RUN_DATE: &str = "2024-05-01";

/// Planar oracle: one minute and one kilometre per degree of straight-line
/// distance. Trips visit waypoints in request order.
#[derive(Debug, Default)]
pub struct PlanarOracle {
    trip_calls: AtomicUsize,
    leg_calls: AtomicUsize,
    fail_legs: bool,
}

impl PlanarOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trips succeed, every leg lookup fails.
    pub fn failing_legs() -> Self {
        Self {
            fail_legs: true,
            ..Self::default()
        }
    }

    pub fn cost(a: Coordinate, b: Coordinate) -> LegCost {
        let d = (a.lon - b.lon).hypot(a.lat - b.lat);
        LegCost::new(d * 1000.0, d * 60.0)
    }

    pub fn trip_calls(&self) -> usize {
        self.trip_calls.load(Ordering::SeqCst)
    }

    pub fn leg_calls(&self) -> usize {
        self.leg_calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.trip_calls() + self.leg_calls()
    }
}

impl CostOracle for PlanarOracle {
    fn plan_trip(&self, waypoints: &[Waypoint], _: TripOptions) -> Result<TripPlan, PlanError> {
        self.trip_calls.fetch_add(1, Ordering::SeqCst);
        let legs: Vec<Leg> = waypoints
            .windows(2)
            .enumerate()
            .map(|(i, pair)| Leg {
                from_index: i,
                to_index: i + 1,
                cost: Self::cost(pair[0].location, pair[1].location),
            })
            .collect();
        let total: LegCost = legs.iter().map(|l| l.cost).sum();
        let ordered = waypoints
            .iter()
            .map(|w| Waypoint {
                on_street_name: None,
                bearing_code: None,
                ..w.clone()
            })
            .collect();
        Ok(TripPlan {
            distance_m: total.distance_m,
            duration_s: total.duration_s,
            ordered,
            legs,
        })
    }

    fn leg_cost(&self, from: &Waypoint, to: &Waypoint, _: Approach) -> Result<LegCost, PlanError> {
        self.leg_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_legs {
            return Err(PlanError::planning("leg lookup refused"));
        }
        Ok(Self::cost(from.location, to.location))
    }
}

/// Store with an active base at the origin and `stops` in [`POOL`].
pub fn seeded_store(stops: &[Stop]) -> SqliteStore {
    let store = SqliteStore::open_in_memory().expect("open in-memory store");
    store
        .upsert_base(BASE, Coordinate::new(0.0, 0.0), true)
        .expect("seed base");
    for stop in stops {
        store.upsert_stop(POOL, stop).expect("seed stop");
    }
    store
}

/// Summed duration of consecutive legs, depot excluded.
pub fn path_duration(stops: &[Waypoint]) -> f64 {
    stops
        .windows(2)
        .map(|pair| PlanarOracle::cost(pair[0].location, pair[1].location).duration_s)
        .sum()
}
