//! Memoised pairwise leg costs for one route-construction call.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::error::PlanError;
use crate::model::{Approach, LegCost, StopId, Waypoint, WaypointKind};
use crate::traits::CostOracle;

/// Cache identity of one end of a leg: the stop id when there is one,
/// otherwise the coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WaypointKey {
    Depot,
    Stop(StopId),
    Coord(String),
}

impl WaypointKey {
    pub fn of(waypoint: &Waypoint) -> Self {
        match &waypoint.kind {
            WaypointKind::Depot => WaypointKey::Depot,
            WaypointKind::Stop(id) => WaypointKey::Stop(id.clone()),
            WaypointKind::Location => WaypointKey::Coord(format!(
                "{:.6},{:.6}",
                waypoint.location.lon, waypoint.location.lat
            )),
        }
    }
}

impl fmt::Display for WaypointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaypointKey::Depot => write!(f, "depot"),
            WaypointKey::Stop(id) => write!(f, "{id}"),
            WaypointKey::Coord(coord) => write!(f, "{coord}"),
        }
    }
}

/// Directed `from -> to` cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LegKey {
    pub from: WaypointKey,
    pub to: WaypointKey,
}

impl LegKey {
    pub fn new(from: &Waypoint, to: &Waypoint) -> Self {
        Self {
            from: WaypointKey::of(from),
            to: WaypointKey::of(to),
        }
    }
}

impl fmt::Display for LegKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

type Slot = Arc<OnceLock<Result<LegCost, PlanError>>>;

/// Memoising wrapper around [`CostOracle::leg_cost`].
///
/// Lookups are single-flight per key: concurrent callers asking for the same
/// leg block on one remote call instead of issuing their own. Failures are
/// memoised too, since any failure aborts the planning call anyway.
pub struct LegCostCache<'a, O: ?Sized> {
    oracle: &'a O,
    approach: Approach,
    slots: Mutex<HashMap<LegKey, Slot>>,
    remote_calls: AtomicUsize,
}

impl<O: ?Sized> fmt::Debug for LegCostCache<'_, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegCostCache")
            .field("approach", &self.approach)
            .field("entries", &self.len())
            .field("remote_calls", &self.remote_calls())
            .finish_non_exhaustive()
    }
}

impl<'a, O: CostOracle + ?Sized> LegCostCache<'a, O> {
    /// Cache requesting curbside arrival for every leg.
    pub fn new(oracle: &'a O) -> Self {
        Self::with_approach(oracle, Approach::Curb)
    }

    pub fn with_approach(oracle: &'a O, approach: Approach) -> Self {
        Self {
            oracle,
            approach,
            slots: Mutex::new(HashMap::new()),
            remote_calls: AtomicUsize::new(0),
        }
    }

    /// Cost of `from -> to`, asking the oracle at most once per key.
    pub fn cost(&self, from: &Waypoint, to: &Waypoint) -> Result<LegCost, PlanError> {
        let key = LegKey::new(from, to);
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(key).or_default())
        };

        slot.get_or_init(|| {
            self.remote_calls.fetch_add(1, Ordering::Relaxed);
            self.oracle.leg_cost(from, to, self.approach)
        })
        .clone()
    }
}

impl<O: ?Sized> LegCostCache<'_, O> {
    /// Number of distinct legs requested so far.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of lookups that actually reached the oracle.
    pub fn remote_calls(&self) -> usize {
        self.remote_calls.load(Ordering::Relaxed)
    }
}
