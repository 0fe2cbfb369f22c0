//! Haversine cost oracle (fallback when OSRM unavailable).
//!
//! Uses great-circle distance to estimate travel cost.
//! Less accurate than OSRM (ignores roads and curb side) but always
//! available and fully deterministic.

use crate::error::PlanError;
use crate::model::{Approach, Coordinate, Leg, LegCost, TripOptions, TripPlan, Waypoint};
use crate::traits::CostOracle;

/// Average driving speed assumption for time estimation.
const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine-based cost oracle.
///
/// Trips are built greedily: starting from the first waypoint, always
/// drive to the nearest unvisited one, and never return.
#[derive(Debug, Clone)]
pub struct HaversineOracle {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
}

impl Default for HaversineOracle {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl HaversineOracle {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    /// Calculate haversine distance between two points in kilometers.
    fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
        let lat1_rad = from.lat.to_radians();
        let lat2_rad = to.lat.to_radians();
        let delta_lat = (to.lat - from.lat).to_radians();
        let delta_lng = (to.lon - from.lon).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_KM * c
    }

    /// Convert distance in km to travel time in seconds.
    fn km_to_seconds(&self, km: f64) -> f64 {
        km / self.speed_kmh * 3600.0
    }

    fn cost(&self, from: Coordinate, to: Coordinate) -> LegCost {
        let km = Self::haversine_km(from, to);
        LegCost::new(km * 1000.0, self.km_to_seconds(km))
    }

    /// Nearest-neighbour visiting order starting at `start`.
    fn nearest_neighbour_order(waypoints: &[Waypoint], start: usize) -> Vec<usize> {
        let mut remaining: Vec<usize> = (0..waypoints.len()).filter(|&i| i != start).collect();
        let mut order = Vec::with_capacity(waypoints.len());
        order.push(start);
        let mut current = start;

        while !remaining.is_empty() {
            let (slot, _) = remaining
                .iter()
                .enumerate()
                .map(|(slot, &i)| {
                    let km = Self::haversine_km(waypoints[current].location, waypoints[i].location);
                    (slot, km)
                })
                // First minimum wins so equal distances keep input order.
                .fold((0, f64::INFINITY), |best, candidate| {
                    if candidate.1 < best.1 { candidate } else { best }
                });
            current = remaining.remove(slot);
            order.push(current);
        }

        order
    }
}

impl CostOracle for HaversineOracle {
    fn plan_trip(
        &self,
        waypoints: &[Waypoint],
        _options: TripOptions,
    ) -> Result<TripPlan, PlanError> {
        if waypoints.len() < 2 {
            return Err(PlanError::planning(
                "at least two waypoints are required to plan a trip",
            ));
        }

        // Starting at the first waypoint satisfies every `TripSource`.
        let order = Self::nearest_neighbour_order(waypoints, 0);

        let ordered: Vec<Waypoint> = order
            .iter()
            .map(|&i| Waypoint {
                location: waypoints[i].location,
                kind: waypoints[i].kind.clone(),
                on_street_name: None,
                bearing_code: None,
            })
            .collect();

        let legs: Vec<Leg> = ordered
            .windows(2)
            .enumerate()
            .map(|(i, pair)| Leg {
                from_index: i,
                to_index: i + 1,
                cost: self.cost(pair[0].location, pair[1].location),
            })
            .collect();
        let total: LegCost = legs.iter().map(|leg| leg.cost).sum();

        Ok(TripPlan {
            distance_m: total.distance_m,
            duration_s: total.duration_s,
            ordered,
            legs,
        })
    }

    fn leg_cost(
        &self,
        from: &Waypoint,
        to: &Waypoint,
        _approach: Approach,
    ) -> Result<LegCost, PlanError> {
        Ok(self.cost(from.location, to.location))
    }
}
