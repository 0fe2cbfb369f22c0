//! OSRM HTTP adapter for trip planning and leg costs.

use serde::Deserialize;

use crate::config::env_parse;
use crate::error::PlanError;
use crate::model::{
    Approach, Coordinate, Leg, LegCost, TripOptions, TripPlan, TripSource, Waypoint,
};
use crate::traits::CostOracle;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5005".to_string(),
            profile: "driving".to_string(),
            timeout_secs: 10,
        }
    }
}

impl OsrmConfig {
    /// Defaults overlaid with `OSRM_BASE_URL`, `OSRM_PROFILE` and
    /// `OSRM_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var("OSRM_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(profile) = std::env::var("OSRM_PROFILE") {
            config.profile = profile;
        }
        if let Some(timeout_secs) = env_parse("OSRM_TIMEOUT_SECS") {
            config.timeout_secs = timeout_secs;
        }
        config
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn trip_url(&self, waypoints: &[Waypoint], options: TripOptions) -> String {
        let query = match options.source {
            // OSRM only accepts an open trip when the start is fixed.
            TripSource::First => "source=first&destination=any&roundtrip=false&overview=false",
            TripSource::Any => "overview=false",
        };
        format!(
            "{}/trip/v1/{}/{}?{}",
            self.base_url(),
            self.config.profile,
            coordinates(waypoints.iter().map(|w| w.location)),
            query
        )
    }

    fn route_url(&self, from: &Waypoint, to: &Waypoint, approach: Approach) -> String {
        let mut url = format!(
            "{}/route/v1/{}/{}?overview=false",
            self.base_url(),
            self.config.profile,
            coordinates([from.location, to.location])
        );
        if approach == Approach::Curb {
            // One value per coordinate.
            url.push_str("&approaches=curb;curb");
        }
        url
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, PlanError> {
        tracing::trace!(%url, "OSRM request");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| self.transport_error(&err, url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(PlanError::planning(format!(
                "OSRM returned {status} for {url}: {body}"
            )));
        }

        response.json::<T>().map_err(|err| {
            PlanError::planning(format!("undecodable OSRM response from {url}: {err}"))
        })
    }

    fn transport_error(&self, err: &reqwest::Error, url: &str) -> PlanError {
        if err.is_timeout() {
            PlanError::planning(format!(
                "OSRM request to {url} timed out after {}s",
                self.config.timeout_secs
            ))
        } else {
            PlanError::planning(format!("OSRM request to {url} failed: {err}"))
        }
    }
}

impl CostOracle for OsrmClient {
    fn plan_trip(
        &self,
        waypoints: &[Waypoint],
        options: TripOptions,
    ) -> Result<TripPlan, PlanError> {
        if waypoints.len() < 2 {
            return Err(PlanError::planning(
                "at least two waypoints are required to plan a trip",
            ));
        }

        let url = self.trip_url(waypoints, options);
        let body: OsrmTripResponse = self.get_json(&url)?;
        trip_from_response(waypoints, body)
    }

    fn leg_cost(
        &self,
        from: &Waypoint,
        to: &Waypoint,
        approach: Approach,
    ) -> Result<LegCost, PlanError> {
        let url = self.route_url(from, to, approach);
        let body: OsrmRouteResponse = self.get_json(&url)?;
        leg_from_response(body)
    }
}

fn coordinates(points: impl IntoIterator<Item = Coordinate>) -> String {
    points
        .into_iter()
        .map(|c| format!("{:.6},{:.6}", c.lon, c.lat))
        .collect::<Vec<_>>()
        .join(";")
}

fn check_code(code: &str, message: Option<String>) -> Result<(), PlanError> {
    if code == "Ok" {
        Ok(())
    } else {
        Err(PlanError::planning(format!(
            "OSRM responded {code}: {}",
            message.unwrap_or_default()
        )))
    }
}

/// Map an OSRM `/trip` answer back onto the requested waypoints.
///
/// OSRM lists `waypoints` in input order, each tagged with its position in
/// the optimised trip. Locations come back snapped; street metadata does not
/// come back at all.
fn trip_from_response(
    input: &[Waypoint],
    body: OsrmTripResponse,
) -> Result<TripPlan, PlanError> {
    check_code(&body.code, body.message)?;

    let mut trips = body.trips.unwrap_or_default();
    if trips.is_empty() {
        return Err(PlanError::planning("OSRM returned no trips for the given stops"));
    }
    if trips.len() > 1 {
        return Err(PlanError::planning(format!(
            "OSRM split the stops into {} disconnected trips",
            trips.len()
        )));
    }
    let trip = trips.remove(0);

    let returned = body.waypoints.unwrap_or_default();
    if returned.len() != input.len() {
        return Err(PlanError::planning(format!(
            "OSRM returned {} waypoints for {} inputs",
            returned.len(),
            input.len()
        )));
    }

    let mut positioned: Vec<(usize, usize, [f64; 2])> = returned
        .iter()
        .enumerate()
        .map(|(input_index, wp)| (wp.waypoint_index, input_index, wp.location))
        .collect();
    positioned.sort_by_key(|&(position, input_index, _)| (position, input_index));

    let ordered = positioned
        .into_iter()
        .map(|(_, input_index, [lon, lat])| Waypoint {
            location: Coordinate::new(lon, lat),
            kind: input[input_index].kind.clone(),
            on_street_name: None,
            bearing_code: None,
        })
        .collect();

    let legs = trip
        .legs
        .iter()
        .enumerate()
        .map(|(i, leg)| Leg {
            from_index: i,
            to_index: i + 1,
            cost: LegCost::new(leg.distance, leg.duration),
        })
        .collect();

    Ok(TripPlan {
        distance_m: trip.distance,
        duration_s: trip.duration,
        ordered,
        legs,
    })
}

fn leg_from_response(body: OsrmRouteResponse) -> Result<LegCost, PlanError> {
    check_code(&body.code, body.message)?;
    let route = body
        .routes
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| PlanError::planning("OSRM returned no route for leg"))?;
    Ok(LegCost::new(route.distance, route.duration))
}

#[derive(Debug, Deserialize)]
struct OsrmTripResponse {
    code: String,
    message: Option<String>,
    trips: Option<Vec<OsrmRoute>>,
    waypoints: Option<Vec<OsrmTripWaypoint>>,
}

#[derive(Debug, Deserialize)]
struct OsrmTripWaypoint {
    waypoint_index: usize,
    location: [f64; 2],
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    message: Option<String>,
    routes: Option<Vec<OsrmRoute>>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    distance: f64,
    duration: f64,
}
