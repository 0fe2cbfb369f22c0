//! Planner configuration and per-stage tunables.
//!
//! Every stage takes its options explicitly so tests can exercise edge
//! values (e.g. `max_moves = 0`).

use std::env;
use std::str::FromStr;

use serde::Deserialize;

use crate::osrm::OsrmConfig;

/// Candidate Selector limits.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SelectionOptions {
    /// Maximum number of candidates handed to trip planning.
    pub limit: usize,
    /// How many top-risk stops to fetch before filtering. Never below `limit`.
    pub raw_limit: usize,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            limit: 25,
            raw_limit: 200,
        }
    }
}

/// Post-Optimizer tunables.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PostOptimizeOptions {
    /// Width of the relocation window after each anchor.
    pub lookahead: usize,
    /// Relocation budget for one pass.
    pub max_moves: usize,
    /// A move must save strictly more than this many seconds.
    pub min_improvement_seconds: f64,
    /// Inputs longer than this are returned unchanged.
    pub max_stops: usize,
}

impl Default for PostOptimizeOptions {
    fn default() -> Self {
        Self {
            lookahead: 8,
            max_moves: 30,
            min_improvement_seconds: 5.0,
            max_stops: 150,
        }
    }
}

/// Corridor Refiner tunables.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CorridorOptions {
    /// Regroup look-ahead, in positions.
    pub window: usize,
    /// Runs scoring below this monotonicity are force-sorted.
    pub threshold: f64,
}

impl Default for CorridorOptions {
    fn default() -> Self {
        Self {
            window: 8,
            threshold: 0.8,
        }
    }
}

/// Everything a [`crate::planner::RoutePlanner`] needs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub osrm: OsrmConfig,
    pub selection: SelectionOptions,
    pub post_optimize: PostOptimizeOptions,
    pub corridor: CorridorOptions,
}

impl PlannerConfig {
    /// Defaults overlaid with `OSRM_*` and `PLANNER_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self {
            osrm: OsrmConfig::from_env(),
            ..Self::default()
        };
        if let Some(limit) = env_parse("PLANNER_CANDIDATE_LIMIT") {
            config.selection.limit = limit;
        }
        if let Some(raw_limit) = env_parse("PLANNER_RAW_LIMIT") {
            config.selection.raw_limit = raw_limit;
        }
        config
    }
}

/// Parse an environment variable, ignoring unset or malformed values.
pub(crate) fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring malformed environment value");
            None
        }
    }
}
