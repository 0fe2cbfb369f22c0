//! Error taxonomy for route construction.

use thiserror::Error;

/// Failure of one route-construction call.
///
/// Every variant is leaf-level: nothing inside the pipeline retries. Callers
/// retry by re-invoking the whole pipeline when [`PlanError::is_retryable`]
/// says so.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// Fewer than two eligible stops survived override filtering.
    #[error("not enough eligible stops to plan a route (found {found})")]
    InsufficientCandidates { found: usize },

    /// The cost oracle returned no usable trip or leg.
    #[error("route planning failed: {reason}")]
    PlanningFailed { reason: String },

    /// The requested base is missing or inactive.
    #[error("base '{base_id}' is missing or inactive")]
    DepotUnavailable { base_id: String },

    /// The route transaction was aborted; nothing was committed.
    #[error("failed to persist route: {reason}")]
    PersistenceFailed { reason: String },

    /// The caller asked for something the catalog cannot satisfy.
    #[error("invalid route request: {reason}")]
    InvalidRequest { reason: String },
}

impl PlanError {
    pub fn planning(reason: impl Into<String>) -> Self {
        PlanError::PlanningFailed {
            reason: reason.into(),
        }
    }

    pub fn persistence(reason: impl Into<String>) -> Self {
        PlanError::PersistenceFailed {
            reason: reason.into(),
        }
    }

    /// Whether re-running the pipeline may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlanError::PlanningFailed { .. } | PlanError::PersistenceFailed { .. }
        )
    }
}

/// Failure reported by the SQLite-backed store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    /// A persisted column held a value the domain types cannot represent.
    #[error("corrupt {column} value '{value}'")]
    InvalidValue { column: &'static str, value: String },

    #[error("route run {0} not found")]
    RouteRunNotFound(i64),

    #[error("stop {stop_id} is not part of route run {route_run_id}")]
    StopNotInRun { route_run_id: i64, stop_id: String },
}

impl From<StoreError> for PlanError {
    fn from(err: StoreError) -> Self {
        PlanError::persistence(err.to_string())
    }
}
