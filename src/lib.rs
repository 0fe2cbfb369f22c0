//! curbside-planner
//!
//! Builds daily curbside service routes: picks the highest-risk stops of a
//! pool, orders them with a road-network cost oracle, polishes the order for
//! kerb-side access, and commits the result as a route run.

pub mod candidates;
pub mod config;
pub mod corridor;
pub mod error;
pub mod haversine;
pub mod leg_cache;
pub mod model;
pub mod osrm;
pub mod persist;
pub mod planner;
pub mod post_optimize;
pub mod store;
pub mod traits;
pub mod trip;

pub use config::PlannerConfig;
pub use error::{PlanError, StoreError};
pub use planner::{PlannedRoute, RoutePlanner, RouteRequest};
pub use store::SqliteStore;
