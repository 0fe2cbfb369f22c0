//! SQLite-backed risk catalog, override store and route-run store.

use std::path::Path;
use std::str::FromStr;

use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use crate::error::{PlanError, StoreError};
use crate::model::{
    Coordinate, NewRouteRun, NewRouteRunStop, OverrideType, RiskScores, RouteOverride, RouteRun,
    RouteRunId, RouteRunStatus, RouteRunStop, Stop, StopId, StopStatus,
};
use crate::traits::{OverrideStore, RiskCatalog, RouteStore};

/// SQLite's default bound-parameter ceiling, minus the pool id.
const MAX_IDS_PER_QUERY: usize = 998;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS bases (
    id TEXT PRIMARY KEY,
    lon REAL NOT NULL,
    lat REAL NOT NULL,
    active INTEGER NOT NULL DEFAULT 1
);
CREATE TABLE IF NOT EXISTS stops (
    stop_id TEXT PRIMARY KEY CHECK (length(trim(stop_id)) > 0),
    pool_id TEXT NOT NULL,
    lon REAL NOT NULL,
    lat REAL NOT NULL,
    on_street_name TEXT,
    bearing_code TEXT
);
CREATE INDEX IF NOT EXISTS stops_pool_idx ON stops (pool_id);
CREATE TABLE IF NOT EXISTS stop_risk_snapshot (
    stop_id TEXT PRIMARY KEY REFERENCES stops(stop_id) ON DELETE CASCADE,
    combined_risk_score REAL NOT NULL DEFAULT 0,
    hotspot_weight REAL NOT NULL DEFAULT 0,
    l3_urgency_weight REAL NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS route_overrides (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pool_id TEXT NOT NULL,
    stop_id TEXT NOT NULL,
    override_type TEXT NOT NULL
        CHECK (override_type IN ('FORCE_INCLUDE', 'FORCE_EXCLUDE', 'PRIORITY_BUMP')),
    value REAL,
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE INDEX IF NOT EXISTS route_overrides_pool_idx ON route_overrides (pool_id);
CREATE TABLE IF NOT EXISTS route_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pool_id TEXT NOT NULL,
    base_id TEXT NOT NULL,
    run_date TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'planned',
    total_distance_m REAL NOT NULL,
    total_duration_s REAL NOT NULL,
    started_at TEXT,
    finished_at TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE TABLE IF NOT EXISTS route_run_stops (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    route_run_id INTEGER NOT NULL REFERENCES route_runs(id) ON DELETE CASCADE,
    stop_id TEXT NOT NULL,
    sequence INTEGER NOT NULL CHECK (sequence >= 0),
    status TEXT NOT NULL DEFAULT 'pending',
    completed_at TEXT,
    planned_distance_m REAL NOT NULL,
    planned_duration_s REAL NOT NULL,
    UNIQUE (route_run_id, sequence),
    UNIQUE (route_run_id, stop_id)
);
";

const STOP_COLUMNS: &str = "s.stop_id, s.lon, s.lat, s.on_street_name, s.bearing_code,
    r.stop_id IS NOT NULL, r.combined_risk_score, r.hotspot_weight, r.l3_urgency_weight";

/// One line of [`SqliteStore::open_route_runs`].
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRunSummary {
    pub id: RouteRunId,
    pub pool_id: String,
    pub base_id: String,
    pub run_date: String,
    pub status: RouteRunStatus,
    pub stop_count: usize,
}

/// Everything the planner reads and writes, in one SQLite database.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn upsert_base(
        &self,
        id: &str,
        location: Coordinate,
        active: bool,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO bases (id, lon, lat, active) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (id) DO UPDATE SET lon = excluded.lon, lat = excluded.lat,
                 active = excluded.active",
            params![id, location.lon, location.lat, active],
        )?;
        Ok(())
    }

    /// Insert or replace a stop and, when present, its risk snapshot.
    pub fn upsert_stop(&self, pool_id: &str, stop: &Stop) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO stops (stop_id, pool_id, lon, lat, on_street_name, bearing_code)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (stop_id) DO UPDATE SET pool_id = excluded.pool_id,
                 lon = excluded.lon, lat = excluded.lat,
                 on_street_name = excluded.on_street_name,
                 bearing_code = excluded.bearing_code",
            params![
                stop.stop_id,
                pool_id,
                stop.location.lon,
                stop.location.lat,
                stop.on_street_name,
                stop.bearing_code,
            ],
        )?;
        if let Some(risk) = stop.risk {
            self.upsert_risk(&stop.stop_id, risk)?;
        }
        Ok(())
    }

    pub fn upsert_risk(&self, stop_id: &str, risk: RiskScores) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO stop_risk_snapshot
                 (stop_id, combined_risk_score, hotspot_weight, l3_urgency_weight)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (stop_id) DO UPDATE SET
                 combined_risk_score = excluded.combined_risk_score,
                 hotspot_weight = excluded.hotspot_weight,
                 l3_urgency_weight = excluded.l3_urgency_weight",
            params![
                stop_id,
                risk.combined_risk_score,
                risk.hotspot_weight,
                risk.l3_urgency_weight,
            ],
        )?;
        Ok(())
    }

    /// Record an operator override and return its id.
    pub fn add_override(&self, o: &RouteOverride, created_by: &str) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO route_overrides (pool_id, stop_id, override_type, value, created_by)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                o.pool_id,
                o.stop_id,
                o.override_type.as_str(),
                o.value,
                created_by
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Remove an override. Returns whether a row existed.
    pub fn delete_override(&self, id: i64) -> Result<bool, StoreError> {
        let removed = self
            .conn
            .execute("DELETE FROM route_overrides WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }

    /// Move a planned run to `in_progress`. `started_at` is set once.
    pub fn start_route_run(&self, id: RouteRunId) -> Result<RouteRun, StoreError> {
        self.conn.execute(
            "UPDATE route_runs
             SET status = 'in_progress', started_at = COALESCE(started_at, datetime('now'))
             WHERE id = ?1 AND status IN ('planned', 'in_progress')",
            [id],
        )?;
        self.require_route_run(id)
    }

    pub fn finish_route_run(&self, id: RouteRunId) -> Result<RouteRun, StoreError> {
        self.conn.execute(
            "UPDATE route_runs SET status = 'completed', finished_at = datetime('now')
             WHERE id = ?1",
            [id],
        )?;
        self.require_route_run(id)
    }

    /// Update one stop of a run. Terminal statuses stamp `completed_at`.
    pub fn set_stop_status(
        &self,
        id: RouteRunId,
        stop_id: &str,
        status: StopStatus,
    ) -> Result<(), StoreError> {
        let updated = self.conn.execute(
            "UPDATE route_run_stops
             SET status = ?3,
                 completed_at = CASE WHEN ?4 THEN datetime('now') ELSE NULL END
             WHERE route_run_id = ?1 AND stop_id = ?2",
            params![id, stop_id, status.as_str(), status.is_terminal()],
        )?;
        if updated == 0 {
            return Err(StoreError::StopNotInRun {
                route_run_id: id,
                stop_id: stop_id.to_string(),
            });
        }
        Ok(())
    }

    /// Mark the run `finished` once no stop is pending or in progress and
    /// at least one was visited or skipped. Returns whether it changed.
    pub fn complete_if_all_stops_terminal(&self, id: RouteRunId) -> Result<bool, StoreError> {
        let (open, closed): (i64, i64) = self.conn.query_row(
            "SELECT
                 COALESCE(SUM(status IN ('pending', 'in_progress')), 0),
                 COALESCE(SUM(status IN ('done', 'skipped')), 0)
             FROM route_run_stops WHERE route_run_id = ?1",
            [id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        if open > 0 || closed == 0 {
            return Ok(false);
        }

        let updated = self.conn.execute(
            "UPDATE route_runs SET status = 'finished', finished_at = datetime('now')
             WHERE id = ?1 AND status NOT IN ('finished', 'completed')",
            [id],
        )?;
        if updated > 0 {
            tracing::info!(route_run_id = id, "all stops closed, route run finished");
        }
        Ok(updated > 0)
    }

    /// Runs still planned or in progress for `run_date`, newest first.
    pub fn open_route_runs(&self, run_date: &str) -> Result<Vec<RouteRunSummary>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT rr.id, rr.pool_id, rr.base_id, rr.run_date, rr.status,
                    (SELECT COUNT(*) FROM route_run_stops s WHERE s.route_run_id = rr.id)
             FROM route_runs rr
             WHERE rr.run_date = ?1 AND rr.status IN ('planned', 'in_progress')
             ORDER BY rr.id DESC",
        )?;
        let rows = stmt
            .query_map([run_date], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, pool_id, base_id, run_date, status, stop_count)| {
                Ok(RouteRunSummary {
                    id,
                    pool_id,
                    base_id,
                    run_date,
                    status: parse_column("route_runs.status", &status)?,
                    stop_count: usize::try_from(stop_count).unwrap_or(0),
                })
            })
            .collect()
    }

    pub fn route_run(&self, id: RouteRunId) -> Result<Option<RouteRun>, StoreError> {
        let header = self
            .conn
            .query_row(
                "SELECT id, pool_id, base_id, run_date, status, total_distance_m,
                        total_duration_s, started_at, finished_at
                 FROM route_runs WHERE id = ?1",
                [id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, f64>(5)?,
                        row.get::<_, f64>(6)?,
                        row.get::<_, Option<String>>(7)?,
                        row.get::<_, Option<String>>(8)?,
                    ))
                },
            )
            .optional()?;
        let Some((id, pool_id, base_id, run_date, status, distance, duration, started, finished)) =
            header
        else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT stop_id, sequence, planned_distance_m, planned_duration_s, status, completed_at
             FROM route_run_stops WHERE route_run_id = ?1 ORDER BY sequence",
        )?;
        let raw = stmt
            .query_map([id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let stops = raw
            .into_iter()
            .map(|(stop_id, sequence, dist, dur, status, completed_at)| {
                Ok(RouteRunStop {
                    route_run_id: id,
                    stop_id,
                    sequence,
                    planned_distance_m: dist,
                    planned_duration_s: dur,
                    status: parse_column("route_run_stops.status", &status)?,
                    completed_at,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(Some(RouteRun {
            id,
            pool_id,
            base_id,
            run_date,
            status: parse_column("route_runs.status", &status)?,
            total_distance_m: distance,
            total_duration_s: duration,
            started_at: started,
            finished_at: finished,
            stops,
        }))
    }

    fn require_route_run(&self, id: RouteRunId) -> Result<RouteRun, StoreError> {
        self.route_run(id)?.ok_or(StoreError::RouteRunNotFound(id))
    }

    fn insert_run(&self, run: &NewRouteRun, stops: &[NewRouteRunStop]) -> Result<i64, StoreError> {
        // Dropping the transaction without commit rolls back.
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO route_runs (pool_id, base_id, run_date, status, total_distance_m,
                                     total_duration_s)
             VALUES (?1, ?2, ?3, 'planned', ?4, ?5)",
            params![
                run.pool_id,
                run.base_id,
                run.run_date,
                run.total_distance_m,
                run.total_duration_s
            ],
        )?;
        let id = tx.last_insert_rowid();
        {
            let mut insert_stop = tx.prepare(
                "INSERT INTO route_run_stops (route_run_id, stop_id, sequence, status,
                                              planned_distance_m, planned_duration_s)
                 VALUES (?1, ?2, ?3, 'pending', ?4, ?5)",
            )?;
            for stop in stops {
                insert_stop.execute(params![
                    id,
                    stop.stop_id,
                    stop.sequence,
                    stop.planned_distance_m,
                    stop.planned_duration_s
                ])?;
            }
        }
        tx.commit()?;
        Ok(id)
    }

    fn query_stops(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Stop>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let stops = stmt
            .query_map(params, stop_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stops)
    }
}

fn stop_from_row(row: &Row<'_>) -> rusqlite::Result<Stop> {
    let has_risk: bool = row.get(5)?;
    let risk = if has_risk {
        Some(RiskScores {
            combined_risk_score: row.get(6)?,
            hotspot_weight: row.get(7)?,
            l3_urgency_weight: row.get(8)?,
        })
    } else {
        None
    };
    Ok(Stop {
        stop_id: row.get(0)?,
        location: Coordinate::new(row.get(1)?, row.get(2)?),
        on_street_name: row.get(3)?,
        bearing_code: row.get(4)?,
        risk,
    })
}

fn parse_column<T: FromStr>(column: &'static str, value: &str) -> Result<T, StoreError> {
    value.parse().map_err(|_| StoreError::InvalidValue {
        column,
        value: value.to_string(),
    })
}

impl RiskCatalog for SqliteStore {
    fn top_stops_for_pool(&self, pool_id: &str, limit: usize) -> Result<Vec<Stop>, PlanError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let sql = format!(
            "SELECT {STOP_COLUMNS}
             FROM stops s LEFT JOIN stop_risk_snapshot r ON r.stop_id = s.stop_id
             WHERE s.pool_id = ?1
             ORDER BY COALESCE(r.combined_risk_score, 0) DESC, s.stop_id ASC
             LIMIT ?2"
        );
        Ok(self.query_stops(&sql, &[&pool_id, &limit])?)
    }

    fn stops_by_id(&self, pool_id: &str, stop_ids: &[StopId]) -> Result<Vec<Stop>, PlanError> {
        let mut stops = Vec::with_capacity(stop_ids.len());
        for chunk in stop_ids.chunks(MAX_IDS_PER_QUERY) {
            let placeholders = (0..chunk.len())
                .map(|i| format!("?{}", i + 2))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "SELECT {STOP_COLUMNS}
                 FROM stops s LEFT JOIN stop_risk_snapshot r ON r.stop_id = s.stop_id
                 WHERE s.pool_id = ?1 AND s.stop_id IN ({placeholders})"
            );
            let mut stmt = self.conn.prepare(&sql).map_err(StoreError::from)?;
            let values = std::iter::once(pool_id).chain(chunk.iter().map(String::as_str));
            let found = stmt
                .query_map(params_from_iter(values), stop_from_row)
                .map_err(StoreError::from)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(StoreError::from)?;
            stops.extend(found);
        }
        Ok(stops)
    }
}

impl OverrideStore for SqliteStore {
    fn overrides_for_pool(&self, pool_id: &str) -> Result<Vec<RouteOverride>, PlanError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT pool_id, stop_id, override_type, value FROM route_overrides
                 WHERE pool_id = ?1 ORDER BY id",
            )
            .map_err(StoreError::from)?;
        let raw = stmt
            .query_map([pool_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<f64>>(3)?,
                ))
            })
            .map_err(StoreError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;

        let overrides = raw
            .into_iter()
            .map(|(pool_id, stop_id, kind, value)| {
                Ok(RouteOverride {
                    pool_id,
                    stop_id,
                    override_type: parse_column::<OverrideType>(
                        "route_overrides.override_type",
                        &kind,
                    )?,
                    value,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        Ok(overrides)
    }
}

impl RouteStore for SqliteStore {
    fn find_active_base(&self, base_id: &str) -> Result<Option<Coordinate>, PlanError> {
        let base = self
            .conn
            .query_row(
                "SELECT lon, lat FROM bases WHERE id = ?1 AND active = 1",
                [base_id],
                |row| Ok(Coordinate::new(row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(StoreError::from)?;
        Ok(base)
    }

    fn insert_route_run(
        &self,
        run: &NewRouteRun,
        stops: &[NewRouteRunStop],
    ) -> Result<RouteRunId, PlanError> {
        Ok(self.insert_run(run, stops)?)
    }

    fn load_route_run(&self, id: RouteRunId) -> Result<Option<RouteRun>, PlanError> {
        Ok(self.route_run(id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().expect("open in-memory store")
    }

    fn new_run() -> NewRouteRun {
        NewRouteRun {
            pool_id: "P1".into(),
            base_id: "B1".into(),
            run_date: "2024-05-01".into(),
            total_distance_m: 300.0,
            total_duration_s: 30.0,
        }
    }

    fn run_stop(stop_id: &str, sequence: u32) -> NewRouteRunStop {
        NewRouteRunStop {
            stop_id: stop_id.into(),
            sequence,
            planned_distance_m: 100.0,
            planned_duration_s: 10.0,
        }
    }

    #[test]
    fn inactive_bases_are_not_found() {
        let store = store();
        store.upsert_base("B1", Coordinate::new(1.0, 2.0), true).unwrap();
        store.upsert_base("B2", Coordinate::new(3.0, 4.0), false).unwrap();

        assert_eq!(
            store.find_active_base("B1").unwrap(),
            Some(Coordinate::new(1.0, 2.0))
        );
        assert_eq!(store.find_active_base("B2").unwrap(), None);
        assert_eq!(store.find_active_base("missing").unwrap(), None);
    }

    #[test]
    fn top_stops_are_pool_scoped_and_ranked() {
        let store = store();
        store
            .upsert_stop("P1", &Stop::new("A", 0.0, 0.0).with_risk(1.0, 0.0, 0.0))
            .unwrap();
        store
            .upsert_stop("P1", &Stop::new("B", 0.0, 0.0).with_risk(9.0, 2.0, 3.0))
            .unwrap();
        store.upsert_stop("P1", &Stop::new("C", 0.0, 0.0)).unwrap();
        store
            .upsert_stop("P2", &Stop::new("D", 0.0, 0.0).with_risk(50.0, 0.0, 0.0))
            .unwrap();

        let stops = store.top_stops_for_pool("P1", 10).unwrap();
        let ids: Vec<_> = stops.iter().map(|s| s.stop_id.as_str()).collect();

        assert_eq!(ids, vec!["B", "A", "C"]);
        assert_eq!(stops[0].risk.map(|r| r.l3_urgency_weight), Some(3.0));
        assert_eq!(stops[2].risk, None);
        assert_eq!(store.top_stops_for_pool("P1", 1).unwrap().len(), 1);
    }

    #[test]
    fn stops_by_id_keeps_street_metadata() {
        let store = store();
        store
            .upsert_stop("P1", &Stop::new("A", 1.0, 2.0).with_street("Elm St", "NB"))
            .unwrap();
        store.upsert_stop("P2", &Stop::new("B", 0.0, 0.0)).unwrap();

        let found = store
            .stops_by_id("P1", &["A".to_string(), "B".to_string(), "X".to_string()])
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].on_street_name.as_deref(), Some("Elm St"));
        assert_eq!(found[0].bearing_code.as_deref(), Some("NB"));
    }

    #[test]
    fn overrides_round_trip_and_delete() {
        let store = store();
        let id = store
            .add_override(&RouteOverride::priority_bump("P1", "A", 2.5), "ops")
            .unwrap();
        store
            .add_override(&RouteOverride::force_exclude("P2", "B"), "ops")
            .unwrap();

        assert_eq!(
            store.overrides_for_pool("P1").unwrap(),
            vec![RouteOverride::priority_bump("P1", "A", 2.5)]
        );
        assert!(store.delete_override(id).unwrap());
        assert!(!store.delete_override(id).unwrap());
        assert!(store.overrides_for_pool("P1").unwrap().is_empty());
    }

    #[test]
    fn inserted_run_loads_in_sequence_order() {
        let store = store();
        let id = store
            .insert_route_run(&new_run(), &[run_stop("B", 1), run_stop("A", 0)])
            .unwrap();

        let run = store.load_route_run(id).unwrap().unwrap();

        assert_eq!(run.status, RouteRunStatus::Planned);
        assert_eq!(run.total_duration_s, 30.0);
        let ids: Vec<_> = run.stops.iter().map(|s| s.stop_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert!(run.stops.iter().all(|s| s.status == StopStatus::Pending));
    }

    #[test]
    fn failed_insert_leaves_nothing_behind() {
        let store = store();
        let err = store
            .insert_route_run(&new_run(), &[run_stop("A", 0), run_stop("A", 1)])
            .unwrap_err();

        assert!(matches!(err, PlanError::PersistenceFailed { .. }));
        let runs: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM route_runs", [], |row| row.get(0))
            .unwrap();
        let stops: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM route_run_stops", [], |row| row.get(0))
            .unwrap();
        assert_eq!((runs, stops), (0, 0));
    }

    #[test]
    fn lifecycle_runs_through_to_finished() {
        let store = store();
        let id = store
            .insert_route_run(&new_run(), &[run_stop("A", 0), run_stop("B", 1)])
            .unwrap();

        let started = store.start_route_run(id).unwrap();
        assert_eq!(started.status, RouteRunStatus::InProgress);
        let first_start = started.started_at.clone();
        assert!(first_start.is_some());
        assert_eq!(store.start_route_run(id).unwrap().started_at, first_start);

        store.set_stop_status(id, "A", StopStatus::Done).unwrap();
        assert!(!store.complete_if_all_stops_terminal(id).unwrap());

        store.set_stop_status(id, "B", StopStatus::Skipped).unwrap();
        assert!(store.complete_if_all_stops_terminal(id).unwrap());
        assert!(!store.complete_if_all_stops_terminal(id).unwrap());

        let run = store.route_run(id).unwrap().unwrap();
        assert_eq!(run.status, RouteRunStatus::Finished);
        assert!(run.finished_at.is_some());
        assert!(run.stops.iter().all(|s| s.completed_at.is_some()));
    }

    #[test]
    fn completed_runs_are_not_overwritten() {
        let store = store();
        let id = store.insert_route_run(&new_run(), &[run_stop("A", 0)]).unwrap();

        store.finish_route_run(id).unwrap();
        store.set_stop_status(id, "A", StopStatus::Done).unwrap();

        assert!(!store.complete_if_all_stops_terminal(id).unwrap());
        assert_eq!(
            store.route_run(id).unwrap().unwrap().status,
            RouteRunStatus::Completed
        );
    }

    #[test]
    fn open_runs_exclude_closed_ones() {
        let store = store();
        let open = store
            .insert_route_run(&new_run(), &[run_stop("A", 0), run_stop("B", 1)])
            .unwrap();
        let closed = store.insert_route_run(&new_run(), &[run_stop("C", 0)]).unwrap();
        store.finish_route_run(closed).unwrap();

        let runs = store.open_route_runs("2024-05-01").unwrap();

        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, open);
        assert_eq!(runs[0].stop_count, 2);
        assert!(store.open_route_runs("2024-05-02").unwrap().is_empty());
    }

    #[test]
    fn unknown_runs_are_reported() {
        let store = store();
        assert!(matches!(
            store.start_route_run(42),
            Err(StoreError::RouteRunNotFound(42))
        ));
        assert!(store.load_route_run(42).unwrap().is_none());
    }
}
