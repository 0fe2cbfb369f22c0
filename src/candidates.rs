//! Candidate selection: rank a pool's stops by risk, apply operator
//! overrides, and keep the top slice for trip planning.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::config::SelectionOptions;
use crate::error::PlanError;
use crate::model::{CandidateStop, OverrideType, RouteOverride, Stop, StopId};
use crate::traits::RiskCatalog;

/// Added on top of the highest organic score for force-included stops.
pub const INCLUSION_MARGIN: f64 = 1000.0;

/// Overrides of one pool, folded by kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideSet {
    pub force_include: BTreeSet<StopId>,
    pub force_exclude: HashSet<StopId>,
    /// Summed `PRIORITY_BUMP` values per stop.
    pub bumps: HashMap<StopId, f64>,
}

impl OverrideSet {
    /// Fold the overrides that belong to `pool_id`.
    pub fn for_pool(pool_id: &str, overrides: &[RouteOverride]) -> Self {
        let mut set = Self::default();
        for o in overrides.iter().filter(|o| o.pool_id == pool_id) {
            match o.override_type {
                OverrideType::ForceInclude => {
                    set.force_include.insert(o.stop_id.clone());
                }
                OverrideType::ForceExclude => {
                    set.force_exclude.insert(o.stop_id.clone());
                }
                OverrideType::PriorityBump => {
                    *set.bumps.entry(o.stop_id.clone()).or_insert(0.0) += o.value.unwrap_or(0.0);
                }
            }
        }
        set
    }

    fn bump(&self, stop_id: &str) -> f64 {
        self.bumps.get(stop_id).copied().unwrap_or(0.0)
    }
}

/// Select up to `options.limit` candidates from `pool_id`.
///
/// Returns [`PlanError::InsufficientCandidates`] when fewer than two stops
/// remain, in which case callers must not plan.
pub fn select_candidates<C>(
    catalog: &C,
    pool_id: &str,
    overrides: &[RouteOverride],
    options: SelectionOptions,
) -> Result<Vec<CandidateStop>, PlanError>
where
    C: RiskCatalog + ?Sized,
{
    let overrides = OverrideSet::for_pool(pool_id, overrides);
    let raw_limit = options.raw_limit.max(options.limit);

    let fetched = catalog.top_stops_for_pool(pool_id, raw_limit)?;
    let fetched_count = fetched.len();

    let mut seen = HashSet::new();
    let mut stops: Vec<Stop> = fetched
        .into_iter()
        .filter(|stop| seen.insert(stop.stop_id.clone()))
        .filter(|stop| !overrides.force_exclude.contains(&stop.stop_id))
        .collect();

    // An id that is both excluded and included comes back here: inclusion wins.
    let mut present: HashSet<StopId> = stops.iter().map(|s| s.stop_id.clone()).collect();
    let missing: Vec<StopId> = overrides
        .force_include
        .iter()
        .filter(|id| !present.contains(*id))
        .cloned()
        .collect();
    if !missing.is_empty() {
        let mut found = catalog.stops_by_id(pool_id, &missing)?;
        found.retain(|stop| {
            missing.contains(&stop.stop_id) && present.insert(stop.stop_id.clone())
        });
        if found.len() < missing.len() {
            tracing::warn!(
                pool_id,
                requested = missing.len(),
                found = found.len(),
                "force-included stops missing from catalog"
            );
        }
        // Sorting below makes the fetch order irrelevant.
        stops.extend(found);
    }

    let mut ranked = rank(stops, &overrides);
    ranked.truncate(options.limit);

    tracing::info!(
        pool_id,
        fetched = fetched_count,
        excluded = overrides.force_exclude.len(),
        included = overrides.force_include.len(),
        selected = ranked.len(),
        "selected route candidates"
    );

    if ranked.len() < 2 {
        return Err(PlanError::InsufficientCandidates {
            found: ranked.len(),
        });
    }
    Ok(ranked)
}

/// Score and sort stops. Deterministic for any input order.
fn rank(stops: Vec<Stop>, overrides: &OverrideSet) -> Vec<CandidateStop> {
    let max_score = stops
        .iter()
        .map(|s| s.risk_or_default().combined_risk_score)
        .fold(0.0_f64, f64::max);
    let inclusion_bonus = max_score + INCLUSION_MARGIN;

    let mut ranked: Vec<CandidateStop> = stops
        .into_iter()
        .map(|stop| {
            let mut score =
                stop.risk_or_default().combined_risk_score + overrides.bump(&stop.stop_id);
            if overrides.force_include.contains(&stop.stop_id) {
                score += inclusion_bonus;
            }
            CandidateStop {
                stop,
                effective_score: score,
            }
        })
        .collect();

    ranked.sort_by(compare_candidates);
    ranked
}

/// Effective score desc, hotspot desc, urgency desc, stop id asc.
fn compare_candidates(a: &CandidateStop, b: &CandidateStop) -> Ordering {
    let (ra, rb) = (a.stop.risk_or_default(), b.stop.risk_or_default());
    b.effective_score
        .total_cmp(&a.effective_score)
        .then_with(|| rb.hotspot_weight.total_cmp(&ra.hotspot_weight))
        .then_with(|| rb.l3_urgency_weight.total_cmp(&ra.l3_urgency_weight))
        .then_with(|| a.stop.stop_id.cmp(&b.stop.stop_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Catalog over a fixed stop list, pre-sorted the way the snapshot
    /// query sorts.
    struct VecCatalog(Vec<Stop>);

    impl RiskCatalog for VecCatalog {
        fn top_stops_for_pool(&self, _: &str, limit: usize) -> Result<Vec<Stop>, PlanError> {
            let mut stops = self.0.clone();
            stops.sort_by(|a, b| {
                b.risk_or_default()
                    .combined_risk_score
                    .total_cmp(&a.risk_or_default().combined_risk_score)
            });
            stops.truncate(limit);
            Ok(stops)
        }

        fn stops_by_id(&self, _: &str, ids: &[StopId]) -> Result<Vec<Stop>, PlanError> {
            Ok(self.0.iter().filter(|s| ids.contains(&s.stop_id)).cloned().collect())
        }
    }

    fn ids(candidates: &[CandidateStop]) -> Vec<&str> {
        candidates.iter().map(|c| c.stop.stop_id.as_str()).collect()
    }

    fn options(limit: usize, raw_limit: usize) -> SelectionOptions {
        SelectionOptions { limit, raw_limit }
    }

    #[test]
    fn bumps_for_the_same_stop_sum() {
        let set = OverrideSet::for_pool(
            "P1",
            &[
                RouteOverride::priority_bump("P1", "A", 2.5),
                RouteOverride::priority_bump("P1", "A", 4.0),
                RouteOverride::priority_bump("P2", "A", 100.0),
            ],
        );
        assert_eq!(set.bump("A"), 6.5);
        assert_eq!(set.bump("B"), 0.0);
    }

    #[test]
    fn ties_break_on_hotspot_then_urgency_then_id() {
        let catalog = VecCatalog(vec![
            Stop::new("D", 0.0, 0.0).with_risk(5.0, 1.0, 1.0),
            Stop::new("C", 0.0, 0.0).with_risk(5.0, 1.0, 1.0),
            Stop::new("B", 0.0, 0.0).with_risk(5.0, 1.0, 3.0),
            Stop::new("A", 0.0, 0.0).with_risk(5.0, 2.0, 0.0),
        ]);

        let selected = select_candidates(&catalog, "P1", &[], options(10, 10)).unwrap();

        assert_eq!(ids(&selected), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn priority_bump_lifts_a_stop() {
        let catalog = VecCatalog(vec![
            Stop::new("A", 0.0, 0.0).with_risk(10.0, 0.0, 0.0),
            Stop::new("B", 0.0, 0.0).with_risk(5.0, 0.0, 0.0),
        ]);
        let overrides = [RouteOverride::priority_bump("P1", "B", 6.0)];

        let selected = select_candidates(&catalog, "P1", &overrides, options(10, 10)).unwrap();

        assert_eq!(ids(&selected), vec!["B", "A"]);
        assert_eq!(selected[0].effective_score, 11.0);
    }

    #[test]
    fn duplicate_catalog_rows_are_collapsed() {
        let catalog = VecCatalog(vec![
            Stop::new("A", 0.0, 0.0).with_risk(3.0, 0.0, 0.0),
            Stop::new("A", 0.0, 0.0).with_risk(3.0, 0.0, 0.0),
            Stop::new("B", 0.0, 0.0).with_risk(1.0, 0.0, 0.0),
        ]);

        let selected = select_candidates(&catalog, "P1", &[], options(10, 10)).unwrap();

        assert_eq!(ids(&selected), vec!["A", "B"]);
    }

    #[test]
    fn exclusion_and_out_of_window_inclusion() {
        let catalog = VecCatalog(vec![
            Stop::new("A", 0.0, 0.0).with_risk(10.0, 0.0, 0.0),
            Stop::new("B", 0.0, 0.0).with_risk(5.0, 0.0, 0.0),
            Stop::new("C", 0.0, 0.0).with_risk(0.0, 0.0, 0.0),
        ]);
        let overrides = [
            RouteOverride::force_exclude("P1", "B"),
            RouteOverride::force_include("P1", "C"),
        ];

        // The top-2 fetch sees only A and B.
        let selected = select_candidates(&catalog, "P1", &overrides, options(2, 2)).unwrap();

        assert_eq!(ids(&selected), vec!["C", "A"]);
        assert!(selected[0].effective_score > selected[1].effective_score);
    }

    #[test]
    fn include_beats_exclude_for_the_same_stop() {
        let catalog = VecCatalog(vec![
            Stop::new("A", 0.0, 0.0).with_risk(10.0, 0.0, 0.0),
            Stop::new("B", 0.0, 0.0).with_risk(5.0, 0.0, 0.0),
        ]);
        let overrides = [
            RouteOverride::force_exclude("P1", "B"),
            RouteOverride::force_include("P1", "B"),
        ];

        let selected = select_candidates(&catalog, "P1", &overrides, options(10, 10)).unwrap();

        assert_eq!(ids(&selected), vec!["B", "A"]);
    }

    #[test]
    fn order_does_not_depend_on_catalog_order() {
        let mut stops = vec![
            Stop::new("A", 0.0, 0.0).with_risk(4.0, 1.0, 0.0),
            Stop::new("B", 0.0, 0.0).with_risk(4.0, 1.0, 0.0),
            Stop::new("C", 0.0, 0.0).with_risk(4.0, 2.0, 0.0),
            Stop::new("D", 0.0, 0.0).with_risk(9.0, 0.0, 0.0),
        ];
        let first =
            select_candidates(&VecCatalog(stops.clone()), "P1", &[], options(10, 10)).unwrap();
        stops.reverse();
        let second = select_candidates(&VecCatalog(stops), "P1", &[], options(10, 10)).unwrap();

        assert_eq!(ids(&first), vec!["D", "C", "A", "B"]);
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn single_eligible_stop_is_insufficient() {
        let catalog = VecCatalog(vec![Stop::new("A", 0.0, 0.0).with_risk(1.0, 0.0, 0.0)]);
        let err = select_candidates(&catalog, "P1", &[], options(10, 10)).unwrap_err();
        assert_eq!(err, PlanError::InsufficientCandidates { found: 1 });
    }

    #[test]
    fn unknown_force_include_is_skipped() {
        let catalog = VecCatalog(vec![
            Stop::new("A", 0.0, 0.0).with_risk(3.0, 0.0, 0.0),
            Stop::new("B", 0.0, 0.0).with_risk(1.0, 0.0, 0.0),
        ]);
        let overrides = [RouteOverride::force_include("P1", "GHOST")];

        let selected = select_candidates(&catalog, "P1", &overrides, options(10, 10)).unwrap();

        assert_eq!(ids(&selected), vec!["A", "B"]);
    }

    #[test]
    fn raw_limit_never_undercuts_limit() {
        let catalog = VecCatalog(
            (0..5)
                .map(|i| Stop::new(format!("S{i}"), 0.0, 0.0).with_risk(i as f64, 0.0, 0.0))
                .collect(),
        );

        let selected = select_candidates(&catalog, "P1", &[], options(4, 1)).unwrap();

        assert_eq!(selected.len(), 4);
    }
}
