//! Bounded local search over the oracle's trip.
//!
//! One left-to-right pass: for every anchor `A = stops[i]`, look at the next
//! `lookahead` positions for a stop `C` that is cheaper to visit right after
//! `A`, and move the best one there. The pass is not globally optimal and
//! is not idempotent; it trades optimality for a bounded number of remote
//! cost lookups.

use rayon::prelude::*;

use crate::config::PostOptimizeOptions;
use crate::error::PlanError;
use crate::model::{LegCost, Waypoint};

/// Result of a post-optimisation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PostOptimized {
    pub stops: Vec<Waypoint>,
    /// Number of relocations applied.
    pub moves: usize,
}

/// Relocate stops to shorten total duration.
///
/// `cost` is expected to be backed by a [`crate::leg_cache::LegCostCache`];
/// candidate positions of one window are evaluated in parallel, so it must
/// be safe to call from several threads.
pub fn post_optimize<F>(
    stops: &[Waypoint],
    cost: F,
    options: PostOptimizeOptions,
) -> Result<PostOptimized, PlanError>
where
    F: Fn(&Waypoint, &Waypoint) -> Result<LegCost, PlanError> + Sync,
{
    if stops.len() > options.max_stops {
        tracing::warn!(
            stops = stops.len(),
            max_stops = options.max_stops,
            "post-optimization skipped"
        );
        return Ok(PostOptimized {
            stops: stops.to_vec(),
            moves: 0,
        });
    }

    let mut arr = stops.to_vec();
    let n = arr.len();
    let mut moves = 0;

    for i in 0..n.saturating_sub(1) {
        if moves >= options.max_moves {
            break;
        }

        let search_limit = i.saturating_add(1).saturating_add(options.lookahead).min(n);
        if i + 2 >= search_limit {
            continue;
        }

        let deltas = (i + 2..search_limit)
            .into_par_iter()
            .map(|j| relocation_delta(&arr, i, j, &cost).map(|delta| (j, delta)))
            .collect::<Result<Vec<_>, _>>()?;

        // Smallest delta wins; the earliest position wins ties.
        let best = deltas
            .into_iter()
            .fold(None, |best: Option<(usize, f64)>, (j, delta)| match best {
                Some((_, best_delta)) if best_delta <= delta => best,
                _ => Some((j, delta)),
            });

        if let Some((j, delta)) = best {
            if delta < -options.min_improvement_seconds {
                tracing::debug!(from = j, to = i + 1, delta_s = delta, "relocating stop");
                let candidate = arr.remove(j);
                arr.insert(i + 1, candidate);
                moves += 1;
            }
        }
    }

    tracing::debug!(moves, "post-optimization finished");
    Ok(PostOptimized { stops: arr, moves })
}

/// Duration change from moving `arr[j]` to sit between `arr[i]` and
/// `arr[i + 1]`. Requires `j >= i + 2`.
fn relocation_delta<F>(arr: &[Waypoint], i: usize, j: usize, cost: &F) -> Result<f64, PlanError>
where
    F: Fn(&Waypoint, &Waypoint) -> Result<LegCost, PlanError>,
{
    let a = &arr[i];
    let b = &arr[i + 1];
    let p = &arr[j - 1];
    let c = &arr[j];
    let next = arr.get(j + 1);

    let mut current = cost(a, b)?.duration_s + cost(p, c)?.duration_s;
    let mut proposed = cost(a, c)?.duration_s + cost(c, b)?.duration_s;
    if let Some(n) = next {
        current += cost(c, n)?.duration_s;
        proposed += cost(p, n)?.duration_s;
    }

    Ok(proposed - current)
}
