//! Corridor refinement: keep stops on the same street and bearing together
//! and visit them in the direction of travel.
//!
//! A corridor signature is the case-folded, trimmed `(street, bearing)`
//! pair. Stops missing either half never join a corridor run. All passes
//! take a slice and return a new vector.

use std::cmp::Ordering;

use crate::config::CorridorOptions;
use crate::model::Waypoint;

/// Normalised `(street, bearing)` of a stop, `None` when either is blank.
pub fn signature(stop: &Waypoint) -> Option<(String, String)> {
    let street = normalize(stop.on_street_name.as_deref());
    let bearing = normalize(stop.bearing_code.as_deref());
    if street.is_empty() || bearing.is_empty() {
        None
    } else {
        Some((street, bearing))
    }
}

fn normalize(value: Option<&str>) -> String {
    value.unwrap_or_default().trim().to_uppercase()
}

/// Cardinal directions named by a bearing code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cardinals {
    pub north: bool,
    pub south: bool,
    pub east: bool,
    pub west: bool,
}

impl Cardinals {
    /// Parse codes like `"NB"`, `"SE"` or `"Northwest"`.
    ///
    /// Spelled-out words take precedence; letters are only read when no
    /// word matches, so `"SOUTHBOUND"` is not mistaken for north. Plain
    /// codes such as `"NB"`, `"SB"`, `"EB"` and `"WB"` read as their letters.
    pub fn parse(bearing: &str) -> Self {
        let b = bearing.trim().to_uppercase();
        let words = Self {
            north: b.contains("NORTH"),
            south: b.contains("SOUTH"),
            east: b.contains("EAST"),
            west: b.contains("WEST"),
        };
        if words != Self::default() {
            return words;
        }
        Self {
            north: b.contains('N'),
            south: b.contains('S'),
            east: b.contains('E'),
            west: b.contains('W'),
        }
    }
}

/// Coordinate a run is sorted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Lon,
    Lat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// How one corridor run should be ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOrder {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl RunOrder {
    /// Pick the dominant axis of `run` and the direction `bearing` implies on
    /// it. `None` when the bearing says nothing about that axis.
    pub fn resolve(run: &[Waypoint], bearing: &str) -> Option<Self> {
        let first = run.first()?;
        let (mut min_lon, mut max_lon) = (first.location.lon, first.location.lon);
        let (mut min_lat, mut max_lat) = (first.location.lat, first.location.lat);
        for stop in run {
            min_lon = min_lon.min(stop.location.lon);
            max_lon = max_lon.max(stop.location.lon);
            min_lat = min_lat.min(stop.location.lat);
            max_lat = max_lat.max(stop.location.lat);
        }
        // Horizontal wins ties.
        let horizontal = (max_lon - min_lon).abs() >= (max_lat - min_lat).abs();

        let cardinals = Cardinals::parse(bearing);
        let (key, direction) = if horizontal {
            let direction = if cardinals.east {
                SortDirection::Ascending
            } else if cardinals.west {
                SortDirection::Descending
            } else {
                return None;
            };
            (SortKey::Lon, direction)
        } else {
            let direction = if cardinals.north {
                SortDirection::Ascending
            } else if cardinals.south {
                SortDirection::Descending
            } else {
                return None;
            };
            (SortKey::Lat, direction)
        };
        Some(Self { key, direction })
    }

    fn value(&self, stop: &Waypoint) -> f64 {
        match self.key {
            SortKey::Lon => stop.location.lon,
            SortKey::Lat => stop.location.lat,
        }
    }

    fn compare(&self, a: &Waypoint, b: &Waypoint) -> Ordering {
        let ordering = self.value(a).total_cmp(&self.value(b));
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }

    fn in_order(&self, a: &Waypoint, b: &Waypoint) -> bool {
        let (va, vb) = (self.value(a), self.value(b));
        match self.direction {
            SortDirection::Ascending => vb >= va,
            SortDirection::Descending => vb <= va,
        }
    }

    /// Stable sort of `run` in this order.
    pub fn sort(&self, run: &mut [Waypoint]) {
        run.sort_by(|a, b| self.compare(a, b));
    }
}

/// Fraction of adjacent pairs in `run` already in the order `bearing`
/// implies. Runs shorter than two, or with no resolvable order, score 1.
pub fn monotonicity_score(run: &[Waypoint], bearing: &str) -> f64 {
    if run.len() < 2 {
        return 1.0;
    }
    let Some(order) = RunOrder::resolve(run, bearing) else {
        return 1.0;
    };
    let ok = run
        .windows(2)
        .filter(|pair| order.in_order(&pair[0], &pair[1]))
        .count();
    ok as f64 / (run.len() - 1) as f64
}

/// Maximal contiguous runs sharing one signature, as `(start, end, bearing)`
/// with `end` exclusive. Stops without a signature are not part of any run.
fn corridor_runs(stops: &[Waypoint]) -> Vec<(usize, usize, String)> {
    let mut runs = Vec::new();
    let mut i = 0;
    while i < stops.len() {
        let Some(sig) = signature(&stops[i]) else {
            i += 1;
            continue;
        };
        let mut j = i + 1;
        while j < stops.len() && signature(&stops[j]).as_ref() == Some(&sig) {
            j += 1;
        }
        runs.push((i, j, sig.1));
        i = j;
    }
    runs
}

/// Pull later stops sharing a signature forward to sit right behind the
/// first one, looking at most `window - 1` positions ahead.
pub fn regroup_within_window(stops: &[Waypoint], window: usize) -> Vec<Waypoint> {
    let mut arr = stops.to_vec();
    let mut i = 0;

    while i < arr.len() {
        let Some(sig) = signature(&arr[i]) else {
            i += 1;
            continue;
        };

        let limit = arr.len().min(i.saturating_add(window));
        let matches: Vec<usize> = (i + 1..limit)
            .filter(|&j| signature(&arr[j]).as_ref() == Some(&sig))
            .collect();

        if !matches.is_empty() {
            // Remove back to front so earlier indices stay valid.
            let mut pulled: Vec<Waypoint> = matches.iter().rev().map(|&j| arr.remove(j)).collect();
            pulled.reverse();
            let tail = arr.split_off(i + 1);
            arr.extend(pulled);
            arr.extend(tail);
        }

        i += 1;
    }

    arr
}

/// Sort every run of two or more stops in its bearing's direction.
pub fn refine_runs(stops: &[Waypoint]) -> Vec<Waypoint> {
    let mut out = stops.to_vec();
    for (start, end, bearing) in corridor_runs(stops) {
        if end - start < 2 {
            continue;
        }
        let run = &mut out[start..end];
        if let Some(order) = RunOrder::resolve(run, &bearing) {
            order.sort(run);
        }
    }
    out
}

/// Force-sort runs whose monotonicity score falls below `threshold`.
pub fn enforce_sanity(stops: &[Waypoint], threshold: f64) -> Vec<Waypoint> {
    let mut out = stops.to_vec();
    for (start, end, bearing) in corridor_runs(stops) {
        if end - start < 2 {
            continue;
        }
        let run = &mut out[start..end];
        let score = monotonicity_score(run, &bearing);
        tracing::debug!(bearing = %bearing, start, len = end - start, score, "corridor run score");

        let Some(order) = RunOrder::resolve(run, &bearing) else {
            continue;
        };
        if score < threshold {
            let before = join_ids(run);
            order.sort(run);
            tracing::warn!(
                bearing = %bearing,
                score,
                %before,
                after = %join_ids(run),
                "corrected non-monotonic corridor run"
            );
        }
    }
    out
}

fn join_ids(run: &[Waypoint]) -> String {
    run.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("->")
}

/// Regroup, refine, then sanity-correct.
pub fn refine_corridors(stops: &[Waypoint], options: CorridorOptions) -> Vec<Waypoint> {
    let regrouped = regroup_within_window(stops, options.window);
    let refined = refine_runs(&regrouped);
    enforce_sanity(&refined, options.threshold)
}
