//! Minimum total cost matching.
//!
//! Each cluster is expanded into as many slots as it could ever host, given the
//! areas of the tracks in its range. Tracks are rows; the columns are the
//! cluster slots followed by one "unmatched" column per track, so the linear
//! assignment problem is always square and always feasible. Cost is
//! `1 - match_factor` for an in-range pair, [`UNMATCHED_COST`] for leaving a
//! track unmatched and [`INVALID_COST`] for out-of-range pairs.

use std::fmt::Write;

use ndarray::Array2;

use crate::tracker::cluster::{Cluster, MAX_MERGED_BLOBS};
use crate::tracker::greedy;
use crate::tracker::matching::{self, MatchAlgorithm, Scoring, TrackClusterMatch};
use crate::tracker::track::Track;

/// Cost of a pair that must never be chosen.
pub const INVALID_COST: f64 = 1e6;
/// Cost of leaving a track without a cluster.
pub const UNMATCHED_COST: f64 = 1.0;

#[derive(Debug, Clone, Default)]
pub struct OptimalAlgorithm {
    /// Cluster x track cost of the last solve; `None` cells are out of range
    costs: Option<Array2<Option<f64>>>,
}

impl OptimalAlgorithm {
    /// Cost matrix of the last solve, clusters as rows and tracks as columns.
    pub fn cost_matrix(&self) -> Option<&Array2<Option<f64>>> {
        self.costs.as_ref()
    }

    /// Printable cost matrix, `-----` marking out-of-range pairs.
    pub fn cost_matrix_view(&self) -> String {
        let mut out = String::new();
        let Some(costs) = &self.costs else {
            return out;
        };
        for row in costs.rows() {
            let cells: Vec<String> = row
                .iter()
                .map(|cell| match cell {
                    Some(cost) => format!("{cost:5.1}"),
                    None => "-----".to_string(),
                })
                .collect();
            let _ = writeln!(out, "{}", cells.join(" "));
        }
        out
    }
}

/// Upper bound on the number of the given tracks one cluster can host.
fn slot_capacity(cluster: &Cluster, mut track_areas: Vec<f64>) -> usize {
    track_areas.sort_by(f64::total_cmp);
    let mut count = 0;
    let mut total = 0.0;
    for area in track_areas {
        if count > 0 && ((total + area) * 0.75 >= cluster.area || count >= MAX_MERGED_BLOBS) {
            break;
        }
        total += area;
        count += 1;
    }
    count
}

/// Solve the square assignment problem; `None` if the solver fails.
fn solve_slots(
    candidates: &[Vec<TrackClusterMatch>],
    slot_owner: &[usize],
    ntracks: usize,
) -> Option<Vec<Option<TrackClusterMatch>>> {
    let nslots = slot_owner.len();
    let n = ntracks + nslots;
    let mut cost = Array2::<f64>::zeros((n, n));
    for ti in 0..ntracks {
        for (slot, &ci) in slot_owner.iter().enumerate() {
            cost[[ti, slot]] = candidates[ti]
                .iter()
                .find(|m| m.cluster_index == ci)
                .map_or(INVALID_COST, |m| 1.0 - m.match_factor);
        }
        for col in nslots..n {
            cost[[ti, col]] = UNMATCHED_COST;
        }
    }

    match lapjv::lapjv(&cost) {
        Ok((row_to_col, _)) => Some(
            (0..ntracks)
                .map(|ti| {
                    let col = row_to_col[ti];
                    if col >= nslots || cost[[ti, col]] >= INVALID_COST {
                        return None;
                    }
                    let ci = slot_owner[col];
                    candidates[ti].iter().find(|m| m.cluster_index == ci).cloned()
                })
                .collect(),
        ),
        Err(_) => {
            log::warn!("assignment solver failed on a {n}x{n} problem, falling back to greedy");
            None
        }
    }
}

/// Commit solver proposals best first. A refused proposal, and any track the
/// solver left unmatched, gets its own candidate walk afterwards.
fn commit_proposals(
    proposals: Vec<Option<TrackClusterMatch>>,
    candidates: &[Vec<TrackClusterMatch>],
    clusters: &mut [Cluster],
    tracks: &mut [Track],
) -> Vec<TrackClusterMatch> {
    let mut proposed: Vec<TrackClusterMatch> = proposals.into_iter().flatten().collect();
    proposed.sort_by(matching::compare_candidates);

    let mut matches = Vec::with_capacity(candidates.len());
    for mut proposal in proposed {
        if matching::is_admissible(&proposal, clusters, tracks) {
            matching::commit(&mut proposal, clusters, tracks);
            matches.push(proposal);
        }
    }

    let mut leftovers: Vec<&Vec<TrackClusterMatch>> = candidates
        .iter()
        .filter(|list| list.first().is_some_and(|best| !tracks[best.track_index].assigned))
        .collect();
    leftovers.sort_by(|a, b| matching::compare_candidates(&a[0], &b[0]));
    for list in leftovers {
        if let Some(chosen) = matching::commit_first_admissible(list, clusters, tracks) {
            matches.push(chosen);
        }
    }
    matches
}

impl MatchAlgorithm for OptimalAlgorithm {
    fn solve(
        &mut self,
        clusters: &mut [Cluster],
        tracks: &mut [Track],
        scoring: &Scoring,
    ) -> Vec<TrackClusterMatch> {
        matching::unassign_all(clusters, tracks);
        let (nclusters, ntracks) = (clusters.len(), tracks.len());

        let candidates: Vec<Vec<TrackClusterMatch>> = tracks
            .iter()
            .enumerate()
            .map(|(ti, track)| matching::track_candidates(ti, track, clusters, scoring))
            .collect();

        let mut costs = Array2::from_elem((nclusters, ntracks), None);
        for list in &candidates {
            for m in list {
                costs[[m.cluster_index, m.track_index]] = Some(1.0 - m.match_factor);
            }
        }
        self.costs = Some(costs);

        if nclusters == 0 || ntracks == 0 {
            return Vec::new();
        }

        let mut slot_owner = Vec::new();
        for (ci, cluster) in clusters.iter().enumerate() {
            let areas: Vec<f64> = candidates
                .iter()
                .flatten()
                .filter(|m| m.cluster_index == ci)
                .map(|m| tracks[m.track_index].area)
                .collect();
            let capacity = slot_capacity(cluster, areas);
            slot_owner.extend(std::iter::repeat_n(ci, capacity));
        }

        let Some(proposals) = solve_slots(&candidates, &slot_owner, ntracks) else {
            let mut fallback = greedy::GreedyAlgorithm::default();
            return fallback.solve(clusters, tracks, scoring);
        };

        let mut matches = commit_proposals(proposals, &candidates, clusters, tracks);
        log::debug!(
            "optimal: {} of {} tracks matched over {} cluster slots",
            matches.len(),
            ntracks,
            slot_owner.len()
        );

        // slot capacities can over-estimate a merge; keep greedy when it scores higher
        matching::unassign_all(clusters, tracks);
        let greedy_matches = greedy::GreedyAlgorithm::default().solve(clusters, tracks, scoring);
        if matching::total_match_factor(&greedy_matches) > matching::total_match_factor(&matches) {
            log::debug!("optimal: greedy solution scored higher, keeping it");
            return greedy_matches;
        }
        matching::unassign_all(clusters, tracks);
        for m in &mut matches {
            matching::commit(m, clusters, tracks);
        }
        matches
    }

    fn debug_info(&self) -> String {
        self.cost_matrix_view()
    }
}
