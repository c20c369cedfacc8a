//! Track/cluster scoring and the matching contract shared by both algorithms.

use std::cmp::Ordering;

use serde::Deserialize;

use crate::tracker::cluster::Cluster;
use crate::tracker::geometry;
use crate::tracker::greedy::GreedyAlgorithm;
use crate::tracker::optimal::OptimalAlgorithm;
use crate::tracker::track::Track;

/// Share of the track radius a position may deviate without penalty.
const RADIUS_ALLOWANCE: f64 = 0.5;

/// Matching algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Most confident track first, first admissible cluster wins
    #[default]
    Greedy,
    /// Minimum total cost assignment
    Optimal,
}

/// Scored candidate pairing of one track with one cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackClusterMatch {
    pub track_index: usize,
    pub track_label: u32,
    pub cluster_index: usize,
    pub cluster_label: u32,
    /// Distance from the track's predicted position to the cluster centroid
    pub distance: f64,
    pub range_factor: f64,
    pub area_factor: f64,
    pub length_factor: f64,
    pub angle_factor: f64,
    /// Product of the factors, in [0, 1]
    pub match_factor: f64,
    pub assigned: bool,
}

impl std::fmt::Display for TrackClusterMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Track:{} Cluster:{} Distance:{:.1} Range:{:.3} Area:{:.3} Length:{:.3} Angle:{:.3} Match:{:.3}",
            self.track_label,
            self.cluster_label,
            self.distance,
            self.range_factor,
            self.area_factor,
            self.length_factor,
            self.angle_factor,
            self.match_factor
        )
    }
}

/// Parameters shared by all scoring in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scoring {
    /// Maximum movement per frame; zero or less means unlimited
    pub max_move: f64,
    pub use_angle_factor: bool,
}

impl Scoring {
    pub fn new(max_move: f64, use_angle_factor: bool) -> Self {
        Self {
            max_move,
            use_angle_factor,
        }
    }

    /// Score one pair; `None` when the cluster is out of the track's range.
    pub fn score(
        &self,
        track_index: usize,
        track: &Track,
        cluster_index: usize,
        cluster: &Cluster,
    ) -> Option<TrackClusterMatch> {
        let distance =
            geometry::distance_between(track.estimate_x, track.estimate_y, cluster.x, cluster.y);
        let range_factor = self.range_factor(track, cluster, distance);
        if range_factor <= 0.0 {
            return None;
        }
        let area_factor = area_factor(track, cluster);
        let length_factor = length_factor(track, cluster);
        let angle_factor = if self.use_angle_factor {
            angle_factor(track, cluster)
        } else {
            1.0
        };
        let match_factor = range_factor * area_factor * length_factor * angle_factor;

        log::trace!(
            "score track {} / cluster {}: distance {:.2} factor {:.3}",
            track.label,
            cluster.label,
            distance,
            match_factor
        );

        Some(TrackClusterMatch {
            track_index,
            track_label: track.label,
            cluster_index,
            cluster_label: cluster.label,
            distance,
            range_factor,
            area_factor,
            length_factor,
            angle_factor,
            match_factor,
            assigned: false,
        })
    }

    fn range_factor(&self, track: &Track, cluster: &Cluster, distance: f64) -> f64 {
        if self.max_move <= 0.0 {
            return 1.0;
        }
        let allowance = if track.is_merged {
            cluster.radius
        } else {
            track.radius * RADIUS_ALLOWANCE
        };
        let adjusted = (distance - allowance).max(0.0);
        (1.0 - adjusted / self.max_move).max(0.0)
    }
}

fn area_factor(track: &Track, cluster: &Cluster) -> f64 {
    if track.area <= 0.0 || cluster.area <= 0.0 {
        return 1.0;
    }
    let relative = (cluster.area - track.area).abs() / cluster.area;
    (1.0 - relative * relative).clamp(0.0, 1.0)
}

fn length_factor(track: &Track, cluster: &Cluster) -> f64 {
    let longest = track.length_major.max(cluster.length_major);
    if track.length_major <= 0.0 || cluster.length_major <= 0.0 {
        return 1.0;
    }
    let relative = (cluster.length_major - track.length_major).abs() / longest;
    (1.0 - relative * relative).clamp(0.0, 1.0)
}

fn angle_factor(track: &Track, cluster: &Cluster) -> f64 {
    if track.length_major <= 0.0 {
        return 1.0;
    }
    let dangle = geometry::axis_angle_difference(track.angle, cluster.angle).abs();
    (1.0 - 0.5 * dangle / 90.0).clamp(0.0, 1.0)
}

/// Candidate ordering: best factor first, then nearest, then lowest index.
pub fn compare_candidates(a: &TrackClusterMatch, b: &TrackClusterMatch) -> Ordering {
    b.match_factor
        .total_cmp(&a.match_factor)
        .then(a.distance.total_cmp(&b.distance))
        .then(a.cluster_index.cmp(&b.cluster_index))
        .then(a.track_index.cmp(&b.track_index))
}

/// All in-range clusters for one track, best first.
pub fn track_candidates(
    track_index: usize,
    track: &Track,
    clusters: &[Cluster],
    scoring: &Scoring,
) -> Vec<TrackClusterMatch> {
    let mut candidates: Vec<TrackClusterMatch> = clusters
        .iter()
        .enumerate()
        .filter_map(|(ci, cluster)| scoring.score(track_index, track, ci, cluster))
        .collect();
    candidates.sort_by(compare_candidates);
    candidates
}

/// Whether the candidate's cluster still accepts its track.
pub fn is_admissible(candidate: &TrackClusterMatch, clusters: &[Cluster], tracks: &[Track]) -> bool {
    clusters[candidate.cluster_index].is_assignable(tracks[candidate.track_index].area)
}

/// Record a match on both sides.
pub fn commit(candidate: &mut TrackClusterMatch, clusters: &mut [Cluster], tracks: &mut [Track]) {
    let track = &mut tracks[candidate.track_index];
    clusters[candidate.cluster_index].assign(track.label, track.area);
    track.assign(candidate.cluster_index, candidate.match_factor);
    candidate.assigned = true;
}

/// Walk a best-first candidate list and commit the first admissible entry.
pub fn commit_first_admissible(
    candidates: &[TrackClusterMatch],
    clusters: &mut [Cluster],
    tracks: &mut [Track],
) -> Option<TrackClusterMatch> {
    let mut chosen = candidates
        .iter()
        .find(|candidate| is_admissible(candidate, clusters, tracks))?
        .clone();
    commit(&mut chosen, clusters, tracks);
    Some(chosen)
}

pub fn unassign_all(clusters: &mut [Cluster], tracks: &mut [Track]) {
    for cluster in clusters.iter_mut() {
        cluster.unassign();
    }
    for track in tracks.iter_mut() {
        track.unassign();
    }
}

/// Sum of match factors of a solution.
pub fn total_match_factor(matches: &[TrackClusterMatch]) -> f64 {
    matches.iter().map(|m| m.match_factor).sum()
}

/// Matching contract: assign tracks to clusters for one frame.
///
/// Implementations clear previous assignments, commit every returned match on
/// both the cluster and the track, never return a track twice and never
/// exceed a cluster's assignability. Unmatched tracks are simply absent.
pub trait MatchAlgorithm {
    fn solve(
        &mut self,
        clusters: &mut [Cluster],
        tracks: &mut [Track],
        scoring: &Scoring,
    ) -> Vec<TrackClusterMatch>;

    /// Human-readable view of the last solve.
    fn debug_info(&self) -> String;
}

/// Configured algorithm instance.
#[derive(Debug, Clone)]
pub enum Matcher {
    Greedy(GreedyAlgorithm),
    Optimal(OptimalAlgorithm),
}

impl Matcher {
    pub fn new(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Greedy => Matcher::Greedy(GreedyAlgorithm::default()),
            Algorithm::Optimal => Matcher::Optimal(OptimalAlgorithm::default()),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            Matcher::Greedy(_) => Algorithm::Greedy,
            Matcher::Optimal(_) => Algorithm::Optimal,
        }
    }
}

impl MatchAlgorithm for Matcher {
    fn solve(
        &mut self,
        clusters: &mut [Cluster],
        tracks: &mut [Track],
        scoring: &Scoring,
    ) -> Vec<TrackClusterMatch> {
        match self {
            Matcher::Greedy(greedy) => greedy.solve(clusters, tracks, scoring),
            Matcher::Optimal(optimal) => optimal.solve(clusters, tracks, scoring),
        }
    }

    fn debug_info(&self) -> String {
        match self {
            Matcher::Greedy(greedy) => greedy.debug_info(),
            Matcher::Optimal(optimal) => optimal.debug_info(),
        }
    }
}
