use std::fmt::Write;

use crate::tracker::cluster::Cluster;
use crate::tracker::matching::{self, MatchAlgorithm, Scoring, TrackClusterMatch};
use crate::tracker::track::Track;

/// Greedy matching.
///
/// Tracks with the most confident best candidate go first; each track takes
/// the first admissible cluster of its best-first candidate list.
#[derive(Debug, Clone, Default)]
pub struct GreedyAlgorithm {
    /// Candidate lists of the last solve, in processing order
    candidates: Vec<Vec<TrackClusterMatch>>,
}

impl GreedyAlgorithm {
    pub fn candidates(&self) -> &[Vec<TrackClusterMatch>] {
        &self.candidates
    }
}

/// Candidate lists for every track, ordered so the track with the strongest
/// best candidate comes first. Tracks without candidates are left out.
pub(crate) fn ordered_candidates(
    clusters: &[Cluster],
    tracks: &[Track],
    scoring: &Scoring,
) -> Vec<Vec<TrackClusterMatch>> {
    let mut lists: Vec<Vec<TrackClusterMatch>> = tracks
        .iter()
        .enumerate()
        .map(|(ti, track)| matching::track_candidates(ti, track, clusters, scoring))
        .filter(|list| !list.is_empty())
        .collect();
    // stable: equal leaders keep track order
    lists.sort_by(|a, b| matching::compare_candidates(&a[0], &b[0]));
    lists
}

impl MatchAlgorithm for GreedyAlgorithm {
    fn solve(
        &mut self,
        clusters: &mut [Cluster],
        tracks: &mut [Track],
        scoring: &Scoring,
    ) -> Vec<TrackClusterMatch> {
        matching::unassign_all(clusters, tracks);
        self.candidates = ordered_candidates(clusters, tracks, scoring);

        let mut matches = Vec::with_capacity(self.candidates.len());
        for list in &self.candidates {
            if let Some(chosen) = matching::commit_first_admissible(list, clusters, tracks) {
                matches.push(chosen);
            }
        }
        log::debug!(
            "greedy: {} of {} tracks matched to {} clusters",
            matches.len(),
            tracks.len(),
            clusters.len()
        );
        matches
    }

    fn debug_info(&self) -> String {
        let mut out = String::new();
        for list in &self.candidates {
            for candidate in list {
                let _ = writeln!(out, "{candidate}");
            }
            out.push('\n');
        }
        out
    }
}
