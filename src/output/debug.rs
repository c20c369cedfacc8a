//! Plain-text dumps of the tracker state.

use std::fmt::Write;

use crate::tracker::{BlobTracker, Scoring};

/// One line per cluster.
pub fn cluster_list(tracker: &BlobTracker) -> String {
    let mut out = String::new();
    for (i, cluster) in tracker.clusters().iter().enumerate() {
        let _ = writeln!(out, "#{i} {cluster}");
    }
    out
}

/// For every track left unmatched this frame, the nearest cluster and how it
/// scored.
pub fn unmatched_tracks(tracker: &BlobTracker) -> String {
    let use_angle = tracker.config().use_angle_factor;
    let limited = Scoring::new(tracker.calibrator().max_move(), use_angle);
    let unlimited = Scoring::new(0.0, use_angle);
    let mut out = String::new();

    for (ti, track) in tracker.tracks().iter().enumerate() {
        if track.assigned {
            continue;
        }
        let _ = writeln!(out, "Unmatched {track}");
        let nearest = tracker
            .clusters()
            .iter()
            .enumerate()
            .filter_map(|(ci, cluster)| unlimited.score(ti, track, ci, cluster))
            .min_by(|a, b| a.distance.total_cmp(&b.distance));
        match nearest {
            Some(m) => {
                let cluster = &tracker.clusters()[m.cluster_index];
                let reason = if limited.score(ti, track, m.cluster_index, cluster).is_none() {
                    "out of range"
                } else {
                    "cluster taken"
                };
                let _ = writeln!(out, "  nearest {m} ({reason})");
            }
            None => {
                let _ = writeln!(out, "  no clusters");
            }
        }
    }
    out
}

/// One line per path node.
pub fn path_node_list(tracker: &BlobTracker) -> String {
    let paths = tracker.paths();
    let mut out = String::new();
    for node in paths.nodes() {
        let _ = writeln!(
            out,
            "Node:{} X:{:.1} Y:{:.1} Age:{} Usage:{} LastUse:{} Recency:{:.3}",
            node.label,
            node.x,
            node.y,
            node.age,
            node.usage_count,
            node.last_use,
            node.accum_usage_recency(paths.age())
        );
    }
    out
}
