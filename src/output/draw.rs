//! Drawing primitives for clusters, tracks and paths.
//!
//! Rendering itself is left to the caller; these types carry positions,
//! shapes and colors ready to be drawn.

use serde::Deserialize;

use crate::output::palette::{Palette, Rgb, label_color, log_scale};
use crate::tracker::{BlobTracker, Cluster, PathGraph, Rect, Track};

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterDraw {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    /// Major axis angle in degrees
    pub angle: f64,
    pub bounding_box: Rect,
    /// Track label, the merged label, or `None` when untracked
    pub label: Option<u32>,
    /// All assigned track labels
    pub labels: String,
    pub color: Rgb,
}

impl From<&Cluster> for ClusterDraw {
    fn from(cluster: &Cluster) -> Self {
        let label = cluster.display_label();
        Self {
            x: cluster.x,
            y: cluster.y,
            radius: cluster.radius,
            angle: cluster.angle,
            bounding_box: cluster.bounding_box,
            label,
            labels: cluster.labels_string(),
            color: label.map_or(Rgb::new(255, 255, 255), label_color),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackDraw {
    pub label: u32,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    /// Head direction in degrees
    pub orientation: f64,
    /// Whether `orientation` reflects observed movement
    pub has_direction: bool,
    /// Most recent positions, oldest first
    pub history: Vec<(f64, f64)>,
    pub color: Rgb,
}

impl TrackDraw {
    pub fn new(track: &Track, history: usize) -> Self {
        Self {
            label: track.label,
            x: track.x,
            y: track.y,
            radius: track.radius,
            orientation: track.orientation,
            has_direction: track.has_direction(),
            history: track.recent_points(history),
            color: label_color(track.label),
        }
    }
}

/// What a path drawing shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathDrawMode {
    /// Nodes colored by time since last use
    Age,
    /// Nodes colored by visits per frame
    #[default]
    Usage,
    /// Nodes colored by recency-weighted visits
    Usage2,
    /// Links colored by traversal count
    Links,
    /// Links with a marker moving along the dominant direction
    #[serde(rename = "linksmove")]
    LinksMove,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathNodeDraw {
    pub label: u32,
    pub x: f64,
    pub y: f64,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathLinkDraw {
    pub from: (f64, f64),
    pub to: (f64, f64),
    pub color: Rgb,
    /// Animation marker position, for [`PathDrawMode::LinksMove`]
    pub marker: Option<(f64, f64)>,
}

/// Drawable path graph; only one of the lists is filled, depending on the
/// mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathDraw {
    pub nodes: Vec<PathNodeDraw>,
    /// Least used first, so busy links end up on top
    pub links: Vec<PathLinkDraw>,
}

pub fn cluster_draws(tracker: &BlobTracker) -> Vec<ClusterDraw> {
    tracker.clusters().iter().map(ClusterDraw::from).collect()
}

/// Draw data for every track, with up to `history` trailing positions.
pub fn track_draws(tracker: &BlobTracker, history: usize) -> Vec<TrackDraw> {
    tracker
        .tracks()
        .iter()
        .map(|track| TrackDraw::new(track, history))
        .collect()
}

/// Color the path graph.
///
/// `power` sets the logarithmic range: relative usage `10^-power` and below
/// get the far end of the palette. Advances link animation cursors in
/// [`PathDrawMode::LinksMove`].
pub fn path_draw(paths: &mut PathGraph, mode: PathDrawMode, power: f64, palette: Palette) -> PathDraw {
    let mut draw = PathDraw::default();
    match mode {
        PathDrawMode::Links | PathDrawMode::LinksMove => {
            let max_usage = paths.max_link_count();
            let positions: Vec<(f64, f64)> = paths.nodes().iter().map(|n| (n.x, n.y)).collect();
            let mut order: Vec<usize> = (0..paths.links().len()).collect();
            order.sort_by_key(|&i| paths.links()[i].max_count());

            let links = paths.links_mut();
            for i in order {
                let link = &mut links[i];
                let from = positions[link.from as usize];
                let to = positions[link.to as usize];
                let scale = link.max_count() as f64 / max_usage.max(1) as f64;
                let marker = (mode == PathDrawMode::LinksMove).then(|| {
                    let t = link.advance(max_usage);
                    (from.0 + t * (to.0 - from.0), from.1 + t * (to.1 - from.1))
                });
                draw.links.push(PathLinkDraw {
                    from,
                    to,
                    color: palette.color(log_scale(scale, power)),
                    marker,
                });
            }
        }
        PathDrawMode::Age | PathDrawMode::Usage | PathDrawMode::Usage2 => {
            let age = paths.age();
            for node in paths.nodes() {
                let scale = match mode {
                    PathDrawMode::Age => 1.0 / node.last_use.max(1) as f64,
                    PathDrawMode::Usage => node.accum_usage(),
                    _ => node.accum_usage_recency(age),
                };
                draw.nodes.push(PathNodeDraw {
                    label: node.label,
                    x: node.x,
                    y: node.y,
                    color: palette.color(log_scale(scale, power)),
                });
            }
        }
    }
    draw
}
