//! Accumulated spatial usage: nodes at visited positions, links between nodes
//! visited in succession by the same track.

use std::collections::HashMap;

use crate::tracker::config::MIN_PATH_DISTANCE;
use crate::tracker::geometry;
use crate::tracker::track::Track;

/// Visited position.
#[derive(Debug, Clone, PartialEq)]
pub struct PathNode {
    pub label: u32,
    pub x: f64,
    pub y: f64,
    /// Graph age at each match
    pub usage: Vec<u32>,
    /// Frames since creation
    pub age: u32,
    /// Number of visits, counting the one that created the node
    pub usage_count: u32,
    /// Frames since the last visit
    pub last_use: u32,
}

impl PathNode {
    fn new(label: u32, x: f64, y: f64) -> Self {
        Self {
            label,
            x,
            y,
            usage: Vec::new(),
            age: 0,
            usage_count: 1,
            last_use: 1,
        }
    }

    fn record_use(&mut self, graph_age: u32) {
        self.usage.push(graph_age);
        self.usage_count += 1;
        self.last_use = 1;
    }

    /// Visits per frame of existence.
    pub fn accum_usage(&self) -> f64 {
        self.usage_count as f64 / self.age.max(1) as f64
    }

    /// Visits weighted by how recent they are.
    pub fn accum_usage_recency(&self, graph_age: u32) -> f64 {
        self.usage
            .iter()
            .map(|&used| 1.0 / graph_age.saturating_sub(used).max(1) as f64)
            .sum()
    }

    /// Distance to `(x, y)` if strictly below `max_distance`.
    pub fn match_distance(&self, x: f64, y: f64, max_distance: f64) -> Option<f64> {
        let distance = geometry::distance_between(self.x, self.y, x, y);
        (distance < max_distance).then_some(distance)
    }
}

/// Connection between two nodes, stored from the older node to the newer one.
#[derive(Debug, Clone, PartialEq)]
pub struct PathLink {
    pub from: u32,
    pub to: u32,
    /// Traversals from `from` to `to`
    pub forward: u32,
    /// Traversals from `to` to `from`
    pub reverse: u32,
    /// Animation position along the link, in [0, 1)
    pub cursor: f64,
}

impl PathLink {
    pub fn max_count(&self) -> u32 {
        self.forward.max(self.reverse)
    }

    /// Usage relative to the busiest link.
    pub fn accum_usage(&self, forward: bool, max_usage: u32) -> f64 {
        let count = if forward { self.forward } else { self.reverse };
        count as f64 / max_usage.max(1) as f64
    }

    /// Advance the animation cursor by the net flow and return the position to
    /// draw at, measured from `from`.
    pub fn advance(&mut self, max_usage: u32) -> f64 {
        let max_usage = max_usage.max(1) as f64;
        let position = if self.forward >= self.reverse {
            self.cursor
        } else {
            1.0 - self.cursor
        };
        self.cursor += self.forward.abs_diff(self.reverse) as f64 / max_usage;
        self.cursor = self.cursor.fract();
        position
    }
}

/// Path usage graph.
#[derive(Debug, Clone)]
pub struct PathGraph {
    nodes: Vec<PathNode>,
    links: Vec<PathLink>,
    /// (from, to) -> index into `links`
    link_index: HashMap<(u32, u32), usize>,
    path_distance: f64,
    age: u32,
}

impl PathGraph {
    pub fn new(path_distance: f64) -> Self {
        Self {
            nodes: Vec::new(),
            links: Vec::new(),
            link_index: HashMap::new(),
            path_distance: path_distance.max(MIN_PATH_DISTANCE),
            age: 0,
        }
    }

    /// Match a track's position to a node, creating one if none is close.
    ///
    /// Returns `true` when an existing node was matched.
    pub fn match_track(&mut self, track: &mut Track) -> bool {
        let (x, y) = (track.x, track.y);
        let mut matched = track
            .last_path_node
            .filter(|&label| {
                self.node(label)
                    .and_then(|node| node.match_distance(x, y, self.path_distance / 2.0))
                    .is_some()
            });

        if matched.is_none() {
            let mut best: Option<(f64, u32)> = None;
            for node in &self.nodes {
                if let Some(distance) = node.match_distance(x, y, self.path_distance) {
                    if best.is_none_or(|(min, _)| distance < min) {
                        best = Some((distance, node.label));
                    }
                }
            }
            matched = best.map(|(_, label)| label);
        }

        let found = matched.is_some();
        let label = match matched {
            Some(label) => {
                let age = self.age;
                self.nodes[label as usize].record_use(age);
                label
            }
            None => {
                let label = self.nodes.len() as u32;
                self.nodes.push(PathNode::new(label, x, y));
                log::trace!("path node {label} created at ({x:.1}, {y:.1})");
                label
            }
        };

        if track.last_path_node != Some(label) {
            if let Some(previous) = track.last_path_node {
                self.add_link(previous, label);
            }
            track.last_path_node = Some(label);
        }
        found
    }

    fn add_link(&mut self, previous: u32, next: u32) {
        let forward = previous < next;
        let key = if forward { (previous, next) } else { (next, previous) };
        let index = *self.link_index.entry(key).or_insert_with(|| {
            self.links.push(PathLink {
                from: key.0,
                to: key.1,
                forward: 0,
                reverse: 0,
                cursor: 0.0,
            });
            self.links.len() - 1
        });
        let link = &mut self.links[index];
        if forward {
            link.forward += 1;
        } else {
            link.reverse += 1;
        }
    }

    /// Age every node and the graph by one frame.
    pub fn tick(&mut self) {
        for node in &mut self.nodes {
            node.age += 1;
            node.last_use += 1;
        }
        self.age += 1;
    }

    /// Tracks still remember their last node, so callers must clear
    /// `Track::last_path_node` as well.
    pub(crate) fn reset(&mut self) {
        self.nodes.clear();
        self.links.clear();
        self.link_index.clear();
        self.age = 0;
    }

    pub fn nodes(&self) -> &[PathNode] {
        &self.nodes
    }

    pub fn links(&self) -> &[PathLink] {
        &self.links
    }

    pub fn links_mut(&mut self) -> &mut [PathLink] {
        &mut self.links
    }

    pub fn node(&self, label: u32) -> Option<&PathNode> {
        self.nodes.get(label as usize)
    }

    pub fn link(&self, a: u32, b: u32) -> Option<&PathLink> {
        let key = if a < b { (a, b) } else { (b, a) };
        self.link_index.get(&key).map(|&i| &self.links[i])
    }

    /// Frames processed since the last reset.
    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn path_distance(&self) -> f64 {
        self.path_distance
    }

    /// Highest single-direction count over all links.
    pub fn max_link_count(&self) -> u32 {
        self.links.iter().map(PathLink::max_count).max().unwrap_or(0)
    }
}
