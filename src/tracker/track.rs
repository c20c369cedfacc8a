//! Persistent tracked object (Track) spanning frames.

use std::collections::VecDeque;

use crate::tracker::cluster::Cluster;
use crate::tracker::geometry;
use crate::tracker::track_state::TrackState;

/// Fraction of the maximum movement a merged track may move per frame.
const MERGED_STEP_FACTOR: f64 = 0.1;
/// Per-frame decay of a merged track's angle toward the cluster angle.
const MERGED_ANGLE_DECAY: f64 = 0.01;
/// Weight of the previous value in the smoothed shape means.
const SMOOTHING: f64 = 0.9;

/// Averaged motion over the most recent history window, in pixels (or degrees)
/// per frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionSummary {
    pub velocity: f64,
    pub acceleration: f64,
    pub angular_velocity: f64,
    pub angular_acceleration: f64,
}

/// Single tracked object.
#[derive(Debug, Clone)]
pub struct Track {
    /// Unique label, never reused within one tracker
    pub label: u32,
    pub x: f64,
    pub y: f64,
    /// Predicted position for the next frame
    pub estimate_x: f64,
    pub estimate_y: f64,
    /// First observed position
    pub origin_x: f64,
    pub origin_y: f64,
    pub area: f64,
    pub radius: f64,
    pub length_major: f64,
    pub length_minor: f64,
    pub mean_area: f64,
    pub mean_length_major: f64,
    pub mean_length_minor: f64,
    /// Axis angle in degrees adopted from the last single-occupancy cluster
    pub angle: f64,
    /// Head direction: `angle` or `angle + 180`
    pub orientation: f64,
    /// Signed distance travelled along `angle`; its sign picks the head
    pub forward_dist: f64,
    pub dx: f64,
    pub dy: f64,
    pub dist: f64,
    pub total_dist: f64,
    pub last_match_factor: f64,
    pub is_new: bool,
    pub is_merged: bool,
    pub assigned: bool,
    pub active_count: u32,
    pub inactive_count: u32,
    /// Frames since the track was spawned
    pub lifetime: u32,
    /// Index of the matched cluster in the current frame
    pub cluster_index: Option<usize>,
    /// Label of the last matched path node
    pub last_path_node: Option<u32>,
    points: VecDeque<(f64, f64)>,
    angles: VecDeque<f64>,
    history_length: usize,
}

impl Track {
    /// Create an unpositioned track; the first [`Track::update`] places it.
    pub fn new(label: u32, history_length: usize) -> Self {
        Self {
            label,
            x: 0.0,
            y: 0.0,
            estimate_x: 0.0,
            estimate_y: 0.0,
            origin_x: 0.0,
            origin_y: 0.0,
            area: 0.0,
            radius: 0.0,
            length_major: 0.0,
            length_minor: 0.0,
            mean_area: 0.0,
            mean_length_major: 0.0,
            mean_length_minor: 0.0,
            angle: 0.0,
            orientation: 0.0,
            forward_dist: 0.0,
            dx: 0.0,
            dy: 0.0,
            dist: 0.0,
            total_dist: 0.0,
            last_match_factor: 1.0,
            is_new: true,
            is_merged: false,
            assigned: true,
            active_count: 0,
            inactive_count: 0,
            lifetime: 0,
            cluster_index: None,
            last_path_node: None,
            points: VecDeque::with_capacity(history_length.min(1024)),
            angles: VecDeque::with_capacity(history_length.min(1024)),
            history_length: history_length.max(1),
        }
    }

    /// Update from the cluster this track was committed to.
    ///
    /// * `max_area` - largest single-object area; shape fields only refresh
    ///   below it
    /// * `max_move` - maximum movement per frame
    /// * `predict` - extrapolate the next position from the last step
    pub fn update(&mut self, cluster: &Cluster, max_area: f64, max_move: f64, predict: bool) {
        let ntracks = cluster.assigned_tracks().len();
        let (new_x, new_y);

        self.is_merged = ntracks > 1;

        if self.is_merged {
            // drift toward the merged centre, never snap
            let slow_move = max_move * MERGED_STEP_FACTOR;
            let mut dx0 = cluster.x - self.x;
            let mut dy0 = cluster.y - self.y;
            let dist0 = geometry::distance(dx0, dy0);
            if dist0 > cluster.radius * 0.5 {
                // stay inside the merged cluster
                self.x += dx0 * 0.5;
                self.y += dy0 * 0.5;
            }
            if dist0 > slow_move {
                dx0 *= slow_move / dist0;
                dy0 *= slow_move / dist0;
            }
            if self.dist > slow_move {
                self.dx *= slow_move / self.dist;
                self.dy *= slow_move / self.dist;
            }
            self.dx = (self.dx * 0.9 + dx0 * 0.1) * 0.5;
            self.dy = (self.dy * 0.9 + dy0 * 0.1) * 0.5;
            self.dist = geometry::distance(self.dx, self.dy);
            new_x = self.x + self.dx;
            new_y = self.y + self.dy;
            self.estimate_x = new_x + self.dx;
            self.estimate_y = new_y + self.dy;

            self.forward_dist = 0.0;

            let dangle = geometry::axis_angle_difference(self.angle, cluster.angle);
            self.angle += dangle * MERGED_ANGLE_DECAY;
        } else if self.is_new {
            new_x = cluster.x;
            new_y = cluster.y;
            self.estimate_x = new_x;
            self.estimate_y = new_y;
            self.origin_x = new_x;
            self.origin_y = new_y;
            self.angle = cluster.angle;
        } else {
            new_x = cluster.x;
            new_y = cluster.y;
            self.dx = new_x - self.x;
            self.dy = new_y - self.y;
            self.dist = geometry::distance(self.dx, self.dy);
            self.total_dist += self.dist;

            if self.angle.abs() > 45.0
                && cluster.angle.abs() > 45.0
                && self.angle * cluster.angle < 0.0
            {
                // axis wrapped around +-90: the head is now on the other side
                self.forward_dist = -self.forward_dist;
            }
            self.angle = cluster.angle;
            if self.dist > 0.0 {
                let heading = geometry::heading(self.dy, self.dx);
                let along = geometry::angle_difference(self.angle, heading);
                let against = geometry::angle_difference(self.angle + 180.0, heading);
                if along.abs() < against.abs() {
                    self.forward_dist += self.dist;
                } else {
                    self.forward_dist -= self.dist;
                }
            }

            if predict && self.dist < max_move {
                self.estimate_x = new_x + self.dx;
                self.estimate_y = new_y + self.dy;
            } else {
                self.estimate_x = new_x;
                self.estimate_y = new_y;
            }
        }

        self.orientation = if self.forward_dist >= 0.0 {
            self.angle
        } else {
            self.angle + 180.0
        };

        if (ntracks == 1 && cluster.area < max_area) || self.area == 0.0 {
            // merged blobs never define an object's size
            self.area = cluster.area;
            self.radius = cluster.radius;
            self.length_major = cluster.length_major;
            self.length_minor = cluster.length_minor;
            self.update_means();
        }

        self.x = new_x;
        self.y = new_y;

        push_bounded(&mut self.points, (self.x, self.y), self.history_length);
        if !self.is_new {
            push_bounded(&mut self.angles, self.orientation, self.history_length);
        }

        self.is_new = false;
        self.active_count += 1;
        self.inactive_count = 0;
        self.lifetime += 1;
    }

    /// Register a frame without a matching cluster.
    pub fn update_inactive(&mut self) {
        self.inactive_count += 1;
        self.active_count = self.active_count.saturating_sub(1);
        self.is_merged = false;
        self.dist = 0.0;
        self.lifetime += 1;
    }

    fn update_means(&mut self) {
        if self.mean_area == 0.0 {
            self.mean_area = self.area;
            self.mean_length_major = self.length_major;
            self.mean_length_minor = self.length_minor;
        } else {
            self.mean_area = self.mean_area * SMOOTHING + self.area * (1.0 - SMOOTHING);
            self.mean_length_major =
                self.mean_length_major * SMOOTHING + self.length_major * (1.0 - SMOOTHING);
            self.mean_length_minor =
                self.mean_length_minor * SMOOTHING + self.length_minor * (1.0 - SMOOTHING);
        }
    }

    pub fn unassign(&mut self) {
        self.assigned = false;
        self.cluster_index = None;
    }

    pub fn assign(&mut self, cluster_index: usize, match_factor: f64) {
        self.assigned = true;
        self.cluster_index = Some(cluster_index);
        self.last_match_factor = match_factor;
    }

    pub fn is_active(&self, min_active: u32) -> bool {
        self.active_count >= min_active && self.inactive_count == 0
    }

    pub fn is_expired(&self, max_inactive: u32) -> bool {
        self.inactive_count > max_inactive
    }

    pub fn state(&self, min_active: u32, max_inactive: u32) -> TrackState {
        if self.is_expired(max_inactive) {
            TrackState::Pruned
        } else if self.inactive_count > 0 {
            TrackState::Inactive
        } else if self.is_active(min_active) {
            TrackState::Active
        } else {
            TrackState::New
        }
    }

    /// Whether the head direction has been resolved from movement.
    pub fn has_direction(&self) -> bool {
        self.forward_dist != 0.0
    }

    pub fn distance_from_origin(&self) -> f64 {
        geometry::distance_between(self.origin_x, self.origin_y, self.x, self.y)
    }

    /// Position history, oldest first.
    pub fn points(&self) -> &VecDeque<(f64, f64)> {
        &self.points
    }

    /// Orientation history, oldest first.
    pub fn angles(&self) -> &VecDeque<f64> {
        &self.angles
    }

    /// The `n` most recent positions, oldest first.
    pub fn recent_points(&self, n: usize) -> Vec<(f64, f64)> {
        let skip = self.points.len().saturating_sub(n);
        self.points.iter().skip(skip).copied().collect()
    }

    /// Mean step length and step change over the last `window` frames.
    pub fn motion_summary(&self, window: usize) -> MotionSummary {
        let steps: Vec<f64> = self
            .points
            .iter()
            .rev()
            .zip(self.points.iter().rev().skip(1))
            .map(|(&(x1, y1), &(x0, y0))| geometry::distance_between(x0, y0, x1, y1))
            .collect();
        let turns: Vec<f64> = self
            .angles
            .iter()
            .rev()
            .zip(self.angles.iter().rev().skip(1))
            .map(|(&newer, &older)| geometry::angle_difference(older, newer))
            .collect();

        let (velocity, acceleration) = rate_and_change(&steps, window);
        let (angular_velocity, angular_acceleration) = rate_and_change(&turns, window);
        MotionSummary {
            velocity,
            acceleration,
            angular_velocity,
            angular_acceleration,
        }
    }
}

/// Mean of the first `window` values (newest first) and mean of their
/// successive differences (newer minus older).
fn rate_and_change(values: &[f64], window: usize) -> (f64, f64) {
    let window = window.max(1);
    let rate_values = &values[..values.len().min(window)];
    let rate = if rate_values.is_empty() {
        0.0
    } else {
        rate_values.iter().sum::<f64>() / rate_values.len() as f64
    };
    let changes: Vec<f64> = values
        .windows(2)
        .take(window)
        .map(|pair| pair[0] - pair[1])
        .collect();
    let change = if changes.is_empty() {
        0.0
    } else {
        changes.iter().sum::<f64>() / changes.len() as f64
    };
    (rate, change)
}

fn push_bounded<T>(buffer: &mut VecDeque<T>, value: T, limit: usize) {
    if buffer.len() == limit {
        buffer.pop_front();
    }
    buffer.push_back(value);
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Label:{} Area:{:.0} Radius:{:.0} Orientation:{:.0} X:{:.0} Y:{:.0}",
            self.label, self.area, self.radius, self.orientation, self.x, self.y
        )
    }
}
