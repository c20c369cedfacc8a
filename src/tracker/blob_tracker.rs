//! Main tracking engine: clusters in, persistent tracks out.

use std::fmt::Write;

use crate::error::Result;
use crate::tracker::blob::{BlobDescriptor, FrameSize};
use crate::tracker::calibration::Calibrator;
use crate::tracker::cluster::{self, Cluster};
use crate::tracker::config::TrackerConfig;
use crate::tracker::matching::{MatchAlgorithm, Matcher, Scoring, TrackClusterMatch};
use crate::tracker::path_graph::PathGraph;
use crate::tracker::stats::TrackingStats;
use crate::tracker::track::Track;
use crate::tracker::track_state::TrackState;

/// Frame-by-frame tracker for segmented organisms.
///
/// Each [`update`](Self::update) groups blobs into clusters, runs area and
/// movement calibration, matches tracks to clusters and records the routes
/// tracks take in a [`PathGraph`].
pub struct BlobTracker {
    config: TrackerConfig,
    calibrator: Calibrator,
    matcher: Matcher,
    clusters: Vec<Cluster>,
    tracks: Vec<Track>,
    matches: Vec<TrackClusterMatch>,
    paths: PathGraph,
    stats: TrackingStats,
    frame_index: u64,
    next_label: u32,
}

impl BlobTracker {
    /// Create a tracker. Fails with `Error::InvalidConfig` if the config does
    /// not validate.
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        let area = config.min_area.zip(config.max_area);
        let calibrator = Calibrator::new(config.calibration.clone(), area, config.max_move);
        Ok(Self {
            calibrator,
            matcher: Matcher::new(config.algorithm),
            clusters: Vec::new(),
            tracks: Vec::new(),
            matches: Vec::new(),
            paths: PathGraph::new(config.effective_path_distance()),
            stats: TrackingStats::default(),
            frame_index: 0,
            next_label: 0,
            config,
        })
    }

    /// Process one frame of blobs and return the active tracks.
    ///
    /// Returns nothing in a frame that finalizes a calibration, since every
    /// track is dropped and tracking restarts on the next frame.
    pub fn update(&mut self, blobs: &[BlobDescriptor], frame: FrameSize) -> Vec<&Track> {
        self.frame_index += 1;

        // Step 1: Clusters from admissible blobs
        self.clusters = cluster::build_clusters(
            blobs,
            frame,
            self.config.max_frame_fraction,
            self.calibrator.admission(),
        );

        // Step 2: Area calibration, restarting tracking once it is final
        if !self.calibrator.is_area_finalized()
            && self
                .calibrator
                .observe_areas(self.clusters.iter().map(|c| c.area))
        {
            self.reset();
            return Vec::new();
        }

        // Step 3: Match existing tracks
        let scoring = Scoring::new(self.calibrator.max_move(), self.config.use_angle_factor);
        self.matches = self
            .matcher
            .solve(&mut self.clusters, &mut self.tracks, &scoring);
        self.record_matching();

        // Step 4: Spawn tracks on unclaimed clusters
        self.spawn_tracks();

        // Step 5: Update matched tracks
        let max_area = self.calibrator.max_area();
        let max_move = self.calibrator.max_move();
        let predict = self.calibrator.is_move_finalized();
        for track in &mut self.tracks {
            if let Some(ci) = track.cluster_index {
                track.update(&self.clusters[ci], max_area, max_move, predict);
            }
        }

        // Step 6: Age out unmatched tracks
        self.prune_tracks();

        // Step 7: Movement calibration
        if self.calibrator.is_area_finalized()
            && !self.calibrator.is_move_finalized()
            && self
                .calibrator
                .observe_displacements(self.tracks.iter().map(|t| t.dist))
        {
            self.reset();
            return Vec::new();
        }

        // Step 8: Path usage
        if self.calibrator.is_move_finalized() {
            self.update_paths();
        }

        self.active_tracks()
    }

    fn record_matching(&mut self) {
        self.stats.track_matching.reset(self.tracks.len() as u32);
        self.stats.track_distance.reset(0);
        for m in &self.matches {
            self.stats.track_matching.add_one();
            self.stats.track_distance.add_value(m.distance);
        }
    }

    fn spawn_tracks(&mut self) {
        let spawn_limit = self.calibrator.max_area();
        for (ci, cluster) in self.clusters.iter_mut().enumerate() {
            if cluster.is_assigned() || cluster.area >= spawn_limit {
                continue;
            }
            let label = self.next_label;
            self.next_label += 1;
            let mut track = Track::new(label, self.config.history_length);
            cluster.assign(label, track.area);
            track.assign(ci, 1.0);
            log::debug!(
                "track {label} spawned at ({:.1}, {:.1}) area {:.1}",
                cluster.x,
                cluster.y,
                cluster.area
            );
            self.tracks.push(track);
        }
    }

    fn prune_tracks(&mut self) {
        let min_active = self.config.min_active;
        let max_inactive = self.config.max_inactive;

        self.tracks.retain_mut(|track| {
            if !track.assigned {
                track.update_inactive();
            }
            if track.is_expired(max_inactive) {
                log::debug!(
                    "track {} pruned after {} frames",
                    track.label,
                    track.lifetime
                );
                return false;
            }
            if track.assigned && track.active_count == min_active {
                log::debug!("track {} active", track.label);
            }
            true
        });

        self.stats.track_lifetime.reset(0);
        self.stats.active_tracks = 0;
        for track in self.tracks.iter().filter(|t| t.is_active(min_active)) {
            self.stats.active_tracks += 1;
            self.stats.track_lifetime.add_value(track.active_count as f64);
        }
    }

    fn update_paths(&mut self) {
        self.stats.path_matching.reset(0);
        for track in self.tracks.iter_mut().filter(|t| t.dist != 0.0) {
            if self.paths.match_track(track) {
                self.stats.path_matching.add_one();
            }
            self.stats.path_matching.add_total();
        }
        self.paths.tick();
    }

    /// Drop all clusters, tracks and paths. Calibrated values and the label
    /// counter are kept.
    pub fn reset(&mut self) {
        log::debug!("tracker reset at frame {}", self.frame_index);
        self.clusters.clear();
        self.tracks.clear();
        self.matches.clear();
        self.paths.reset();
        self.stats.reset();
    }

    /// Forget every path node and link while keeping the tracks.
    pub fn reset_paths(&mut self) {
        self.paths.reset();
        for track in &mut self.tracks {
            track.last_path_node = None;
        }
    }

    pub fn active_tracks(&self) -> Vec<&Track> {
        self.tracks
            .iter()
            .filter(|t| t.is_active(self.config.min_active))
            .collect()
    }

    pub fn track_state(&self, track: &Track) -> TrackState {
        track.state(self.config.min_active, self.config.max_inactive)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, label: u32) -> Option<&Track> {
        self.tracks.iter().find(|t| t.label == label)
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Matches committed in the last frame.
    pub fn matches(&self) -> &[TrackClusterMatch] {
        &self.matches
    }

    pub fn paths(&self) -> &PathGraph {
        &self.paths
    }

    pub fn paths_mut(&mut self) -> &mut PathGraph {
        &mut self.paths
    }

    pub fn calibrator(&self) -> &Calibrator {
        &self.calibrator
    }

    pub fn stats(&self) -> &TrackingStats {
        &self.stats
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Frames processed so far, the current one included.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Whether both area and movement are calibrated.
    pub fn is_calibrated(&self) -> bool {
        self.calibrator.is_area_finalized() && self.calibrator.is_move_finalized()
    }

    /// Human-readable summary of parameters and tracking quality.
    pub fn status(&self) -> String {
        let mut info = String::new();
        let _ = match self.calibrator.area() {
            Some(area) => writeln!(info, "Cluster min/max area = {:.0}/{:.0}", area.min, area.max),
            None => writeln!(info, "Cluster min/max area = (calibrating)"),
        };
        let _ = match self.calibrator.max_move_range() {
            Some(range) => writeln!(
                info,
                "Tracking max move/min active/max inactive = {:.1}/{}/{}",
                range.max, self.config.min_active, self.config.max_inactive
            ),
            None => writeln!(
                info,
                "Tracking max move/min active/max inactive = (calibrating)/{}/{}",
                self.config.min_active, self.config.max_inactive
            ),
        };
        info.push('\n');
        let _ = writeln!(info, "Tot clusters = {}", self.clusters.len());
        let _ = writeln!(
            info,
            "Tot tracked clusters (active) = {} ({})",
            self.tracks.len(),
            self.stats.active_tracks
        );
        let _ = writeln!(
            info,
            "Tracking match rate = {:.2}\n",
            self.stats.track_matching.average()
        );
        let _ = writeln!(info, "Average distance = {:.3}", self.stats.track_distance.average());
        let _ = writeln!(
            info,
            "Average life time = {:.0}\n",
            self.stats.track_lifetime.average()
        );
        let _ = writeln!(info, "Tot path nodes = {}", self.paths.nodes().len());
        let _ = writeln!(info, "Tot path links = {}", self.paths.links().len());
        let _ = writeln!(
            info,
            "Path match rate = {:.2}",
            self.stats.path_matching.average()
        );
        info
    }

    /// Candidate lists or cost matrix of the last match.
    pub fn match_debug_info(&self) -> String {
        self.matcher.debug_info()
    }
}
