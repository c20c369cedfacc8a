//! Per-frame cluster model and frame admission.

use crate::tracker::blob::{BlobDescriptor, FrameSize};
use crate::tracker::rect::Rect;

/// Smallest blob considered at all, in pixels.
pub const MIN_PIXELS: f64 = 2.0;

/// Maximum number of tracks one cluster may host.
pub const MAX_MERGED_BLOBS: usize = 5;

/// Label reported for a cluster hosting several tracks.
pub const MERGED_LABEL: u32 = 0x10000;

/// A blob of the current frame with its geometric descriptors.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub label: u32,
    pub x: f64,
    pub y: f64,
    pub area: f64,
    pub radius: f64,
    /// Major axis orientation in degrees, (-90, 90]
    pub angle: f64,
    pub length_major: f64,
    pub length_minor: f64,
    pub bounding_box: Rect,
    pub contour: Option<Vec<(i32, i32)>>,
    /// Labels of the tracks committed to this cluster in the current frame
    assigned_tracks: Vec<u32>,
    assigned_area: f64,
}

impl Cluster {
    pub fn from_blob(blob: &BlobDescriptor) -> Self {
        let (length_major, length_minor) = blob.moments.axis_lengths();
        let area = blob.area.max(0.0);
        Self {
            label: blob.label,
            x: blob.centroid.0,
            y: blob.centroid.1,
            area,
            radius: area.sqrt(),
            angle: blob.moments.angle(),
            length_major,
            length_minor,
            bounding_box: blob.bounding_box,
            contour: blob.contour.clone(),
            assigned_tracks: Vec::new(),
            assigned_area: 0.0,
        }
    }

    /// Whether a track of `track_area` may join this cluster.
    ///
    /// An empty cluster always accepts. Further tracks are accepted while the
    /// combined tracked area stays clearly below the cluster area and the merge
    /// cap is not reached.
    pub fn is_assignable(&self, track_area: f64) -> bool {
        let n = self.assigned_tracks.len();
        if n == 0 {
            return true;
        }
        (self.assigned_area + track_area) * 0.75 < self.area && n < MAX_MERGED_BLOBS
    }

    pub fn assign(&mut self, track_label: u32, track_area: f64) {
        self.assigned_tracks.push(track_label);
        self.assigned_area += track_area;
    }

    pub fn unassign(&mut self) {
        self.assigned_tracks.clear();
        self.assigned_area = 0.0;
    }

    pub fn is_assigned(&self) -> bool {
        !self.assigned_tracks.is_empty()
    }

    pub fn is_merged(&self) -> bool {
        self.assigned_tracks.len() > 1
    }

    pub fn assigned_tracks(&self) -> &[u32] {
        &self.assigned_tracks
    }

    pub fn assigned_area(&self) -> f64 {
        self.assigned_area
    }

    /// Identity label for display: the single track's label, [`MERGED_LABEL`]
    /// for merges, `None` when unassigned.
    pub fn display_label(&self) -> Option<u32> {
        match self.assigned_tracks.as_slice() {
            [] => None,
            [label] => Some(*label),
            _ => Some(MERGED_LABEL),
        }
    }

    /// Space separated list of assigned track labels.
    pub fn labels_string(&self) -> String {
        self.assigned_tracks
            .iter()
            .map(|label| label.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for Cluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Label:{} Area:{:.1} Radius:{:.1} Angle:{:.1} X:{:.1} Y:{:.1}",
            self.labels_string(),
            self.area,
            self.radius,
            self.angle,
            self.x,
            self.y
        )
    }
}

/// Area bounds a blob must satisfy to become a cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AreaAdmission {
    /// Calibration pending: anything above [`MIN_PIXELS`].
    Provisional,
    /// Calibrated `[min, max]` object area; merged blobs up to
    /// `max * MAX_MERGED_BLOBS` are still admitted.
    Calibrated { min: f64, max: f64 },
}

impl AreaAdmission {
    pub fn admits(&self, area: f64) -> bool {
        match *self {
            AreaAdmission::Provisional => area >= MIN_PIXELS,
            AreaAdmission::Calibrated { min, max } => {
                area >= min && area <= max * MAX_MERGED_BLOBS as f64
            }
        }
    }
}

/// Whether any blob covers more than `max_fraction` of the frame, marking the
/// whole frame as corrupted.
pub fn is_corrupted_frame(blobs: &[BlobDescriptor], frame: FrameSize, max_fraction: f64) -> bool {
    let pixels = frame.pixels();
    if pixels <= 0.0 {
        return false;
    }
    let limit = pixels * max_fraction;
    blobs.iter().any(|blob| blob.area > limit)
}

/// Build the clusters of one frame.
///
/// Returns no clusters at all when the frame is corrupted by an oversized blob.
pub fn build_clusters(
    blobs: &[BlobDescriptor],
    frame: FrameSize,
    max_fraction: f64,
    admission: AreaAdmission,
) -> Vec<Cluster> {
    if is_corrupted_frame(blobs, frame, max_fraction) {
        log::warn!(
            "dropping frame: blob larger than {:.0}% of {}x{} pixels",
            max_fraction * 100.0,
            frame.width,
            frame.height
        );
        return Vec::new();
    }

    blobs
        .iter()
        .filter(|blob| admission.admits(blob.area))
        .map(Cluster::from_blob)
        .collect()
}
