use serde::Deserialize;

use crate::error::{Error, Result};
use crate::tracker::matching::Algorithm;

/// Smallest useful distance between path nodes, in pixels.
pub const MIN_PATH_DISTANCE: f64 = 2.0;

/// Sample requirements of the self-calibration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Frames that must contribute samples
    pub training_cycles: u32,
    /// Samples that must be collected
    pub training_data_points: usize,
    /// Upper bound on the histogram bin count
    pub histogram_bins: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            training_cycles: 10,
            training_data_points: 1000,
            histogram_bins: 20,
        }
    }
}

/// Configuration for the [`BlobTracker`](crate::tracker::BlobTracker).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Single-object area bounds; calibrated when absent
    pub min_area: Option<f64>,
    pub max_area: Option<f64>,
    /// Maximum movement per frame; calibrated when absent
    pub max_move: Option<f64>,
    pub min_active: u32,
    pub max_inactive: u32,
    /// Path node spacing, floored at [`MIN_PATH_DISTANCE`]
    pub path_distance: f64,
    pub algorithm: Algorithm,
    pub use_angle_factor: bool,
    /// Physical size of one pixel for reported distances
    pub pixel_size: f64,
    /// Frame rate; zero when unknown
    pub fps: f64,
    /// Motion averaging window in seconds
    pub window_size: f64,
    /// Largest share of the frame a single blob may cover
    pub max_frame_fraction: f64,
    pub history_length: usize,
    pub calibration: CalibrationConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_area: None,
            max_area: None,
            max_move: None,
            min_active: 3,
            max_inactive: 3,
            path_distance: MIN_PATH_DISTANCE,
            algorithm: Algorithm::Greedy,
            use_angle_factor: false,
            pixel_size: 1.0,
            fps: 0.0,
            window_size: 1.0,
            max_frame_fraction: 0.1,
            history_length: 200,
            calibration: CalibrationConfig::default(),
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_active == 0 {
            return Err(invalid("min_active must be at least 1"));
        }
        match (self.min_area, self.max_area) {
            (Some(min), Some(max)) => {
                if !min.is_finite() || !max.is_finite() || min < 0.0 || max < 0.0 {
                    return Err(invalid(format!(
                        "area bounds must be finite and non-negative, got [{min}, {max}]"
                    )));
                }
                if min > max {
                    return Err(invalid(format!("min_area {min} exceeds max_area {max}")));
                }
            }
            (None, None) => {}
            _ => return Err(invalid("min_area and max_area must be given together")),
        }
        if let Some(max_move) = self.max_move {
            if !(max_move.is_finite() && max_move > 0.0) {
                return Err(invalid(format!("max_move must be positive, got {max_move}")));
            }
        }
        if !self.path_distance.is_finite() {
            return Err(invalid("path_distance must be finite"));
        }
        if !(self.pixel_size.is_finite() && self.pixel_size > 0.0) {
            return Err(invalid(format!(
                "pixel_size must be positive, got {}",
                self.pixel_size
            )));
        }
        if !(self.window_size.is_finite() && self.window_size > 0.0) {
            return Err(invalid(format!(
                "window_size must be positive, got {}",
                self.window_size
            )));
        }
        if !(self.fps.is_finite() && self.fps >= 0.0) {
            return Err(invalid(format!("fps must be non-negative, got {}", self.fps)));
        }
        if !(self.max_frame_fraction > 0.0 && self.max_frame_fraction <= 1.0) {
            return Err(invalid(format!(
                "max_frame_fraction must be in (0, 1], got {}",
                self.max_frame_fraction
            )));
        }
        if self.history_length == 0 {
            return Err(invalid("history_length must be at least 1"));
        }
        let calibration = &self.calibration;
        if calibration.training_cycles == 0
            || calibration.training_data_points == 0
            || calibration.histogram_bins == 0
        {
            return Err(invalid("calibration sizes must be at least 1"));
        }
        Ok(())
    }

    /// Path node spacing actually used.
    pub fn effective_path_distance(&self) -> f64 {
        self.path_distance.max(MIN_PATH_DISTANCE)
    }

    /// Number of history samples motion is averaged over.
    pub fn motion_window(&self) -> usize {
        ((self.fps * self.window_size).round() as usize).max(1)
    }

    /// Seconds since the first frame, zero when the frame rate is unknown.
    pub fn frame_time(&self, frame: u64) -> f64 {
        if self.fps > 0.0 {
            frame as f64 / self.fps
        } else {
            0.0
        }
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidConfig(message.into())
}
