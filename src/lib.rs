//! # biotrack-rs
//!
//! Multi-object tracking for organisms filmed from above: per-frame blobs are
//! turned into clusters, matched onto persistent tracks, and aggregated into a
//! graph of frequently used paths. Area and movement thresholds calibrate
//! themselves from the first frames of the run.
//!
//! ```rust,ignore
//! use biotrack_rs::{BlobTracker, BlobBuilder, FrameSize, TrackerConfig};
//!
//! let mut tracker = BlobTracker::new(TrackerConfig::default())?;
//! let blobs = vec![BlobBuilder::new().centroid(10.0, 12.0).area(40.0).build()?];
//! let active = tracker.update(&blobs, FrameSize::new(640, 480));
//! ```

pub mod integration;
pub mod output;
pub mod tracker;

mod error;

pub use error::{Error, Result};
pub use integration::{BlobBuilder, BlobSource, IntoBlobs, TrackerPipeline};
pub use tracker::{
    Algorithm, BlobDescriptor, BlobTracker, CalibrationConfig, Cluster, FrameSize, Moments,
    PathGraph, Rect, Track, TrackClusterMatch, TrackState, TrackerConfig,
};
