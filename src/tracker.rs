mod blob;
mod blob_tracker;
pub mod calibration;
pub mod cluster;
mod config;
pub mod geometry;
mod greedy;
pub mod matching;
mod optimal;
pub mod path_graph;
mod rect;
mod stats;
mod track;
mod track_state;

pub use blob::{BlobDescriptor, FrameSize, Moments};
pub use blob_tracker::BlobTracker;
pub use calibration::{Calibrator, ParamRange, StatData};
pub use cluster::Cluster;
pub use config::{CalibrationConfig, MIN_PATH_DISTANCE, TrackerConfig};
pub use greedy::GreedyAlgorithm;
pub use matching::{Algorithm, MatchAlgorithm, Matcher, Scoring, TrackClusterMatch};
pub use optimal::OptimalAlgorithm;
pub use path_graph::{PathGraph, PathLink, PathNode};
pub use rect::Rect;
pub use stats::{Averager, TrackingStats};
pub use track::{MotionSummary, Track};
pub use track_state::TrackState;
