//! Integration module for connecting blob extraction with the tracker.
//!
//! Connected-component extraction from a binary mask happens outside this
//! crate; these traits and helpers let any such step feed the tracker.

mod builder;
mod detector;
mod pipeline;

pub use builder::BlobBuilder;
pub use detector::{BlobSource, IntoBlobs};
pub use pipeline::TrackerPipeline;
