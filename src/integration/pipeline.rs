//! TrackerPipeline for combining blob extraction with tracking.

use crate::error::Result;
use crate::tracker::{BlobTracker, FrameSize, Track, TrackerConfig};

use super::BlobSource;

/// A combined tracker that bundles a blob source with the [`BlobTracker`].
pub struct TrackerPipeline<S: BlobSource> {
    source: S,
    tracker: BlobTracker,
}

impl<S: BlobSource> TrackerPipeline<S> {
    /// Create a new tracking pipeline with the given source and tracker config.
    pub fn new(source: S, config: TrackerConfig) -> Result<Self> {
        Ok(Self {
            source,
            tracker: BlobTracker::new(config)?,
        })
    }

    /// Create a new tracking pipeline with default tracker configuration.
    pub fn with_default_config(source: S) -> Result<Self> {
        Self::new(source, TrackerConfig::default())
    }

    /// Process a single mask and return the active tracks.
    ///
    /// # Arguments
    /// * `mask` - Binary mask bytes
    /// * `width` - Mask width in pixels
    /// * `height` - Mask height in pixels
    pub fn process_frame(
        &mut self,
        mask: &[u8],
        width: u32,
        height: u32,
    ) -> std::result::Result<Vec<&Track>, S::Error> {
        let frame = FrameSize::new(width, height);
        let blobs = self.source.blobs(mask, frame)?;
        Ok(self.tracker.update(&blobs, frame))
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn tracker(&self) -> &BlobTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut BlobTracker {
        &mut self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::BlobDescriptor;

    /// Reports one blob per frame, moving right by a fixed step.
    struct MockSource {
        x: f64,
    }

    impl BlobSource for MockSource {
        type Error = std::convert::Infallible;

        fn blobs(
            &mut self,
            _mask: &[u8],
            _frame: FrameSize,
        ) -> std::result::Result<Vec<BlobDescriptor>, Self::Error> {
            self.x += 2.0;
            Ok(vec![BlobDescriptor::new(1, self.x, 50.0, 30.0)])
        }
    }

    #[test]
    fn test_tracker_pipeline() {
        let config = TrackerConfig {
            min_area: Some(10.0),
            max_area: Some(50.0),
            max_move: Some(6.0),
            ..Default::default()
        };
        let mut pipeline = TrackerPipeline::new(MockSource { x: 10.0 }, config).unwrap();

        // New tracks need three matched frames before they are reported
        assert!(pipeline.process_frame(&[], 640, 480).unwrap().is_empty());
        assert!(pipeline.process_frame(&[], 640, 480).unwrap().is_empty());
        let tracks = pipeline.process_frame(&[], 640, 480).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].x, 16.0);
        assert_eq!(pipeline.source().x, 16.0);
    }

    #[test]
    fn test_invalid_config() {
        let config = TrackerConfig {
            fps: f64::NAN,
            ..Default::default()
        };
        assert!(TrackerPipeline::new(MockSource { x: 0.0 }, config).is_err());
    }
}
