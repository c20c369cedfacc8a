//! Trait for blob extraction backends.

use crate::tracker::{BlobDescriptor, FrameSize};

/// Trait for blob extraction backends.
///
/// Implement this trait to connect any thresholding or segmentation step to
/// the tracker.
///
/// # Example
///
/// ```ignore
/// use biotrack_rs::{BlobDescriptor, BlobSource, FrameSize};
///
/// struct MaskLabeler {
///     // Your connected-component labeling here
/// }
///
/// impl BlobSource for MaskLabeler {
///     type Error = std::io::Error;
///
///     fn blobs(&mut self, mask: &[u8], frame: FrameSize) -> Result<Vec<BlobDescriptor>, Self::Error> {
///         // Label the mask and describe each component
///         Ok(vec![])
///     }
/// }
/// ```
pub trait BlobSource {
    /// Error type for extraction failures.
    type Error;

    /// Extract the blobs of one binary mask.
    ///
    /// # Arguments
    /// * `mask` - Mask bytes, row-major (layout depends on implementation)
    /// * `frame` - Mask dimensions in pixels
    fn blobs(&mut self, mask: &[u8], frame: FrameSize) -> Result<Vec<BlobDescriptor>, Self::Error>;
}

/// Helper trait for converting extractor-specific outputs to blob descriptors.
pub trait IntoBlobs {
    fn into_blobs(self) -> Vec<BlobDescriptor>;
}

impl IntoBlobs for Vec<BlobDescriptor> {
    fn into_blobs(self) -> Vec<BlobDescriptor> {
        self
    }
}

/// `(x, y, area)` triples, labelled in order.
impl IntoBlobs for Vec<(f64, f64, f64)> {
    fn into_blobs(self) -> Vec<BlobDescriptor> {
        self.into_iter()
            .enumerate()
            .map(|(i, (x, y, area))| BlobDescriptor::new(i as u32 + 1, x, y, area))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triples_into_blobs() {
        let blobs = vec![(1.0, 2.0, 30.0), (5.0, 6.0, 12.0)].into_blobs();
        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[1].label, 2);
        assert_eq!(blobs[1].centroid, (5.0, 6.0));
        assert_eq!(blobs[0].area, 30.0);
    }
}
