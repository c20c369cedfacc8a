//! Builder for creating BlobDescriptor objects from various input formats.

use crate::error::{Error, Result};
use crate::tracker::{BlobDescriptor, Moments, Rect};

#[derive(Debug, Clone, Copy)]
struct Ellipse {
    angle: f64,
    major: f64,
    minor: f64,
}

/// Builder for creating [`BlobDescriptor`] objects.
///
/// Missing fields are derived where possible: the centroid from the bounding
/// box, the area from the pixels, and the moments from an ellipse, the pixels
/// or, failing both, a disc of the given area.
#[derive(Debug, Clone, Default)]
pub struct BlobBuilder {
    label: u32,
    centroid: Option<(f64, f64)>,
    area: Option<f64>,
    bounding_box: Option<Rect>,
    ellipse: Option<Ellipse>,
    pixels: Option<Vec<(i32, i32)>>,
    contour: Option<Vec<(i32, i32)>>,
}

impl BlobBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: u32) -> Self {
        self.label = label;
        self
    }

    pub fn centroid(mut self, x: f64, y: f64) -> Self {
        self.centroid = Some((x, y));
        self
    }

    /// Set the pixel count.
    pub fn area(mut self, area: f64) -> Self {
        self.area = Some(area);
        self
    }

    /// Set bounding box in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        self.bounding_box = Some(Rect::from_tlbr(x1, y1, x2, y2));
        self
    }

    /// Set bounding box in TLWH format.
    pub fn tlwh(mut self, x: f64, y: f64, w: f64, h: f64) -> Self {
        self.bounding_box = Some(Rect::new(x, y, w, h));
        self
    }

    /// Describe the shape as an ellipse with full axis lengths and the major
    /// axis at `angle` degrees.
    pub fn ellipse(mut self, angle: f64, major: f64, minor: f64) -> Self {
        self.ellipse = Some(Ellipse {
            angle,
            major,
            minor,
        });
        self
    }

    /// Use the blob's pixel coordinates for area, centroid, box and moments.
    pub fn pixels(mut self, pixels: Vec<(i32, i32)>) -> Self {
        self.pixels = Some(pixels);
        self
    }

    pub fn contour(mut self, contour: Vec<(i32, i32)>) -> Self {
        self.contour = Some(contour);
        self
    }

    /// Build the final [`BlobDescriptor`].
    pub fn build(self) -> Result<BlobDescriptor> {
        let pixel_moments = self.pixels.as_deref().map(Moments::from_pixels);

        let area = self
            .area
            .or(pixel_moments.map(|m| m.m00))
            .or(self.bounding_box.map(|b| b.area()))
            .ok_or_else(|| Error::InvalidBlob("blob needs an area".into()))?;
        if !area.is_finite() || area < 0.0 {
            return Err(Error::InvalidBlob(format!("invalid blob area {area}")));
        }

        let (x, y) = self
            .centroid
            .or(pixel_moments
                .filter(|m| m.m00 > 0.0)
                .map(|m| (m.m10 / m.m00, m.m01 / m.m00)))
            .or(self.bounding_box.map(|b| b.center()))
            .ok_or_else(|| Error::InvalidBlob("blob needs a position".into()))?;
        if !x.is_finite() || !y.is_finite() {
            return Err(Error::InvalidBlob(format!("invalid blob centroid ({x}, {y})")));
        }

        let mut blob = BlobDescriptor::new(self.label, x, y, area);
        if let Some(pixels) = &self.pixels {
            blob.bounding_box = pixel_bounds(pixels);
        }
        if let Some(bounding_box) = self.bounding_box {
            blob.bounding_box = bounding_box;
        }
        if let Some(e) = self.ellipse {
            blob.moments = Moments::from_ellipse(x, y, area, e.angle, e.major, e.minor);
        } else if let Some(moments) = pixel_moments {
            blob.moments = moments;
        }
        blob.contour = self.contour;
        Ok(blob)
    }
}

fn pixel_bounds(pixels: &[(i32, i32)]) -> Rect {
    let (mut x1, mut y1) = (i32::MAX, i32::MAX);
    let (mut x2, mut y2) = (i32::MIN, i32::MIN);
    for &(x, y) in pixels {
        x1 = x1.min(x);
        y1 = y1.min(y);
        x2 = x2.max(x);
        y2 = y2.max(y);
    }
    if pixels.is_empty() {
        return Rect::default();
    }
    Rect::from_tlbr(x1 as f64, y1 as f64, x2 as f64 + 1.0, y2 as f64 + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_blob_builder() {
        let blob = BlobBuilder::new()
            .label(4)
            .tlbr(10.0, 20.0, 50.0, 80.0)
            .area(1200.0)
            .build()
            .unwrap();

        assert_eq!(blob.label, 4);
        assert_eq!(blob.area, 1200.0);
        assert_eq!(blob.centroid, (30.0, 50.0));
        assert_eq!(blob.bounding_box, Rect::new(10.0, 20.0, 40.0, 60.0));
    }

    #[test]
    fn test_from_pixels() {
        let pixels: Vec<(i32, i32)> = (0..6).flat_map(|x| [(x, 3), (x, 4)]).collect();
        let blob = BlobBuilder::new().pixels(pixels).build().unwrap();
        assert_eq!(blob.area, 12.0);
        assert_relative_eq!(blob.centroid.0, 2.5);
        assert_relative_eq!(blob.centroid.1, 3.5);
        assert_eq!(blob.bounding_box, Rect::new(0.0, 3.0, 6.0, 2.0));
        assert_relative_eq!(blob.moments.angle(), 0.0);
    }

    #[test]
    fn test_ellipse_orientation() {
        let blob = BlobBuilder::new()
            .centroid(0.0, 0.0)
            .area(50.0)
            .ellipse(-60.0, 12.0, 4.0)
            .build()
            .unwrap();
        assert_relative_eq!(blob.moments.angle(), -60.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rejects_incomplete_or_invalid() {
        assert!(matches!(
            BlobBuilder::new().centroid(1.0, 1.0).build(),
            Err(Error::InvalidBlob(_))
        ));
        assert!(BlobBuilder::new().area(10.0).build().is_err());
        assert!(BlobBuilder::new().centroid(1.0, 1.0).area(-1.0).build().is_err());
        assert!(
            BlobBuilder::new()
                .centroid(f64::NAN, 1.0)
                .area(1.0)
                .build()
                .is_err()
        );
    }
}
