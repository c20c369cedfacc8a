//! Blob descriptors produced by an external connected-component step.

use nalgebra::Matrix2;

use crate::tracker::geometry;
use crate::tracker::rect::Rect;

/// Spatial and central image moments of a blob, as reported by the
/// connected-component extraction (pixel units, not normalised).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub mu20: f64,
    pub mu11: f64,
    pub mu02: f64,
}

impl Moments {
    /// Compute moments from the pixel coordinates of a blob.
    pub fn from_pixels(pixels: &[(i32, i32)]) -> Self {
        let m00 = pixels.len() as f64;
        if pixels.is_empty() {
            return Self::default();
        }
        let m10: f64 = pixels.iter().map(|&(x, _)| x as f64).sum();
        let m01: f64 = pixels.iter().map(|&(_, y)| y as f64).sum();
        let (cx, cy) = (m10 / m00, m01 / m00);
        let mut moments = Self {
            m00,
            m10,
            m01,
            ..Self::default()
        };
        for &(x, y) in pixels {
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            moments.mu20 += dx * dx;
            moments.mu11 += dx * dy;
            moments.mu02 += dy * dy;
        }
        moments
    }

    /// Moments of a solid ellipse centred on `(cx, cy)` with full axis lengths
    /// `major`/`minor` and the major axis at `angle` degrees.
    pub fn from_ellipse(cx: f64, cy: f64, area: f64, angle: f64, major: f64, minor: f64) -> Self {
        let (sin, cos) = angle.to_radians().sin_cos();
        let var_major = (major / 4.0).powi(2);
        let var_minor = (minor / 4.0).powi(2);
        Self {
            m00: area,
            m10: cx * area,
            m01: cy * area,
            mu20: (var_major * cos * cos + var_minor * sin * sin) * area,
            mu11: (var_major - var_minor) * sin * cos * area,
            mu02: (var_major * sin * sin + var_minor * cos * cos) * area,
        }
    }

    /// Orientation of the major axis in degrees, in (-90, 90].
    pub fn angle(&self) -> f64 {
        if self.mu11 == 0.0 && self.mu20 == self.mu02 {
            return 0.0;
        }
        0.5 * geometry::heading(2.0 * self.mu11, self.mu20 - self.mu02)
    }

    /// Full major and minor axis lengths of the equivalent ellipse.
    pub fn axis_lengths(&self) -> (f64, f64) {
        if self.m00 <= 0.0 {
            return (0.0, 0.0);
        }
        let covariance = Matrix2::new(self.mu20, self.mu11, self.mu11, self.mu02) / self.m00;
        let eigenvalues = covariance.symmetric_eigenvalues();
        let (a, b) = (eigenvalues[0].max(0.0), eigenvalues[1].max(0.0));
        let (high, low) = if a >= b { (a, b) } else { (b, a) };
        (4.0 * high.sqrt(), 4.0 * low.sqrt())
    }
}

/// One blob of a binary mask, as supplied per frame.
#[derive(Debug, Clone, Default)]
pub struct BlobDescriptor {
    /// Connected-component label
    pub label: u32,
    /// Pixel count
    pub area: f64,
    /// Centroid (x, y)
    pub centroid: (f64, f64),
    pub bounding_box: Rect,
    pub moments: Moments,
    /// Outer contour, if the extraction step produced one
    pub contour: Option<Vec<(i32, i32)>>,
}

impl BlobDescriptor {
    /// Blob without shape information: moments describe a disc of the given
    /// area.
    pub fn new(label: u32, x: f64, y: f64, area: f64) -> Self {
        let diameter = 2.0 * (area.max(0.0) / std::f64::consts::PI).sqrt();
        Self {
            label,
            area,
            centroid: (x, y),
            bounding_box: Rect::from_center(x, y, diameter, diameter),
            moments: Moments::from_ellipse(x, y, area, 0.0, diameter, diameter),
            contour: None,
        }
    }
}

/// Dimensions of the frame the blobs were extracted from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total pixel count.
    pub fn pixels(&self) -> f64 {
        self.width as f64 * self.height as f64
    }
}
