//! Planar distance and angle helpers. All angles are in degrees.

/// Length of the vector `(dx, dy)`.
#[inline]
pub fn distance(dx: f64, dy: f64) -> f64 {
    (dx * dx + dy * dy).sqrt()
}

/// Distance between two points.
#[inline]
pub fn distance_between(x0: f64, y0: f64, x1: f64, y1: f64) -> f64 {
    distance(x1 - x0, y1 - y0)
}

/// Heading of the vector `(dx, dy)`.
#[inline]
pub fn heading(dy: f64, dx: f64) -> f64 {
    dy.atan2(dx).to_degrees()
}

/// Signed difference `angle2 - angle1` wrapped into (-180, 180].
pub fn angle_difference(angle1: f64, angle2: f64) -> f64 {
    wrap(angle2 - angle1, 360.0)
}

/// Signed difference between two axis angles (no head/tail), wrapped into
/// (-90, 90].
pub fn axis_angle_difference(angle1: f64, angle2: f64) -> f64 {
    wrap(angle2 - angle1, 180.0)
}

fn wrap(mut dangle: f64, period: f64) -> f64 {
    let half = period / 2.0;
    if !dangle.is_finite() {
        return 0.0;
    }
    dangle %= period;
    if dangle <= -half {
        dangle += period;
    } else if dangle > half {
        dangle -= period;
    }
    dangle
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_distance() {
        assert_relative_eq!(distance(3.0, 4.0), 5.0);
        assert_relative_eq!(distance_between(1.0, 1.0, 4.0, 5.0), 5.0);
    }

    #[test]
    fn test_heading() {
        assert_relative_eq!(heading(1.0, 0.0), 90.0);
        assert_relative_eq!(heading(0.0, -1.0), 180.0);
    }

    #[test]
    fn test_angle_difference_wraps() {
        assert_relative_eq!(angle_difference(170.0, -170.0), 20.0);
        assert_relative_eq!(angle_difference(-170.0, 170.0), -20.0);
        assert_relative_eq!(angle_difference(0.0, 180.0), 180.0);
        assert_relative_eq!(angle_difference(10.0, 730.0), 0.0);
    }

    #[test]
    fn test_axis_angle_difference_wraps() {
        assert_relative_eq!(axis_angle_difference(80.0, -80.0), 20.0);
        assert_relative_eq!(axis_angle_difference(10.0, 20.0), 10.0);
        assert_relative_eq!(axis_angle_difference(0.0, 90.0), 90.0);
    }
}
