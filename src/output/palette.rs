//! Color palettes for drawing tracking results.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::tracker::cluster::MERGED_LABEL;

/// Entries per palette lookup table.
pub const SCALE_LENGTH: usize = 0x1000;

/// Default exponent range of the logarithmic color scale.
const DEFAULT_POWER: f64 = 6.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn from_unit(f: f64, r: f64, g: f64, b: f64) -> Self {
        let channel = |v: f64| (f * v * 255.0) as u8;
        Self::new(channel(r), channel(g), channel(b))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    /// White to black
    #[default]
    Grayscale,
    /// White, yellow, red, blue, black
    Heat,
    /// Red, yellow, green, cyan, blue, purple, black
    Rainbow,
}

static GRAY_TABLE: OnceLock<Vec<Rgb>> = OnceLock::new();
static HEAT_TABLE: OnceLock<Vec<Rgb>> = OnceLock::new();
static RAINBOW_TABLE: OnceLock<Vec<Rgb>> = OnceLock::new();

fn build_table(color: fn(f64) -> Rgb) -> Vec<Rgb> {
    (0..SCALE_LENGTH)
        .map(|i| color(i as f64 / SCALE_LENGTH as f64))
        .collect()
}

impl Palette {
    fn table(&self) -> &'static [Rgb] {
        match self {
            Palette::Grayscale => GRAY_TABLE.get_or_init(|| build_table(gray_scale)),
            Palette::Heat => HEAT_TABLE.get_or_init(|| build_table(heat_scale)),
            Palette::Rainbow => RAINBOW_TABLE.get_or_init(|| build_table(rainbow_scale)),
        }
    }

    /// Color at `scale` in [0, 1]; out-of-range values clamp to the ends.
    pub fn color(&self, scale: f64) -> Rgb {
        let table = self.table();
        let index = if scale >= 1.0 {
            SCALE_LENGTH - 1
        } else if scale > 0.0 {
            (scale * SCALE_LENGTH as f64) as usize
        } else {
            0
        };
        table[index]
    }
}

fn gray_scale(scale: f64) -> Rgb {
    let v = ((1.0 - scale) * 255.0) as u8;
    Rgb::new(v, v, v)
}

fn heat_scale(scale: f64) -> Rgb {
    let segment = scale * 4.0;
    let t = segment.fract();
    match segment as u32 {
        0 => Rgb::from_unit(1.0, 1.0, 1.0, 1.0 - t),
        1 => Rgb::from_unit(1.0, 1.0, 1.0 - t, 0.0),
        2 => Rgb::from_unit(1.0, 1.0 - t, 0.0, t),
        3 => Rgb::from_unit(1.0 - t, 0.0, 0.0, 1.0),
        _ => Rgb::default(),
    }
}

fn rainbow_scale(scale: f64) -> Rgb {
    let segment = scale * 6.0;
    let t = segment.fract();
    match segment as u32 {
        0 => Rgb::from_unit(1.0, 1.0 - t, 1.0, 0.0),
        1 => Rgb::from_unit(1.0, 0.0, 1.0, t),
        2 => Rgb::from_unit(1.0, 0.0, 1.0 - t, 1.0),
        3 => Rgb::from_unit(1.0, t, 0.0, 1.0),
        4 => Rgb::from_unit(1.0, 1.0, 0.0, 1.0 - t),
        5 => Rgb::from_unit(1.0 - t, 1.0, t, 0.0),
        _ => Rgb::default(),
    }
}

/// Map a relative value in (0, 1] onto [0, 1] logarithmically: 1 maps to 0,
/// `10^-power` and below to 1. A zero `power` uses the default range.
pub fn log_scale(value: f64, power: f64) -> f64 {
    let power = if power == 0.0 { DEFAULT_POWER } else { power };
    let scale = -value.log10() / power;
    if scale.is_nan() {
        return 1.0;
    }
    scale.clamp(0.0, 1.0)
}

/// One of 27 distinct colors per label; grey for merged clusters.
pub fn label_color(label: u32) -> Rgb {
    if label == MERGED_LABEL {
        return Rgb::new(127, 127, 127);
    }
    let index = label % 27;
    let level = |i: u32| (0.25 * (i + 1) as f64 * 255.0) as u8;
    Rgb::new(level(index % 3), level((index / 3) % 3), level((index / 9) % 3))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grayscale_ends() {
        assert_eq!(Palette::Grayscale.color(0.0), Rgb::new(255, 255, 255));
        assert_eq!(Palette::Grayscale.color(-1.0), Rgb::new(255, 255, 255));
        assert_eq!(Palette::Grayscale.color(2.0), Rgb::new(0, 0, 0));
    }

    #[test]
    fn test_heat_segments() {
        assert_eq!(Palette::Heat.color(0.0), Rgb::new(255, 255, 255));
        assert_eq!(Palette::Heat.color(0.25), Rgb::new(255, 255, 0));
        assert_eq!(Palette::Heat.color(0.5), Rgb::new(255, 0, 0));
        assert_eq!(Palette::Heat.color(0.75), Rgb::new(0, 0, 255));
        let end = Palette::Heat.color(1.0);
        assert!(end.b < 2 && end.r == 0);
    }

    #[test]
    fn test_rainbow_starts_red_yellow() {
        assert_eq!(Palette::Rainbow.color(0.0), Rgb::new(255, 255, 0));
        assert_eq!(Palette::Rainbow.color(0.5), Rgb::new(0, 0, 255));
    }

    #[test]
    fn test_tables_are_shared() {
        let a = Palette::Heat.table().as_ptr();
        let b = Palette::Heat.table().as_ptr();
        assert_eq!(a, b);
        assert_eq!(Palette::Heat.table().len(), SCALE_LENGTH);
    }

    #[test]
    fn test_log_scale() {
        assert_eq!(log_scale(1.0, 6.0), 0.0);
        assert!((log_scale(0.001, 6.0) - 0.5).abs() < 1e-12);
        assert_eq!(log_scale(1e-9, 6.0), 1.0);
        assert_eq!(log_scale(0.0, 0.0), 1.0);
        assert_eq!(log_scale(5.0, 6.0), 0.0);
    }

    #[test]
    fn test_label_colors() {
        assert_eq!(label_color(0), Rgb::new(63, 63, 63));
        assert_eq!(label_color(27), label_color(0));
        assert_ne!(label_color(1), label_color(0));
        assert_eq!(label_color(MERGED_LABEL), Rgb::new(127, 127, 127));
    }
}
