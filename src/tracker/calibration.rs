//! Online self-calibration of area and movement thresholds.
//!
//! Area bounds come from an Otsu split of the blob area histogram; the movement
//! limit from the median per-frame displacement of the tracks. Both are
//! computed once, after enough frames and samples have been seen, and never
//! change afterwards.

use crate::tracker::cluster::{AreaAdmission, MIN_PIXELS};
use crate::tracker::config::CalibrationConfig;

/// Movement limit used while movement calibration is pending.
pub const PROVISIONAL_MAX_MOVE: f64 = 1000.0;
/// Calibrated movement limit in multiples of the median displacement.
const MOVE_MEDIAN_FACTOR: f64 = 4.0;
/// Quantile the histogram range is cut at.
const HISTOGRAM_QUANTILE: f64 = 0.95;

/// Calibrated bound.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParamRange {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Samples the range was derived from
    pub n: usize,
}

impl ParamRange {
    pub fn new(min: f64, max: f64, mean: f64, n: usize) -> Self {
        Self { min, max, mean, n }
    }
}

impl std::fmt::Display for ParamRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1} - {:.1} (mean {:.1})", self.min, self.max, self.mean)
    }
}

/// Sample statistics with an automatically sized histogram.
#[derive(Debug, Clone, Default)]
pub struct StatData {
    data: Vec<f64>,
    max_bins: usize,
    pub bins: Vec<u32>,
    pub nbins: usize,
    /// Upper end of the histogram range
    pub max_range: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub otsu: f64,
    pub peak: f64,
    pub max_bin_count: u32,
}

impl StatData {
    pub fn new(max_bins: usize) -> Self {
        Self {
            max_bins: max_bins.max(1),
            ..Self::default()
        }
    }

    pub fn add(&mut self, x: f64) {
        self.data.push(x);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn reset(&mut self) {
        self.data.clear();
        self.bins.clear();
        self.nbins = 0;
    }

    /// Recompute all statistics; `false` without samples.
    pub fn calc_stats(&mut self) -> bool {
        if self.data.is_empty() {
            return false;
        }
        self.data.sort_by(f64::total_cmp);
        let n = self.data.len() as f64;
        self.mean = self.data.iter().sum::<f64>() / n;
        self.median = self.partition(0.5);
        self.std_dev = (self.data.iter().map(|x| (x - self.mean).powi(2)).sum::<f64>() / n).sqrt();
        self.calc_histogram();
        self.max_bin_count = self.bins.iter().copied().max().unwrap_or(0);
        self.calc_otsu();
        self.calc_peak();
        true
    }

    /// Value at quantile `p` of the sorted samples.
    fn partition(&self, p: f64) -> f64 {
        match self.data.len() {
            0 => 0.0,
            n => self.data[((n as f64 * p) as usize).min(n - 1)],
        }
    }

    fn calc_histogram(&mut self) {
        let n = self.data.len() as f64;
        self.max_range = self.partition(HISTOGRAM_QUANTILE);
        self.bins = vec![0; self.max_bins];
        if self.max_range == 0.0 {
            self.nbins = 0;
            self.max_range = 1.0;
            return;
        }

        // Freedman-Diaconis bin width
        let iqr = self.partition(0.75) - self.partition(0.25);
        let bin_size = 2.0 * iqr / n.powf(1.0 / 3.0);
        self.nbins = if bin_size > 0.0 {
            ((self.max_range / bin_size).ceil() as usize).clamp(1, self.max_bins)
        } else {
            self.max_bins
        };

        for &x in &self.data {
            let i = ((x / self.max_range * self.nbins as f64).max(0.0) as usize).min(self.nbins - 1);
            self.bins[i] += 1;
        }
    }

    fn calc_otsu(&mut self) {
        self.otsu = 0.0;
        // the last bin collects the tail beyond the range and is left out
        let used = self.nbins.saturating_sub(1);
        let total: f64 = self.bins[..used].iter().map(|&b| b as f64).sum();
        let sum1: f64 = self.bins[..used]
            .iter()
            .enumerate()
            .map(|(i, &b)| i as f64 * b as f64)
            .sum();

        let (mut sum_b, mut w_b, mut maximum) = (0.0, 0.0, 0.0);
        for i in 0..used {
            let count = self.bins[i] as f64;
            w_b += count;
            let w_f = total - w_b;
            if w_b == 0.0 || w_f == 0.0 {
                continue;
            }
            sum_b += i as f64 * count;
            let m_f = (sum1 - sum_b) / w_f;
            let between = w_b * w_f * (sum_b / w_b - m_f).powi(2);
            if between >= maximum {
                self.otsu = self.bin_value(i);
                maximum = between;
            }
        }
    }

    fn calc_peak(&mut self) {
        if self.nbins == 0 {
            self.peak = self.median;
            return;
        }
        let lowest = (self.otsu / self.max_range * self.nbins as f64) as usize;
        let middle = self.nbins / 2;
        let top = (self.nbins - 1).max(1);

        let mut max_count = self.bins[middle];
        self.peak = self.bin_value(middle);
        for i in (lowest + 1..top).rev() {
            if i < self.nbins && self.bins[i] > max_count {
                max_count = self.bins[i];
                self.peak = self.bin_value(i);
            }
        }
    }

    fn bin_value(&self, i: usize) -> f64 {
        i as f64 / self.nbins as f64 * self.max_range
    }

    /// Object range: from the Otsu split to the peak mirrored around it.
    pub fn param_range(&self) -> ParamRange {
        let max = self.peak + (self.peak - self.otsu);
        ParamRange::new(self.otsu, max, self.peak, self.data.len())
    }
}

/// Calibration progress of one parameter.
#[derive(Debug, Clone, Default)]
struct Training {
    stats: StatData,
    cycles: u32,
    finalized: bool,
}

impl Training {
    fn new(max_bins: usize) -> Self {
        Self {
            stats: StatData::new(max_bins),
            ..Self::default()
        }
    }

    /// Add one frame of samples; `true` once enough were collected.
    fn observe(&mut self, samples: impl IntoIterator<Item = f64>, config: &CalibrationConfig) -> bool {
        let before = self.stats.len();
        for x in samples {
            self.stats.add(x);
        }
        if self.stats.len() > before {
            self.cycles += 1;
        }
        self.cycles >= config.training_cycles && self.stats.len() >= config.training_data_points
    }
}

/// Derives the area range and maximum movement from observed data.
#[derive(Debug, Clone)]
pub struct Calibrator {
    config: CalibrationConfig,
    area_training: Training,
    move_training: Training,
    area: ParamRange,
    max_move: ParamRange,
}

impl Calibrator {
    /// `area` and `max_move`, when given, are taken as final.
    pub fn new(config: CalibrationConfig, area: Option<(f64, f64)>, max_move: Option<f64>) -> Self {
        let mut calibrator = Self {
            area_training: Training::new(config.histogram_bins),
            move_training: Training::new(config.histogram_bins),
            config,
            area: ParamRange::default(),
            max_move: ParamRange::default(),
        };
        if let Some((min, max)) = area {
            calibrator.area = ParamRange::new(min, max, (min + max) / 2.0, 0);
            calibrator.area_training.finalized = true;
        }
        if let Some(max_move) = max_move {
            calibrator.max_move = ParamRange::new(0.0, max_move, max_move / 2.0, 0);
            calibrator.move_training.finalized = true;
        }
        calibrator
    }

    pub fn is_area_finalized(&self) -> bool {
        self.area_training.finalized
    }

    pub fn is_move_finalized(&self) -> bool {
        self.move_training.finalized
    }

    pub fn area(&self) -> Option<ParamRange> {
        self.is_area_finalized().then_some(self.area)
    }

    pub fn max_move_range(&self) -> Option<ParamRange> {
        self.is_move_finalized().then_some(self.max_move)
    }

    /// Largest single-object area, unlimited while pending.
    pub fn max_area(&self) -> f64 {
        if self.is_area_finalized() {
            self.area.max
        } else {
            f64::INFINITY
        }
    }

    /// Movement limit in effect.
    pub fn max_move(&self) -> f64 {
        if self.is_move_finalized() {
            self.max_move.max
        } else {
            PROVISIONAL_MAX_MOVE
        }
    }

    pub fn admission(&self) -> AreaAdmission {
        if self.is_area_finalized() {
            AreaAdmission::Calibrated {
                min: self.area.min,
                max: self.area.max,
            }
        } else {
            AreaAdmission::Provisional
        }
    }

    /// Feed the raw blob areas of one frame. Returns `true` when this call
    /// finalized the area range.
    pub fn observe_areas(&mut self, areas: impl IntoIterator<Item = f64>) -> bool {
        if self.is_area_finalized() {
            return false;
        }
        let ready = self
            .area_training
            .observe(areas.into_iter().filter(|&a| a >= MIN_PIXELS), &self.config);
        log::debug!(
            "area calibration: {} samples over {} frames",
            self.area_training.stats.len(),
            self.area_training.cycles
        );
        if !ready || !self.area_training.stats.calc_stats() {
            return false;
        }
        self.area = self.area_training.stats.param_range();
        self.area_training.finalized = true;
        log::info!("area calibrated: {}", self.area);
        true
    }

    /// Feed the nonzero track displacements of one frame. Only collects once
    /// the area range is final. Returns `true` when this call finalized the
    /// movement limit.
    pub fn observe_displacements(&mut self, distances: impl IntoIterator<Item = f64>) -> bool {
        if !self.is_area_finalized() || self.is_move_finalized() {
            return false;
        }
        let ready = self
            .move_training
            .observe(distances.into_iter().filter(|&d| d > 0.0), &self.config);
        if !ready || !self.move_training.stats.calc_stats() {
            return false;
        }
        let stats = &self.move_training.stats;
        self.max_move = ParamRange::new(
            0.0,
            MOVE_MEDIAN_FACTOR * stats.median,
            stats.median,
            stats.len(),
        );
        self.move_training.finalized = true;
        log::info!("max move calibrated: {:.2}", self.max_move.max);
        true
    }

    /// Statistics collected for the area range.
    pub fn area_stats(&self) -> &StatData {
        &self.area_training.stats
    }

    pub fn move_stats(&self) -> &StatData {
        &self.move_training.stats
    }
}
