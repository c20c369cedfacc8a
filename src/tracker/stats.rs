/// Running sum over a count.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Averager {
    sum: f64,
    count: u32,
}

impl Averager {
    /// Clear the sum and preset the count.
    pub fn reset(&mut self, count: u32) {
        self.sum = 0.0;
        self.count = count;
    }

    pub fn add_value(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// Count a hit without adding to the total.
    pub fn add_one(&mut self) {
        self.sum += 1.0;
    }

    /// Count an attempt.
    pub fn add_total(&mut self) {
        self.count += 1;
    }

    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Per-frame tracking quality figures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackingStats {
    /// Share of tracks matched in the last frame
    pub track_matching: Averager,
    /// Mean distance of the matched tracks
    pub track_distance: Averager,
    /// Mean active count of active tracks
    pub track_lifetime: Averager,
    /// Share of moving tracks that hit an existing path node
    pub path_matching: Averager,
    pub active_tracks: usize,
}

impl TrackingStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
