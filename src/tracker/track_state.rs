/// Track lifecycle state, derived from a track's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackState {
    /// Matched fewer than `min_active` frames so far
    #[default]
    New,
    /// Matched for at least `min_active` frames without a miss
    Active,
    /// Missed one or more consecutive frames, not yet pruned
    Inactive,
    /// Missed more than `max_inactive` frames; removed from the registry
    Pruned,
}
