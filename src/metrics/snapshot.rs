use crate::metrics::metrics_impl::CarMetrics;

/// Point-in-time copy of CAR counters plus directory gauges.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CarMetricsSnapshot {
    pub hits: u64,
    pub contended_hits: u64, // misses on the shared tier that hit after the exclusive re-check
    pub misses: u64,
    pub loads: u64,

    pub evicted_entries: u64,
    pub slots_allocated: u64,

    pub recent_to_frequent_promotions: u64,
    pub ghost_recent_hits: u64,
    pub ghost_frequent_hits: u64,
    pub target_increases: u64,
    pub target_decreases: u64,
    pub hand_sweeps: u64,
    pub ghost_recent_trims: u64,
    pub ghost_frequent_trims: u64,

    pub cache_len: usize,
    pub capacity: usize,
    pub target_recent_size: usize,
    pub recent_len: usize,
    pub frequent_len: usize,
    pub ghost_recent_len: usize,
    pub ghost_frequent_len: usize,
}

impl CarMetricsSnapshot {
    /// Copies the counters out of `metrics`. Gauges are left at zero.
    pub fn from_counters(metrics: &CarMetrics) -> Self {
        Self {
            hits: metrics.hits.get(),
            misses: metrics.misses,
            loads: metrics.loads,
            evicted_entries: metrics.evicted_entries,
            slots_allocated: metrics.slots_allocated,
            recent_to_frequent_promotions: metrics.recent_to_frequent_promotions,
            ghost_recent_hits: metrics.ghost_recent_hits,
            ghost_frequent_hits: metrics.ghost_frequent_hits,
            target_increases: metrics.target_increases,
            target_decreases: metrics.target_decreases,
            hand_sweeps: metrics.hand_sweeps,
            ghost_recent_trims: metrics.ghost_recent_trims,
            ghost_frequent_trims: metrics.ghost_frequent_trims,
            ..Self::default()
        }
    }

    /// Fraction of lookups that were hits; `0.0` before any lookup.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::traits::{CoreMetricsReadRecorder, CoreMetricsRecorder};

    #[test]
    fn snapshot_copies_counters() {
        let mut metrics = CarMetrics::default();
        metrics.record_miss();
        metrics.record_load();
        (&metrics).record_hit();

        let snap = CarMetricsSnapshot::from_counters(&metrics);
        assert_eq!(snap.hits, 1);
        assert_eq!(snap.misses, 1);
        assert_eq!(snap.loads, 1);
        assert_eq!(snap.cache_len, 0);
        assert_eq!(snap.contended_hits, 0);
    }

    #[test]
    fn hit_ratio_handles_empty_and_mixed() {
        let mut snap = CarMetricsSnapshot::default();
        assert_eq!(snap.hit_ratio(), 0.0);
        snap.hits = 3;
        snap.misses = 1;
        assert!((snap.hit_ratio() - 0.75).abs() < f64::EPSILON);
    }
}
