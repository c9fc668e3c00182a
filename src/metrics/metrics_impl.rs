use crate::metrics::cell::MetricsCell;
use crate::metrics::traits::{CarMetricsRecorder, CoreMetricsReadRecorder, CoreMetricsRecorder};

// ---------------------------------------------------------------------------
// CarMetrics
// ---------------------------------------------------------------------------

/// Counters owned by a [`CarCore`](crate::policy::car::CarCore).
///
/// `hits` is a [`MetricsCell`] so it can be bumped from the shared lock tier;
/// every other field is only written under exclusive access.
#[derive(Debug, Default)]
pub struct CarMetrics {
    pub hits: MetricsCell,
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
}

impl CoreMetricsRecorder for CarMetrics {
    fn record_miss(&mut self) {
        self.misses += 1;
    }
    fn record_load(&mut self) {
        self.loads += 1;
    }
    fn record_evicted_entry(&mut self) {
        self.evicted_entries += 1;
    }
    fn record_slot_allocated(&mut self) {
        self.slots_allocated += 1;
    }
}

impl CoreMetricsReadRecorder for &CarMetrics {
    fn record_hit(&self) {
        self.hits.incr();
    }
}

impl CarMetricsRecorder for CarMetrics {
    fn record_recent_to_frequent_promotion(&mut self) {
        self.recent_to_frequent_promotions += 1;
    }
    fn record_ghost_recent_hit(&mut self) {
        self.ghost_recent_hits += 1;
    }
    fn record_ghost_frequent_hit(&mut self) {
        self.ghost_frequent_hits += 1;
    }
    fn record_target_increase(&mut self) {
        self.target_increases += 1;
    }
    fn record_target_decrease(&mut self) {
        self.target_decreases += 1;
    }
    fn record_hand_sweep(&mut self) {
        self.hand_sweeps += 1;
    }
    fn record_ghost_recent_trim(&mut self) {
        self.ghost_recent_trims += 1;
    }
    fn record_ghost_frequent_trim(&mut self) {
        self.ghost_frequent_trims += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn car_metrics_record_write_path() {
        let mut m = CarMetrics::default();
        m.record_miss();
        m.record_load();
        m.record_evicted_entry();
        m.record_slot_allocated();
        m.record_slot_allocated();
        m.record_recent_to_frequent_promotion();
        m.record_ghost_recent_hit();
        m.record_ghost_frequent_hit();
        m.record_target_increase();
        m.record_target_decrease();
        m.record_hand_sweep();
        m.record_ghost_recent_trim();
        m.record_ghost_frequent_trim();

        assert_eq!(m.misses, 1);
        assert_eq!(m.loads, 1);
        assert_eq!(m.evicted_entries, 1);
        assert_eq!(m.slots_allocated, 2);
        assert_eq!(m.recent_to_frequent_promotions, 1);
        assert_eq!(m.ghost_recent_hits, 1);
        assert_eq!(m.ghost_frequent_hits, 1);
        assert_eq!(m.target_increases, 1);
        assert_eq!(m.target_decreases, 1);
        assert_eq!(m.hand_sweeps, 1);
        assert_eq!(m.ghost_recent_trims, 1);
        assert_eq!(m.ghost_frequent_trims, 1);
    }

    #[test]
    fn car_metrics_hit_through_shared_ref() {
        let m = CarMetrics::default();
        (&m).record_hit();
        (&m).record_hit();
        assert_eq!(m.hits.get(), 2);
    }
}
