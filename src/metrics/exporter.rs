use std::io::Write;
use std::sync::Mutex;

use crate::metrics::snapshot::CarMetricsSnapshot;
use crate::metrics::traits::MetricsExporter;

/// Prometheus text exporter for cache metrics snapshots.
///
/// This exporter writes in the Prometheus text exposition format so it can be
/// scraped by Prometheus or forwarded to an OpenTelemetry collector.
///
/// # Example
///
/// ```
/// use carcache::metrics::exporter::PrometheusTextExporter;
/// use carcache::metrics::traits::MetricsExporter;
/// use carcache::policy::car::CarCache;
/// use carcache::slot::SlotId;
///
/// let cache: CarCache<u32, u32> = CarCache::builder(4)
///     .loader(|key: &u32, _slot: SlotId| key * 2)
///     .build();
/// cache.load(&1);
///
/// let exporter = PrometheusTextExporter::new("car", Vec::new());
/// exporter.export(&cache.metrics());
/// let text = String::from_utf8(exporter.into_inner()).unwrap();
/// assert!(text.contains("car_misses_total 1"));
/// ```
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send + Sync> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send + Sync> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the exporter and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_metric(&self, kind: &str, name: &str, value: u64) {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let _ = writeln!(writer, "# TYPE {} {}", name, kind);
        let _ = writeln!(writer, "{} {}", name, value);
    }

    fn write_counter(&self, name: &str, value: u64) {
        self.write_metric("counter", name, value);
    }

    fn write_gauge(&self, name: &str, value: u64) {
        self.write_metric("gauge", name, value);
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

impl<W: Write + Send + Sync> MetricsExporter<CarMetricsSnapshot> for PrometheusTextExporter<W> {
    fn export(&self, snapshot: &CarMetricsSnapshot) {
        self.write_counter(&self.metric_name("hits_total"), snapshot.hits);
        self.write_counter(
            &self.metric_name("contended_hits_total"),
            snapshot.contended_hits,
        );
        self.write_counter(&self.metric_name("misses_total"), snapshot.misses);
        self.write_counter(&self.metric_name("loads_total"), snapshot.loads);
        self.write_counter(
            &self.metric_name("evicted_entries_total"),
            snapshot.evicted_entries,
        );
        self.write_counter(
            &self.metric_name("slots_allocated_total"),
            snapshot.slots_allocated,
        );
        self.write_counter(
            &self.metric_name("recent_to_frequent_promotions_total"),
            snapshot.recent_to_frequent_promotions,
        );
        self.write_counter(
            &self.metric_name("ghost_recent_hits_total"),
            snapshot.ghost_recent_hits,
        );
        self.write_counter(
            &self.metric_name("ghost_frequent_hits_total"),
            snapshot.ghost_frequent_hits,
        );
        self.write_counter(
            &self.metric_name("target_increases_total"),
            snapshot.target_increases,
        );
        self.write_counter(
            &self.metric_name("target_decreases_total"),
            snapshot.target_decreases,
        );
        self.write_counter(&self.metric_name("hand_sweeps_total"), snapshot.hand_sweeps);
        self.write_counter(
            &self.metric_name("ghost_recent_trims_total"),
            snapshot.ghost_recent_trims,
        );
        self.write_counter(
            &self.metric_name("ghost_frequent_trims_total"),
            snapshot.ghost_frequent_trims,
        );
        self.write_gauge(&self.metric_name("cache_len"), snapshot.cache_len as u64);
        self.write_gauge(&self.metric_name("capacity"), snapshot.capacity as u64);
        self.write_gauge(
            &self.metric_name("target_recent_size"),
            snapshot.target_recent_size as u64,
        );
        self.write_gauge(&self.metric_name("recent_len"), snapshot.recent_len as u64);
        self.write_gauge(
            &self.metric_name("frequent_len"),
            snapshot.frequent_len as u64,
        );
        self.write_gauge(
            &self.metric_name("ghost_recent_len"),
            snapshot.ghost_recent_len as u64,
        );
        self.write_gauge(
            &self.metric_name("ghost_frequent_len"),
            snapshot.ghost_frequent_len as u64,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(prefix: &str, snapshot: &CarMetricsSnapshot) -> String {
        let exporter = PrometheusTextExporter::new(prefix, Vec::new());
        exporter.export(snapshot);
        String::from_utf8(exporter.into_inner()).unwrap()
    }

    #[test]
    fn exports_counters_and_gauges_with_prefix() {
        let snapshot = CarMetricsSnapshot {
            hits: 7,
            misses: 3,
            target_recent_size: 2,
            capacity: 4,
            ..CarMetricsSnapshot::default()
        };
        let text = render("car", &snapshot);

        assert!(text.contains("# TYPE car_hits_total counter\ncar_hits_total 7\n"));
        assert!(text.contains("car_misses_total 3\n"));
        assert!(text.contains("# TYPE car_target_recent_size gauge\ncar_target_recent_size 2\n"));
        assert!(text.contains("car_capacity 4\n"));
    }

    #[test]
    fn empty_prefix_uses_bare_names() {
        let text = render("", &CarMetricsSnapshot::default());
        assert!(text.starts_with("# TYPE hits_total counter\nhits_total 0\n"));
        assert!(!text.contains("_hits_total"));
    }
}
