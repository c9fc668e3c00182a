//! Example demonstrating the CAR (Clock with Adaptive Replacement) cache.
//!
//! Loads the four strings from a small "backing store" through a capacity-3
//! cache and shows the loader and replacement callbacks firing.
//!
//! Run with: cargo run --example car_demo
//! For engine traces: RUST_LOG=carcache=debug cargo run --example car_demo

#[cfg(feature = "metrics")]
use carcache::metrics::exporter::PrometheusTextExporter;
#[cfg(feature = "metrics")]
use carcache::metrics::traits::MetricsExporter;
use carcache::policy::car::CarCache;
use carcache::slot::SlotId;
use tracing_subscriber::EnvFilter;

const TEXT: [&str; 4] = [
    "Clock with adaptive replacement (CAR)",
    "Golang",
    "Hello World",
    "Cache replacement policy",
];

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    println!("=== CAR (Clock with Adaptive Replacement) Cache Example ===\n");

    let cache: CarCache<usize, String> = CarCache::builder(TEXT.len() - 1)
        .loader(|key: &usize, slot: SlotId| {
            println!("  load     key {} -> slot {}", key, slot);
            TEXT[*key].to_string()
        })
        .replacement_notifier(|key: &usize, value: Option<String>, slot: SlotId| {
            println!(
                "  replace  key {} leaves slot {} ({:?})",
                key,
                slot,
                value.unwrap_or_default()
            );
        })
        .build();

    println!("Created CAR cache: capacity={}\n", cache.capacity());

    println!("Filling the cache with keys 0, 1, 2:");
    for key in 0..3 {
        println!("  -> {:?}", cache.load(&key).unwrap_or_default());
    }

    println!("\nRe-reading key 1 (hit, sets its reference bit):");
    println!("  -> {:?}", cache.load(&1).unwrap_or_default());

    println!("\nLoading key 3 (cache is full, one entry must go):");
    println!("  -> {:?}", cache.load(&3).unwrap_or_default());

    println!("\n=== Directory ===\n");
    println!("  recent (T1):         {}", cache.recent_len());
    println!("  frequent (T2):       {}", cache.frequent_len());
    println!("  ghost recent (B1):   {}", cache.ghost_recent_len());
    println!("  ghost frequent (B2): {}", cache.ghost_frequent_len());
    println!("  target recent (p):   {}", cache.target_recent_size());
    for key in 0..TEXT.len() {
        println!("  key {} -> {:?}", key, cache.residency(&key));
    }

    #[cfg(feature = "metrics")]
    {
        let snap = cache.metrics();
        println!(
            "\nhits={} misses={} evictions={} hit_ratio={:.2}",
            snap.hits,
            snap.misses,
            snap.evicted_entries,
            snap.hit_ratio()
        );

        println!("\n=== Prometheus export ===\n");
        let exporter = PrometheusTextExporter::new("car_demo", std::io::stdout());
        exporter.export(&snap);
    }

    match cache.check_invariants() {
        Ok(()) => println!("\nDirectory invariants hold."),
        Err(e) => println!("\nInvariant violated: {}", e),
    }
}
