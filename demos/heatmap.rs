//! Heatmap example: periodic reporting of the hottest keys.
//!
//! Run with: cargo run --example heatmap --features async

use fluxgate::{Policy, RateLimitOrchestrator, ReportConfig};
use std::time::Duration;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt().init();

    let orchestrator = RateLimitOrchestrator::builder()
        .with_heavy_keeper(256, 0.9)
        .build()
        .expect("valid config");

    let policy = Policy::new("api", 10_000.0, 10_000.0, 60).expect("valid policy");
    let lookup = move |_key: u64| Some(policy.clone());

    // Skewed traffic: key k receives roughly 1/k of the requests
    for i in 1..=2_000u64 {
        for key in 1..=8u64 {
            if i % key == 0 {
                orchestrator.check(key * 0x1000, &lookup, 0);
            }
        }
    }

    println!("=== Heatmap Example ===\n");
    print!("{}", orchestrator.heatmap_reporter().render_top_keys());

    let config = ReportConfig::new(Duration::from_millis(200))
        .expect("valid interval")
        .with_max_entries(3);
    let reporter = fluxgate::HeatmapReporter::with_config(
        std::sync::Arc::clone(orchestrator.heavy_hitters()),
        config,
    );

    let handle = reporter.start_logging();
    tokio::time::sleep(Duration::from_millis(500)).await;
    handle.abort();
}
