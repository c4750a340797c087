//! Adaptive example: shrinking local limits as cluster traffic grows.
//!
//! Gossip samples report cluster-wide QPS. As this instance's share of the
//! fleet's traffic drops, limiters created for new keys enforce a
//! proportionally smaller slice of the global quota.

use fluxgate::{Policy, RateLimitOrchestrator};

const SECOND: i64 = 1_000_000_000;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let orchestrator = RateLimitOrchestrator::builder()
        .build()
        .expect("valid config");

    // Cluster-wide quota: 1000 requests/second per key
    let policy = Policy::new("global", 1_000.0, 1.0, 60).expect("valid policy");
    let lookup = move |_key: u64| Some(policy.clone());

    println!("=== Adaptive Share Example ===\n");

    let mut now = 0;
    for (round, cluster_qps) in [100.0, 1_000.0, 10_000.0, 100_000.0].into_iter().enumerate() {
        // This instance serves roughly 100 qps
        for _ in 0..100 {
            orchestrator.check(u64::MAX, &lookup, now);
        }
        now += SECOND;
        for _ in 0..5 {
            orchestrator.ingest_cluster_estimate(cluster_qps, now);
        }

        let state = orchestrator.adaptive_state(now);
        for (name, value) in state.debug_view() {
            println!("  {:<10} {:>10.3}", name, value);
        }

        // A fresh key picks up the current share
        let key = round as u64;
        orchestrator.check(key, &lookup, now);
        let blocked = orchestrator.check(key, &lookup, now);
        println!(
            "  new key {} -> one permit every {:?}\n",
            key,
            blocked.retry_after()
        );
    }
}
