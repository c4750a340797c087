//! Basic example: per-key rate limiting with a fixed policy.
//!
//! Every client IP gets its own limiter allowing 3 requests per second with a
//! burst of 3. The fourth request in the same instant is rejected with a
//! retry-after hint.

use fluxgate::{Policy, RateLimitOrchestrator, RequestKey};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    let orchestrator = RateLimitOrchestrator::builder()
        .with_shard_capacity(1_024)
        .build()
        .expect("valid config");

    let policy = Policy::new("per-ip", 3.0, 3.0, 60).expect("valid policy");
    let lookup = move |_key: u64| Some(policy.clone());

    println!("=== Basic Rate Limiting Example ===\n");
    println!("Policy: 3 requests/second, burst of 3\n");

    for ip in ["203.0.113.1", "203.0.113.2"] {
        let key = RequestKey::builder().ip(ip).route("/search").build("demo-secret");
        println!("Client {} (key {}):", ip, key);

        for attempt in 1..=5 {
            let outcome = orchestrator.check(key.as_u64(), &lookup, 0);
            if outcome.is_allowed() {
                println!("  request {} allowed", attempt);
            } else {
                println!(
                    "  request {} blocked, retry after {:?}",
                    attempt,
                    outcome.retry_after()
                );
            }
        }
        println!();
    }

    let snapshot = orchestrator.stats().snapshot();
    println!("Total requests:   {}", snapshot.total_requests);
    println!("Blocked requests: {}", snapshot.blocked_requests);
    println!("Block rate:       {:.1}%", snapshot.block_rate() * 100.0);
}
