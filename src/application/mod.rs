//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages runtime state:
//! - Traffic estimator (adaptive local/cluster share)
//! - Window rotator (periodic sketch resets)
//! - Stats (admission counters)
//! - Rate limit orchestrator (per-request decision making)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) for policy resolution,
//! metrics export and time. Callers and infrastructure adapters implement
//! them.

pub mod estimator;
pub mod limiter;
pub mod ports;
pub mod rotator;
pub mod stats;
