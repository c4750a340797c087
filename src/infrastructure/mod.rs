//! Infrastructure layer - concrete data structures and adapters.
//!
//! This layer provides:
//! - The hot-key cache and both frequency sketches
//! - Heavy-hitter tracking and heatmap reporting
//! - The in-memory policy registry
//! - Clock abstraction (system time vs mock)
//! - The orchestrator builder

pub mod builder;
pub mod cache;
pub mod clock;
pub mod heatmap;
pub mod heavy_hitters;
pub mod registry;
pub mod sketch;

/// Mock implementations for testing.
///
/// This module is only available when the `test-helpers` feature is enabled,
/// or during test builds. It provides controllable test doubles for the
/// application ports.
///
/// To use these mocks in integration tests, add to your `Cargo.toml`:
/// ```toml
/// [dev-dependencies]
/// fluxgate = { version = "*", features = ["test-helpers"] }
/// ```
#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;
