//! Mock implementations for testing.
//!
//! This module provides test doubles for the application ports and a tracing
//! layer capturing emitted events, enabling controlled testing of the
//! orchestrator without wall-clock time.

pub mod clock;
pub mod layer;
pub mod metrics;

pub use clock::MockClock;
pub use layer::{CapturedEvent, MockCaptureLayer};
pub use metrics::RecordingMetrics;
