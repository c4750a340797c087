//! Domain layer - pure values and rate arithmetic with no I/O.
//!
//! This layer contains the core concepts and invariants of the limiting engine:
//! - Limit policies and their validation
//! - Request key hashing
//! - The per-key GCRA limiter
//! - Adaptive share computation and limit scaling
//!
//! All types in this layer are self-contained and easily testable.

pub mod adaptive;
pub mod gcra;
pub mod key;
pub mod outcome;
pub mod policy;
