//! Limit policies applied to request keys.
//!
//! A policy is compiled by an external collaborator (configuration loader,
//! route matcher, ...) and handed to the engine through a
//! [`PolicyLookup`](crate::application::ports::PolicyLookup). The engine only
//! ever reads it.

use std::fmt;
use std::sync::Arc;

/// Error returned when constructing an invalid policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PolicyError {
    /// Rate must be a positive, finite number of permits per second
    InvalidLimit(f64),
    /// Burst must be a positive, finite number of tokens
    InvalidBurst(f64),
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::InvalidLimit(limit) => {
                write!(f, "limit_per_second must be positive and finite, got {}", limit)
            }
            PolicyError::InvalidBurst(burst) => {
                write!(f, "burst_tokens must be positive and finite, got {}", burst)
            }
        }
    }
}

impl std::error::Error for PolicyError {}

/// An immutable rate limit policy.
///
/// # Example
/// ```
/// use fluxgate::Policy;
///
/// let policy = Policy::new("per-ip", 10.0, 20.0, 60).unwrap();
/// assert_eq!(policy.id(), "per-ip");
/// assert_eq!(policy.limit_per_second(), 10.0);
/// assert!(Policy::new("broken", 0.0, 1.0, 60).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Policy {
    id: Arc<str>,
    limit_per_second: f64,
    burst_tokens: f64,
    window_seconds: u64,
}

impl Policy {
    /// Create a validated policy.
    ///
    /// # Errors
    /// Returns `PolicyError` if the rate or burst is zero, negative, NaN or infinite.
    pub fn new(
        id: impl Into<Arc<str>>,
        limit_per_second: f64,
        burst_tokens: f64,
        window_seconds: u64,
    ) -> Result<Self, PolicyError> {
        if !limit_per_second.is_finite() || limit_per_second <= 0.0 {
            return Err(PolicyError::InvalidLimit(limit_per_second));
        }
        if !burst_tokens.is_finite() || burst_tokens <= 0.0 {
            return Err(PolicyError::InvalidBurst(burst_tokens));
        }
        Ok(Self {
            id: id.into(),
            limit_per_second,
            burst_tokens,
            window_seconds,
        })
    }

    /// Policy identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Nominal (cluster-wide) permits per second.
    pub fn limit_per_second(&self) -> f64 {
        self.limit_per_second
    }

    /// Number of requests admitted back-to-back from a cold state.
    pub fn burst_tokens(&self) -> f64 {
        self.burst_tokens
    }

    /// Accounting window the policy was authored against.
    pub fn window_seconds(&self) -> u64 {
        self.window_seconds
    }

    pub(crate) fn shared_id(&self) -> Arc<str> {
        Arc::clone(&self.id)
    }
}
