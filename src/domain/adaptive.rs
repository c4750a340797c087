//! Adaptive share of fleet-wide traffic and limit scaling.
//!
//! Policies express a cluster-wide quota. Each instance enforces only the
//! fraction of that quota matching its share of observed traffic:
//! `share = local_qps / cluster_qps`, clamped to `(0, 1]`.

/// Lowest QPS any estimate is allowed to report.
pub const MIN_QPS: f64 = 1.0;

/// Immutable snapshot of local and cluster traffic estimates.
///
/// Snapshots are replaced as a whole by the
/// [`TrafficEstimator`](crate::application::estimator::TrafficEstimator);
/// a snapshot once handed out never changes.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdaptiveState {
    local_qps: f64,
    cluster_qps: f64,
    updated_at_nanos: i64,
}

impl AdaptiveState {
    /// Build a snapshot, raising both rates to at least [`MIN_QPS`].
    ///
    /// Non-finite rates are treated as [`MIN_QPS`].
    pub fn new(local_qps: f64, cluster_qps: f64, updated_at_nanos: i64) -> Self {
        Self {
            local_qps: sanitize_qps(local_qps),
            cluster_qps: sanitize_qps(cluster_qps),
            updated_at_nanos,
        }
    }

    /// Starting state: one instance alone in its cluster.
    pub fn initial() -> Self {
        Self::new(MIN_QPS, MIN_QPS, 0)
    }

    /// Smoothed local QPS.
    pub fn local_qps(&self) -> f64 {
        self.local_qps
    }

    /// Smoothed cluster-wide QPS.
    pub fn cluster_qps(&self) -> f64 {
        self.cluster_qps
    }

    /// Timestamp of the flush or gossip update that produced this snapshot.
    pub fn updated_at_nanos(&self) -> i64 {
        self.updated_at_nanos
    }

    /// Fraction of the cluster quota this instance should enforce.
    ///
    /// Always strictly positive, finite and at most 1.
    pub fn share(&self) -> f64 {
        let denominator = self.cluster_qps.max(MIN_QPS);
        let ratio = self.local_qps / denominator;
        if !ratio.is_finite() {
            return 1.0;
        }
        if ratio <= 0.0 {
            return MIN_QPS / denominator;
        }
        ratio.min(1.0)
    }

    /// Named values for diagnostics endpoints.
    pub fn debug_view(&self) -> [(&'static str, f64); 3] {
        [
            ("localQps", self.local_qps),
            ("clusterQps", self.cluster_qps),
            ("share", self.share()),
        ]
    }
}

impl Default for AdaptiveState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Clamp a raw rate sample to `[MIN_QPS, +inf)`, mapping NaN/inf to `MIN_QPS`.
pub(crate) fn sanitize_qps(qps: f64) -> f64 {
    if qps.is_finite() {
        qps.max(MIN_QPS)
    } else {
        MIN_QPS
    }
}

/// Scales a nominal cluster-wide limit down to this instance's share.
#[derive(Debug, Clone, Copy, Default)]
pub struct LimitScaler;

impl LimitScaler {
    /// Create a scaler.
    pub fn new() -> Self {
        Self
    }

    /// Effective local limit for `global_limit` under `state`. Never below 1.
    pub fn scale(&self, global_limit: f64, state: &AdaptiveState) -> f64 {
        self.scale_by_share(global_limit, state.share())
    }

    /// Same as [`scale`](Self::scale) for callers holding a bare share factor.
    pub fn scale_by_share(&self, global_limit: f64, share: f64) -> f64 {
        if share <= 0.0 || share.is_nan() {
            return global_limit.max(1.0);
        }
        (global_limit * share).max(1.0)
    }
}
