//! In-memory policy registry.
//!
//! Holds compiled policies by id and binds key hashes to them, with an
//! optional default policy for unbound keys. Backed by DashMap so lookups on
//! the request path never contend on a single lock.

use crate::application::ports::PolicyLookup;
use crate::domain::policy::Policy;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Thread-safe registry resolving key hashes to policies.
///
/// # Example
/// ```
/// use fluxgate::{Policy, PolicyLookup, PolicyRegistry};
///
/// let registry = PolicyRegistry::new();
/// registry.register(Policy::new("login", 5.0, 5.0, 60).unwrap());
/// registry.register(Policy::new("default", 100.0, 200.0, 60).unwrap());
/// registry.bind(42, "login");
/// registry.set_default("default");
///
/// assert_eq!(registry.lookup(42).unwrap().id(), "login");
/// assert_eq!(registry.lookup(7).unwrap().id(), "default");
/// ```
#[derive(Debug, Default)]
pub struct PolicyRegistry {
    policies: DashMap<Arc<str>, Policy>,
    bindings: DashMap<u64, Arc<str>>,
    default_policy: RwLock<Option<Arc<str>>>,
}

impl PolicyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a policy, keyed by its id.
    ///
    /// Returns the policy previously registered under the same id. Limiters
    /// already cached keep the parameters they were created with.
    pub fn register(&self, policy: Policy) -> Option<Policy> {
        self.policies.insert(policy.shared_id(), policy)
    }

    /// Remove a policy. Keys bound to it resolve to nothing until rebound.
    pub fn remove(&self, id: &str) -> Option<Policy> {
        self.policies.remove(id).map(|(_, policy)| policy)
    }

    /// Get a registered policy by id.
    pub fn get(&self, id: &str) -> Option<Policy> {
        self.policies.get(id).map(|entry| entry.value().clone())
    }

    /// Bind `key_hash` to the policy named `id`.
    ///
    /// The policy does not have to be registered yet.
    pub fn bind(&self, key_hash: u64, id: impl Into<Arc<str>>) {
        self.bindings.insert(key_hash, id.into());
    }

    /// Remove the binding for `key_hash`. The key falls back to the default.
    pub fn unbind(&self, key_hash: u64) -> bool {
        self.bindings.remove(&key_hash).is_some()
    }

    /// Use the policy named `id` for keys without a binding.
    pub fn set_default(&self, id: impl Into<Arc<str>>) {
        *self.default_policy.write() = Some(id.into());
    }

    /// Stop resolving unbound keys.
    pub fn clear_default(&self) {
        *self.default_policy.write() = None;
    }

    /// Ids of all registered policies, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.policies.iter().map(|e| e.key().to_string()).collect();
        ids.sort();
        ids
    }

    /// Number of registered policies.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Whether no policy is registered.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    fn resolve_id(&self, key_hash: u64) -> Option<Arc<str>> {
        if let Some(id) = self.bindings.get(&key_hash) {
            return Some(Arc::clone(id.value()));
        }
        self.default_policy.read().clone()
    }
}

impl PolicyLookup for PolicyRegistry {
    fn lookup(&self, key_hash: u64) -> Option<Policy> {
        let id = self.resolve_id(key_hash)?;
        self.get(&id)
    }
}
