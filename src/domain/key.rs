//! Request key computation.
//!
//! A request key identifies the subject of a rate limit based on:
//! - A deployment secret (so keys are not guessable across deployments)
//! - Named request attributes (client IP, route, selected headers, ...)
//!
//! Requests with the same key share one per-key limiter. Keys are the first
//! 8 bytes of a SHA-256 digest, so every process in a fleet derives the same
//! hash for the same attributes and secret.

use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// A 64-bit key hash identifying a rate limit subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey(u64);

impl RequestKey {
    /// Wrap an already computed key hash.
    pub const fn from_hash(hash: u64) -> Self {
        RequestKey(hash)
    }

    /// Start collecting attributes for a key.
    pub fn builder() -> RequestKeyBuilder {
        RequestKeyBuilder::default()
    }

    /// Get the raw hash value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<RequestKey> for u64 {
    fn from(key: RequestKey) -> Self {
        key.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Collects request attributes and hashes them into a [`RequestKey`].
///
/// Attributes are hashed in name order, so insertion order never matters.
///
/// # Example
/// ```
/// use fluxgate::RequestKey;
///
/// let a = RequestKey::builder().ip("10.0.0.1").route("/login").build("secret");
/// let b = RequestKey::builder().route("/login").ip("10.0.0.1").build("secret");
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestKeyBuilder {
    attributes: BTreeMap<Cow<'static, str>, String>,
}

impl RequestKeyBuilder {
    /// Add a named attribute. A later value for the same name replaces the earlier one.
    pub fn attribute(mut self, name: impl Into<Cow<'static, str>>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Add the client address.
    pub fn ip(self, ip: impl Into<String>) -> Self {
        self.attribute("ip", ip)
    }

    /// Add the matched route.
    pub fn route(self, route: impl Into<String>) -> Self {
        self.attribute("route", route)
    }

    /// Add a request header.
    pub fn header(self, name: &str, value: impl Into<String>) -> Self {
        self.attribute(format!("header:{}", name), value)
    }

    /// Hash the secret and all attributes into a key.
    ///
    /// The digest covers the secret followed by one `name=value\n` line per
    /// attribute in name order.
    pub fn build(&self, secret: &str) -> RequestKey {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());

        for (name, value) in &self.attributes {
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update(b"\n");
        }

        let digest = hasher.finalize();
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        RequestKey(u64::from_be_bytes(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_attributes_produce_same_key() {
        let k1 = RequestKey::builder().ip("1.2.3.4").route("/a").build("s");
        let k2 = RequestKey::builder().ip("1.2.3.4").route("/a").build("s");
        assert_eq!(k1, k2);
    }

    #[test]
    fn test_attribute_order_independence() {
        let k1 = RequestKey::builder()
            .attribute("z", "1")
            .attribute("a", "2")
            .build("s");
        let k2 = RequestKey::builder()
            .attribute("a", "2")
            .attribute("z", "1")
            .build("s");
        assert_eq!(k1, k2);
    }

    #[test]
    fn test_different_secrets_produce_different_keys() {
        let builder = RequestKey::builder().ip("1.2.3.4");
        assert_ne!(builder.build("one"), builder.build("two"));
    }

    #[test]
    fn test_different_values_produce_different_keys() {
        let k1 = RequestKey::builder().ip("1.2.3.4").build("s");
        let k2 = RequestKey::builder().ip("1.2.3.5").build("s");
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_header_is_distinct_from_plain_attribute() {
        let k1 = RequestKey::builder().header("x-user", "alice").build("s");
        let k2 = RequestKey::builder().attribute("x-user", "alice").build("s");
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_later_value_replaces_earlier() {
        let k1 = RequestKey::builder().ip("a").ip("b").build("s");
        let k2 = RequestKey::builder().ip("b").build("s");
        assert_eq!(k1, k2);
    }

    #[test]
    fn test_hash_is_stable_across_processes() {
        let key = RequestKey::builder()
            .ip("10.0.0.1")
            .route("/login")
            .build("secret");
        assert_eq!(key.as_u64(), 0x044d_a5c4_663c_cc54);

        let key = RequestKey::builder().ip("1.2.3.4").build("s");
        assert_eq!(key.to_string(), "66ea982d2109a78b");
    }

    #[test]
    fn test_display_format() {
        let key = RequestKey::from_hash(0xabc);
        assert_eq!(key.to_string(), "0000000000000abc");
        assert_eq!(u64::from(key), 0xabc);
    }
}
