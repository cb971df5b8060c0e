//! Cache key construction.
//!
//! The final key layout is `[{environment}:]{namespace}[:v{version}]:{base}[_{sub_key}]`.
//! Keys written by earlier deployments must keep resolving, so the order of
//! the segments and the encoding of sub-keys are fixed.

use crate::{CacheError, CacheNamespace, CacheResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Maximum allowed cache key length in UTF-8 bytes.
pub const MAX_KEY_BYTES: usize = 250;

/// Key construction settings, fixed for the lifetime of a cache instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyOptions {
    /// Version segment; bumping it orphans every existing entry.
    #[serde(default)]
    pub schema_version: Option<i32>,

    /// Prefix isolating environments that share one backend.
    #[serde(default)]
    pub environment_prefix: Option<String>,

    /// Percent-encode sub-keys.
    #[serde(default = "default_true")]
    pub enable_key_encoding: bool,

    /// Reject keys longer than [`MAX_KEY_BYTES`].
    #[serde(default = "default_true")]
    pub enable_key_length_validation: bool,
}

fn default_true() -> bool {
    true
}

impl Default for KeyOptions {
    fn default() -> Self {
        Self {
            schema_version: None,
            environment_prefix: None,
            enable_key_encoding: true,
            enable_key_length_validation: true,
        }
    }
}

impl KeyOptions {
    /// Options for process-local stores: raw sub-keys and no length limit.
    #[must_use]
    pub fn local() -> Self {
        Self {
            enable_key_encoding: false,
            enable_key_length_validation: false,
            ..Self::default()
        }
    }

    /// Sets the schema version.
    #[must_use]
    pub fn with_schema_version(mut self, version: i32) -> Self {
        self.schema_version = Some(version);
        self
    }

    /// Sets the environment prefix.
    #[must_use]
    pub fn with_environment_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.environment_prefix = Some(prefix.into());
        self
    }

    /// Enables or disables sub-key encoding.
    #[must_use]
    pub fn with_key_encoding(mut self, enabled: bool) -> Self {
        self.enable_key_encoding = enabled;
        self
    }

    /// Enables or disables key length validation.
    #[must_use]
    pub fn with_key_length_validation(mut self, enabled: bool) -> Self {
        self.enable_key_length_validation = enabled;
        self
    }
}

/// The final key handed to a raw store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wraps an already-built key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the UTF-8 length of the key.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.0.len()
    }

    /// Consumes the key, returning the inner string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Builds keys for one cache instance.
#[derive(Debug, Clone, Default)]
pub struct KeyBuilder {
    options: Arc<KeyOptions>,
}

impl KeyBuilder {
    /// Creates a key builder.
    #[must_use]
    pub fn new(options: KeyOptions) -> Self {
        Self {
            options: Arc::new(options),
        }
    }

    /// Returns the options used by this builder.
    #[must_use]
    pub fn options(&self) -> &KeyOptions {
        &self.options
    }

    /// Builds the key for a namespace member and optional sub-key.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::KeyTooLong`] when length validation is enabled and
    /// the key exceeds [`MAX_KEY_BYTES`].
    pub fn build<N: CacheNamespace>(&self, id: N, sub_key: Option<&str>) -> CacheResult<CacheKey> {
        build_key(N::TYPE_NAME, id.base_key(), sub_key, &self.options)
    }
}

/// Builds a cache key from its parts.
///
/// # Errors
///
/// Returns [`CacheError::KeyTooLong`] when length validation is enabled and
/// the key exceeds [`MAX_KEY_BYTES`].
pub fn build_key(
    type_name: &str,
    base_key: &str,
    sub_key: Option<&str>,
    options: &KeyOptions,
) -> CacheResult<CacheKey> {
    let entry_key = match sub_key.filter(|key| !is_blank(key)) {
        Some(key) if options.enable_key_encoding => {
            format!("{}_{}", base_key, urlencoding::encode(key))
        }
        Some(key) => format!("{}_{}", base_key, key),
        None => base_key.to_string(),
    };

    let mut full_key = type_name.to_string();

    if let Some(version) = options.schema_version {
        full_key = format!("{}:v{}", full_key, version);
    }

    full_key = format!("{}:{}", full_key, entry_key);

    if let Some(prefix) = options.environment_prefix.as_deref().filter(|p| !is_blank(p)) {
        full_key = format!("{}:{}", prefix, full_key);
    }

    if options.enable_key_length_validation && full_key.len() > MAX_KEY_BYTES {
        return Err(CacheError::KeyTooLong {
            length: full_key.len(),
            key: full_key,
            limit: MAX_KEY_BYTES,
        });
    }

    Ok(CacheKey(full_key))
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache_namespace;

    cache_namespace! {
        enum TestCacheId {
            Foobar,
            UserProfile => "user-profile",
            ProductCatalog,
        }
    }

    fn key(options: KeyOptions, id: TestCacheId, sub_key: Option<&str>) -> CacheResult<String> {
        KeyBuilder::new(options)
            .build(id, sub_key)
            .map(CacheKey::into_string)
    }

    #[test]
    fn test_plain_key() {
        let built = key(KeyOptions::default(), TestCacheId::Foobar, None).unwrap();
        assert_eq!(built, "TestCacheId:Foobar");
    }

    #[test]
    fn test_override_used_verbatim() {
        let built = key(KeyOptions::default(), TestCacheId::UserProfile, None).unwrap();
        assert_eq!(built, "TestCacheId:user-profile");
        assert!(!built.contains("UserProfile"));
    }

    #[test]
    fn test_member_name_used_without_override() {
        let built = key(KeyOptions::default(), TestCacheId::ProductCatalog, None).unwrap();
        assert_eq!(built, "TestCacheId:ProductCatalog");
    }

    #[test]
    fn test_sub_key_appended() {
        let built = key(KeyOptions::default(), TestCacheId::Foobar, Some("123")).unwrap();
        assert_eq!(built, "TestCacheId:Foobar_123");
    }

    #[test]
    fn test_blank_sub_key_treated_as_absent() {
        for blank in ["", " ", "   ", "\t\n"] {
            let built = key(KeyOptions::default(), TestCacheId::Foobar, Some(blank)).unwrap();
            assert_eq!(built, "TestCacheId:Foobar");
        }
    }

    #[test]
    fn test_sub_key_encoding() {
        let built = key(
            KeyOptions::default(),
            TestCacheId::Foobar,
            Some("user:123 test@example.com"),
        )
        .unwrap();
        assert_eq!(built, "TestCacheId:Foobar_user%3A123%20test%40example.com");
    }

    #[test]
    fn test_reserved_characters_encoded() {
        let built = key(
            KeyOptions::default(),
            TestCacheId::Foobar,
            Some("key/with%special&chars?param=value"),
        )
        .unwrap();
        assert_eq!(
            built,
            "TestCacheId:Foobar_key%2Fwith%25special%26chars%3Fparam%3Dvalue"
        );
    }

    #[test]
    fn test_unreserved_characters_untouched() {
        let built = key(KeyOptions::default(), TestCacheId::Foobar, Some("a-Z_0.9~")).unwrap();
        assert_eq!(built, "TestCacheId:Foobar_a-Z_0.9~");
    }

    #[test]
    fn test_unicode_encoded_as_utf8_bytes() {
        let built = key(KeyOptions::default(), TestCacheId::Foobar, Some("用户-123")).unwrap();
        assert_eq!(built, "TestCacheId:Foobar_%E7%94%A8%E6%88%B7-123");
    }

    #[test]
    fn test_encoding_disabled_keeps_raw_sub_key() {
        let options = KeyOptions::default().with_key_encoding(false);
        let built = key(options, TestCacheId::Foobar, Some("user:123 test@example.com")).unwrap();
        assert_eq!(built, "TestCacheId:Foobar_user:123 test@example.com");
    }

    #[test]
    fn test_encoding_never_touches_other_segments() {
        let options = KeyOptions::default()
            .with_environment_prefix("eu west")
            .with_schema_version(3);
        let built = key(options, TestCacheId::UserProfile, Some("a b")).unwrap();
        assert_eq!(built, "eu west:TestCacheId:v3:user-profile_a%20b");
    }

    #[test]
    fn test_version_segment() {
        let options = KeyOptions::default().with_schema_version(2);
        let built = key(options, TestCacheId::Foobar, None).unwrap();
        assert_eq!(built, "TestCacheId:v2:Foobar");
    }

    #[test]
    fn test_versions_isolate_entries() {
        let v1 = key(KeyOptions::default().with_schema_version(1), TestCacheId::Foobar, None).unwrap();
        let v2 = key(KeyOptions::default().with_schema_version(2), TestCacheId::Foobar, None).unwrap();
        assert_ne!(v1, v2);
    }

    #[test]
    fn test_environment_prefix() {
        let options = KeyOptions::default().with_environment_prefix("staging");
        let built = key(options, TestCacheId::Foobar, None).unwrap();
        assert_eq!(built, "staging:TestCacheId:Foobar");
    }

    #[test]
    fn test_blank_environment_prefix_ignored() {
        for prefix in ["", "   "] {
            let options = KeyOptions::default().with_environment_prefix(prefix);
            let built = key(options, TestCacheId::Foobar, None).unwrap();
            assert_eq!(built, "TestCacheId:Foobar");
        }
    }

    #[test]
    fn test_full_key_layout() {
        let options = KeyOptions::default()
            .with_schema_version(2)
            .with_environment_prefix("staging");
        let built = key(options, TestCacheId::Foobar, Some("123")).unwrap();
        assert_eq!(built, "staging:TestCacheId:v2:Foobar_123");
    }

    #[test]
    fn test_deterministic() {
        let builder = KeyBuilder::new(KeyOptions::default().with_schema_version(7));
        let first = builder.build(TestCacheId::Foobar, Some("x y")).unwrap();
        for _ in 0..10 {
            assert_eq!(builder.build(TestCacheId::Foobar, Some("x y")).unwrap(), first);
        }
    }

    #[test]
    fn test_override_and_plain_members_never_collide() {
        let builder = KeyBuilder::default();
        let profile = builder.build(TestCacheId::UserProfile, None).unwrap();
        let catalog = builder.build(TestCacheId::ProductCatalog, None).unwrap();
        assert_ne!(profile, catalog);
    }

    #[test]
    fn test_key_too_long_rejected() {
        let long = "x".repeat(300);
        let err = key(KeyOptions::default(), TestCacheId::Foobar, Some(&long)).unwrap_err();
        assert!(err.is_invalid_argument());
        match err {
            CacheError::KeyTooLong { key, length, limit } => {
                assert_eq!(limit, MAX_KEY_BYTES);
                assert_eq!(length, "TestCacheId:Foobar_".len() + 300);
                assert!(key.starts_with("TestCacheId:Foobar_xxx"));
            }
            other => panic!("Expected KeyTooLong, got {other:?}"),
        }
    }

    #[test]
    fn test_key_too_long_allowed_without_validation() {
        let long = "x".repeat(300);
        let options = KeyOptions::default().with_key_length_validation(false);
        let built = key(options, TestCacheId::Foobar, Some(&long)).unwrap();
        assert_eq!(built.len(), "TestCacheId:Foobar_".len() + 300);
    }

    #[test]
    fn test_limit_is_inclusive() {
        let prefix_len = "TestCacheId:Foobar_".len();
        let exact = "a".repeat(MAX_KEY_BYTES - prefix_len);
        assert!(key(KeyOptions::default(), TestCacheId::Foobar, Some(&exact)).is_ok());

        let over = "a".repeat(MAX_KEY_BYTES - prefix_len + 1);
        assert!(key(KeyOptions::default(), TestCacheId::Foobar, Some(&over)).is_err());
    }

    #[test]
    fn test_length_counts_utf8_bytes() {
        // 100 three-byte characters fit in 250 chars but not in 250 bytes
        let unicode = "中".repeat(100);
        let options = KeyOptions::default().with_key_encoding(false);
        let err = key(options, TestCacheId::Foobar, Some(&unicode)).unwrap_err();
        assert!(err.to_string().contains("exceeds maximum length"));
    }

    #[test]
    fn test_length_measured_after_encoding_and_prefix() {
        let prefix_len = "prod:TestCacheId:Foobar_".len();
        // Each space expands to three bytes once encoded
        let spaces = " a".repeat((MAX_KEY_BYTES - prefix_len) / 2);
        let options = KeyOptions::default().with_environment_prefix("prod");
        assert!(key(options, TestCacheId::Foobar, Some(&spaces)).is_err());
    }

    #[test]
    fn test_local_options() {
        let options = KeyOptions::local();
        assert!(!options.enable_key_encoding);
        assert!(!options.enable_key_length_validation);
        let long = "x".repeat(500);
        assert!(key(options, TestCacheId::Foobar, Some(&long)).is_ok());
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: KeyOptions = serde_json::from_str(r#"{"schema_version": 4}"#).unwrap();
        assert_eq!(options.schema_version, Some(4));
        assert!(options.enable_key_encoding);
        assert!(options.enable_key_length_validation);
        assert!(options.environment_prefix.is_none());
    }
}
