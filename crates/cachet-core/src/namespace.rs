//! Namespace identifiers.
//!
//! A namespace is a closed set of identifiers, one per logical cache "table".
//! Each member has a stable canonical name and may declare an explicit key
//! override, which keeps stored keys stable when the member is renamed.
//!
//! The member table is static: it is produced by [`cache_namespace!`] (or a
//! hand-written [`CacheNamespace`] impl) at compile time and checked once by
//! [`validate_namespace`] when a cache is constructed.

use crate::{CacheError, CacheResult};
use std::collections::HashMap;

/// A closed set of cache identifiers.
pub trait CacheNamespace: Copy + Send + Sync + 'static {
    /// Discriminator distinguishing this set from every other namespace type.
    const TYPE_NAME: &'static str;

    /// All members of the namespace.
    fn members() -> &'static [Self];

    /// The stable canonical name of a member.
    fn member_name(self) -> &'static str;

    /// The explicit key override declared for a member, if any.
    fn key_override(self) -> Option<&'static str> {
        None
    }

    /// The base key: the override when present, otherwise the canonical name.
    fn base_key(self) -> &'static str {
        self.key_override().unwrap_or_else(|| self.member_name())
    }
}

/// Checks that a namespace table can be used to build keys.
///
/// # Errors
///
/// - [`CacheError::InvalidArgument`] if the type name or an override is blank.
/// - [`CacheError::DuplicateKeyOverride`] if two members resolve to the same base key.
pub fn validate_namespace<N: CacheNamespace>() -> CacheResult<()> {
    if N::TYPE_NAME.trim().is_empty() {
        return Err(CacheError::invalid_argument(
            "Cache namespace type name cannot be empty or whitespace.",
        ));
    }

    let mut seen: HashMap<&'static str, &'static str> = HashMap::new();
    for member in N::members() {
        if let Some(key) = member.key_override() {
            if key.trim().is_empty() {
                return Err(CacheError::invalid_argument(format!(
                    "Cache key override for {}::{} cannot be empty or whitespace.",
                    N::TYPE_NAME,
                    member.member_name()
                )));
            }
        }

        let key = member.base_key();
        if let Some(previous) = seen.insert(key, member.member_name()) {
            tracing::error!(
                namespace = N::TYPE_NAME,
                key,
                first = previous,
                second = member.member_name(),
                "Cache namespace members share a key"
            );
            return Err(CacheError::DuplicateKeyOverride {
                namespace: N::TYPE_NAME,
                key: key.to_string(),
            });
        }
    }

    Ok(())
}

/// Declares a namespace enum together with its static member table.
///
/// A member may declare an explicit key override with `=> "key"`.
///
/// ```
/// use cachet_core::{cache_namespace, CacheNamespace};
///
/// cache_namespace! {
///     /// Catalog caches.
///     pub enum CatalogCacheId {
///         UserProfile => "user-profile",
///         ProductCatalog,
///     }
/// }
///
/// assert_eq!(CatalogCacheId::TYPE_NAME, "CatalogCacheId");
/// assert_eq!(CatalogCacheId::UserProfile.base_key(), "user-profile");
/// assert_eq!(CatalogCacheId::ProductCatalog.base_key(), "ProductCatalog");
/// ```
#[macro_export]
macro_rules! cache_namespace {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$member_meta:meta])*
                $member:ident $(=> $key:literal)?
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $(
                $(#[$member_meta])*
                $member,
            )+
        }

        impl $crate::CacheNamespace for $name {
            const TYPE_NAME: &'static str = stringify!($name);

            fn members() -> &'static [Self] {
                &[$(Self::$member),+]
            }

            fn member_name(self) -> &'static str {
                match self {
                    $(Self::$member => stringify!($member),)+
                }
            }

            fn key_override(self) -> Option<&'static str> {
                match self {
                    $(Self::$member => $crate::__cache_key_override!($($key)?),)+
                }
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __cache_key_override {
    () => {
        None
    };
    ($key:literal) => {
        Some($key)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    cache_namespace! {
        enum TestCacheId {
            Foobar,
            NonRefreshedFoobar,
            UserProfile => "user-profile",
            ProductCatalog,
        }
    }

    cache_namespace! {
        enum CollidingOverrides {
            First => "shared",
            Second => "shared",
        }
    }

    cache_namespace! {
        enum OverrideShadowsName {
            Orders,
            Legacy => "Orders",
        }
    }

    cache_namespace! {
        enum BlankOverride {
            Empty => "   ",
        }
    }

    #[test]
    fn test_generated_table() {
        assert_eq!(TestCacheId::TYPE_NAME, "TestCacheId");
        assert_eq!(TestCacheId::members().len(), 4);
        assert_eq!(TestCacheId::Foobar.member_name(), "Foobar");
        assert_eq!(TestCacheId::UserProfile.member_name(), "UserProfile");
    }

    #[test]
    fn test_override_is_used_verbatim() {
        assert_eq!(TestCacheId::UserProfile.key_override(), Some("user-profile"));
        assert_eq!(TestCacheId::UserProfile.base_key(), "user-profile");
    }

    #[test]
    fn test_member_without_override_uses_name() {
        assert_eq!(TestCacheId::ProductCatalog.key_override(), None);
        assert_eq!(TestCacheId::ProductCatalog.base_key(), "ProductCatalog");
    }

    #[test]
    fn test_valid_namespace() {
        assert!(validate_namespace::<TestCacheId>().is_ok());
    }

    #[test]
    fn test_duplicate_overrides_rejected() {
        let err = validate_namespace::<CollidingOverrides>().unwrap_err();
        match err {
            CacheError::DuplicateKeyOverride { namespace, key } => {
                assert_eq!(namespace, "CollidingOverrides");
                assert_eq!(key, "shared");
            }
            other => panic!("Expected DuplicateKeyOverride, got {other:?}"),
        }
    }

    #[test]
    fn test_override_colliding_with_member_name_rejected() {
        let err = validate_namespace::<OverrideShadowsName>().unwrap_err();
        assert!(matches!(err, CacheError::DuplicateKeyOverride { .. }));
    }

    #[test]
    fn test_blank_override_rejected() {
        let err = validate_namespace::<BlankOverride>().unwrap_err();
        assert!(matches!(err, CacheError::InvalidArgument(_)));
    }

    #[derive(Clone, Copy)]
    enum HandWritten {
        Session,
    }

    impl CacheNamespace for HandWritten {
        const TYPE_NAME: &'static str = "HandWritten";

        fn members() -> &'static [Self] {
            &[Self::Session]
        }

        fn member_name(self) -> &'static str {
            match self {
                Self::Session => "Session",
            }
        }
    }

    #[test]
    fn test_hand_written_impl_defaults() {
        assert_eq!(HandWritten::Session.key_override(), None);
        assert_eq!(HandWritten::Session.base_key(), "Session");
        assert!(validate_namespace::<HandWritten>().is_ok());
    }
}
