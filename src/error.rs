//! Error types for the carcache library.
//!
//! - [`ConfigError`]: a cache could not be built from the given parameters
//!   (today only a capacity of zero).
//! - [`InvariantError`]: `check_invariants` found the CAR directory (resident
//!   rings, ghost lists, target size, slot table) inconsistent.
//!
//! Structural violations detected *during* an operation (removing from an
//! empty ring, re-inserting a key that is already tracked) are defects, not
//! runtime conditions; they panic instead of producing one of these values.
//!
//! ```
//! use carcache::error::ConfigError;
//! use carcache::policy::car::CarCache;
//!
//! let cache: Result<CarCache<u64, String>, ConfigError> = CarCache::try_new(100);
//! assert!(cache.is_ok());
//!
//! let err = CarCache::<u64, String>::try_new(0).unwrap_err();
//! assert!(err.message().contains("capacity"));
//! ```

use std::fmt;

/// Declares a message-carrying error newtype with `Display` and `Error`.
macro_rules! message_error {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(String);

        impl $name {
            #[inline]
            pub fn new(msg: impl Into<String>) -> Self {
                Self(msg.into())
            }

            /// The human-readable description.
            #[inline]
            pub fn message(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::error::Error for $name {}
    };
}

message_error! {
    /// Invalid construction parameters.
    ///
    /// Returned by [`CarCore::try_new`](crate::policy::car::CarCore::try_new),
    /// [`CarCache::try_new`](crate::policy::car::CarCache::try_new) and
    /// [`CarCacheBuilder::try_build`](crate::policy::car::CarCacheBuilder::try_build).
    /// The panicking constructors panic with the same message.
    ConfigError
}

message_error! {
    /// A CAR directory invariant does not hold.
    ///
    /// Returned by [`CarCore::check_invariants`](crate::policy::car::CarCore::check_invariants)
    /// and its façade delegate; the message names the violated rule and the
    /// population sizes involved.
    InvariantError
}
