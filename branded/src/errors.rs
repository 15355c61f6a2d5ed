use std::any::type_name;

use thiserror::Error;

/// Top-level error type returned by the integration registries.
#[derive(Debug, Error)]
pub enum BrandError {
    /// A value could not be converted into the wrapper type. Decoding a JSON
    /// `null` into a wrapper is the canonical case.
    #[error("cannot convert {found} to `{wrapper}`")]
    InvalidCast { wrapper: &'static str, found: String },

    /// No converter was dispatched to this registry for the requested type.
    #[error("no converter registered for `{wrapper}`")]
    NotRegistered { wrapper: &'static str },

    /// The wrapper's inner type is outside the set this registry can
    /// translate (32/64-bit signed and unsigned integers, text).
    #[error("`{wrapper}` wraps `{inner}`, which this registry cannot translate")]
    UnsupportedInnerKind {
        wrapper: &'static str,
        inner: &'static str,
    },
}

impl BrandError {
    pub(crate) fn invalid_cast<B>(found: impl Into<String>) -> Self {
        BrandError::InvalidCast {
            wrapper: type_name::<B>(),
            found: found.into(),
        }
    }

    pub(crate) fn not_registered<B>() -> Self {
        BrandError::NotRegistered {
            wrapper: type_name::<B>(),
        }
    }

    pub(crate) fn unsupported<B, I>() -> Self {
        BrandError::UnsupportedInnerKind {
            wrapper: type_name::<B>(),
            inner: type_name::<I>(),
        }
    }
}
