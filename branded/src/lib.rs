//! Runtime support for branded newtype wrappers.
//!
//! A branded type is a single-field struct that gives a primitive or string
//! value a distinct compile-time identity. The companion code for each
//! wrapper (its converter, conversions, and capability impls) is produced at
//! build time by `branded-build`; this crate holds the pieces that generated
//! code and its consumers link against:
//!
//! - [`BrandedConverter`], [`BrandedType`] and [`BrandedDispatcher`], the
//!   uniform wrap/unwrap and registration surface,
//! - the [`conventions!`] and [`decorate!`] declaration macros read by the
//!   generator,
//! - the [`integrations`] registries that consume dispatched converters.

pub mod errors;
pub mod integrations;
mod macros;

pub use branded_macros::Branded;
pub use errors::BrandError;

/// Wraps and unwraps values of one branded type.
///
/// Implementations are generated per wrapper and are stateless: both
/// operations are associated functions.
pub trait BrandedConverter<B, I> {
    /// Wraps an inner value into the branded type.
    fn wrap(inner: I) -> B;

    /// Unwraps the inner value out of the branded type.
    fn unwrap(value: B) -> I;
}

/// Binds a branded type to its inner type and generated converter.
///
/// Generated code implements this so decorations and adapters can name the
/// converter without knowing the generated module layout:
/// `<UserId as BrandedType>::Converter`.
pub trait BrandedType: Sized {
    type Inner;
    type Converter: BrandedConverter<Self, Self::Inner>;
}

/// Registration entry point handed to external registries.
///
/// Each generated wrapper exposes `dispatch`, which forwards the full
/// (wrapper, inner, converter) triple to a dispatcher exactly once, so a
/// registry can be populated without writing out any of the type names:
///
/// ```ignore
/// let mut registry = JsonConverterRegistry::new();
/// UserId::dispatch(&mut registry);
/// OrderId::dispatch(&mut registry);
/// ```
pub trait BrandedDispatcher {
    fn dispatch<B, I, C>(&mut self)
    where
        B: Clone + Send + Sync + 'static,
        I: Send + Sync + 'static,
        C: BrandedConverter<B, I> + 'static;
}
