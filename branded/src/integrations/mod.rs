//! Registries that consume dispatched converters.
//!
//! Both registries implement [`BrandedDispatcher`](crate::BrandedDispatcher)
//! and are populated through the generated `dispatch` entry points. They are
//! thin forwarding shims: all interesting behavior lives in the converters
//! handed to them.

pub mod json;
pub mod sql;
