//! Capability probes: which optional behaviors a wrapper may forward to its
//! wrapped value.
//!
//! Each capability pairs a detection predicate over the inner type's name
//! with an emission function; new capabilities are added by registering a
//! new pair rather than by special-casing the emission engine. A wrapper
//! must not derive the traits a capability it requests provides.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};

/// Resolved identifiers the emission functions splice into their impls.
pub struct CapabilityTarget {
    pub wrapper: syn::Path,
    pub inner: syn::Type,
    field: FieldAccess,
}

enum FieldAccess {
    Tuple,
    Named(syn::Ident),
}

impl CapabilityTarget {
    pub fn new(wrapper: syn::Path, inner: syn::Type, accessor: &str) -> Self {
        let field = if accessor == "0" {
            FieldAccess::Tuple
        } else {
            FieldAccess::Named(format_ident!("{}", accessor))
        };
        Self {
            wrapper,
            inner,
            field,
        }
    }

    /// Tokens that read the inner value out of `self` or another wrapper.
    pub fn access(&self) -> TokenStream {
        match &self.field {
            FieldAccess::Tuple => {
                let index = syn::Index::from(0);
                quote! { #index }
            }
            FieldAccess::Named(ident) => quote! { #ident },
        }
    }

    /// A function-like expression constructing the wrapper from one inner
    /// value, suitable as a `map` argument.
    pub fn constructor(&self) -> TokenStream {
        let wrapper = &self.wrapper;
        match &self.field {
            FieldAccess::Tuple => quote! { #wrapper },
            FieldAccess::Named(ident) => quote! { |value| #wrapper { #ident: value } },
        }
    }

    /// An expression constructing the wrapper from the given inner-value
    /// expression.
    pub fn build(&self, value: TokenStream) -> TokenStream {
        let wrapper = &self.wrapper;
        match &self.field {
            FieldAccess::Tuple => quote! { #wrapper(#value) },
            FieldAccess::Named(ident) => quote! { #wrapper { #ident: #value } },
        }
    }
}

#[derive(Clone, Copy)]
pub struct Capability {
    name: &'static str,
    probe: fn(&str) -> bool,
    emit: fn(&CapabilityTarget) -> TokenStream,
}

impl Capability {
    pub fn new(
        name: &'static str,
        probe: fn(&str) -> bool,
        emit: fn(&CapabilityTarget) -> TokenStream,
    ) -> Self {
        Self { name, probe, emit }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn supports(&self, inner: &str) -> bool {
        (self.probe)(inner)
    }

    pub fn emit(&self, target: &CapabilityTarget) -> TokenStream {
        (self.emit)(target)
    }
}

#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    entries: Vec<Capability>,
}

impl CapabilityRegistry {
    /// The built-in capability set: `ordering`, `hashing`, `parsing`.
    pub fn standard() -> Self {
        let mut registry = Self::default();
        registry.register(Capability::new("ordering", probe_ordered, emit_ordering));
        registry.register(Capability::new("hashing", probe_ordered, emit_hashing));
        registry.register(Capability::new("parsing", probe_parseable, emit_parsing));
        registry
    }

    pub fn register(&mut self, capability: Capability) {
        self.entries.retain(|c| c.name != capability.name);
        self.entries.push(capability);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|c| c.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.entries.iter().find(|c| c.name == name)
    }

    /// Capability names whose probe accepts the inner type, in registration
    /// order.
    pub fn eligible(&self, inner: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|c| c.supports(inner))
            .map(|c| c.name.to_string())
            .collect()
    }
}

fn base_name(inner: &str) -> &str {
    inner.rsplit("::").next().unwrap_or(inner)
}

const ORDERED_INNER: &[&str] = &[
    "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128", "usize",
    "bool", "char", "String",
];

const FLOAT_INNER: &[&str] = &["f32", "f64"];

fn probe_ordered(inner: &str) -> bool {
    ORDERED_INNER.contains(&base_name(inner))
}

fn probe_parseable(inner: &str) -> bool {
    let base = base_name(inner);
    ORDERED_INNER.contains(&base) || FLOAT_INNER.contains(&base)
}

fn emit_ordering(target: &CapabilityTarget) -> TokenStream {
    let wrapper = &target.wrapper;
    let access = target.access();
    quote! {
        impl ::core::cmp::PartialEq for #wrapper {
            fn eq(&self, other: &Self) -> bool {
                self.#access == other.#access
            }
        }

        impl ::core::cmp::Eq for #wrapper {}

        impl ::core::cmp::PartialOrd for #wrapper {
            fn partial_cmp(&self, other: &Self) -> ::core::option::Option<::core::cmp::Ordering> {
                ::core::option::Option::Some(self.cmp(other))
            }
        }

        impl ::core::cmp::Ord for #wrapper {
            fn cmp(&self, other: &Self) -> ::core::cmp::Ordering {
                self.#access.cmp(&other.#access)
            }
        }
    }
}

fn emit_hashing(target: &CapabilityTarget) -> TokenStream {
    let wrapper = &target.wrapper;
    let access = target.access();
    quote! {
        impl ::core::hash::Hash for #wrapper {
            fn hash<H: ::core::hash::Hasher>(&self, state: &mut H) {
                ::core::hash::Hash::hash(&self.#access, state);
            }
        }
    }
}

fn emit_parsing(target: &CapabilityTarget) -> TokenStream {
    let wrapper = &target.wrapper;
    let inner = &target.inner;
    let constructor = target.constructor();
    quote! {
        impl ::core::str::FromStr for #wrapper {
            type Err = <#inner as ::core::str::FromStr>::Err;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.parse::<#inner>().map(#constructor)
            }
        }
    }
}
