//! Emission of one generated source unit per valid candidate.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::capability::{CapabilityRegistry, CapabilityTarget};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Outcome};
use crate::scanner::WrapperCandidate;
use crate::template::AttributeTemplate;

/// One generated source file, ready to be written under the output
/// directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedUnit {
    pub module_name: String,
    pub file_name: String,
    pub source: String,
    pub qualified_name: String,
}

/// Generate the companion source for one valid candidate.
///
/// Deterministic for a given (candidate, templates, capability set,
/// runtime-support flag) tuple. The returned outcome carries the
/// `CodeGenerated` audit diagnostic; an error is only possible when a
/// rendered decoration or the assembled unit is not valid Rust.
pub fn emit_candidate(
    candidate: &WrapperCandidate,
    templates: &[AttributeTemplate],
    capabilities: &CapabilityRegistry,
    runtime_support: bool,
) -> Outcome<GeneratedUnit> {
    let wrapper: syn::Path =
        syn::parse_str(&candidate.qualified_name).expect("qualified names are paths");
    let inner: syn::Type = match syn::parse_str(&candidate.inner_type) {
        Ok(inner) => inner,
        Err(err) => {
            return Outcome::error(Diagnostic::new(
                DiagnosticKind::InvalidConfiguration,
                candidate.location.clone(),
                format!(
                    "the inner type `{}` of `{}` cannot be rendered: {err}",
                    candidate.inner_type, candidate.name
                ),
            ));
        }
    };
    let target = CapabilityTarget::new(wrapper.clone(), inner.clone(), &candidate.accessor);

    let mut decorations: Vec<syn::Item> = Vec::new();
    for template in templates {
        if !template.applies_to(&candidate.inner_type) {
            continue;
        }
        let line = template.render_for(&candidate.qualified_name, &candidate.inner_type);
        match syn::parse_str::<syn::Item>(&line) {
            Ok(item) => decorations.push(item),
            Err(err) => {
                return Outcome::error(Diagnostic::new(
                    DiagnosticKind::InvalidConfiguration,
                    template.location.clone(),
                    format!("the rendered decoration `{line}` is not valid Rust: {err}"),
                ));
            }
        }
    }

    let converter = runtime_support.then(|| converter_items(candidate, &target));
    let conversions = conversion_items(&target);
    let capability_impls: Vec<TokenStream> = candidate
        .capabilities
        .iter()
        .filter_map(|name| capabilities.get(name))
        .map(|capability| capability.emit(&target))
        .collect();

    let output = quote! {
        //! Auto-generated companion code. Do not edit manually.
        //!
        //! Regenerated by `branded-build` on every build.

        #(#decorations)*

        #converter

        #conversions

        #(#capability_impls)*
    };

    let syntax_tree: syn::File = match syn::parse2(output) {
        Ok(file) => file,
        Err(err) => {
            return Outcome::error(Diagnostic::new(
                DiagnosticKind::InvalidConfiguration,
                candidate.location.clone(),
                format!(
                    "the generated code for `{}` is not valid Rust: {err}",
                    candidate.name
                ),
            ));
        }
    };

    let module_name = format!(
        "{}_{}",
        candidate.module_path.replace("::", "_"),
        to_snake_case(&candidate.name)
    );
    let unit = GeneratedUnit {
        file_name: format!("{module_name}.rs"),
        module_name,
        source: prettyplease::unparse(&syntax_tree),
        qualified_name: candidate.qualified_name.clone(),
    };

    Outcome::new(
        Some(unit),
        vec![Diagnostic::new(
            DiagnosticKind::CodeGenerated,
            candidate.location.clone(),
            format!("companion code generated for `{}`", candidate.name),
        )],
    )
}

/// The converter adapter and dispatch entry point, emitted only when the
/// runtime crate is a dependency of the generation target.
fn converter_items(candidate: &WrapperCandidate, target: &CapabilityTarget) -> TokenStream {
    let wrapper = &target.wrapper;
    let inner = &target.inner;
    let access = target.access();
    let construct = target.build(quote! { inner });
    let converter = format_ident!("{}Converter", candidate.name);

    quote! {
        pub struct #converter;

        impl ::branded::BrandedConverter<#wrapper, #inner> for #converter {
            fn wrap(inner: #inner) -> #wrapper {
                #construct
            }

            fn unwrap(value: #wrapper) -> #inner {
                value.#access
            }
        }

        impl ::branded::BrandedType for #wrapper {
            type Inner = #inner;
            type Converter = #converter;
        }

        impl #wrapper {
            /// Hands this type's converter to an external registry.
            pub fn dispatch<D: ::branded::BrandedDispatcher>(dispatcher: &mut D) {
                dispatcher.dispatch::<#wrapper, #inner, #converter>();
            }
        }
    }
}

/// The unconditional conversions: textual, and into the wrapped type.
fn conversion_items(target: &CapabilityTarget) -> TokenStream {
    let wrapper = &target.wrapper;
    let inner = &target.inner;
    let access = target.access();

    quote! {
        impl ::core::fmt::Display for #wrapper {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.#access, f)
            }
        }

        impl ::core::convert::From<#wrapper> for #inner {
            fn from(value: #wrapper) -> #inner {
                value.#access
            }
        }
    }
}

/// Convert PascalCase to snake_case.
fn to_snake_case(name: &str) -> String {
    let mut result = String::new();
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(ch.to_ascii_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}
