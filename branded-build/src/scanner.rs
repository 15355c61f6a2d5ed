//! Source file scanner: discovers wrapper candidates and the `conventions!`
//! and `decorate!` declarations.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use quote::ToTokens;
use syn::spanned::Spanned;
use syn::{Attribute, Fields, Item, Visibility};
use walkdir::WalkDir;

use crate::capability::CapabilityRegistry;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Location, Outcome};

/// One recognized wrapper declaration.
///
/// `inner_type` and `accessor` hold `"?"` when the declaration is malformed;
/// such a candidate still carries its location so diagnostics can point at
/// it, but it never reaches emission.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WrapperCandidate {
    /// The struct name (e.g. "UserId").
    pub name: String,
    /// The module the struct is declared in (e.g. "crate::ids").
    pub module_path: String,
    /// `module_path::name`.
    pub qualified_name: String,
    pub location: Location,
    /// The single field's type, as canonical text.
    pub inner_type: String,
    /// The single field's name ("0" for tuple structs).
    pub accessor: String,
    /// Eligible capabilities, narrowed by any `#[branded(...)]` request.
    pub capabilities: Vec<String>,
}

/// A `conventions!` or `decorate!` declaration, kept as raw text so later
/// stages can parse it and descriptors stay value-comparable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MacroDecl {
    pub body: String,
    pub location: Location,
}

/// Everything one scan pass discovered.
#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    pub candidates: Vec<Outcome<WrapperCandidate>>,
    pub conventions: Vec<MacroDecl>,
    pub decorations: Vec<MacroDecl>,
    /// File-level diagnostics (unparsable files).
    pub diagnostics: Vec<Diagnostic>,
}

impl ScanOutput {
    pub fn merge(&mut self, other: ScanOutput) {
        self.candidates.extend(other.candidates);
        self.conventions.extend(other.conventions);
        self.decorations.extend(other.decorations);
        self.diagnostics.extend(other.diagnostics);
    }
}

/// Scan a directory recursively for Rust files containing wrapper
/// declarations. File order is deterministic.
pub fn scan_directory(
    path: &Path,
    crate_name: &str,
    capabilities: &CapabilityRegistry,
) -> Result<ScanOutput> {
    let mut output = ScanOutput::default();

    for entry in WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path().extension().is_some_and(|ext| ext == "rs")
                && !e.path().to_string_lossy().contains("/generated/")
                && !e.path().to_string_lossy().contains("/target/")
        })
    {
        let file_path = entry.path();
        let content = fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read {}", file_path.display()))?;
        let module_path = compute_module_path(file_path, path, crate_name);
        output.merge(scan_source(&content, &module_path, file_path, capabilities));
    }

    Ok(output)
}

/// Scan one file's contents. A file that does not parse as Rust is skipped
/// with a warning instead of failing the pass.
pub fn scan_source(
    content: &str,
    module_path: &str,
    file: &Path,
    capabilities: &CapabilityRegistry,
) -> ScanOutput {
    let mut output = ScanOutput::default();

    let syntax = match syn::parse_file(content) {
        Ok(syntax) => syntax,
        Err(err) => {
            output.diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnparsableFile,
                Location::new(file, 1, 1),
                format!("skipped: {err}"),
            ));
            return output;
        }
    };

    collect_items(&syntax.items, module_path, file, capabilities, &mut output);
    output
}

fn collect_items(
    items: &[Item],
    module_path: &str,
    file: &Path,
    capabilities: &CapabilityRegistry,
    output: &mut ScanOutput,
) {
    for item in items {
        match item {
            Item::Struct(item_struct) if has_branded_derive(&item_struct.attrs) => {
                output
                    .candidates
                    .push(parse_candidate(item_struct, module_path, file, capabilities));
            }
            Item::Macro(item_macro) => {
                let Some(kind) = marker_macro_name(&item_macro.mac.path) else {
                    continue;
                };
                let decl = MacroDecl {
                    body: item_macro.mac.tokens.to_string(),
                    location: Location::from_span(file, item_macro.mac.path.span()),
                };
                match kind {
                    "conventions" => output.conventions.push(decl),
                    _ => output.decorations.push(decl),
                }
            }
            Item::Mod(item_mod) => {
                if let Some((_, items)) = &item_mod.content {
                    let nested = format!("{}::{}", module_path, item_mod.ident);
                    collect_items(items, &nested, file, capabilities, output);
                }
            }
            _ => {}
        }
    }
}

/// Check if a struct has `#[derive(Branded)]`.
fn has_branded_derive(attrs: &[Attribute]) -> bool {
    for attr in attrs {
        if attr.path().is_ident("derive")
            && let Ok(nested) = attr.parse_args_with(
                syn::punctuated::Punctuated::<syn::Path, syn::Token![,]>::parse_terminated,
            )
        {
            for path in nested {
                if path
                    .segments
                    .last()
                    .is_some_and(|segment| segment.ident == "Branded")
                {
                    return true;
                }
            }
        }
    }
    false
}

/// `branded::conventions!` / `branded::decorate!` (or their bare forms).
fn marker_macro_name(path: &syn::Path) -> Option<&'static str> {
    let segments: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();
    let name = match segments.as_slice() {
        [name] => name.as_str(),
        [krate, name] if krate == "branded" => name.as_str(),
        _ => return None,
    };
    match name {
        "conventions" => Some("conventions"),
        "decorate" => Some("decorate"),
        _ => None,
    }
}

fn parse_candidate(
    item: &syn::ItemStruct,
    module_path: &str,
    file: &Path,
    capabilities: &CapabilityRegistry,
) -> Outcome<WrapperCandidate> {
    let name = item.ident.to_string();
    let location = Location::from_span(file, item.ident.span());
    let placeholder = WrapperCandidate {
        name: name.clone(),
        module_path: module_path.to_string(),
        qualified_name: format!("{module_path}::{name}"),
        location: location.clone(),
        inner_type: "?".to_string(),
        accessor: "?".to_string(),
        capabilities: Vec::new(),
    };

    if !item.generics.params.is_empty() {
        return Outcome::new(
            None,
            vec![Diagnostic::new(
                DiagnosticKind::UnsupportedConfiguration,
                location,
                format!("`{name}` has type parameters, which branded wrappers do not support"),
            )],
        );
    }

    if !matches!(item.vis, Visibility::Public(_)) {
        return Outcome::flawed(
            placeholder,
            Diagnostic::new(
                DiagnosticKind::MissingPubVisibility,
                location,
                format!("`{name}` must be `pub` so generated companions can reach it"),
            ),
        );
    }

    let field = match &item.fields {
        Fields::Named(fields) if fields.named.len() == 1 => &fields.named[0],
        Fields::Unnamed(fields) if fields.unnamed.len() == 1 => &fields.unnamed[0],
        _ => {
            return Outcome::flawed(
                placeholder,
                Diagnostic::new(
                    DiagnosticKind::MissingInnerField,
                    location,
                    format!("`{name}` must have exactly one field"),
                ),
            );
        }
    };

    if !matches!(field.vis, Visibility::Public(_)) {
        return Outcome::flawed(
            placeholder,
            Diagnostic::new(
                DiagnosticKind::MissingPubVisibility,
                location,
                format!("the field of `{name}` must be `pub` so generated companions can reach it"),
            ),
        );
    }

    let inner_type = type_text(&field.ty);
    let accessor = field
        .ident
        .as_ref()
        .map(|ident| ident.to_string())
        .unwrap_or_else(|| "0".to_string());

    let (requested, warnings) = parse_capability_request(&item.attrs, &location, capabilities);
    let mut eligible = capabilities.eligible(&inner_type);
    if let Some(requested) = requested {
        eligible.retain(|capability| requested.contains(capability));
    }

    Outcome::new(
        Some(WrapperCandidate {
            inner_type,
            accessor,
            capabilities: eligible,
            ..placeholder
        }),
        warnings,
    )
}

/// Parse `#[branded(ordering, parsing)]` into a requested-capability list.
/// Unknown names warn and are ignored.
fn parse_capability_request(
    attrs: &[Attribute],
    location: &Location,
    capabilities: &CapabilityRegistry,
) -> (Option<Vec<String>>, Vec<Diagnostic>) {
    let mut requested = None;
    let mut warnings = Vec::new();

    for attr in attrs {
        if !attr.path().is_ident("branded") {
            continue;
        }
        let nested = match attr.parse_args_with(
            syn::punctuated::Punctuated::<syn::Ident, syn::Token![,]>::parse_terminated,
        ) {
            Ok(nested) => nested,
            Err(err) => {
                warnings.push(Diagnostic::new(
                    DiagnosticKind::UnsupportedConfiguration,
                    location.clone(),
                    format!("unsupported `#[branded]` attribute: {err}"),
                ));
                continue;
            }
        };
        let list = requested.get_or_insert_with(Vec::new);
        for ident in nested {
            let name = ident.to_string();
            if capabilities.contains(&name) {
                list.push(name);
            } else {
                warnings.push(Diagnostic::new(
                    DiagnosticKind::UnsupportedConfiguration,
                    location.clone(),
                    format!("`{name}` is not a recognized capability"),
                ));
            }
        }
    }

    (requested, warnings)
}

/// Canonical text of a type: token text with the gaps the tokenizer inserts
/// around path and generic punctuation removed, so that matching against
/// `only_for`/`except_for` lists is stable.
pub(crate) fn type_text(ty: &syn::Type) -> String {
    normalize_tokens(&ty.to_token_stream().to_string())
}

pub(crate) fn normalize_tokens(text: &str) -> String {
    text.replace(" :: ", "::")
        .replace(":: ", "::")
        .replace(" ::", "::")
        .replace(" < ", "<")
        .replace("< ", "<")
        .replace(" <", "<")
        .replace(" > ", ">")
        .replace(" >", ">")
        .replace(" ,", ",")
}

/// Compute the module path from a file path.
/// e.g. "src/ids/domain.rs" -> "crate::ids::domain"
fn compute_module_path(file_path: &Path, base_path: &Path, crate_name: &str) -> String {
    let relative = file_path.strip_prefix(base_path).unwrap_or(file_path);

    let without_extension = relative.with_extension("");
    let mut parts: Vec<&str> = without_extension
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();

    // Remove "mod", "lib" or "main" from the end if present
    if let Some(last) = parts.last()
        && (*last == "mod" || *last == "lib" || *last == "main")
    {
        parts.pop();
    }

    if parts.is_empty() {
        crate_name.to_string()
    } else {
        format!("{}::{}", crate_name, parts.join("::"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scan(code: &str) -> ScanOutput {
        scan_source(
            code,
            "crate::ids",
            &PathBuf::from("src/ids.rs"),
            &CapabilityRegistry::standard(),
        )
    }

    #[test]
    fn recognizes_a_well_formed_wrapper() {
        let output = scan(
            r#"
            #[derive(Debug, Clone, Branded)]
            pub struct UserId(pub u64);
            "#,
        );

        assert_eq!(output.candidates.len(), 1);
        let candidate = output.candidates[0].usable().expect("candidate is usable");
        assert_eq!(candidate.name, "UserId");
        assert_eq!(candidate.qualified_name, "crate::ids::UserId");
        assert_eq!(candidate.inner_type, "u64");
        assert_eq!(candidate.accessor, "0");
        assert_eq!(candidate.capabilities, ["ordering", "hashing", "parsing"]);
    }

    #[test]
    fn named_field_wrappers_use_the_field_name_as_accessor() {
        let output = scan(
            r#"
            #[derive(Branded)]
            pub struct UserName {
                pub value: String,
            }
            "#,
        );

        let candidate = output.candidates[0].usable().unwrap();
        assert_eq!(candidate.inner_type, "String");
        assert_eq!(candidate.accessor, "value");
    }

    #[test]
    fn missing_pub_yields_one_error_and_placeholders() {
        let output = scan(
            r#"
            #[derive(Branded)]
            struct UserId(pub u64);
            "#,
        );

        let outcome = &output.candidates[0];
        assert!(outcome.has_errors());
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(
            outcome.diagnostics[0].kind,
            DiagnosticKind::MissingPubVisibility
        );
        let candidate = outcome.value.as_ref().unwrap();
        assert_eq!(candidate.inner_type, "?");
        assert_eq!(candidate.accessor, "?");
    }

    #[test]
    fn private_field_is_a_visibility_error_too() {
        let output = scan(
            r#"
            #[derive(Branded)]
            pub struct UserId(u64);
            "#,
        );

        assert_eq!(
            output.candidates[0].diagnostics[0].kind,
            DiagnosticKind::MissingPubVisibility
        );
    }

    #[test]
    fn wrong_field_count_yields_one_error() {
        for code in [
            "#[derive(Branded)] pub struct Unit;",
            "#[derive(Branded)] pub struct Pair(pub u64, pub u64);",
        ] {
            let output = scan(code);
            let outcome = &output.candidates[0];
            assert_eq!(outcome.diagnostics.len(), 1);
            assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::MissingInnerField);
            assert_eq!(outcome.usable(), None);
        }
    }

    #[test]
    fn capability_requests_narrow_the_eligible_set() {
        let output = scan(
            r#"
            #[derive(Branded)]
            #[branded(ordering)]
            pub struct UserId(pub u64);
            "#,
        );

        let candidate = output.candidates[0].usable().unwrap();
        assert_eq!(candidate.capabilities, ["ordering"]);
    }

    #[test]
    fn unknown_capability_names_warn_and_are_ignored() {
        let output = scan(
            r#"
            #[derive(Branded)]
            #[branded(ordering, sparkles)]
            pub struct UserId(pub u64);
            "#,
        );

        let outcome = &output.candidates[0];
        assert!(!outcome.has_errors());
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(
            outcome.diagnostics[0].kind,
            DiagnosticKind::UnsupportedConfiguration
        );
        assert_eq!(outcome.value.as_ref().unwrap().capabilities, ["ordering"]);
    }

    #[test]
    fn collects_marker_macros_and_nested_modules() {
        let output = scan(
            r#"
            branded::conventions! {
                type_name_pattern = r"Id$",
            }

            branded::decorate! {
                target = some::registration,
                args = [WrapperType],
            }

            pub mod inner {
                #[derive(Branded)]
                pub struct OrderId(pub i64);
            }
            "#,
        );

        assert_eq!(output.conventions.len(), 1);
        assert_eq!(output.decorations.len(), 1);
        assert_eq!(
            output.candidates[0].usable().unwrap().qualified_name,
            "crate::ids::inner::OrderId"
        );
    }

    #[test]
    fn unparsable_files_are_skipped_with_a_warning() {
        let output = scan("pub struct {");
        assert!(output.candidates.is_empty());
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].kind, DiagnosticKind::UnparsableFile);
    }

    #[test]
    fn identical_declaration_text_yields_value_equal_candidates() {
        let code = r#"
            #[derive(Branded)]
            pub struct UserId(pub u64);
        "#;
        assert_eq!(scan(code).candidates, scan(code).candidates);
    }

    #[test]
    fn module_paths_follow_file_layout() {
        let base = PathBuf::from("src");
        for (path, expected) in [
            ("src/ids/domain.rs", "crate::ids::domain"),
            ("src/ids/mod.rs", "crate::ids"),
            ("src/lib.rs", "crate"),
        ] {
            assert_eq!(
                compute_module_path(&PathBuf::from(path), &base, "crate"),
                expected
            );
        }
    }
}
