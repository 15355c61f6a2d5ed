//! Resolution of the process-wide `conventions!` declaration.

use std::hash::{Hash, Hasher};

use regex::Regex;
use syn::Token;
use syn::parse::{Parse, ParseStream};

use crate::diagnostics::{Diagnostic, DiagnosticKind, Outcome};
use crate::scanner::MacroDecl;

/// A compiled name filter. Equality and hashing go by the pattern source so
/// configurations stay value-comparable memoization keys.
#[derive(Debug, Clone)]
pub struct NamePattern {
    source: String,
    regex: Regex,
}

impl NamePattern {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

impl PartialEq for NamePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for NamePattern {}

impl Hash for NamePattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
    }
}

/// The resolved process-wide configuration. Immutable once resolved; at
/// most one `conventions!` declaration is honored per pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Configuration {
    pub type_name_pattern: Option<NamePattern>,
}

impl Configuration {
    /// Whether a candidate with this fully qualified name is treated as a
    /// wrapper.
    pub fn accepts(&self, qualified_name: &str) -> bool {
        match &self.type_name_pattern {
            Some(pattern) => pattern.is_match(qualified_name),
            None => true,
        }
    }
}

/// Resolve zero-or-one `conventions!` declarations into a configuration.
///
/// Zero yields the default (accept everything). More than one is a fatal
/// `InvalidConfiguration`; emission must not proceed on the default in that
/// case.
pub fn resolve_configuration(decls: &[MacroDecl]) -> Outcome<Configuration> {
    match decls {
        [] => Outcome::ok(Configuration::default()),
        [decl] => resolve_single(decl),
        _ => Outcome::error(Diagnostic::new(
            DiagnosticKind::InvalidConfiguration,
            decls[1].location.clone(),
            format!(
                "the configuration is invalid: expected exactly 1 conventions declaration, got {}",
                decls.len()
            ),
        )),
    }
}

fn resolve_single(decl: &MacroDecl) -> Outcome<Configuration> {
    let settings: SettingList = match syn::parse_str(&decl.body) {
        Ok(settings) => settings,
        Err(err) => {
            return Outcome::error(Diagnostic::new(
                DiagnosticKind::InvalidConfiguration,
                decl.location.clone(),
                format!("the configuration is invalid: {err}"),
            ));
        }
    };

    let mut configuration = Configuration::default();
    let mut warnings = Vec::new();

    for setting in settings.entries {
        match (setting.name.as_str(), &setting.value) {
            ("type_name_pattern", SettingValue::Str(pattern)) => match Regex::new(pattern) {
                Ok(regex) => {
                    configuration.type_name_pattern = Some(NamePattern {
                        source: pattern.clone(),
                        regex,
                    });
                }
                Err(err) => {
                    return Outcome::error(Diagnostic::new(
                        DiagnosticKind::InvalidConfiguration,
                        decl.location.clone(),
                        format!("the configuration is invalid: {err}"),
                    ));
                }
            },
            (name, _) => {
                warnings.push(Diagnostic::new(
                    DiagnosticKind::UnsupportedConfiguration,
                    decl.location.clone(),
                    format!(
                        "`{name}` is not supported, most probably due to a mismatch between \
                         branded and branded-build"
                    ),
                ));
            }
        }
    }

    Outcome::new(Some(configuration), warnings)
}

struct SettingList {
    entries: Vec<Setting>,
}

struct Setting {
    name: String,
    value: SettingValue,
}

enum SettingValue {
    Str(String),
    Other,
}

impl Parse for SettingList {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut entries = Vec::new();
        while !input.is_empty() {
            let name: syn::Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            let value = if input.peek(syn::LitStr) {
                SettingValue::Str(input.parse::<syn::LitStr>()?.value())
            } else {
                while !input.is_empty() && !input.peek(Token![,]) {
                    input.parse::<proc_macro2::TokenTree>()?;
                }
                SettingValue::Other
            };
            entries.push(Setting {
                name: name.to_string(),
                value,
            });
            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            } else {
                break;
            }
        }
        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Location;

    fn decl(body: &str, line: usize) -> MacroDecl {
        MacroDecl {
            body: body.to_string(),
            location: Location::new("src/lib.rs", line, 1),
        }
    }

    #[test]
    fn zero_declarations_accept_everything() {
        let outcome = resolve_configuration(&[]);
        let configuration = outcome.usable().unwrap();
        assert!(configuration.accepts("crate::ids::UserId"));
        assert!(configuration.accepts("crate::anything::Else"));
    }

    #[test]
    fn a_pattern_filters_by_qualified_name() {
        let outcome = resolve_configuration(&[decl(r#"type_name_pattern = "Id$""#, 1)]);
        let configuration = outcome.usable().unwrap();
        assert!(configuration.accepts("crate::ids::UserId"));
        assert!(!configuration.accepts("crate::ids::UserName"));
    }

    #[test]
    fn two_declarations_are_a_single_fatal_error_naming_the_count() {
        let outcome = resolve_configuration(&[
            decl(r#"type_name_pattern = "Id$""#, 1),
            decl(r#"type_name_pattern = "Key$""#, 9),
        ]);
        assert!(outcome.has_errors());
        assert_eq!(outcome.diagnostics.len(), 1);
        let diagnostic = &outcome.diagnostics[0];
        assert_eq!(diagnostic.kind, DiagnosticKind::InvalidConfiguration);
        assert!(diagnostic.message.contains("got 2"));
        assert_eq!(diagnostic.location.line, 9);
        assert_eq!(outcome.usable(), None);
    }

    #[test]
    fn an_invalid_pattern_is_fatal() {
        let outcome = resolve_configuration(&[decl(r#"type_name_pattern = "((""#, 1)]);
        assert!(outcome.has_errors());
        assert_eq!(
            outcome.diagnostics[0].kind,
            DiagnosticKind::InvalidConfiguration
        );
    }

    #[test]
    fn unknown_settings_warn_and_are_ignored() {
        let outcome =
            resolve_configuration(&[decl(r#"accent_color = "mauve", type_name_pattern = "Id$""#, 1)]);
        assert!(!outcome.has_errors());
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(
            outcome.diagnostics[0].kind,
            DiagnosticKind::UnsupportedConfiguration
        );
        assert!(outcome.diagnostics[0].message.contains("accent_color"));
        assert!(outcome.usable().unwrap().type_name_pattern.is_some());
    }

    #[test]
    fn a_non_string_value_for_the_pattern_is_unsupported_not_fatal() {
        let outcome = resolve_configuration(&[decl("type_name_pattern = 42", 1)]);
        assert!(!outcome.has_errors());
        assert_eq!(
            outcome.diagnostics[0].kind,
            DiagnosticKind::UnsupportedConfiguration
        );
        assert!(outcome.usable().unwrap().type_name_pattern.is_none());
    }

    #[test]
    fn garbage_bodies_are_invalid_configuration() {
        let outcome = resolve_configuration(&[decl("== what", 1)]);
        assert!(outcome.has_errors());
        assert_eq!(
            outcome.diagnostics[0].kind,
            DiagnosticKind::InvalidConfiguration
        );
    }
}
