//! Compilation of `decorate!` descriptors into reusable emission templates,
//! and the positional string-templating utility used to apply them.
//!
//! A compiled template is a macro-invocation line with `{0}` (wrapper type)
//! and `{1}` (inner type) slots. Literal braces in user data are escaped as
//! `{{`/`}}` at compile time so per-candidate substitution cannot be
//! corrupted.

use quote::ToTokens;
use regex::Regex;
use syn::Token;
use syn::parse::{Parse, ParseStream};

use crate::diagnostics::{Diagnostic, DiagnosticKind, Location, Outcome};
use crate::scanner::{MacroDecl, normalize_tokens, type_text};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeTemplate {
    /// `target!(arg, arg, name = value);` with positional slots.
    pub render: String,
    /// Inner-type allow list, canonical type text.
    pub only_for: Option<Vec<String>>,
    /// Inner-type deny list, canonical type text.
    pub except_for: Option<Vec<String>>,
    pub location: Location,
}

impl AttributeTemplate {
    /// A template applies iff the allow list (when present) contains the
    /// inner type and the deny list (when present) does not.
    pub fn applies_to(&self, inner: &str) -> bool {
        if let Some(only_for) = &self.only_for
            && !only_for.iter().any(|t| t == inner)
        {
            return false;
        }
        if let Some(except_for) = &self.except_for
            && except_for.iter().any(|t| t == inner)
        {
            return false;
        }
        true
    }

    /// One decoration line for a candidate.
    pub fn render_for(&self, wrapper: &str, inner: &str) -> String {
        expand_template(&self.render, wrapper, inner)
    }
}

/// Compile one `decorate!` declaration. Errors are fatal to this descriptor
/// only; sibling descriptors are unaffected.
pub fn compile_decoration(decl: &MacroDecl) -> Outcome<AttributeTemplate> {
    let body: DecorationBody = match syn::parse_str(&decl.body) {
        Ok(body) => body,
        Err(err) => {
            return Outcome::error(Diagnostic::new(
                DiagnosticKind::InvalidConfiguration,
                decl.location.clone(),
                format!("the decoration is invalid: {err}"),
            ));
        }
    };

    let warnings: Vec<Diagnostic> = body
        .unknown
        .iter()
        .map(|name| {
            Diagnostic::new(
                DiagnosticKind::UnsupportedConfiguration,
                decl.location.clone(),
                format!(
                    "`{name}` is not supported, most probably due to a mismatch between \
                     branded and branded-build"
                ),
            )
        })
        .collect();

    let Some(target) = &body.target else {
        return Outcome::error(Diagnostic::new(
            DiagnosticKind::InvalidConfiguration,
            decl.location.clone(),
            "the decoration is invalid: missing `target`".to_string(),
        ));
    };

    let mut rendered = Vec::new();
    for element in &body.args {
        match render_element(element) {
            Ok(text) => rendered.push(text),
            Err(fault) => return Outcome::error(fault.at(&decl.location)),
        }
    }

    if let Some(named) = &body.named_args {
        if named.len() % 2 != 0 {
            return Outcome::error(Diagnostic::new(
                DiagnosticKind::InvalidNamedArgumentList,
                decl.location.clone(),
                "named_args must consist of pairs of names (strings) and their values".to_string(),
            ));
        }
        for pair in named.chunks(2) {
            let name = match &pair[0] {
                Element::Str(lit) => lit.value(),
                other => {
                    return Outcome::error(Diagnostic::new(
                        DiagnosticKind::NamedArgumentNameMustBeString,
                        decl.location.clone(),
                        format!(
                            "the named argument name `{}` is not a string",
                            element_text(other)
                        ),
                    ));
                }
            };
            let value = match render_element(&pair[1]) {
                Ok(text) => text,
                Err(fault) => return Outcome::error(fault.at(&decl.location)),
            };
            rendered.push(format!("{name} = {value}"));
        }
    }

    let target = normalize_tokens(&target.to_token_stream().to_string());
    let template = AttributeTemplate {
        render: format!("{}!({});", target, rendered.join(", ")),
        only_for: body.only_for,
        except_for: body.except_for,
        location: decl.location.clone(),
    };
    Outcome::new(Some(template), warnings)
}

/// Substitute `{0}` and `{1}` and unescape literal braces.
pub fn expand_template(template: &str, wrapper: &str, inner: &str) -> String {
    let bytes = template.as_bytes();
    let mut out = String::with_capacity(template.len() + wrapper.len() + inner.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                out.push('{');
                i += 2;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                out.push('}');
                i += 2;
            }
            b'{' if bytes.get(i + 1) == Some(&b'0') && bytes.get(i + 2) == Some(&b'}') => {
                out.push_str(wrapper);
                i += 3;
            }
            b'{' if bytes.get(i + 1) == Some(&b'1') && bytes.get(i + 2) == Some(&b'}') => {
                out.push_str(inner);
                i += 3;
            }
            _ => {
                let ch = template[i..].chars().next().expect("char boundary");
                out.push(ch);
                i += ch.len_utf8();
            }
        }
    }
    out
}

fn escape_braces(text: &str) -> String {
    text.replace('{', "{{").replace('}', "}}")
}

struct TemplateFault {
    kind: DiagnosticKind,
    message: String,
}

impl TemplateFault {
    fn at(self, location: &Location) -> Diagnostic {
        Diagnostic::new(self.kind, location.clone(), self.message)
    }
}

fn invalid_generic() -> TemplateFault {
    TemplateFault {
        kind: DiagnosticKind::InvalidGenericType,
        message: "when using an encoded generic reference, the first element must be an \
                  unbound generic type (all type arguments `_`) and the remainder of the \
                  list must be its type arguments"
            .to_string(),
    }
}

/// One argument value in a `decorate!` body.
enum Element {
    /// A string literal; kept whole so named-argument names can be read back.
    Str(syn::LitStr),
    /// Any other literal, rendered and escaped.
    Literal(String),
    Type(syn::Type),
    /// `[Head<_, _>, Arg, Arg]`, validated at render time.
    Encoded(Vec<Element>),
}

impl Parse for Element {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.peek(syn::token::Bracket) {
            let inner;
            syn::bracketed!(inner in input);
            let elements =
                syn::punctuated::Punctuated::<Element, Token![,]>::parse_terminated(&inner)?;
            return Ok(Element::Encoded(elements.into_iter().collect()));
        }
        if input.peek(syn::Lit) || input.peek(Token![-]) {
            let negative = input.parse::<Option<Token![-]>>()?.is_some();
            let lit: syn::Lit = input.parse()?;
            if let syn::Lit::Str(lit) = &lit
                && !negative
            {
                return Ok(Element::Str(lit.clone()));
            }
            let text = lit.to_token_stream().to_string();
            let text = if negative { format!("-{text}") } else { text };
            return Ok(Element::Literal(escape_braces(&text)));
        }
        Ok(Element::Type(input.parse()?))
    }
}

fn element_text(element: &Element) -> String {
    match element {
        Element::Str(lit) => lit.to_token_stream().to_string(),
        Element::Literal(text) => text.clone(),
        Element::Type(ty) => type_text(ty),
        Element::Encoded(_) => "[...]".to_string(),
    }
}

fn render_element(element: &Element) -> Result<String, TemplateFault> {
    match element {
        Element::Str(lit) => Ok(escape_braces(&lit.to_token_stream().to_string())),
        Element::Literal(text) => Ok(text.clone()),
        Element::Type(ty) => Ok(render_type(ty)),
        Element::Encoded(elements) => render_encoded(elements),
    }
}

fn render_type(ty: &syn::Type) -> String {
    if let Some(slot) = sentinel_slot(ty) {
        return slot.to_string();
    }
    let text = escape_braces(&type_text(ty));
    if text.contains('<') {
        substitute_sentinels(&text)
    } else {
        text
    }
}

/// The three well-known placeholder type names, bare or `branded::`-prefixed.
fn sentinel_slot(ty: &syn::Type) -> Option<&'static str> {
    let syn::Type::Path(type_path) = ty else {
        return None;
    };
    if type_path.qself.is_some() {
        return None;
    }
    let segments = &type_path.path.segments;
    let last = segments.last()?;
    if !matches!(last.arguments, syn::PathArguments::None) {
        return None;
    }
    let qualified_ok = match segments.len() {
        1 => true,
        2 => segments[0].ident == "branded",
        _ => false,
    };
    if !qualified_ok {
        return None;
    }
    slot_for(&last.ident.to_string())
}

fn slot_for(name: &str) -> Option<&'static str> {
    match name {
        "WrapperType" => Some("{0}"),
        "InnerType" => Some("{1}"),
        "ConverterType" => Some("<{0} as ::branded::BrandedType>::Converter"),
        _ => None,
    }
}

/// Placeholder substitution inside a closed generic type's rendered text.
fn substitute_sentinels(text: &str) -> String {
    let mut out = text.to_string();
    for (name, slot) in [
        ("WrapperType", "{0}"),
        ("InnerType", "{1}"),
        ("ConverterType", "<{0} as ::branded::BrandedType>::Converter"),
    ] {
        let pattern = Regex::new(&format!(r"\b(?:branded::)?{name}\b")).expect("static pattern");
        out = pattern.replace_all(&out, slot).into_owned();
    }
    out
}

fn render_encoded(elements: &[Element]) -> Result<String, TemplateFault> {
    let Some((head, tail)) = elements.split_first() else {
        return Err(invalid_generic());
    };
    let Element::Type(syn::Type::Path(head_path)) = head else {
        return Err(invalid_generic());
    };
    let Some(last) = head_path.path.segments.last() else {
        return Err(invalid_generic());
    };
    let syn::PathArguments::AngleBracketed(args) = &last.arguments else {
        return Err(invalid_generic());
    };
    let unbound = args
        .args
        .iter()
        .all(|arg| matches!(arg, syn::GenericArgument::Type(syn::Type::Infer(_))));
    if !unbound || args.args.is_empty() || args.args.len() != tail.len() {
        return Err(invalid_generic());
    }

    let mut rendered = Vec::with_capacity(tail.len());
    for element in tail {
        match element {
            Element::Type(ty) => rendered.push(render_type(ty)),
            _ => return Err(invalid_generic()),
        }
    }

    let mut head = head_path.path.clone();
    if let Some(last) = head.segments.last_mut() {
        last.arguments = syn::PathArguments::None;
    }
    let head = escape_braces(&normalize_tokens(&head.to_token_stream().to_string()));
    Ok(format!("{}<{}>", head, rendered.join(", ")))
}

struct DecorationBody {
    target: Option<syn::Path>,
    args: Vec<Element>,
    named_args: Option<Vec<Element>>,
    only_for: Option<Vec<String>>,
    except_for: Option<Vec<String>>,
    unknown: Vec<String>,
}

impl Parse for DecorationBody {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut body = DecorationBody {
            target: None,
            args: Vec::new(),
            named_args: None,
            only_for: None,
            except_for: None,
            unknown: Vec::new(),
        };

        while !input.is_empty() {
            let key: syn::Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            match key.to_string().as_str() {
                "target" => body.target = Some(input.parse()?),
                "args" => body.args = parse_element_list(input)?,
                "named_args" => body.named_args = Some(parse_element_list(input)?),
                "only_for" => body.only_for = Some(parse_type_list(input)?),
                "except_for" => body.except_for = Some(parse_type_list(input)?),
                other => {
                    while !input.is_empty() && !input.peek(Token![,]) {
                        input.parse::<proc_macro2::TokenTree>()?;
                    }
                    body.unknown.push(other.to_string());
                }
            }
            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            } else {
                break;
            }
        }

        Ok(body)
    }
}

fn parse_element_list(input: ParseStream) -> syn::Result<Vec<Element>> {
    let inner;
    syn::bracketed!(inner in input);
    let elements = syn::punctuated::Punctuated::<Element, Token![,]>::parse_terminated(&inner)?;
    Ok(elements.into_iter().collect())
}

fn parse_type_list(input: ParseStream) -> syn::Result<Vec<String>> {
    let inner;
    syn::bracketed!(inner in input);
    let types = syn::punctuated::Punctuated::<syn::Type, Token![,]>::parse_terminated(&inner)?;
    Ok(types.iter().map(type_text).collect())
}
