use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Marker derive for branded wrapper types.
///
/// The derive itself expands to nothing. It exists so that
/// `#[derive(Branded)]` and the `#[branded(...)]` helper attribute are legal
/// Rust: the actual companion code is produced by `branded-build`, which
/// scans source files for this marker and writes the generated module as
/// part of the build.
///
/// The helper attribute narrows the capabilities the generator implements
/// for the wrapper:
///
/// ```ignore
/// #[derive(Branded)]
/// #[branded(ordering, parsing)]
/// pub struct UserId(pub u64);
/// ```
#[proc_macro_derive(Branded, attributes(branded))]
pub fn derive_branded(input: TokenStream) -> TokenStream {
    // Parse so malformed input still gets a proper rustc error here instead
    // of a confusing one at the scanner stage.
    let _ = parse_macro_input!(input as DeriveInput);
    TokenStream::new()
}
