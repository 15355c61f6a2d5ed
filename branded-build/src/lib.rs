//! Build-time companion-code generator for branded wrapper types.
//!
//! This crate scans your source files for `#[derive(Branded)]` single-field
//! structs and generates their companion code: a wrap/unwrap converter with
//! a dispatch entry point (when the `branded` runtime crate is available),
//! textual and value conversions, capability forwarding impls, and any
//! decorations declared with `branded::decorate!`. A process-wide
//! `branded::conventions!` declaration can restrict which structs are
//! treated as wrappers by name.
//!
//! # Example
//!
//! In your `build.rs`:
//!
//! ```ignore
//! fn main() {
//!     let report = branded_build::generate()
//!         .scan_path("src/")
//!         .output_dir("src/generated")
//!         .run()
//!         .expect("Failed to generate branded companions");
//!     assert!(!report.has_errors(), "branded-build reported errors");
//!
//!     println!("cargo:rerun-if-changed=src/");
//! }
//! ```
//!
//! The pipeline itself is pure: [`generator::run_pass`] maps a scanned
//! snapshot to generated units plus diagnostics, memoized per candidate, so
//! hosts that re-run on edits only pay for what changed.

pub mod capability;
pub mod config;
pub mod diagnostics;
pub mod emit;
pub mod generator;
pub mod memo;
pub mod scanner;
pub mod template;

pub use generator::{GenerationReport, GeneratorBuilder};

/// Create a new generator with default settings.
///
/// # Example
///
/// ```ignore
/// branded_build::generate()
///     .scan_path("src/")
///     .output_dir("src/generated")
///     .run()
///     .expect("Failed to generate branded companions");
/// ```
pub fn generate() -> GeneratorBuilder {
    GeneratorBuilder::new()
}
