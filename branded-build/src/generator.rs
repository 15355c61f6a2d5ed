//! Builder for configuring and running the generator, and the pure
//! generation pass it drives.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::capability::{Capability, CapabilityRegistry};
use crate::config::resolve_configuration;
use crate::diagnostics::Diagnostic;
use crate::emit::{GeneratedUnit, emit_candidate};
use crate::memo::Memo;
use crate::scanner::{ScanOutput, WrapperCandidate, scan_directory};
use crate::template::{AttributeTemplate, compile_decoration};

/// Broadcast inputs of one generation pass.
pub struct PassOptions {
    pub runtime_support: bool,
    pub capabilities: CapabilityRegistry,
}

/// Everything one pass produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PassOutput {
    pub units: Vec<GeneratedUnit>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Run one generation pass over a scanned snapshot.
///
/// Pure apart from the memo: re-running on an unchanged snapshot produces
/// byte-identical units and an identical diagnostic set, served from cache.
/// All diagnostics are surfaced, including those of candidates that are
/// excluded from emission. An invalid configuration halts emission
/// entirely; only zero `conventions!` declarations fall back to the
/// default.
pub fn run_pass(scan: &ScanOutput, options: &PassOptions, memo: &mut Memo) -> PassOutput {
    let mut diagnostics = scan.diagnostics.clone();

    let configuration = resolve_configuration(&scan.conventions);
    diagnostics.extend(configuration.diagnostics.iter().cloned());

    let mut templates: Vec<AttributeTemplate> = Vec::new();
    for decl in &scan.decorations {
        let outcome = compile_decoration(decl);
        diagnostics.extend(outcome.diagnostics.iter().cloned());
        if let Some(template) = outcome.usable() {
            templates.push(template.clone());
        }
    }

    for outcome in &scan.candidates {
        diagnostics.extend(outcome.diagnostics.iter().cloned());
    }

    let Some(configuration) = configuration.usable() else {
        return PassOutput {
            units: Vec::new(),
            diagnostics,
        };
    };

    // Deduplicate (overlapping scan roots), filter, then order candidates
    // by name so the output is independent of discovery order.
    let mut seen = HashSet::new();
    let mut candidates: Vec<&WrapperCandidate> = scan
        .candidates
        .iter()
        .filter_map(|outcome| outcome.usable())
        .filter(|candidate| seen.insert(candidate.qualified_name.clone()))
        .filter(|candidate| configuration.accepts(&candidate.qualified_name))
        .collect();
    candidates.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));

    let mut units = Vec::new();
    for candidate in candidates {
        let key = Memo::key(candidate, configuration, &templates, options.runtime_support);
        let outcome = memo.lookup(key).unwrap_or_else(|| {
            let outcome = emit_candidate(
                candidate,
                &templates,
                &options.capabilities,
                options.runtime_support,
            );
            memo.store(key, &outcome);
            outcome
        });
        diagnostics.extend(outcome.diagnostics.iter().cloned());
        if let Some(unit) = outcome.value {
            units.push(unit);
        }
    }

    PassOutput { units, diagnostics }
}

/// What a [`GeneratorBuilder::run`] call did.
#[derive(Debug)]
pub struct GenerationReport {
    pub diagnostics: Vec<Diagnostic>,
    /// Files whose content changed and were (re)written.
    pub written: Vec<PathBuf>,
    /// Units served from the memo instead of re-emitted.
    pub reused: usize,
    /// Total units produced by the pass.
    pub generated: usize,
}

impl GenerationReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity() == crate::diagnostics::Severity::Error)
    }
}

/// Builder for configuring and running the generator.
pub struct GeneratorBuilder {
    scan_paths: Vec<PathBuf>,
    output_dir: PathBuf,
    crate_name: String,
    manifest_path: PathBuf,
    runtime_support: Option<bool>,
    capabilities: CapabilityRegistry,
}

impl GeneratorBuilder {
    /// Create a new generator with default settings.
    pub fn new() -> Self {
        Self {
            scan_paths: Vec::new(),
            output_dir: PathBuf::from("src/generated"),
            crate_name: "crate".to_string(),
            manifest_path: PathBuf::from("Cargo.toml"),
            runtime_support: None,
            capabilities: CapabilityRegistry::standard(),
        }
    }

    /// Add a path to scan for wrapper declarations.
    ///
    /// Can be called multiple times to scan multiple directories.
    pub fn scan_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.scan_paths.push(path.into());
        self
    }

    /// Set the directory the generated units are written to.
    ///
    /// Default: `src/generated`
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    /// Set the crate name used in generated paths.
    ///
    /// Default: `crate`
    pub fn crate_name(mut self, name: impl Into<String>) -> Self {
        self.crate_name = name.into();
        self
    }

    /// Set the manifest consulted to detect whether the `branded` runtime
    /// crate is available to the generation target.
    ///
    /// Default: `Cargo.toml`
    pub fn manifest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_path = path.into();
        self
    }

    /// Force the runtime-support flag instead of detecting it from the
    /// manifest.
    pub fn runtime_support(mut self, available: bool) -> Self {
        self.runtime_support = Some(available);
        self
    }

    /// Register an additional capability (or replace a built-in one).
    pub fn capability(mut self, capability: Capability) -> Self {
        self.capabilities.register(capability);
        self
    }

    /// Run the generator.
    ///
    /// Scans all configured paths, runs one generation pass, and writes the
    /// generated units plus a `mod.rs` into the output directory. Files are
    /// only rewritten when their content changed.
    pub fn run(self) -> Result<GenerationReport> {
        let scan_paths = if self.scan_paths.is_empty() {
            vec![PathBuf::from("src/")]
        } else {
            self.scan_paths
        };

        let runtime_support = match self.runtime_support {
            Some(available) => available,
            None => detect_runtime_support(&self.manifest_path),
        };

        let mut scan = ScanOutput::default();
        for path in &scan_paths {
            let output = scan_directory(path, &self.crate_name, &self.capabilities)
                .with_context(|| format!("Failed to scan {}", path.display()))?;
            scan.merge(output);
        }

        let options = PassOptions {
            runtime_support,
            capabilities: self.capabilities,
        };
        let mut memo = Memo::new();
        let pass = run_pass(&scan, &options, &mut memo);

        fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("Failed to create directory {}", self.output_dir.display()))?;

        let mut written = Vec::new();
        for unit in &pass.units {
            let path = self.output_dir.join(&unit.file_name);
            if write_if_changed(&path, &unit.source)? {
                written.push(path);
            }
        }

        let mod_path = self.output_dir.join("mod.rs");
        if write_if_changed(&mod_path, &mod_contents(&pass.units))? {
            written.push(mod_path);
        }

        for diagnostic in &pass.diagnostics {
            eprintln!("branded-build: {diagnostic}");
        }
        if !written.is_empty() {
            eprintln!(
                "branded-build: generated {} units into {} ({} files changed)",
                pass.units.len(),
                self.output_dir.display(),
                written.len()
            );
        }

        Ok(GenerationReport {
            diagnostics: pass.diagnostics,
            written,
            reused: memo.hits(),
            generated: pass.units.len(),
        })
    }
}

impl Default for GeneratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the target's manifest lists the `branded` runtime crate. An
/// unreadable or unparsable manifest counts as "not available".
fn detect_runtime_support(manifest_path: &Path) -> bool {
    let Ok(contents) = fs::read_to_string(manifest_path) else {
        return false;
    };
    let Ok(manifest) = contents.parse::<toml::Table>() else {
        return false;
    };
    ["dependencies", "dev-dependencies"].iter().any(|table| {
        manifest
            .get(*table)
            .and_then(|deps| deps.as_table())
            .is_some_and(|deps| deps.contains_key("branded"))
    })
}

fn mod_contents(units: &[GeneratedUnit]) -> String {
    let mut contents = String::from("//! Auto-generated module. Do not edit manually.\n\n");
    let mut names: Vec<&str> = units.iter().map(|unit| unit.module_name.as_str()).collect();
    names.sort_unstable();
    for name in names {
        contents.push_str(&format!("pub mod {name};\n"));
    }
    contents
}

/// Write only if content changed, to avoid needless recompilation.
fn write_if_changed(path: &Path, contents: &str) -> Result<bool> {
    let unchanged = matches!(fs::read_to_string(path), Ok(existing) if existing == contents);
    if unchanged {
        return Ok(false);
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::scanner::scan_source;
    use std::path::PathBuf;

    fn scan(code: &str) -> ScanOutput {
        scan_source(
            code,
            "crate",
            &PathBuf::from("src/lib.rs"),
            &CapabilityRegistry::standard(),
        )
    }

    fn options() -> PassOptions {
        PassOptions {
            runtime_support: true,
            capabilities: CapabilityRegistry::standard(),
        }
    }

    const TWO_WRAPPERS: &str = r#"
        #[derive(Branded)]
        pub struct UserId(pub u64);

        #[derive(Branded)]
        pub struct UserName(pub String);
    "#;

    #[test]
    fn a_pass_emits_one_unit_per_valid_candidate() {
        let mut memo = Memo::new();
        let pass = run_pass(&scan(TWO_WRAPPERS), &options(), &mut memo);
        assert_eq!(pass.units.len(), 2);
        let generated: Vec<_> = pass
            .diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::CodeGenerated)
            .collect();
        assert_eq!(generated.len(), 2);
    }

    #[test]
    fn malformed_candidates_are_reported_but_not_emitted() {
        let code = r#"
            #[derive(Branded)]
            struct Hidden(pub u64);

            #[derive(Branded)]
            pub struct UserId(pub u64);
        "#;
        let mut memo = Memo::new();
        let pass = run_pass(&scan(code), &options(), &mut memo);
        assert_eq!(pass.units.len(), 1);
        assert!(
            pass.diagnostics
                .iter()
                .any(|d| d.kind == DiagnosticKind::MissingPubVisibility)
        );
    }

    #[test]
    fn a_name_pattern_excludes_candidates_silently() {
        let code = r#"
            branded::conventions! {
                type_name_pattern = "Id$",
            }

            #[derive(Branded)]
            pub struct UserId(pub u64);

            #[derive(Branded)]
            pub struct UserName(pub String);
        "#;
        let mut memo = Memo::new();
        let pass = run_pass(&scan(code), &options(), &mut memo);
        assert_eq!(pass.units.len(), 1);
        assert_eq!(pass.units[0].qualified_name, "crate::UserId");
        // Exclusion carries no diagnostics of its own.
        assert!(
            pass.diagnostics
                .iter()
                .all(|d| !d.message.contains("UserName"))
        );
    }

    #[test]
    fn an_invalid_configuration_halts_emission_entirely() {
        let code = r#"
            branded::conventions! { type_name_pattern = "Id$", }
            branded::conventions! { type_name_pattern = "Key$", }

            #[derive(Branded)]
            pub struct UserId(pub u64);
        "#;
        let mut memo = Memo::new();
        let pass = run_pass(&scan(code), &options(), &mut memo);
        assert!(pass.units.is_empty());
        let errors: Vec<_> = pass
            .diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::InvalidConfiguration)
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("got 2"));
    }

    #[test]
    fn a_failed_template_does_not_affect_its_siblings() {
        let code = r#"
            branded::decorate! {
                target = broken::register,
                args = [[json::Codec<_, _>, WrapperType]],
            }

            branded::decorate! {
                target = fine::register,
                args = [WrapperType],
            }

            #[derive(Branded)]
            pub struct UserId(pub u64);
        "#;
        let mut memo = Memo::new();
        let pass = run_pass(&scan(code), &options(), &mut memo);
        assert_eq!(pass.units.len(), 1);
        assert!(pass.units[0].source.contains("fine::register!(crate::UserId);"));
        assert!(!pass.units[0].source.contains("broken"));
        assert!(
            pass.diagnostics
                .iter()
                .any(|d| d.kind == DiagnosticKind::InvalidGenericType)
        );
    }

    #[test]
    fn rerunning_an_unchanged_snapshot_is_byte_identical_and_memoized() {
        let scan = scan(TWO_WRAPPERS);
        let options = options();
        let mut memo = Memo::new();
        let first = run_pass(&scan, &options, &mut memo);
        assert_eq!(memo.hits(), 0);
        let second = run_pass(&scan, &options, &mut memo);
        assert_eq!(first, second);
        assert_eq!(memo.hits(), 2);
    }

    #[test]
    fn changing_one_candidate_reuses_the_other() {
        let options = options();
        let mut memo = Memo::new();
        run_pass(&scan(TWO_WRAPPERS), &options, &mut memo);

        let changed = TWO_WRAPPERS.replace("u64", "u32");
        let pass = run_pass(&scan(&changed), &options, &mut memo);
        assert_eq!(pass.units.len(), 2);
        // UserName is untouched and served from cache; UserId re-emits.
        assert_eq!(memo.hits(), 1);
    }

    #[test]
    fn duplicate_discoveries_collapse_to_one_unit() {
        let mut doubled = scan(TWO_WRAPPERS);
        doubled.merge(scan(TWO_WRAPPERS));
        let mut memo = Memo::new();
        let pass = run_pass(&doubled, &options(), &mut memo);
        assert_eq!(pass.units.len(), 2);
    }
}
