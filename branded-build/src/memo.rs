//! Content-addressed reuse of per-candidate emission results.
//!
//! Emission is a pure function of its descriptor inputs, so a pass can
//! reuse the previous pass's output verbatim whenever the inputs are
//! value-equal. Nothing else persists across passes.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use crate::config::Configuration;
use crate::diagnostics::Outcome;
use crate::emit::GeneratedUnit;
use crate::scanner::WrapperCandidate;
use crate::template::AttributeTemplate;

#[derive(Default)]
pub struct Memo {
    entries: HashMap<u64, Outcome<GeneratedUnit>>,
    hits: usize,
}

impl Memo {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache key for one candidate's emission inputs.
    pub fn key(
        candidate: &WrapperCandidate,
        configuration: &Configuration,
        templates: &[AttributeTemplate],
        runtime_support: bool,
    ) -> u64 {
        let mut hasher = DefaultHasher::new();
        candidate.hash(&mut hasher);
        configuration.hash(&mut hasher);
        templates.hash(&mut hasher);
        runtime_support.hash(&mut hasher);
        hasher.finish()
    }

    pub fn lookup(&mut self, key: u64) -> Option<Outcome<GeneratedUnit>> {
        let cached = self.entries.get(&key).cloned();
        if cached.is_some() {
            self.hits += 1;
        }
        cached
    }

    pub fn store(&mut self, key: u64, outcome: &Outcome<GeneratedUnit>) {
        self.entries.insert(key, outcome.clone());
    }

    /// How many lookups were served from cache since construction.
    pub fn hits(&self) -> usize {
        self.hits
    }
}
