//! Compiler configuration.

use std::collections::BTreeSet;

use lumen_core::{EsVersion, FullVersion};

/// Options for one compilation.
///
/// The default requests every recognised version of both families and one
/// worker per logical CPU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Requested ES versions. Empty means the family is not targeted.
    pub es: BTreeSet<EsVersion>,
    /// Requested full-profile versions. Empty means the family is not
    /// targeted.
    pub full: BTreeSet<FullVersion>,
    /// Worker threads used for per-shader tasks.
    pub workers: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            es: EsVersion::all().collect(),
            full: FullVersion::all().collect(),
            workers: num_cpus::get(),
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_es_versions(mut self, versions: impl IntoIterator<Item = u32>) -> Self {
        self.es = versions.into_iter().map(EsVersion).collect();
        self
    }

    pub fn with_full_versions(mut self, versions: impl IntoIterator<Item = u32>) -> Self {
        self.full = versions.into_iter().map(FullVersion).collect();
        self
    }

    /// Set the worker count; zero is treated as one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}
