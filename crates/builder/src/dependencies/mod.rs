#![allow(clippy::module_name_repetitions)]

//! Final dependency sets of an emitted package
//!
//! Declared dependencies come from the package specification; discovered
//! ones come from a [`CompositionAnalyzer`] that inspects the staged tree
//! (shared objects, commands, pkg-config files and so on). The two are
//! merged by [`resolver::resolve`].

pub mod resolver;

use crate::core::context::EmitContext;
use crate::PackageBuild;
use apkforge_errors::{BuildError, Error};
use apkforge_events::{EventEmitter, PackageEvent};
use apkforge_types::{Arch, Dependencies, DiscoveredDependencies, PackageOptions};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use resolver::{dedup, normalize, remove_self_provided, resolve, unversioned_name};

/// Read-only view of a package handed to the analyzer
#[derive(Debug, Clone, Copy)]
pub struct AnalysisHandle<'a> {
    build: &'a PackageBuild,
}

impl<'a> AnalysisHandle<'a> {
    #[must_use]
    pub fn new(build: &'a PackageBuild) -> Self {
        Self { build }
    }

    #[must_use]
    pub fn package_name(&self) -> &str {
        &self.build.package_name
    }

    #[must_use]
    pub fn origin_name(&self) -> &str {
        &self.build.origin_name
    }

    #[must_use]
    pub fn arch(&self) -> Arch {
        self.build.arch
    }

    /// Staged file tree of the package
    #[must_use]
    pub fn staged_dir(&self) -> PathBuf {
        self.build.workspace_subdir()
    }

    /// Dependencies as declared, before any discovery
    #[must_use]
    pub fn declared(&self) -> &Dependencies {
        &self.build.dependencies
    }

    #[must_use]
    pub fn options(&self) -> PackageOptions {
        self.build.options
    }
}

/// Inspects a staged package and reports what it needs and offers
#[async_trait]
pub trait CompositionAnalyzer: Send + Sync {
    /// Analyze one package
    ///
    /// # Errors
    ///
    /// Any error aborts emission of the package.
    async fn analyze(&self, handle: &AnalysisHandle<'_>) -> Result<DiscoveredDependencies, Error>;
}

/// Analyzer that discovers nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAnalyzer;

#[async_trait]
impl CompositionAnalyzer for NoopAnalyzer {
    async fn analyze(&self, _handle: &AnalysisHandle<'_>) -> Result<DiscoveredDependencies, Error> {
        Ok(DiscoveredDependencies::default())
    }
}

/// Analyzer replaying previously recorded results
///
/// Results are keyed by package name; packages without an entry get the
/// fallback value. Option flags are honoured so a recording made without
/// them still behaves like a live analysis.
#[derive(Debug, Clone, Default)]
pub struct RecordedAnalyzer {
    per_package: BTreeMap<String, DiscoveredDependencies>,
    fallback: DiscoveredDependencies,
}

impl RecordedAnalyzer {
    /// Replay the same result for every package
    #[must_use]
    pub fn new(discovered: DiscoveredDependencies) -> Self {
        Self {
            per_package: BTreeMap::new(),
            fallback: discovered,
        }
    }

    /// Replay a result for one named package
    #[must_use]
    pub fn with_package(mut self, name: impl Into<String>, discovered: DiscoveredDependencies) -> Self {
        self.per_package.insert(name.into(), discovered);
        self
    }

    /// Load a recording from a JSON file
    ///
    /// The file holds either a single result (the dependency log format) or
    /// an object mapping package names to results.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn from_json_file(path: &Path) -> Result<Self, Error> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::io_with_path(&e, path))?;

        let invalid = |e: serde_json::Error| BuildError::DependencyAnalysis {
            package: path.display().to_string(),
            message: format!("invalid recorded dependencies: {e}"),
        };

        let value: serde_json::Value = serde_json::from_str(&contents).map_err(invalid)?;
        let is_single = value.as_object().is_some_and(|fields| {
            fields
                .keys()
                .all(|k| matches!(k.as_str(), "runtime" | "provides" | "vendored"))
        });

        if is_single {
            let single = serde_json::from_value(value).map_err(invalid)?;
            return Ok(Self::new(single));
        }

        let per_package: BTreeMap<String, DiscoveredDependencies> =
            serde_json::from_value(value).map_err(invalid)?;
        Ok(Self {
            per_package,
            fallback: DiscoveredDependencies::default(),
        })
    }
}

#[async_trait]
impl CompositionAnalyzer for RecordedAnalyzer {
    async fn analyze(&self, handle: &AnalysisHandle<'_>) -> Result<DiscoveredDependencies, Error> {
        let mut discovered = self
            .per_package
            .get(handle.package_name())
            .unwrap_or(&self.fallback)
            .clone();

        let options = handle.options();
        if options.no_depends {
            discovered.runtime.clear();
        }
        if options.no_provides {
            discovered.provides.clear();
        }
        if options.no_commands {
            discovered.provides.retain(|p| !p.starts_with("cmd:"));
        }
        Ok(discovered)
    }
}

/// Run the analyzer and store the final dependency sets on `build`
///
/// Returns what the analyzer discovered, before merging.
///
/// # Errors
///
/// Returns `BuildError::DependencyAnalysis` if the analyzer fails. Failing
/// to write the dependency log only produces a warning.
pub async fn generate_dependencies(
    context: &EmitContext,
    build: &mut PackageBuild,
    analyzer: &dyn CompositionAnalyzer,
) -> Result<DiscoveredDependencies, Error> {
    let discovered = analyzer
        .analyze(&AnalysisHandle::new(build))
        .await
        .map_err(|e| BuildError::DependencyAnalysis {
            package: build.package_name.clone(),
            message: e.to_string(),
        })?;

    if let Some(prefix) = &context.dependency_log {
        write_dependency_log(context, prefix, build.arch, &discovered).await;
    }

    build.dependencies = resolve(&build.dependencies, &discovered);
    summarize(context, build);

    context.emit_package(PackageEvent::DependenciesResolved {
        package: build.package_name.clone(),
        runtime: build.dependencies.runtime.len(),
        provides: build.dependencies.provides.len(),
        vendored: build.dependencies.vendored.len(),
    });
    Ok(discovered)
}

/// Path of the per-architecture dependency log
#[must_use]
pub fn dependency_log_path(prefix: &Path, arch: Arch) -> PathBuf {
    let mut path = prefix.as_os_str().to_owned();
    path.push(".");
    path.push(arch.to_apk());
    PathBuf::from(path)
}

/// Overwrite the per-architecture dependency log with `discovered`
///
/// Failures are reported as warnings.
pub(crate) async fn write_dependency_log(
    context: &EmitContext,
    prefix: &Path,
    arch: Arch,
    discovered: &DiscoveredDependencies,
) {
    let path = dependency_log_path(prefix, arch);
    context.emit_debug(format!("writing dependency log {}", path.display()));

    let result = match serde_json::to_vec(discovered) {
        Ok(mut json) => {
            json.push(b'\n');
            tokio::fs::write(&path, json).await.map_err(|e| e.to_string())
        }
        Err(e) => Err(e.to_string()),
    };

    if let Err(e) = result {
        context.emit_warning_with_context(
            format!("unable to write dependency log {}", path.display()),
            e,
        );
    }
}

/// Normalize the final sets and report them
fn summarize(context: &EmitContext, build: &mut PackageBuild) {
    let deps = &mut build.dependencies;
    deps.runtime = normalize(&deps.runtime);
    deps.provides = normalize(&deps.provides);
    deps.replaces = normalize(&deps.replaces);
    deps.vendored = normalize(&deps.vendored);

    let mut fields = BTreeMap::new();
    fields.insert("package".to_string(), build.package_name.clone());
    fields.insert("runtime".to_string(), deps.runtime.join(" "));
    fields.insert("provides".to_string(), deps.provides.join(" "));
    fields.insert("replaces".to_string(), deps.replaces.join(" "));
    fields.insert("vendored".to_string(), deps.vendored.join(" "));
    if let Some(priority) = deps.provider_priority {
        fields.insert("provider_priority".to_string(), priority.to_string());
    }
    context.emit_debug_with_context("final dependency sets", fields);
}
