//! APK assembly: data, control and signature sections written as one file
//!
//! An artifact is the concatenation of up to three gzip members:
//!
//! 1. the signature section, when a signer is configured
//! 2. the control section (`.PKGINFO` and scriptlets)
//! 3. the data section (the staged file tree)
//!
//! The data section is written first because `.PKGINFO` embeds its hash,
//! and the signature covers the compressed control section.

pub mod archive;
pub mod build_log;
pub mod compression;
pub mod control;
pub mod data;
pub mod ownership;
pub mod signature;
pub mod size;

use self::data::{emit_data_section, DataSection, DataSectionRequest};
use self::ownership::RemapTable;
use crate::core::context::EmitContext;
use crate::dependencies::{generate_dependencies, write_dependency_log, CompositionAnalyzer};
use crate::PackageBuild;
use apkforge_config::BuilderConfig;
use apkforge_errors::{BuildError, Error};
use apkforge_events::{EventEmitter, FailureContext, PackageEvent};
use apkforge_types::{Accounts, Arch, Configuration, DiscoveredDependencies};
use std::fs::{self, Permissions};
use std::io::{self, BufWriter, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;

/// Mode of finished artifacts
const ARTIFACT_MODE: u32 = 0o644;

/// Step of an emission, reported when it fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    PreparingWorkspace,
    AnalyzingPackage,
    MeasuringSize,
    WritingData,
    WritingControl,
    Signing,
    WritingArtifact,
}

impl Phase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreparingWorkspace => "preparing workspace",
            Self::AnalyzingPackage => "analyzing package",
            Self::MeasuringSize => "computing installed size",
            Self::WritingData => "writing data section",
            Self::WritingControl => "writing control section",
            Self::Signing => "signing control section",
            Self::WritingArtifact => "writing package",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finished artifact and the final state of its package
#[derive(Debug, Clone)]
pub struct EmittedPackage {
    pub path: PathBuf,
    pub build: PackageBuild,
    /// Analyzer output, as recorded in the dependency log
    pub discovered: DiscoveredDependencies,
}

/// Emit one package
///
/// # Errors
///
/// Returns the error of the first failing phase. Nothing is left at the
/// artifact path in that case.
pub async fn emit_package(
    context: &EmitContext,
    mut build: PackageBuild,
    accounts: &Accounts,
    analyzer: &dyn CompositionAnalyzer,
) -> Result<EmittedPackage, Error> {
    let started = Instant::now();
    context.emit_package(PackageEvent::EmissionStarted {
        package: build.package_name.clone(),
        origin: build.origin_name.clone(),
        version: build.full_version(),
        arch: build.arch.to_apk().to_string(),
    });

    let mut phase = Phase::PreparingWorkspace;
    match run_phases(context, &mut build, accounts, analyzer, &mut phase).await {
        Ok((path, discovered)) => {
            if let Some(dir) = &context.build_log_dir {
                record_build_log(context, dir, &build).await;
            }
            context.emit_package(PackageEvent::EmissionCompleted {
                package: build.package_name.clone(),
                path: path.clone(),
                duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            });
            Ok(EmittedPackage {
                path,
                build,
                discovered,
            })
        }
        Err(err) => {
            context.emit_package(PackageEvent::EmissionFailed {
                package: build.package_name.clone(),
                phase: phase.as_str().to_string(),
                failure: FailureContext::from_error(&err),
            });
            Err(err)
        }
    }
}

async fn run_phases(
    context: &EmitContext,
    build: &mut PackageBuild,
    accounts: &Accounts,
    analyzer: &dyn CompositionAnalyzer,
    phase: &mut Phase,
) -> Result<(PathBuf, DiscoveredDependencies), Error> {
    let staged_dir = build.workspace_subdir();
    tokio::fs::create_dir_all(&staged_dir)
        .await
        .map_err(|e| BuildError::Workspace {
            message: format!("unable to create {}: {e}", staged_dir.display()),
        })?;

    *phase = Phase::AnalyzingPackage;
    let discovered = generate_dependencies(context, build, analyzer).await?;

    *phase = Phase::MeasuringSize;
    build.installed_size = measure_installed_size(staged_dir.clone()).await?;

    *phase = Phase::WritingData;
    let data = emit_data_section(DataSectionRequest {
        staged_dir,
        guest_dir: context.guest_dir.clone(),
        remap: RemapTable::from_accounts(accounts),
        mtime: context.source_date_epoch,
        gzip: context.gzip,
    })
    .await?;
    build.data_hash = Some(data.hash.to_hex());
    context.emit_package(PackageEvent::DataSectionWritten {
        package: build.package_name.clone(),
        installed_size: build.installed_size,
        compressed_size: data.compressed_size,
        data_hash: data.hash.to_hex(),
    });

    *phase = Phase::WritingControl;
    let control = control::build_control_section(build, context.source_date_epoch)?;
    context.emit_package(PackageEvent::ControlSectionWritten {
        package: build.package_name.clone(),
        size: control.len() as u64,
    });

    let signature = match &context.signer {
        Some(signer) => {
            *phase = Phase::Signing;
            let section =
                signature::build_signature_section(signer.as_ref(), &control, context.source_date_epoch)?;
            context.emit_package(PackageEvent::SignatureWritten {
                package: build.package_name.clone(),
                key_name: signer.key_name().to_string(),
            });
            Some(section)
        }
        None => None,
    };

    *phase = Phase::WritingArtifact;
    let target = build.filename();
    write_artifact(build.out_dir.clone(), target.clone(), signature, control, data).await?;
    Ok((target, discovered))
}

async fn measure_installed_size(staged_dir: PathBuf) -> Result<u64, Error> {
    tokio::task::spawn_blocking(move || size::installed_size(&staged_dir))
        .await
        .map_err(|e| BuildError::TaskFailed {
            message: format!("installed size task failed: {e}"),
        })?
        .map_err(|e| {
            BuildError::InstalledSize {
                message: e.to_string(),
            }
            .into()
        })
}

async fn write_artifact(
    out_dir: PathBuf,
    target: PathBuf,
    signature: Option<Vec<u8>>,
    control: Vec<u8>,
    mut data: DataSection,
) -> Result<(), Error> {
    let path = target.display().to_string();
    tokio::task::spawn_blocking(move || {
        concatenate_sections(&out_dir, &target, signature.as_deref(), &control, &mut data.file)
    })
    .await
    .map_err(|e| BuildError::TaskFailed {
        message: format!("artifact task failed: {e}"),
    })?
    .map_err(|e| {
        BuildError::OutputFailed {
            path,
            message: e.to_string(),
        }
        .into()
    })
}

/// Write the sections next to `target` and rename the result into place
fn concatenate_sections(
    out_dir: &Path,
    target: &Path,
    signature: Option<&[u8]>,
    control: &[u8],
    data: &mut NamedTempFile,
) -> io::Result<()> {
    fs::create_dir_all(out_dir)?;
    let mut staging = NamedTempFile::new_in(out_dir)?;

    {
        let mut writer = BufWriter::new(staging.as_file_mut());
        if let Some(signature) = signature {
            writer.write_all(signature)?;
        }
        writer.write_all(control)?;
        io::copy(data, &mut writer)?;
        writer.flush()?;
    }

    staging.as_file().sync_all()?;
    fs::set_permissions(staging.path(), Permissions::from_mode(ARTIFACT_MODE))?;
    staging.persist(target).map_err(|e| e.error)?;
    Ok(())
}

async fn record_build_log(context: &EmitContext, dir: &Path, build: &PackageBuild) {
    let dir = dir.to_path_buf();
    let entry = build.clone();
    let result = tokio::task::spawn_blocking(move || build_log::append_build_log(&dir, &entry))
        .await
        .map_err(|e| e.to_string())
        .and_then(|r| r.map_err(|e| e.to_string()));

    if let Err(e) = result {
        context.emit_warning_with_context(
            format!("unable to record {} in build log", build.identity()),
            e,
        );
    }
}

/// Emit the origin package of `configuration` and all of its subpackages
///
/// Packages are emitted concurrently. Returns the artifact paths, origin
/// first, then subpackages in declaration order.
///
/// The dependency log is written once all packages are done and holds the
/// record of the last package in that order.
///
/// # Errors
///
/// Returns the first emission error.
pub async fn emit_configuration(
    context: &EmitContext,
    configuration: &Configuration,
    arch: Arch,
    config: &BuilderConfig,
    analyzer: &dyn CompositionAnalyzer,
) -> Result<Vec<PathBuf>, Error> {
    let origin = &configuration.package;
    let context = context.clone().with_origin(origin.name.clone());

    let mut builds = vec![PackageBuild::from_package(origin, arch, config)];
    builds.extend(
        configuration
            .subpackages
            .iter()
            .map(|sub| PackageBuild::from_subpackage(origin, sub, arch, config)),
    );

    context.emit_package(PackageEvent::ConfigurationStarted {
        origin: origin.name.clone(),
        packages: builds.len(),
    });

    let mut package_context = context.clone();
    package_context.dependency_log = None;

    let accounts = &configuration.environment.accounts;
    let emitted = futures::future::try_join_all(
        builds
            .into_iter()
            .map(|build| emit_package(&package_context, build, accounts, analyzer)),
    )
    .await?;

    if let (Some(prefix), Some(last)) = (&context.dependency_log, emitted.last()) {
        write_dependency_log(&context, prefix, arch, &last.discovered).await;
    }

    let artifacts: Vec<PathBuf> = emitted.into_iter().map(|e| e.path).collect();
    context.emit_package(PackageEvent::ConfigurationCompleted {
        origin: origin.name.clone(),
        artifacts: artifacts.clone(),
    });
    Ok(artifacts)
}
