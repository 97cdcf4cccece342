#![deny(clippy::pedantic, unsafe_code)]
//! APK emission for apkforge
//!
//! Turns a staged file tree into an Alpine `.apk`: the data section is
//! tarred, compressed and hashed, `.PKGINFO` and scriptlets form the
//! control section, and an optional RSA signature covers the control
//! section.

mod core;
pub mod dependencies;
mod identity;
pub mod inspect;
mod package_build;
pub mod packaging;

pub use crate::core::context::EmitContext;
pub use dependencies::{
    generate_dependencies, AnalysisHandle, CompositionAnalyzer, NoopAnalyzer, RecordedAnalyzer,
};
pub use inspect::{ApkSections, Section, SectionEntry};
pub use package_build::PackageBuild;
pub use packaging::compression::ParallelGzEncoder;
pub use packaging::control::render_pkginfo;
pub use packaging::ownership::{OwnerNames, RemapTable};
pub use packaging::{emit_configuration, emit_package, EmittedPackage, Phase};
