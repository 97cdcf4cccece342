use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::FailureContext;

/// Lifecycle of a single package emission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PackageEvent {
    /// Emission of the origin package and its subpackages is starting
    ConfigurationStarted { origin: String, packages: usize },

    /// Every package of a configuration was emitted
    ConfigurationCompleted {
        origin: String,
        artifacts: Vec<PathBuf>,
    },

    /// Emission of one package is starting
    EmissionStarted {
        package: String,
        origin: String,
        version: String,
        arch: String,
    },

    /// Final dependency sets were computed
    DependenciesResolved {
        package: String,
        runtime: usize,
        provides: usize,
        vendored: usize,
    },

    /// Data section was compressed and hashed
    DataSectionWritten {
        package: String,
        installed_size: u64,
        compressed_size: u64,
        data_hash: String,
    },

    /// Control section was built
    ControlSectionWritten { package: String, size: u64 },

    /// Control section was signed
    SignatureWritten { package: String, key_name: String },

    /// Artifact was written to its final location
    EmissionCompleted {
        package: String,
        path: PathBuf,
        duration_ms: u64,
    },

    /// Emission aborted
    EmissionFailed {
        package: String,
        phase: String,
        failure: FailureContext,
    },
}

impl PackageEvent {
    /// Package name the event refers to, if it is about a single package
    #[must_use]
    pub fn package(&self) -> Option<&str> {
        match self {
            Self::ConfigurationStarted { .. } | Self::ConfigurationCompleted { .. } => None,
            Self::EmissionStarted { package, .. }
            | Self::DependenciesResolved { package, .. }
            | Self::DataSectionWritten { package, .. }
            | Self::ControlSectionWritten { package, .. }
            | Self::SignatureWritten { package, .. }
            | Self::EmissionCompleted { package, .. }
            | Self::EmissionFailed { package, .. } => Some(package),
        }
    }
}
