//! Emission context shared by every phase of a package emission

use apkforge_config::{BuilderConfig, GzipConcurrency};
use apkforge_events::{AppEvent, EventEmitter, EventMeta, EventSender};
use apkforge_signing::ApkSigner;
use std::path::PathBuf;
use std::sync::Arc;

/// Settings and collaborators for emitting packages
///
/// Cheap to clone; concurrent emissions each get their own copy.
#[derive(Clone)]
pub struct EmitContext {
    /// Fixed timestamp for archive entries and `builddate`
    pub source_date_epoch: u64,
    /// Root of the guest filesystem (`etc/passwd`, `etc/group`)
    pub guest_dir: PathBuf,
    /// Prefix of the dependency log, if enabled
    pub dependency_log: Option<PathBuf>,
    /// Directory holding `packages.log`, if build logging is enabled
    pub build_log_dir: Option<PathBuf>,
    /// Data-section compressor parallelism
    pub gzip: GzipConcurrency,
    pub signer: Option<Arc<dyn ApkSigner>>,
    /// Origin package name used to correlate events
    pub origin: Option<String>,
    pub event_sender: Option<EventSender>,
}

impl std::fmt::Debug for EmitContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmitContext")
            .field("source_date_epoch", &self.source_date_epoch)
            .field("guest_dir", &self.guest_dir)
            .field("dependency_log", &self.dependency_log)
            .field("build_log_dir", &self.build_log_dir)
            .field("gzip", &self.gzip)
            .field("signer", &self.signer.as_ref().map(|s| s.key_name().to_string()))
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl EventEmitter for EmitContext {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }

    fn enrich_event_meta(&self, event: &AppEvent, meta: &mut EventMeta) {
        if let Some(origin) = &self.origin {
            meta.correlation_id = Some(origin.clone());
        }
        if let AppEvent::Package(package_event) = event {
            if let Some(package) = package_event.package() {
                meta.set_package(package);
            }
        }
    }
}

impl Default for EmitContext {
    fn default() -> Self {
        Self {
            source_date_epoch: 0,
            guest_dir: PathBuf::from("/"),
            dependency_log: None,
            build_log_dir: None,
            gzip: GzipConcurrency::default(),
            signer: None,
            origin: None,
            event_sender: None,
        }
    }
}

impl EmitContext {
    /// Create a context from builder configuration
    ///
    /// Compressor parallelism is resolved here, once. The signer is not
    /// loaded; attach one with [`EmitContext::with_signer`].
    #[must_use]
    pub fn from_config(config: &BuilderConfig) -> Self {
        let packaging = &config.packaging;
        Self {
            source_date_epoch: packaging.source_date_epoch,
            guest_dir: config.paths.guest_dir.clone(),
            dependency_log: packaging.dependency_log.clone(),
            build_log_dir: packaging
                .create_build_log
                .then(|| config.paths.build_log_dir.clone()),
            gzip: packaging.compression.resolve(),
            ..Self::default()
        }
    }

    /// Set the signer
    #[must_use]
    pub fn with_signer(mut self, signer: Arc<dyn ApkSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Set event sender
    #[must_use]
    pub fn with_event_sender(mut self, event_sender: EventSender) -> Self {
        self.event_sender = Some(event_sender);
        self
    }

    /// Set the origin package used for event correlation
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Set the fixed archive timestamp
    #[must_use]
    pub fn with_source_date_epoch(mut self, epoch: u64) -> Self {
        self.source_date_epoch = epoch;
        self
    }

    /// Set the compressor parallelism
    #[must_use]
    pub fn with_gzip(mut self, gzip: GzipConcurrency) -> Self {
        self.gzip = gzip;
        self
    }

    /// Set the guest filesystem root
    #[must_use]
    pub fn with_guest_dir(mut self, guest_dir: impl Into<PathBuf>) -> Self {
        self.guest_dir = guest_dir.into();
        self
    }

    /// Enable the shared build log in `dir`
    #[must_use]
    pub fn with_build_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.build_log_dir = Some(dir.into());
        self
    }

    /// Enable the dependency log with the given path prefix
    #[must_use]
    pub fn with_dependency_log(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.dependency_log = Some(prefix.into());
        self
    }
}
