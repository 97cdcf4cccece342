//! Structured logging of emission events
//!
//! Events sent by the builder are turned into tracing records with
//! structured fields, one record shape per event kind.

use apkforge_events::{AppEvent, EventMessage, GeneralEvent, PackageEvent};
use std::path::Path;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Log an event using the tracing infrastructure with structured fields
pub fn log_event_with_tracing(message: &EventMessage) {
    let meta = &message.meta;
    let package = meta.package();

    match &message.event {
        AppEvent::Package(package_event) => match package_event {
            PackageEvent::ConfigurationStarted { origin, packages } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    origin = %origin,
                    packages = packages,
                    "Emitting configuration"
                );
            }
            PackageEvent::ConfigurationCompleted { origin, artifacts } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    origin = %origin,
                    artifacts = artifacts.len(),
                    "Configuration emitted"
                );
            }
            PackageEvent::EmissionStarted {
                package,
                origin,
                version,
                arch,
            } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    package = %package,
                    origin = %origin,
                    version = %version,
                    arch = %arch,
                    "Package emission started"
                );
            }
            PackageEvent::DependenciesResolved {
                package,
                runtime,
                provides,
                vendored,
            } => {
                debug!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    package = %package,
                    runtime = runtime,
                    provides = provides,
                    vendored = vendored,
                    "Dependencies resolved"
                );
            }
            PackageEvent::DataSectionWritten {
                package,
                installed_size,
                compressed_size,
                data_hash,
            } => {
                debug!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    package = %package,
                    installed_size = installed_size,
                    compressed_size = compressed_size,
                    data_hash = %data_hash,
                    "Data section written"
                );
            }
            PackageEvent::ControlSectionWritten { package, size } => {
                debug!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    package = %package,
                    size = size,
                    "Control section written"
                );
            }
            PackageEvent::SignatureWritten { package, key_name } => {
                debug!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    package = %package,
                    key = %key_name,
                    "Control section signed"
                );
            }
            PackageEvent::EmissionCompleted {
                package,
                path,
                duration_ms,
            } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    package = %package,
                    path = %path.display(),
                    duration_ms = duration_ms,
                    "Package emitted"
                );
            }
            PackageEvent::EmissionFailed {
                package,
                phase,
                failure,
            } => {
                error!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    package = %package,
                    phase = %phase,
                    retryable = failure.retryable,
                    code = ?failure.code,
                    message = %failure.message,
                    hint = ?failure.hint,
                    "Package emission failed"
                );
            }
        },

        AppEvent::General(general_event) => match general_event {
            GeneralEvent::Warning { message, context } => {
                warn!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    package = ?package,
                    message = %message,
                    context = ?context,
                    "Warning"
                );
            }
            GeneralEvent::DebugLog { message, context } => {
                debug!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    package = ?package,
                    message = %message,
                    context = ?context,
                    "Debug log"
                );
            }
        },
    }
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Initialize tracing
///
/// JSON mode keeps stdout clean for results and writes JSON records to
/// stderr. Debug mode logs everything from apkforge crates, also to a
/// file under `logs/` when it can be created.
pub fn init_tracing(json_mode: bool, debug_enabled: bool) {
    if json_mode {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter(if debug_enabled {
                "info,apkforge=debug"
            } else {
                "warn"
            }))
            .init();
    } else if debug_enabled {
        let log_dir = Path::new("logs");
        let log_file = log_dir.join(format!(
            "apkforge-{}.log",
            chrono::Utc::now().format("%Y%m%d-%H%M%S")
        ));

        match std::fs::create_dir_all(log_dir).and_then(|()| std::fs::File::create(&log_file)) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(env_filter("info,apkforge=debug"))
                    .init();
                eprintln!("Debug logging enabled: {}", log_file.display());
            }
            Err(e) => {
                eprintln!("Warning: Failed to create log file: {e}");
                tracing_subscriber::fmt()
                    .with_writer(std::io::stderr)
                    .with_env_filter(env_filter("info,apkforge=debug"))
                    .init();
            }
        }
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter("warn,apkforge=info"))
            .init();
    }
}
