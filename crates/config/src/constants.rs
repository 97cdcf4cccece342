//! Fixed names and limits of the apk container format

/// Directory under the workspace that holds one staged tree per package
pub const STAGING_DIR: &str = "melange-out";

/// Shared build log written next to the output directory
pub const BUILD_LOG_FILE: &str = "packages.log";

/// File extension of emitted packages
pub const PACKAGE_EXTENSION: &str = "apk";

/// Upper bound for data-section compressor threads.
///
/// Roughly the number of performance cores on a workstation: small hosts
/// scale down to their own core count, large CI hosts leave room for
/// concurrent package builds.
pub const MAX_COMPRESSION_THREADS: usize = 8;

/// Unit of input handed to one compressor worker
pub const DEFAULT_COMPRESSION_BLOCK_SIZE: usize = 1 << 20;

/// Smallest block that still gives deflate a full window
pub const MIN_COMPRESSION_BLOCK_SIZE: usize = 32 * 1024;
