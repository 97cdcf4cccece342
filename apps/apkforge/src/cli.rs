//! Command line interface definition

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// apkforge - reproducible Alpine package emitter
#[derive(Parser)]
#[command(name = "apkforge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Emit reproducible Alpine APK packages from staged build output")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate builder config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Emit the origin package of a specification and its subpackages
    Emit(EmitArgs),

    /// Show the sections of an emitted package and check its data hash
    Inspect {
        /// Path to the .apk file
        file: PathBuf,
    },
}

#[derive(Args)]
pub struct EmitArgs {
    /// Package specification (YAML)
    #[arg(long, value_name = "PATH")]
    pub spec: PathBuf,

    /// Target architecture (defaults to the host)
    #[arg(long)]
    pub arch: Option<String>,

    /// Recorded dependency analysis (JSON)
    #[arg(long, value_name = "PATH")]
    pub discovered: Option<PathBuf>,

    /// RSA private key (PEM) used to sign the control section
    #[arg(long, value_name = "PATH")]
    pub signing_key: Option<PathBuf>,

    /// Root output directory; packages land in DIR/{arch}
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Directory holding melange-out/{package} staging trees
    #[arg(long, value_name = "DIR")]
    pub workspace_dir: Option<PathBuf>,

    /// Fixed timestamp for archive entries
    #[arg(long, env = "SOURCE_DATE_EPOCH")]
    pub source_date_epoch: Option<u64>,

    /// Append emitted packages to packages.log
    #[arg(long)]
    pub build_log: bool,
}
