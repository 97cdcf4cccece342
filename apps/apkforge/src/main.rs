//! apkforge - reproducible Alpine package emitter
//!
//! Emits the packages of a build specification from staged output, and
//! inspects emitted packages.

mod cli;
mod display;
mod error;
mod logging;

use crate::cli::{Cli, Commands, EmitArgs, GlobalArgs};
use crate::display::OutputRenderer;
use crate::error::CliError;
use apkforge_builder::{
    emit_configuration, ApkSections, CompositionAnalyzer, EmitContext, NoopAnalyzer,
    RecordedAnalyzer,
};
use apkforge_config::BuilderConfig;
use apkforge_errors::Error;
use apkforge_events::EventReceiver;
use apkforge_signing::RsaKeySigner;
use apkforge_types::{Arch, Configuration};
use clap::Parser;
use std::future::Future;
use std::path::Path;
use std::process;
use std::sync::Arc;
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    logging::init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if json_mode {
            println!("{}", serde_json::json!({ "error": e.to_string() }));
        } else {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting apkforge v{}", env!("CARGO_PKG_VERSION"));
    let renderer = OutputRenderer::new(cli.global.json);

    match cli.command {
        Commands::Emit(args) => {
            let artifacts = emit(&cli.global, args).await?;
            renderer.render_artifacts(&artifacts)?;
        }
        Commands::Inspect { file } => inspect(renderer, &file).await?,
    }
    Ok(())
}

async fn emit(global: &GlobalArgs, args: EmitArgs) -> Result<Vec<std::path::PathBuf>, CliError> {
    // file, then environment, then flags
    let mut config = BuilderConfig::load_or_default(global.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &args);
    config.validate()?;

    let spec = tokio::fs::read_to_string(&args.spec)
        .await
        .map_err(|e| Error::io_with_path(&e, &args.spec))?;
    let configuration = Configuration::from_yaml(&spec)?;

    let arch = match &args.arch {
        Some(arch) => arch.parse::<Arch>()?,
        None => Arch::host().ok_or_else(|| {
            CliError::InvalidArguments("unable to detect the host architecture, pass --arch".into())
        })?,
    };

    let analyzer: Box<dyn CompositionAnalyzer> = match &args.discovered {
        Some(path) => Box::new(RecordedAnalyzer::from_json_file(path).await?),
        None => Box::new(NoopAnalyzer),
    };

    let (event_sender, event_receiver) = apkforge_events::channel();
    let mut context = EmitContext::from_config(&config).with_event_sender(event_sender);
    if let Some(key) = &config.packaging.signing.key {
        let signer =
            RsaKeySigner::from_pem_file(key, config.packaging.signing.passphrase.as_deref())
                .await?;
        context = context.with_signer(Arc::new(signer));
    }

    run_with_events(
        emit_configuration(&context, &configuration, arch, &config, analyzer.as_ref()),
        event_receiver,
    )
    .await
}

async fn inspect(renderer: OutputRenderer, file: &Path) -> Result<(), CliError> {
    let apk = ApkSections::from_file(file).await?;
    let verified = apk.verify_data_hash();
    renderer.render_inspection(&apk, &verified)?;
    verified?;
    Ok(())
}

/// Drive `future` while logging the events it sends
async fn run_with_events<T>(
    future: impl Future<Output = Result<T, Error>>,
    mut event_receiver: EventReceiver,
) -> Result<T, CliError> {
    let mut future = Box::pin(future);

    loop {
        select! {
            result = &mut future => {
                while let Ok(message) = event_receiver.try_recv() {
                    logging::log_event_with_tracing(&message);
                }
                return result.map_err(CliError::from);
            }

            message = event_receiver.recv() => {
                if let Some(message) = message {
                    logging::log_event_with_tracing(&message);
                }
            }
        }
    }
}

/// Apply CLI overrides (highest precedence)
fn apply_cli_config(config: &mut BuilderConfig, args: &EmitArgs) {
    if let Some(out_dir) = &args.out_dir {
        config.paths.out_dir.clone_from(out_dir);
    }
    if let Some(workspace_dir) = &args.workspace_dir {
        config.paths.workspace_dir.clone_from(workspace_dir);
    }
    if let Some(key) = &args.signing_key {
        config.packaging.signing.key = Some(key.clone());
    }
    if let Some(epoch) = args.source_date_epoch {
        config.packaging.source_date_epoch = epoch;
    }
    if args.build_log {
        config.packaging.create_build_log = true;
    }
}
