//! CLI entry point for the workshop mod downloader.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info, warn};
use workshop_dl::manifest::read_manifest;
use workshop_dl::modpack::load_modpack;
use workshop_dl::steamcmd::Credentials;
use workshop_dl::{Config, Error, InstallSummary, ModDownloader, ModList, params, server};

mod cli;

use cli::{Args, Command};

/// Exit code when steamcmd could not log in
const EXIT_AUTH_FAILED: u8 = 1;
/// Exit code when the run finished but some mods were not installed
const EXIT_PARTIAL: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    debug!(?args, "CLI arguments parsed");

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            match e.downcast_ref::<Error>() {
                Some(Error::Authentication { reason }) => {
                    error!("steam login failed ({reason}), nothing was downloaded");
                    error!("check STEAMCMD_USR, STEAMCMD_PWD and STEAMCMD_GUARD");
                    return ExitCode::from(EXIT_AUTH_FAILED);
                }
                Some(err) if err.is_batch_fatal() => {
                    error!("{err}, batch aborted and nothing was installed");
                }
                _ => error!("{e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let mut config = Config::load_or_default(args.config.as_deref())
        .context("failed to load configuration")?;

    match args.command {
        Command::Install { modpack, no_echo } => {
            if no_echo {
                config.steamcmd.echo_output = false;
            }
            let mods = load_modpack(&modpack).await?;
            info!(count = mods.len(), modpack = ?modpack, "loaded modpack");
            download(config, &mods).await
        }
        Command::Retry { manifest, no_echo } => {
            if no_echo {
                config.steamcmd.echo_output = false;
            }
            let path = manifest.unwrap_or_else(|| config.paths.manifest_path.clone());
            let mods = read_manifest(&path).await?;
            if mods.is_empty() {
                info!(manifest = ?path, "nothing to retry");
                return Ok(ExitCode::SUCCESS);
            }
            info!(count = mods.len(), manifest = ?path, "retrying failed mods");
            download(config, &mods).await
        }
        Command::Params {
            modpack,
            config_name,
            server_mod,
        } => {
            let mods = load_modpack(&modpack).await?;
            let path = params::append_params(
                &config.paths.configs_dir(),
                &config_name,
                &mods,
                server_mod,
            )
            .await?;
            println!("{}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Whoami => {
            let credentials = Credentials::from_env()?;
            println!("{}", credentials.username);
            if credentials.guard_code.is_some() {
                info!("a Steam Guard code is set");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Configs => {
            let configs_dir = config.paths.configs_dir();
            let names = server::list_configs(&configs_dir).await?;
            if names.is_empty() {
                warn!(dir = ?configs_dir, "no configs found");
            }
            for name in names {
                println!("{name}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Start { config_name } => {
            let status = server::start(
                &config.paths.server_dir,
                &config.paths.server_binary,
                &config.paths.configs_dir(),
                &config_name,
            )
            .await?;
            Ok(match status.code() {
                Some(0) => ExitCode::SUCCESS,
                Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
                None => ExitCode::FAILURE,
            })
        }
    }
}

async fn download(config: Config, mods: &ModList) -> Result<ExitCode> {
    let credentials = Credentials::from_env()?;
    let downloader = ModDownloader::new(config)?;
    let summary = downloader.install(mods, credentials).await?;
    Ok(report(&summary))
}

fn report(summary: &InstallSummary) -> ExitCode {
    let report = &summary.report;
    info!(
        installed = report.installed.len(),
        failed = report.failed_count(),
        total = summary.requested,
        "done"
    );

    if summary.is_success() {
        return ExitCode::SUCCESS;
    }

    for item in &report.fetch_failed {
        println!("download failed: {item}");
    }
    for failure in &report.install_failed {
        println!("install failed: {} ({})", failure.item, failure.kind);
    }
    if let Some(path) = summary.manifest.as_deref() {
        println!("{}", retry_hint(path));
    }
    ExitCode::from(EXIT_PARTIAL)
}

fn retry_hint(manifest: &Path) -> String {
    format!(
        "failed mods were written to {}, run `workshop-dl retry` to try them again",
        manifest.display()
    )
}
