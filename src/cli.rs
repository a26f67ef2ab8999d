//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Download Steam Workshop mods and install them on an Arma 3 dedicated server.
///
/// Credentials are read from STEAMCMD_USR and STEAMCMD_PWD (plus the optional
/// Steam Guard code in STEAMCMD_GUARD).
#[derive(Parser, Debug)]
#[command(name = "workshop-dl")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Download and install every mod of an exported launcher preset
    Install {
        /// Preset HTML exported from the Arma 3 launcher
        modpack: PathBuf,

        /// Do not echo steamcmd output
        #[arg(long)]
        no_echo: bool,
    },

    /// Download and install the mods listed in a retry manifest
    Retry {
        /// Manifest to retry (defaults to the configured manifest path)
        manifest: Option<PathBuf>,

        /// Do not echo steamcmd output
        #[arg(long)]
        no_echo: bool,
    },

    /// Append a mod line for a preset to a server parameter config
    Params {
        /// Preset HTML exported from the Arma 3 launcher
        modpack: PathBuf,

        /// Config name, without the .txt extension
        config_name: String,

        /// Write -servermod= instead of -mod=
        #[arg(short, long)]
        server_mod: bool,
    },

    /// Show the Steam user the credentials belong to
    Whoami,

    /// List the server parameter configs
    Configs,

    /// Start the dedicated server with a parameter config
    Start {
        /// Config name, without the .txt extension
        config_name: String,
    },
}
