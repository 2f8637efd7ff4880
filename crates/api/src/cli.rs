//! Command-line interface of the `lpa` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "lpa", author, version, about = "Pose estimation labeling app server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch the app server
    Run(RunArgs),
    /// Deprecated spelling of `run`
    #[command(hide = true)]
    Serve(RunArgs),
}

/// Overrides for values otherwise read from the environment.
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Bind address [env: HOST]
    #[arg(long)]
    pub host: Option<String>,
    /// Port to serve the app on [env: PORT, default: 7501]
    #[arg(long, short)]
    pub port: Option<u16>,
    /// Directory holding the projects [env: DATA_DIR]
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

impl Command {
    /// The run arguments, plus whether the deprecated spelling was used.
    pub fn into_run_args(self) -> (RunArgs, bool) {
        match self {
            Command::Run(args) => (args, false),
            Command::Serve(args) => (args, true),
        }
    }
}
