//! Taskforge CLI
//!
//! Command-line interface for generating task graphs from kind files.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::{Config, parse_key_val};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "taskforge")]
#[command(about = "Taskforge task graph generator", long_about = None)]
struct Cli {
    /// Root of the task configuration (holds the `kinds` directory)
    #[arg(long, env = "TASKFORGE_ROOT", default_value = "taskcluster")]
    root: PathBuf,

    /// JSON file with the graph parameters
    #[arg(long, env = "TASKFORGE_PARAMETERS")]
    parameters: Option<PathBuf>,

    /// Parameter overrides as key=value pairs (e.g. -p project=mozilla-central -p level=3)
    #[arg(short = 'p', long = "param", value_parser = parse_key_val)]
    params: Vec<(String, Value)>,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskforge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        root: cli.root,
        parameters_file: cli.parameters,
        overrides: cli.params,
    };

    handle_command(cli.command, &config)
}
