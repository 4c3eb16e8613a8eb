//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod full;
mod init;
mod kinds;

pub use init::InitCommands;

use anyhow::{Context, Result};
use clap::Subcommand;
use taskforge_core::{Parameters, Pipeline, TransformRegistry};
use taskforge_lua::{KindDefinition, LogModule, ModuleRegistry, ParamsModule, TracingSink};
use tracing::info;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Generate the full task graph
    Full {
        /// Only show tasks of this kind
        #[arg(short, long)]
        kind: Option<String>,

        /// Print the tasks as JSON
        #[arg(long)]
        json: bool,
    },
    /// List kinds in the order they are built
    Kinds,
    /// List the registered transforms
    Transforms,
    /// Initialize development environment
    Init {
        #[command(subcommand)]
        command: InitCommands,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Full { kind, json } => full::handle_full_command(config, kind.as_deref(), json),
        Commands::Kinds => kinds::list_kinds(config),
        Commands::Transforms => kinds::list_transforms(),
        Commands::Init { command } => init::handle_init_command(command),
    }
}

/// Kinds loaded from the configuration root, ready to run
pub(crate) struct LoadedGraph {
    pub pipeline: Pipeline,
    pub definitions: Vec<KindDefinition>,
}

/// Modules available to kind files
pub(crate) fn kind_modules(params: &Parameters) -> Result<ModuleRegistry> {
    let mut modules = ModuleRegistry::new();
    modules.register(ParamsModule::new(params.clone()))?;
    modules.register(LogModule::new(TracingSink::new("kind")))?;
    Ok(modules)
}

/// Load parameters and every kind, and assemble the pipeline
pub(crate) fn load_graph(config: &Config) -> Result<LoadedGraph> {
    let params = config.load_parameters()?;
    let modules = kind_modules(&params)?;

    let kinds_dir = config.kinds_dir();
    let definitions = taskforge_lua::load_kinds_dir(&kinds_dir, &modules)?;
    info!(
        "Loaded {} kinds from {}",
        definitions.len(),
        kinds_dir.display()
    );

    let registry = TransformRegistry::with_defaults();
    let mut pipeline = Pipeline::new(params);
    for definition in &definitions {
        let kind = definition.clone().into_kind(&registry)?;
        pipeline
            .add_kind(kind)
            .with_context(|| format!("Failed to add kind '{}'", definition.name))?;
    }

    Ok(LoadedGraph {
        pipeline,
        definitions,
    })
}
