//! Init command handlers
//!
//! Handles initialization of development environment including
//! generation of stub files for modules and .luarc.json configuration.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use std::fs;
use std::path::Path;
use taskforge_core::Parameters;
use taskforge_lua::kind_stubs;

use super::kind_modules;

/// Directory, relative to the output directory, receiving the stubs
const STUBS_DIR: &str = ".taskforge/stubs";

/// Init subcommands
#[derive(Subcommand)]
pub enum InitCommands {
    /// Generate Lua development files (.luarc.json and stubs)
    Lua {
        /// Output directory for generated files
        #[arg(short, long, default_value = ".")]
        output: String,

        /// Generate only .luarc.json
        #[arg(long)]
        config_only: bool,

        /// Generate only stub files
        #[arg(long)]
        stubs_only: bool,
    },
}

/// Handle init commands
pub fn handle_init_command(command: InitCommands) -> Result<()> {
    match command {
        InitCommands::Lua {
            output,
            config_only,
            stubs_only,
        } => generate_lua_dev_files(Path::new(&output), config_only, stubs_only),
    }
}

/// Generate Lua development files
///
/// Creates .luarc.json for LSP configuration and stub files for module autocompletion.
fn generate_lua_dev_files(output_path: &Path, config_only: bool, stubs_only: bool) -> Result<()> {
    if !stubs_only {
        generate_luarc_json(output_path)?;
    }

    if !config_only {
        generate_stub_files(output_path)?;
    }

    println!("{}", "✓ Lua development files generated!".green().bold());
    println!();
    println!("{}", "Next steps:".bold());
    println!("  1. Install Lua Language Server in your editor");
    println!("  2. Open a kind file under kinds/ to see autocomplete and type hints");
    println!("  3. Run {} to build the graph", "taskforge full".cyan());

    Ok(())
}

/// Generate .luarc.json for Lua LSP configuration
fn generate_luarc_json(output_path: &Path) -> Result<()> {
    let luarc_path = output_path.join(".luarc.json");

    let luarc_content = format!(
        r#"{{
  "$schema": "https://raw.githubusercontent.com/sumneko/vscode-lua/master/setting/schema.json",
  "runtime": {{
    "version": "Lua 5.4"
  }},
  "diagnostics": {{
    "globals": ["kind", "params", "log"]
  }},
  "workspace": {{
    "library": ["{}"],
    "checkThirdParty": false
  }},
  "completion": {{
    "callSnippet": "Both"
  }}
}}
"#,
        STUBS_DIR
    );

    fs::create_dir_all(output_path)
        .with_context(|| format!("Failed to create output directory {:?}", output_path))?;
    fs::write(&luarc_path, luarc_content)
        .with_context(|| format!("Failed to write .luarc.json to {:?}", luarc_path))?;

    println!("  {} .luarc.json", "Created".green());

    Ok(())
}

/// Generate stub files for the kind file modules
///
/// Uses the actual module implementations to generate stubs,
/// ensuring they stay in sync with the real modules.
fn generate_stub_files(output_path: &Path) -> Result<()> {
    let stubs_dir = output_path.join(STUBS_DIR);
    fs::create_dir_all(&stubs_dir)
        .with_context(|| format!("Failed to create stubs directory at {:?}", stubs_dir))?;

    let mut stubs = vec![("kind".to_string(), kind_stubs())];
    let modules = kind_modules(&Parameters::default())?;
    for module in modules.modules() {
        stubs.push((module.id().to_string(), module.stubs()));
    }

    for (name, content) in stubs {
        let stub_path = stubs_dir.join(format!("{}.lua", name));

        fs::write(&stub_path, content)
            .with_context(|| format!("Failed to write stub file {:?}", stub_path))?;

        println!("  {} {}.lua", "Created".green(), name);
    }

    println!(
        "  {} in {}",
        "Stubs ready".green(),
        stubs_dir.display().to_string().cyan()
    );

    Ok(())
}
