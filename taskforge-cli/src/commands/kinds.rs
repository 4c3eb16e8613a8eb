//! Listing commands
//!
//! Show the kinds found under the root and the transforms kind files can
//! name.

use anyhow::Result;
use colored::*;
use taskforge_core::TransformRegistry;

use super::load_graph;
use crate::config::Config;

/// Print every kind in build order
pub fn list_kinds(config: &Config) -> Result<()> {
    let loaded = load_graph(config)?;
    let order = loaded.pipeline.kind_order()?;

    if order.is_empty() {
        println!(
            "{}",
            format!("No kinds found in {}", config.kinds_dir().display()).yellow()
        );
        return Ok(());
    }

    println!("{}", format!("Found {} kind(s):", order.len()).bold());
    println!();
    for name in &order {
        let Some(definition) = loaded.definitions.iter().find(|d| &d.name == name) else {
            continue;
        };
        let metadata = definition.metadata();

        println!("{}", metadata.name.cyan().bold());
        if let Some(description) = &metadata.description {
            println!("  {}", description.dimmed());
        }
        if !metadata.kind_dependencies.is_empty() {
            println!("  Depends on: {}", metadata.kind_dependencies.join(", "));
        }
        let transforms: Vec<&str> = metadata.transforms.iter().map(|t| t.name.as_str()).collect();
        if !transforms.is_empty() {
            println!("  Transforms: {}", transforms.join(" → ").dimmed());
        }
        println!("  Tasks:      {}", metadata.task_count);
        println!();
    }

    Ok(())
}

/// Print the names of all built-in transforms
pub fn list_transforms() -> Result<()> {
    let registry = TransformRegistry::with_defaults();
    println!(
        "{}",
        format!("{} registered transform(s):", registry.len()).bold()
    );
    for name in registry.names() {
        println!("  {}", name.cyan());
    }
    Ok(())
}
