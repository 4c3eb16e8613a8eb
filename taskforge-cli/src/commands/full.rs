//! Full graph command
//!
//! Builds every kind and prints the resulting tasks.

use anyhow::{Result, bail};
use colored::*;
use serde_json::Value;
use taskforge_core::{TaskGraph, UpstreamTask};

use super::load_graph;
use crate::config::Config;

/// Build the graph and print it
pub fn handle_full_command(config: &Config, kind: Option<&str>, json: bool) -> Result<()> {
    let loaded = load_graph(config)?;

    if let Some(kind) = kind {
        if loaded.pipeline.kind(kind).is_none() {
            bail!("Kind '{}' is not defined", kind);
        }
    }

    let graph = loaded.pipeline.run()?;

    if json {
        print_json(&graph, kind)
    } else {
        print_summary(&graph, &loaded.pipeline.kind_order()?, kind);
        Ok(())
    }
}

fn print_json(graph: &TaskGraph, kind: Option<&str>) -> Result<()> {
    let mut tasks = graph.to_json();
    if let (Some(kind), Value::Object(map)) = (kind, &mut tasks) {
        map.retain(|_, task| task["kind"] == kind);
    }
    println!("{}", serde_json::to_string_pretty(&tasks)?);
    Ok(())
}

fn print_summary(graph: &TaskGraph, order: &[String], only: Option<&str>) {
    let mut shown = 0;
    for kind in order {
        if only.is_some_and(|only| only != kind) {
            continue;
        }
        let tasks: Vec<&UpstreamTask> = graph.tasks_of_kind(kind).collect();
        println!(
            "{} {}",
            kind.bold(),
            format!("({} tasks)", tasks.len()).dimmed()
        );
        for task in &tasks {
            match treeherder_symbol(task) {
                Some(symbol) => println!("  {} {}", task.label.cyan(), symbol.dimmed()),
                None => println!("  {}", task.label.cyan()),
            }
        }
        shown += tasks.len();
    }

    println!();
    println!(
        "{}",
        format!("✓ {} tasks generated", shown).green().bold()
    );
}

/// `group(symbol)` of the materialised task, if it has one
fn treeherder_symbol(task: &UpstreamTask) -> Option<String> {
    let treeherder = task.extra_treeherder()?;
    let symbol = treeherder.get("symbol")?.as_str()?;
    let group = treeherder
        .get("groupSymbol")
        .and_then(Value::as_str)
        .unwrap_or(taskforge_core::symbol::NO_GROUP);
    Some(taskforge_core::symbol::join_symbol(group, symbol))
}
