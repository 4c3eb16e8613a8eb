//! Configuration module
//!
//! Handles CLI configuration: where the kinds live and which parameters the
//! graph is generated with.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use taskforge_core::Parameters;

/// Directory under the root holding the kind files
pub const KINDS_DIR: &str = "kinds";

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the task configuration
    pub root: PathBuf,
    /// JSON file with the graph parameters
    pub parameters_file: Option<PathBuf>,
    /// `key=value` overrides applied on top of the parameters file
    pub overrides: Vec<(String, Value)>,
}

impl Config {
    /// Directory holding the kind files
    pub fn kinds_dir(&self) -> PathBuf {
        self.root.join(KINDS_DIR)
    }

    /// Load the parameters: file first, then overrides, then defaults
    ///
    /// Defaults only fill names neither the file nor an override supplied.
    pub fn load_parameters(&self) -> Result<Parameters> {
        let mut params = match &self.parameters_file {
            Some(path) => read_parameters_file(path)?,
            None => Parameters::default(),
        };
        for (name, value) in &self.overrides {
            params
                .set(name.clone(), value.clone())
                .with_context(|| format!("Failed to set parameter '{}'", name))?;
        }
        Ok(params.with_defaults())
    }
}

fn read_parameters_file(path: &Path) -> Result<Parameters> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read parameters file {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Parameters file {} is not valid JSON", path.display()))?;
    Parameters::from_json(value)
        .with_context(|| format!("Invalid parameters file {}", path.display()))
}

/// Parse a single key=value pair
///
/// The value is read as JSON when it parses as JSON (`level=3`,
/// `shipping=true`), otherwise it is taken as a plain string.
pub fn parse_key_val(s: &str) -> Result<(String, Value)> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("invalid KEY=value: no `=` found in `{}`", s))?;
    if key.is_empty() {
        return Err(anyhow!("invalid KEY=value: empty key in `{}`", s));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}
