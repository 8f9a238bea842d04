use std::path::Path;

use anyhow::{Context, Result};
use keyevent::KeyCombination;
use serde::{Deserialize, Serialize};

/// One named key event the host should register
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub name: String,
    /// Combination used when nothing is persisted for this name yet
    #[serde(default)]
    pub key: Option<String>,
    /// Shell command run on key down
    #[serde(default)]
    pub command: Option<String>,
}

impl Binding {
    pub fn default_combination(&self) -> Result<Option<KeyCombination>> {
        self.key
            .as_deref()
            .map(|key| {
                KeyCombination::parse(key)
                    .with_context(|| format!("Invalid key '{key}' for '{}'", self.name))
            })
            .transpose()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config {
    pub bindings: Vec<Binding>,
}

impl Config {
    pub fn from_ron(text: &str) -> Result<Self> {
        let config: Config = ron::from_str(text).context("Failed to parse RON")?;
        for binding in &config.bindings {
            binding.default_combination()?;
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path:?}"))?;
        Self::from_ron(&text)
    }
}

/// Split a `name=key` assignment from the command line
pub fn parse_assignment(s: &str) -> Result<(String, KeyCombination)> {
    let (name, key) = s
        .split_once('=')
        .with_context(|| format!("Expected NAME=KEY, got '{s}'"))?;
    let combination = KeyCombination::parse(key.trim())
        .with_context(|| format!("Invalid key '{key}'"))?;
    Ok((name.trim().to_string(), combination))
}
