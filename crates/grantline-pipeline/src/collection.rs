//! Collection configuration — which grants a run evaluates

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// The collection file: an ordered list of core project numbers.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionConfig {
    pub core_project_numbers: Vec<String>,
}

impl CollectionConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read collection file: {}", path.display()))?;
        let config: CollectionConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse collection file: {}", path.display()))?;
        Ok(config)
    }

    /// Identifiers upper-cased, in file order. The core project number is
    /// the cross-provider join key and is upper-case everywhere downstream.
    pub fn normalized_project_numbers(&self) -> Vec<String> {
        self.core_project_numbers
            .iter()
            .map(|num| num.to_uppercase())
            .collect()
    }
}
