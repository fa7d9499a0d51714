/*!
# Analyzer Configuration

Matching and classification settings, loaded from a TOML file. Every field
has a default, so a partial file (or no file at all) is valid.

```toml
similarity_threshold = 0.6
detect_moves = true
workers = 4
report_unsupported_constructs = false
```
*/

use crate::classify::ClassifyOptions;
use crate::matching::MatchOptions;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Minimum Dice similarity for a best-effort pair (0.0 to 1.0)
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Detect moves between different parents
    #[serde(default = "default_true")]
    pub detect_moves: bool,

    /// Worker threads for batch analysis
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Report lambdas, queries, anonymous types and methods in updated bodies
    #[serde(default = "default_true")]
    pub report_unsupported_constructs: bool,
}

fn default_similarity_threshold() -> f64 {
    0.5
}

fn default_true() -> bool {
    true
}

fn default_workers() -> usize {
    num_cpus::get()
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            detect_moves: true,
            workers: default_workers(),
            report_unsupported_constructs: true,
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read analyzer config from {}", path.as_ref().display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse TOML config from {}", path.as_ref().display()))?;
        tracing::debug!("loaded analyzer config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize analyzer config to TOML")?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write analyzer config to {}", path.as_ref().display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            bail!("similarity_threshold must be within [0, 1], got {}", self.similarity_threshold);
        }
        Ok(())
    }

    /// Число потоков; 0 означает по числу CPU.
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 { num_cpus::get() } else { self.workers }
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions { similarity_threshold: self.similarity_threshold, detect_moves: self.detect_moves }
    }

    pub fn classify_options(&self) -> ClassifyOptions {
        ClassifyOptions { report_unsupported_constructs: self.report_unsupported_constructs }
    }
}
