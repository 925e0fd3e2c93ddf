//! Engine configuration
//!
//! Loaded from YAML, then overridden from the environment:
//!
//! ```yaml
//! template_paths:
//!   - templates/
//!   - extra/greetings.lg
//! duplicate_policy: reject    # or last_wins
//! random_seed: 42             # omit for non-deterministic choice
//! ```
//!
//! | Variable | Effect |
//! |---|---|
//! | `LG_TEMPLATE_PATH` | replaces `template_paths` (platform path-list syntax) |
//! | `LG_RANDOM_SEED` | sets `random_seed` |

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::registry::DuplicatePolicy;

pub const TEMPLATE_PATH_VAR: &str = "LG_TEMPLATE_PATH";
pub const RANDOM_SEED_VAR: &str = "LG_RANDOM_SEED";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// `.lg` files or directories of them, loaded in order
    pub template_paths: Vec<PathBuf>,
    pub duplicate_policy: DuplicatePolicy,
    pub random_seed: Option<u64>,
}

impl EngineConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse engine configuration")
    }

    /// Read a YAML file; relative template paths resolve against its directory
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading engine configuration from {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config: EngineConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if let Some(base) = path.parent() {
            for template_path in &mut config.template_paths {
                if template_path.is_relative() {
                    *template_path = base.join(&*template_path);
                }
            }
        }
        Ok(config)
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Optional YAML file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable source
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(paths) = lookup(TEMPLATE_PATH_VAR).filter(|p| !p.trim().is_empty()) {
            self.template_paths = std::env::split_paths(&paths).collect();
        }
        if let Some(seed) = lookup(RANDOM_SEED_VAR) {
            let seed = seed
                .trim()
                .parse::<u64>()
                .map_err(|e| anyhow!("{} must be an unsigned integer: {}", RANDOM_SEED_VAR, e))?;
            self.random_seed = Some(seed);
        }
        Ok(self)
    }
}
