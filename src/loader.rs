//! `.lg` file loading

use anyhow::{Context, Result};
use lg_core::{parse_lg_named, LgFile};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::LoadError;

pub const LG_EXTENSION: &str = "lg";

/// Reads and parses LG files.
///
/// A directory contributes its `.lg` files in name order; subdirectories are
/// not searched.
#[derive(Debug, Clone, Default)]
pub struct TemplateLoader {
    paths: Vec<PathBuf>,
}

impl TemplateLoader {
    pub fn new(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Every file the configured paths expand to, in load order
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for path in &self.paths {
            files.extend(Self::expand(path)?);
        }
        Ok(files)
    }

    /// Parse every configured path, in order
    pub fn load(&self) -> Result<Vec<LgFile>> {
        let files = self
            .files()?
            .iter()
            .map(|path| Self::load_file(path))
            .collect::<Result<Vec<_>>>()?;
        info!(
            files = files.len(),
            templates = files.iter().map(|f| f.templates.len()).sum::<usize>(),
            "loaded LG sources"
        );
        Ok(files)
    }

    pub fn load_file(path: &Path) -> Result<LgFile> {
        debug!("Parsing {}", path.display());
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file = parse_lg_named(&source, &path.display().to_string())
            .map_err(LoadError::from)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(file)
    }

    fn expand(path: &Path) -> Result<Vec<PathBuf>> {
        if !path.is_dir() {
            return Ok(vec![path.to_path_buf()]);
        }
        let mut files = Vec::new();
        let entries = std::fs::read_dir(path)
            .with_context(|| format!("Failed to read directory {}", path.display()))?;
        for entry in entries {
            let entry_path = entry
                .with_context(|| format!("Failed to read directory {}", path.display()))?
                .path();
            if entry_path.is_file()
                && entry_path.extension().is_some_and(|ext| ext == LG_EXTENSION)
            {
                files.push(entry_path);
            }
        }
        files.sort();
        Ok(files)
    }
}
