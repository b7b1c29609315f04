use crate::Result;
use crate::error::TemplateError;
use log::debug;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolves a template name (as written in `{% include "name" %}`) to its source.
pub trait Locator: Send + Sync {
    fn resolve(&self, name: &str) -> Result<String>;
}

impl<F> Locator for F
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    fn resolve(&self, name: &str) -> Result<String> {
        self(name)
    }
}

/// Reads templates from disk; relative names are joined onto `base`.
#[derive(Debug, Clone)]
pub struct FileLocator {
    base: PathBuf,
}

impl FileLocator {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }
}

impl Locator for FileLocator {
    fn resolve(&self, name: &str) -> Result<String> {
        let path = Path::new(name);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        };

        debug!("Resolving template '{}' from {}", name, path.display());
        fs::read_to_string(&path).map_err(|e| TemplateError::Resolution {
            name: path.display().to_string(),
            reason: format!("{} (default file locator)", e),
        })
    }
}

/// Serves templates from memory, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MemoryLocator {
    templates: HashMap<String, String>,
}

impl MemoryLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(name, source);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.templates.insert(name.into(), source.into());
    }
}

impl Locator for MemoryLocator {
    fn resolve(&self, name: &str) -> Result<String> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| TemplateError::Resolution {
                name: name.to_string(),
                reason: "no such template".to_string(),
            })
    }
}
