//! Model catalog: registry of installed enhancement backends.

mod backend;
mod tools;

pub use backend::{resolve_executable, ModelBackend, ModelParams, ModelRequest};
pub use tools::{NcnnInterpolator, NcnnUpscaler};

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::models::ModelFamily;

/// Errors resolving a configured model selection.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Unknown model '{0}'")]
    Unknown(String),

    #[error("Model '{name}' is a {actual} model, expected {expected}")]
    WrongFamily {
        name: String,
        expected: ModelFamily,
        actual: ModelFamily,
    },

    #[error("Model '{name}' is not installed (executable '{executable}' not found)")]
    NotInstalled { name: String, executable: String },
}

/// Registry of model backends, keyed by catalog name.
#[derive(Default)]
pub struct ModelCatalog {
    backends: Vec<Arc<dyn ModelBackend>>,
}

impl ModelCatalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog pre-populated with the standard ncnn-vulkan tools, resolved
    /// under `install_dir` (or PATH when `None`).
    pub fn with_default_tools(install_dir: Option<&Path>) -> Self {
        let mut catalog = Self::new();
        catalog.register(Arc::new(NcnnUpscaler::real_esrgan(install_dir)));
        catalog.register(Arc::new(NcnnUpscaler::real_cugan(install_dir)));
        catalog.register(Arc::new(NcnnUpscaler::waifu2x(install_dir)));
        catalog.register(Arc::new(NcnnInterpolator::rife(install_dir)));
        catalog.register(Arc::new(NcnnInterpolator::cain(install_dir)));
        catalog
    }

    /// Register a backend. A later registration with the same name shadows
    /// an earlier one.
    pub fn register(&mut self, backend: Arc<dyn ModelBackend>) {
        self.backends.retain(|b| b.name() != backend.name());
        self.backends.push(backend);
    }

    /// Look up a backend by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ModelBackend>> {
        self.backends.iter().find(|b| b.name() == name).cloned()
    }

    /// All registered backends of one family.
    pub fn by_family(&self, family: ModelFamily) -> Vec<Arc<dyn ModelBackend>> {
        self.backends
            .iter()
            .filter(|b| b.family() == family)
            .cloned()
            .collect()
    }

    /// All registered backends.
    pub fn all(&self) -> &[Arc<dyn ModelBackend>] {
        &self.backends
    }

    /// Resolve a configured selection to an installed backend of the
    /// expected family.
    pub fn resolve(
        &self,
        name: &str,
        family: ModelFamily,
    ) -> Result<Arc<dyn ModelBackend>, CatalogError> {
        let backend = self
            .get(name)
            .ok_or_else(|| CatalogError::Unknown(name.to_string()))?;

        if backend.family() != family {
            return Err(CatalogError::WrongFamily {
                name: name.to_string(),
                expected: family,
                actual: backend.family(),
            });
        }

        if !backend.is_installed() {
            return Err(CatalogError::NotInstalled {
                name: name.to_string(),
                executable: backend.executable().display().to_string(),
            });
        }

        Ok(backend)
    }
}
