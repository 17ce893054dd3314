//! Per-session project context and the shared model store.
//!
//! A [`ProjectContext`] bundles everything a resolution needs: language
//! version, module-search directories, library introspection data and the
//! workspace collaborator. Callers build one per session and pass it
//! explicitly.
//!
//! Parsed files live in a [`ModelStore`]. A reparse never mutates a
//! published model: it builds a new one and swaps the `Arc` in the map, so a
//! concurrent reader holds either the old model or the new one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;
use crate::imports::{FileImports, PathResolver};
use crate::library::{LibraryRegistry, LibrarySpec, VariableFileSpec};
use crate::model::FileModel;
use crate::parser;
use crate::varsyntax;
use crate::version::LanguageVersion;
use crate::workspace::Workspace;

// ──────────────────────────────────────────────
// Configuration
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub version: LanguageVersion,
    /// Module-search directories for relative imports.
    pub search_paths: Vec<PathBuf>,
    pub libraries: Vec<LibrarySpec>,
    pub variable_files: Vec<VariableFileSpec>,
    /// Variables visible everywhere, e.g. from `--variable` on a command line.
    pub global_variables: Vec<String>,
}

// ──────────────────────────────────────────────
// Model store
// ──────────────────────────────────────────────

/// Anything that can hand out parsed models by file identity.
pub trait ModelSource: Send + Sync {
    /// The current model for `path`, or `None` when it cannot be obtained.
    fn model(&self, path: &Path) -> Option<Arc<FileModel>>;
}

/// Published models keyed by file identity, plus a generation counter
/// bumped on every publish or removal.
#[derive(Debug, Default)]
pub struct ModelStore {
    models: RwLock<HashMap<PathBuf, Arc<FileModel>>>,
    generation: AtomicU64,
}

impl ModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<Arc<FileModel>> {
        let models = self.models.read().unwrap_or_else(PoisonError::into_inner);
        models.get(path).cloned()
    }

    /// Replace the model for its path atomically.
    pub fn publish(&self, model: FileModel) -> Arc<FileModel> {
        let model = Arc::new(model);
        let path = model.path.clone();
        {
            let mut models = self.models.write().unwrap_or_else(PoisonError::into_inner);
            models.insert(path.clone(), Arc::clone(&model));
        }
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(path = %path.display(), generation, "published model");
        model
    }

    /// Parse `text` as the new content of `path` and publish it.
    pub fn reparse(&self, path: &Path, text: &str, version: LanguageVersion) -> Arc<FileModel> {
        self.publish(parser::parse_source(text, path, version))
    }

    pub fn remove(&self, path: &Path) -> Option<Arc<FileModel>> {
        let removed = {
            let mut models = self.models.write().unwrap_or_else(PoisonError::into_inner);
            models.remove(path)
        };
        if removed.is_some() {
            self.generation.fetch_add(1, Ordering::AcqRel);
        }
        removed
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.models.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ──────────────────────────────────────────────
// Project context
// ──────────────────────────────────────────────

pub struct ProjectContext {
    version: LanguageVersion,
    search_paths: Vec<PathBuf>,
    libraries: LibraryRegistry,
    variable_files: Vec<VariableFileSpec>,
    global_variables: Vec<String>,
    workspace: Arc<dyn Workspace>,
    store: ModelStore,
}

impl ProjectContext {
    pub fn new(config: ProjectConfig, workspace: Arc<dyn Workspace>) -> Self {
        ProjectContext {
            version: config.version,
            search_paths: config.search_paths,
            libraries: LibraryRegistry::new(config.libraries),
            variable_files: config.variable_files,
            global_variables: config.global_variables,
            workspace,
            store: ModelStore::new(),
        }
    }

    pub fn version(&self) -> LanguageVersion {
        self.version
    }

    pub fn libraries(&self) -> &LibraryRegistry {
        &self.libraries
    }

    pub fn global_variables(&self) -> &[String] {
        &self.global_variables
    }

    pub fn workspace(&self) -> &dyn Workspace {
        self.workspace.as_ref()
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn resolver(&self) -> PathResolver<'_> {
        PathResolver::new(self.workspace.as_ref(), &self.search_paths)
    }

    /// The published model for `path`, parsing it through the workspace on
    /// first request.
    pub fn load(&self, path: &Path) -> Result<Arc<FileModel>, StoreError> {
        let key = self.workspace.canonicalize(path);
        if let Some(model) = self.store.get(&key) {
            return Ok(model);
        }
        let text = self
            .workspace
            .read_source(&key)
            .map_err(|source| StoreError::Read {
                path: key.clone(),
                source,
            })?;
        Ok(self.store.reparse(&key, &text, self.version))
    }

    /// Publish new content for `path`, e.g. an unsaved editor buffer.
    pub fn update(&self, path: &Path, text: &str) -> Arc<FileModel> {
        let key = self.workspace.canonicalize(path);
        self.store.reparse(&key, text, self.version)
    }

    pub fn imports(&self, model: &FileModel) -> FileImports {
        FileImports::collect(model, &self.resolver(), &self.libraries)
    }

    /// Introspection data for a variable file, matched by path suffix.
    pub fn variable_file(&self, path: &Path) -> Option<&VariableFileSpec> {
        let wanted = path.to_string_lossy().replace('\\', "/");
        self.variable_files.iter().find(|spec| {
            let configured = spec.path.replace('\\', "/");
            wanted.ends_with(&configured) || configured.ends_with(&wanted)
        })
    }

    /// Normalized global variable names.
    pub fn global_variable_names(&self) -> Vec<String> {
        self.global_variables
            .iter()
            .filter_map(|v| varsyntax::base_name(v))
            .collect()
    }
}

impl ModelSource for ProjectContext {
    fn model(&self, path: &Path) -> Option<Arc<FileModel>> {
        match self.load(path) {
            Ok(model) => Some(model),
            Err(err) => {
                debug!(error = %err, "model unavailable");
                None
            }
        }
    }
}
