//! `rfkit.toml` project configuration.
//!
//! ```toml
//! version = "6.1"
//! search_paths = ["resources"]
//! global_variables = ["${BROWSER}"]
//! libdoc = ["libdoc/SeleniumLibrary.json"]
//!
//! [[libraries]]
//! name = "MyLib"
//! keywords = [{ name = "Do Thing", args = ["a", "b=1"] }]
//!
//! [[variable_files]]
//! path = "vars.py"
//! variables = ["${PORT}"]
//! ```
//!
//! Relative paths are taken from the directory holding the file.

use std::path::{Path, PathBuf};

use rfkit_core::{LanguageVersion, LibrarySpec, ProjectConfig, VariableFileSpec};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub(crate) const DEFAULT_CONFIG: &str = "rfkit.toml";

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid libdoc export {path}: {source}")]
    Libdoc {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    version: Option<LanguageVersion>,
    search_paths: Vec<PathBuf>,
    global_variables: Vec<String>,
    /// libdoc JSON exports to load as library introspection data.
    libdoc: Vec<PathBuf>,
    libraries: Vec<LibrarySpec>,
    variable_files: Vec<VariableFileSpec>,
}

/// Load the project configuration from `explicit`, or from `rfkit.toml` in
/// the working directory when present. No file means defaults.
pub(crate) fn load(explicit: Option<&Path>) -> Result<ProjectConfig, ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG);
            if !default.is_file() {
                debug!("no {DEFAULT_CONFIG}, using defaults");
                return Ok(ProjectConfig::default());
            }
            default
        }
    };
    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let base = path.parent().unwrap_or(Path::new("")).to_path_buf();
    from_toml(&text, &path, &base)
}

fn from_toml(text: &str, path: &Path, base: &Path) -> Result<ProjectConfig, ConfigError> {
    let file: ConfigFile = toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut libraries = file.libraries;
    for export in &file.libdoc {
        let export = base.join(export);
        let json = std::fs::read_to_string(&export).map_err(|source| ConfigError::Read {
            path: export.clone(),
            source,
        })?;
        let library =
            LibrarySpec::from_libdoc_json(&json).map_err(|source| ConfigError::Libdoc {
                path: export.clone(),
                source,
            })?;
        debug!(library = %library.name, keywords = library.keywords.len(), "loaded libdoc export");
        libraries.push(library);
    }

    let variable_files = file
        .variable_files
        .into_iter()
        .map(|spec| VariableFileSpec {
            path: base.join(&spec.path).to_string_lossy().into_owned(),
            ..spec
        })
        .collect();

    Ok(ProjectConfig {
        version: file.version.unwrap_or_default(),
        search_paths: file.search_paths.iter().map(|p| base.join(p)).collect(),
        libraries,
        variable_files,
        global_variables: file.global_variables,
    })
}
