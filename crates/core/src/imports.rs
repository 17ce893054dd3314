//! Import graph: from declared import strings to concrete file identities.
//!
//! A path containing a variable placeholder is reported as unresolved and
//! never guessed at. Absolute paths pass through. Relative paths are tried
//! against the importing file's directory first and then against each
//! module-search directory. A missing file is an ordinary unresolved
//! import; only malformed path syntax is an error.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::ImportPathError;
use crate::library::LibraryRegistry;
use crate::model::{FileModel, ImportKind};
use crate::varsyntax;
use crate::workspace::Workspace;

// ──────────────────────────────────────────────
// Import paths
// ──────────────────────────────────────────────

/// A syntactically valid import string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPath {
    raw: String,
    variables: Vec<String>,
}

impl ImportPath {
    pub fn parse(raw: &str) -> Result<ImportPath, ImportPathError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ImportPathError::Empty);
        }
        if raw.chars().any(char::is_control) {
            return Err(ImportPathError::ControlCharacter {
                path: raw.to_owned(),
            });
        }
        if let Some(at) = unterminated_variable(raw) {
            return Err(ImportPathError::UnterminatedVariable {
                path: raw.to_owned(),
                at,
            });
        }
        let variables = varsyntax::find_variables(raw)
            .iter()
            .map(|v| v.full_text())
            .collect();
        Ok(ImportPath {
            raw: raw.to_owned(),
            variables,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_parameterized(&self) -> bool {
        !self.variables.is_empty()
    }

    /// Placeholders in the path, e.g. `["${ROOT}"]`.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// `/x`, `C:/x` or `C:\x`.
    pub fn is_absolute(&self) -> bool {
        let bytes = self.raw.as_bytes();
        Path::new(&self.raw).is_absolute()
            || self.raw.starts_with('/')
            || (bytes.len() > 2
                && bytes[0].is_ascii_alphabetic()
                && bytes[1] == b':'
                && matches!(bytes[2], b'/' | b'\\'))
    }

    /// Whether a library import names a file rather than a module.
    pub fn looks_like_file(&self) -> bool {
        self.raw.contains('/') || self.raw.contains('\\') || self.raw.ends_with(".py")
    }

    fn relative(&self) -> PathBuf {
        PathBuf::from(self.raw.replace('\\', "/"))
    }
}

/// Byte offset of a `${` / `@{` / `&{` / `%{` opening with no matching brace.
fn unterminated_variable(text: &str) -> Option<usize> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut i = 0;
    while i + 1 < chars.len() {
        let (at, c) = chars[i];
        if c == '\\' {
            i += 2;
            continue;
        }
        if matches!(c, '$' | '@' | '&' | '%') && chars[i + 1].1 == '{' {
            let mut depth = 0usize;
            let mut closed = None;
            for (j, &(_, ch)) in chars.iter().enumerate().skip(i + 1) {
                match ch {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            closed = Some(j);
                            break;
                        }
                    }
                    _ => {}
                }
            }
            match closed {
                Some(j) => i = j + 1,
                None => return Some(at),
            }
        } else {
            i += 1;
        }
    }
    None
}

// ──────────────────────────────────────────────
// Resolution
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum UnresolvedReason {
    Parameterized { variables: Vec<String> },
    NotFound { tried: Vec<PathBuf> },
    UnknownLibrary { name: String },
}

impl std::fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnresolvedReason::Parameterized { variables } => {
                write!(f, "parameterized path ({})", variables.join(", "))
            }
            UnresolvedReason::NotFound { tried } => {
                write!(f, "not found (tried {} locations)", tried.len())
            }
            UnresolvedReason::UnknownLibrary { name } => write!(f, "unknown library '{name}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Resolution {
    Resolved(PathBuf),
    Unresolved(UnresolvedReason),
}

impl Resolution {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Resolution::Resolved(path) => Some(path),
            Resolution::Unresolved(_) => None,
        }
    }
}

pub struct PathResolver<'w> {
    workspace: &'w dyn Workspace,
    search_paths: &'w [PathBuf],
}

impl<'w> PathResolver<'w> {
    pub fn new(workspace: &'w dyn Workspace, search_paths: &'w [PathBuf]) -> Self {
        PathResolver {
            workspace,
            search_paths,
        }
    }

    /// Every location `import` could denote, in lookup order.
    fn candidates(&self, importing_file: &Path, path: &ImportPath) -> Vec<PathBuf> {
        if path.is_absolute() {
            return vec![PathBuf::from(path.as_str())];
        }
        let relative = path.relative();
        let base = importing_file.parent().unwrap_or(Path::new(""));
        std::iter::once(base.join(&relative))
            .chain(self.search_paths.iter().map(|dir| dir.join(&relative)))
            .collect()
    }

    /// The first existing location.
    pub fn resolve_first(
        &self,
        importing_file: &Path,
        import: &str,
    ) -> Result<Resolution, ImportPathError> {
        let path = ImportPath::parse(import)?;
        if path.is_parameterized() {
            return Ok(Resolution::Unresolved(UnresolvedReason::Parameterized {
                variables: path.variables().to_vec(),
            }));
        }
        let tried = self.candidates(importing_file, &path);
        match tried.iter().find(|c| self.workspace.is_file(c)) {
            Some(found) => Ok(Resolution::Resolved(self.workspace.canonicalize(found))),
            None => Ok(Resolution::Unresolved(UnresolvedReason::NotFound { tried })),
        }
    }

    /// All existing locations, without duplicates. Empty for parameterized
    /// or missing imports.
    pub fn resolve_all(
        &self,
        importing_file: &Path,
        import: &str,
    ) -> Result<Vec<PathBuf>, ImportPathError> {
        let path = ImportPath::parse(import)?;
        if path.is_parameterized() {
            return Ok(Vec::new());
        }
        let mut found: Vec<PathBuf> = Vec::new();
        for candidate in self.candidates(importing_file, &path) {
            if self.workspace.is_file(&candidate) {
                let canon = self.workspace.canonicalize(&candidate);
                if !found.contains(&canon) {
                    found.push(canon);
                }
            }
        }
        Ok(found)
    }
}

// ──────────────────────────────────────────────
// Per-file imports
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ImportTarget {
    /// A resource or variable file, or a library given by path.
    File(PathBuf),
    /// A known library, by its registered name.
    Library(String),
    Unresolved(UnresolvedReason),
    Malformed(#[serde(serialize_with = "as_display")] ImportPathError),
}

fn as_display<S: serde::Serializer>(err: &ImportPathError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(err)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedImport {
    pub kind: ImportKind,
    pub declared: String,
    pub line: u32,
    pub arguments: Vec<String>,
    pub alias: Option<String>,
    pub target: ImportTarget,
}

impl ResolvedImport {
    pub fn file(&self) -> Option<&Path> {
        match &self.target {
            ImportTarget::File(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.target, ImportTarget::File(_) | ImportTarget::Library(_))
    }
}

/// Outgoing edges of one file in the import graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileImports {
    pub imports: Vec<ResolvedImport>,
}

impl FileImports {
    pub fn collect(
        model: &FileModel,
        resolver: &PathResolver<'_>,
        libraries: &LibraryRegistry,
    ) -> FileImports {
        let imports = model
            .imports()
            .into_iter()
            .map(|view| {
                let declared = view.path.map(|t| t.text.clone()).unwrap_or_default();
                let target =
                    resolve_target(view.kind, &declared, model.path(), resolver, libraries);
                if let ImportTarget::Unresolved(reason) = &target {
                    debug!(
                        file = %model.path().display(),
                        import = %declared,
                        %reason,
                        "unresolved import"
                    );
                }
                ResolvedImport {
                    kind: view.kind,
                    line: view.setting.line(),
                    arguments: view.arguments.iter().map(|t| t.text.clone()).collect(),
                    alias: view.alias.map(|t| t.text.clone()),
                    declared,
                    target,
                }
            })
            .collect();
        FileImports { imports }
    }

    pub fn resources(&self) -> impl Iterator<Item = &Path> {
        self.of_kind(ImportKind::Resource).filter_map(ResolvedImport::file)
    }

    pub fn variable_files(&self) -> impl Iterator<Item = &Path> {
        self.of_kind(ImportKind::Variables).filter_map(ResolvedImport::file)
    }

    pub fn libraries(&self) -> impl Iterator<Item = &ResolvedImport> {
        self.of_kind(ImportKind::Library)
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &ResolvedImport> {
        self.imports.iter().filter(|i| !i.is_resolved())
    }

    fn of_kind(&self, kind: ImportKind) -> impl Iterator<Item = &ResolvedImport> {
        self.imports.iter().filter(move |i| i.kind == kind)
    }
}

fn resolve_target(
    kind: ImportKind,
    declared: &str,
    importing_file: &Path,
    resolver: &PathResolver<'_>,
    libraries: &LibraryRegistry,
) -> ImportTarget {
    let path = match ImportPath::parse(declared) {
        Ok(path) => path,
        Err(err) => return ImportTarget::Malformed(err),
    };
    if kind == ImportKind::Library && !path.looks_like_file() {
        if path.is_parameterized() {
            return ImportTarget::Unresolved(UnresolvedReason::Parameterized {
                variables: path.variables().to_vec(),
            });
        }
        return match libraries.get(declared) {
            Some(lib) => ImportTarget::Library(lib.name.clone()),
            None => ImportTarget::Unresolved(UnresolvedReason::UnknownLibrary {
                name: declared.to_owned(),
            }),
        };
    }
    match resolver.resolve_first(importing_file, declared) {
        Ok(Resolution::Resolved(file)) => match kind {
            ImportKind::Library => match libraries.get(&file.to_string_lossy()) {
                Some(lib) => ImportTarget::Library(lib.name.clone()),
                None => ImportTarget::File(file),
            },
            _ => ImportTarget::File(file),
        },
        Ok(Resolution::Unresolved(reason)) => match (kind, libraries.get(declared)) {
            // A library file outside the workspace may still be known by path.
            (ImportKind::Library, Some(lib)) => ImportTarget::Library(lib.name.clone()),
            _ => ImportTarget::Unresolved(reason),
        },
        Err(err) => ImportTarget::Malformed(err),
    }
}
