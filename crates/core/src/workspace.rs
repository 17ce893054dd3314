//! Workspace abstraction: the only place the core touches the filesystem.
//!
//! Import resolution asks the [`Workspace`] whether a candidate file exists
//! and the model store asks it for source text. [`FileSystemWorkspace`]
//! delegates to `std::fs`; [`InMemoryWorkspace`] serves tests and editors
//! holding unsaved buffers.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

pub trait Workspace: Send + Sync {
    fn read_source(&self, path: &Path) -> io::Result<String>;

    /// Whether `path` names an existing file.
    fn is_file(&self, path: &Path) -> bool;

    /// Stable identity of a file, used for visited sets and as store key.
    fn canonicalize(&self, path: &Path) -> PathBuf {
        normalize_path(path)
    }
}

/// Resolve `.` and `..` without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                } else if components.is_empty() {
                    components.push(component);
                }
            }
            other => components.push(other),
        }
    }
    components.iter().collect()
}

pub struct FileSystemWorkspace;

impl Workspace for FileSystemWorkspace {
    fn read_source(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn canonicalize(&self, path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| normalize_path(path))
    }
}

/// Files held in memory, keyed by normalized path.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkspace {
    files: HashMap<PathBuf, String>,
}

impl InMemoryWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl AsRef<Path>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, text: impl Into<String>) {
        self.files.insert(normalize_path(path.as_ref()), text.into());
    }

    pub fn remove(&mut self, path: impl AsRef<Path>) -> Option<String> {
        self.files.remove(&normalize_path(path.as_ref()))
    }
}

impl Workspace for InMemoryWorkspace {
    fn read_source(&self, path: &Path) -> io::Result<String> {
        let normalized = normalize_path(path);
        self.files.get(&normalized).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found in memory: {}", normalized.display()),
            )
        })
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(&normalize_path(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_path_resolves_dot_and_dotdot() {
        assert_eq!(normalize_path(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(normalize_path(Path::new("../x")), PathBuf::from("../x"));
    }

    #[test]
    fn in_memory_read_source() {
        let ws = InMemoryWorkspace::new().with_file("/suite/a.robot", "*** Keywords ***\n");
        assert_eq!(
            ws.read_source(Path::new("/suite/x/../a.robot")).unwrap(),
            "*** Keywords ***\n"
        );
        let err = ws.read_source(Path::new("/missing.robot")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn in_memory_existence_and_identity() {
        let ws = InMemoryWorkspace::new().with_file("/a/b/res.resource", "");
        assert!(ws.is_file(Path::new("/a/b/./res.resource")));
        assert!(!ws.is_file(Path::new("/a/b")));
        assert_eq!(
            ws.canonicalize(Path::new("/a/c/../b/res.resource")),
            PathBuf::from("/a/b/res.resource")
        );
    }
}
