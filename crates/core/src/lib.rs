//! rfkit-core: parse-and-resolve core for tabular keyword-driven test suites.
//!
//! Source text flows through the [`splitter`] into cell tokens, the
//! [`parser`] drives the [`mapper`] chain over each line to build a
//! [`FileModel`], and the [`dumper`] writes a model back out. The
//! [`resolve`] locators answer what a keyword or variable name refers to,
//! following imports resolved by [`imports`] through a [`ProjectContext`].
//!
//! # Public API
//!
//! - [`parse_source()`] -- parse one file into a [`FileModel`]
//! - [`dump()`] -- write a model back to source text
//! - [`ProjectContext`] -- per-session configuration and model store
//! - [`KeywordLocator`] / [`VariableLocator`] -- symbol resolution

pub mod arguments;
pub mod dumper;
pub mod embedded;
pub mod error;
pub mod imports;
pub mod library;
pub mod mapper;
pub mod model;
pub mod parser;
pub mod project;
pub mod resolve;
pub mod splitter;
pub mod state;
pub mod token;
pub mod varsyntax;
pub mod version;
pub mod workspace;

// ── Convenience re-exports: key types ────────────────────────────────

pub use arguments::ArgumentsDescriptor;
pub use error::{EditError, EmbeddedError, ImportPathError, StoreError, VersionError};
pub use imports::{FileImports, ImportTarget, ResolvedImport};
pub use library::{LibrarySpec, VariableFileSpec};
pub use model::{FileModel, SectionKind};
pub use project::{ModelStore, ProjectConfig, ProjectContext};
pub use resolve::{
    ContinueDecision, KeywordCache, KeywordEntity, KeywordLocator, Scope, VariableEntity,
    VariableLocator, VariableOrigin,
};
pub use token::{Token, TokenTag};
pub use version::LanguageVersion;
pub use workspace::{FileSystemWorkspace, InMemoryWorkspace, Workspace};

// ── Convenience re-exports: entry points ─────────────────────────────

pub use dumper::dump;
pub use parser::parse_source;
