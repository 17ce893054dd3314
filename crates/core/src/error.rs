//! Error types for the few boundaries where an operation can fail.
//!
//! Parsing itself never fails: anomalies are recorded as token tags on the
//! model. Resolution misses are values, not errors (see
//! [`crate::imports::Resolution`]).

use std::path::PathBuf;

/// A language version string that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("invalid language version '{text}': expected MAJOR[.MINOR[.PATCH]]")]
    Invalid { text: String },
}

/// Malformed import-path syntax. Signals a configuration defect in the
/// importing file, unlike an import that merely cannot be found.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportPathError {
    #[error("import path is empty")]
    Empty,

    #[error("import path '{path}' has an unterminated variable starting at byte {at}")]
    UnterminatedVariable { path: String, at: usize },

    #[error("import path '{path}' contains a control character")]
    ControlCharacter { path: String },
}

/// A positional cell edit that the addressed element cannot accept.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    /// Column 0 holds the declaration; it is edited by replacing the element.
    #[error("column {column} addresses the declaration cell")]
    DeclarationSlot { column: usize },

    #[error("column {column} is past the last cell (row has {cells} cells)")]
    OutOfRange { column: usize, cells: usize },
}

/// Failure to obtain source text for a model requested by path.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cannot read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A keyword name whose embedded-argument pattern does not compile.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EmbeddedError {
    #[error("keyword '{name}' has an invalid embedded argument pattern: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}
