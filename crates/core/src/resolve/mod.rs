//! Symbol resolution: what is visible from a file and what a name means.
//!
//! Locators only read models; they never mutate a table or the store
//! beyond loading imported files on first request. Traversal visits
//! definitions in priority order and hands each one to a callback, which
//! may stop the walk early.

pub mod keywords;
pub mod variables;

use std::ops::ControlFlow;
use std::path::Path;

use serde::Serialize;

use crate::model::FileModel;

pub use keywords::{AccessibleKeywords, KeywordCache, KeywordEntity, KeywordLocator};
pub use variables::{VariableEntity, VariableLocator, VariableOrigin};

/// Returned by traversal callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinueDecision {
    Continue,
    Stop,
}

impl ContinueDecision {
    fn flow(self) -> ControlFlow<()> {
        match self {
            ContinueDecision::Continue => ControlFlow::Continue(()),
            ContinueDecision::Stop => ControlFlow::Break(()),
        }
    }
}

/// Where a keyword definition sits relative to the usage site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Scope {
    Local,
    Resource,
    StandardLibrary,
    ReferencedLibrary,
}

impl Scope {
    /// Lower wins when one name has candidates in several scopes. A
    /// referenced library overrides a standard one.
    pub fn priority(self) -> u8 {
        match self {
            Scope::Local => 0,
            Scope::Resource => 1,
            Scope::ReferencedLibrary => 2,
            Scope::StandardLibrary => 3,
        }
    }
}

const STANDARD_LIBRARIES: &[&str] = &[
    "BuiltIn",
    "Collections",
    "DateTime",
    "Dialogs",
    "OperatingSystem",
    "Process",
    "Remote",
    "Screenshot",
    "String",
    "Telnet",
    "XML",
];

pub fn is_standard_library(name: &str) -> bool {
    STANDARD_LIBRARIES.iter().any(|l| l.eq_ignore_ascii_case(name))
}

/// Name a file's definitions are qualified with: its stem.
pub fn source_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Line of the last positioned token starting at or before `offset`.
pub fn line_at_offset(model: &FileModel, offset: usize) -> Option<u32> {
    model
        .all_tokens()
        .into_iter()
        .filter(|t| t.is_placed() && t.offset <= offset)
        .max_by_key(|t| t.offset)
        .map(|t| t.line)
}
