//! Preloaded library introspection data.
//!
//! Libraries are never executed: their keywords, argument specs and
//! deprecation flags come from configuration or from libdoc JSON exports.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::arguments::ArgumentsDescriptor;
use crate::varsyntax;

pub const BUILTIN: &str = "BuiltIn";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordSpec {
    pub name: String,
    /// Argument specs as libdoc writes them: `name`, `name=default`,
    /// `*varargs`, `**kwargs`.
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub deprecated: bool,
}

impl KeywordSpec {
    pub fn new(name: &str, args: &[&str]) -> Self {
        KeywordSpec {
            name: name.to_owned(),
            args: args.iter().map(|a| (*a).to_owned()).collect(),
            deprecated: false,
        }
    }

    pub fn arguments(&self) -> ArgumentsDescriptor {
        ArgumentsDescriptor::from_library_specs(&self.args)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySpec {
    pub name: String,
    /// Source file of the library, when known; matched against path imports.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub keywords: Vec<KeywordSpec>,
}

/// Variables exposed by a variable file, by the file's path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableFileSpec {
    pub path: String,
    #[serde(default)]
    pub variables: Vec<String>,
}

// ──────────────────────────────────────────────
// libdoc JSON
// ──────────────────────────────────────────────

#[derive(Deserialize)]
struct LibdocDocument {
    name: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    keywords: Vec<LibdocKeyword>,
}

#[derive(Deserialize)]
struct LibdocKeyword {
    name: String,
    #[serde(default)]
    args: Vec<LibdocArgument>,
    #[serde(default)]
    deprecated: bool,
    #[serde(default)]
    doc: String,
}

/// Older exports list plain strings; newer ones objects with a `repr`.
#[derive(Deserialize)]
#[serde(untagged)]
enum LibdocArgument {
    Plain(String),
    Detailed { repr: String },
}

impl LibrarySpec {
    /// Parse a libdoc JSON export.
    pub fn from_libdoc_json(json: &str) -> Result<LibrarySpec, serde_json::Error> {
        let doc: LibdocDocument = serde_json::from_str(json)?;
        let keywords = doc
            .keywords
            .into_iter()
            .map(|kw| KeywordSpec {
                deprecated: kw.deprecated || kw.doc.starts_with("*DEPRECATED"),
                args: kw
                    .args
                    .into_iter()
                    .map(|a| match a {
                        LibdocArgument::Plain(s) | LibdocArgument::Detailed { repr: s } => s,
                    })
                    .collect(),
                name: kw.name,
            })
            .collect();
        Ok(LibrarySpec {
            name: doc.name,
            path: doc.source,
            keywords,
        })
    }

    pub fn keyword(&self, name: &str) -> Option<&KeywordSpec> {
        let wanted = varsyntax::normalize(name);
        self.keywords
            .iter()
            .find(|k| varsyntax::normalize(&k.name) == wanted)
    }
}

// ──────────────────────────────────────────────
// BuiltIn
// ──────────────────────────────────────────────

static BUILTIN_LIBRARY: Lazy<LibrarySpec> = Lazy::new(|| LibrarySpec {
    name: BUILTIN.to_owned(),
    path: None,
    keywords: vec![
        KeywordSpec::new("Log", &["message", "level=INFO", "html=False", "console=False"]),
        KeywordSpec::new("Log Many", &["*messages"]),
        KeywordSpec::new("Log To Console", &["message", "stream=STDOUT", "no_newline=False"]),
        KeywordSpec::new("No Operation", &[]),
        KeywordSpec::new("Sleep", &["time", "reason=None"]),
        KeywordSpec::new("Fail", &["msg=None", "*tags"]),
        KeywordSpec::new("Should Be Equal", &["first", "second", "msg=None", "values=True"]),
        KeywordSpec::new("Should Not Be Equal", &["first", "second", "msg=None", "values=True"]),
        KeywordSpec::new("Should Be True", &["condition", "msg=None"]),
        KeywordSpec::new("Should Contain", &["container", "item", "msg=None"]),
        KeywordSpec::new("Should Be Empty", &["item", "msg=None"]),
        KeywordSpec::new("Set Variable", &["*values"]),
        KeywordSpec::new("Set Test Variable", &["name", "*values"]),
        KeywordSpec::new("Set Suite Variable", &["name", "*values"]),
        KeywordSpec::new("Set Global Variable", &["name", "*values"]),
        KeywordSpec::new("Create List", &["*items"]),
        KeywordSpec::new("Create Dictionary", &["*items", "**kwitems"]),
        KeywordSpec::new("Evaluate", &["expression", "modules=None", "namespace=None"]),
        KeywordSpec::new("Run Keyword", &["name", "*args"]),
        KeywordSpec::new("Run Keyword If", &["condition", "name", "*args"]),
        KeywordSpec::new("Run Keywords", &["*keywords"]),
        KeywordSpec::new("Should Be Equal As Integers", &["first", "second", "msg=None"]),
        KeywordSpec::new("Get Length", &["item"]),
        KeywordSpec::new("Catenate", &["*items"]),
        KeywordSpec::new("Import Library", &["name", "*args"]),
        KeywordSpec::new("Import Resource", &["path"]),
        KeywordSpec::new("Import Variables", &["path", "*args"]),
        KeywordSpec::new("Set Tags", &["*tags"]),
        KeywordSpec::new("Pass Execution", &["message", "*tags"]),
        KeywordSpec::new("Return From Keyword", &["*return_values"]),
        KeywordSpec {
            name: "Run Keyword Unless".to_owned(),
            args: vec!["condition".to_owned(), "name".to_owned(), "*args".to_owned()],
            deprecated: true,
        },
    ],
});

/// Variables every file sees without an import.
pub const BUILTIN_VARIABLES: &[&str] = &[
    "${EMPTY}",
    "@{EMPTY}",
    "&{EMPTY}",
    "${SPACE}",
    "${True}",
    "${False}",
    "${None}",
    "${null}",
    "${/}",
    "${:}",
    "${\\n}",
    "${CURDIR}",
    "${TEMPDIR}",
    "${EXECDIR}",
    "${OUTPUT_DIR}",
    "${OUTPUT_FILE}",
    "${LOG_FILE}",
    "${REPORT_FILE}",
    "${SUITE_NAME}",
    "${SUITE_SOURCE}",
    "${SUITE_DOCUMENTATION}",
    "&{SUITE_METADATA}",
    "${TEST_NAME}",
    "@{TEST_TAGS}",
    "${TEST_DOCUMENTATION}",
    "${PREV_TEST_NAME}",
    "${PREV_TEST_STATUS}",
    "${LOG_LEVEL}",
];

pub fn builtin() -> &'static LibrarySpec {
    &BUILTIN_LIBRARY
}

// ──────────────────────────────────────────────
// Registry
// ──────────────────────────────────────────────

/// Known libraries by normalized name. BuiltIn is always present.
#[derive(Debug, Clone)]
pub struct LibraryRegistry {
    libraries: BTreeMap<String, LibrarySpec>,
}

impl Default for LibraryRegistry {
    fn default() -> Self {
        let mut registry = LibraryRegistry {
            libraries: BTreeMap::new(),
        };
        registry.register(builtin().clone());
        registry
    }
}

impl LibraryRegistry {
    pub fn new(libraries: impl IntoIterator<Item = LibrarySpec>) -> Self {
        let mut registry = LibraryRegistry::default();
        for library in libraries {
            registry.register(library);
        }
        registry
    }

    /// Add or replace a library.
    pub fn register(&mut self, library: LibrarySpec) {
        self.libraries
            .insert(varsyntax::normalize(&library.name), library);
    }

    /// Look a library up by import name or by path. Path imports match on a
    /// configured source path, or on the file stem (`lib/MyLib.py` finds
    /// `MyLib`).
    pub fn get(&self, import: &str) -> Option<&LibrarySpec> {
        if let Some(found) = self.libraries.get(&varsyntax::normalize(import)) {
            return Some(found);
        }
        let import_path = import.replace('\\', "/");
        if let Some(found) = self.libraries.values().find(|l| {
            l.path
                .as_deref()
                .is_some_and(|p| p.replace('\\', "/").ends_with(&import_path))
        }) {
            return Some(found);
        }
        let stem = import_path
            .rsplit('/')
            .next()
            .map(|file| file.split('.').next().unwrap_or(file))
            .filter(|stem| *stem != import)?;
        self.libraries.get(&varsyntax::normalize(stem))
    }

    pub fn builtin(&self) -> &LibrarySpec {
        self.get(BUILTIN).unwrap_or_else(|| builtin())
    }

    pub fn iter(&self) -> impl Iterator<Item = &LibrarySpec> {
        self.libraries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn libdoc_json_in_both_argument_styles() {
        let json = r#"{
            "name": "MyLib",
            "source": "/libs/MyLib.py",
            "keywords": [
                {"name": "Do Thing", "args": ["a", "b=1"]},
                {"name": "Old Thing", "args": [{"repr": "*rest", "name": "rest"}], "deprecated": true},
                {"name": "Older", "doc": "*DEPRECATED* use Do Thing"}
            ]
        }"#;
        let lib = LibrarySpec::from_libdoc_json(json).unwrap();
        assert_eq!(lib.name, "MyLib");
        assert_eq!(lib.keywords[0].arguments().required_count(), 1);
        assert!(lib.keywords[1].arguments().has_varargs());
        assert!(lib.keywords[1].deprecated);
        assert!(lib.keywords[2].deprecated);
        assert!(lib.keyword("do_thing").is_some());
    }

    #[test]
    fn registry_finds_libraries_by_name_and_path() {
        let registry = LibraryRegistry::new([LibrarySpec {
            name: "MyLib".into(),
            path: Some("/libs/MyLib.py".into()),
            keywords: vec![],
        }]);
        assert!(registry.get("mylib").is_some());
        assert!(registry.get("libs/MyLib.py").is_some());
        assert!(registry.get("other/MyLib.py").is_some());
        assert!(registry.get("Missing").is_none());
        assert!(registry.builtin().keyword("Log").is_some());
    }

    #[test]
    fn malformed_libdoc_is_an_error() {
        assert!(LibrarySpec::from_libdoc_json("{\"keywords\": []}").is_err());
    }
}
