//! The file model: one table per section kind plus the per-line separator
//! layout needed to write the source back unchanged.
//!
//! Elements never own a pointer to their parent. A child records a
//! [`ParentRef`], a slot index into the owning table, which stays valid as
//! long as the model is not restructured.

pub mod cells;
pub mod code;
pub mod setting;
pub mod variable;

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::token::{SeparatorStyle, Token, TokenTag};
use crate::version::LanguageVersion;

pub use code::{is_for_marker, CodeTable, CodeUnit, ExecutableRow, UnitItem};
pub use setting::{Setting, SettingKind, SettingTable};
pub use variable::{VariableDeclaration, VariableKind, VariableTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SectionKind {
    Settings,
    Variables,
    TestCases,
    Tasks,
    Keywords,
    Comments,
    /// An unrecognised `*** Header ***`; its content is kept verbatim.
    Unknown,
}

impl SectionKind {
    /// Classify a header cell such as `*** Test Cases ***`. Asterisks, case,
    /// inner spaces and a plural `s` are not significant. Returns `None` when
    /// the cell is not a header at all.
    pub fn from_header(text: &str, version: LanguageVersion) -> Option<SectionKind> {
        if !text.starts_with('*') {
            return None;
        }
        let name: String = text
            .trim_matches(|c: char| c == '*' || c.is_whitespace())
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        let name = name.strip_suffix('s').unwrap_or(&name);
        Some(match name {
            "setting" | "metadata" => SectionKind::Settings,
            "variable" => SectionKind::Variables,
            "testcase" => SectionKind::TestCases,
            "task" if version >= LanguageVersion::new(3, 1) => SectionKind::Tasks,
            "keyword" | "userkeyword" => SectionKind::Keywords,
            "comment" => SectionKind::Comments,
            _ => SectionKind::Unknown,
        })
    }

    pub fn is_code(self) -> bool {
        matches!(
            self,
            SectionKind::TestCases | SectionKind::Tasks | SectionKind::Keywords
        )
    }

    pub fn is_raw(self) -> bool {
        matches!(self, SectionKind::Comments | SectionKind::Unknown)
    }

    /// Header text used when a missing section has to be created.
    pub fn canonical_header(self) -> &'static str {
        match self {
            SectionKind::Settings => "*** Settings ***",
            SectionKind::Variables => "*** Variables ***",
            SectionKind::TestCases => "*** Test Cases ***",
            SectionKind::Tasks => "*** Tasks ***",
            SectionKind::Keywords => "*** Keywords ***",
            SectionKind::Comments => "*** Comments ***",
            SectionKind::Unknown => "*** Unknown ***",
        }
    }
}

/// Navigational back-reference from an element to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ParentRef {
    /// Not (yet) attached to a table.
    File,
    Table(SectionKind),
    /// Item of the unit at `index` in the table of `section`.
    Unit { section: SectionKind, index: usize },
}

/// A section header line: the header cell and any trailing cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Header {
    pub token: Token,
    pub columns: Vec<Token>,
}

impl Header {
    pub fn line(&self) -> u32 {
        self.token.line
    }

    pub fn tokens(&self) -> Vec<&Token> {
        std::iter::once(&self.token).chain(&self.columns).collect()
    }
}

/// A line holding nothing but comment cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRow {
    pub parent: ParentRef,
    pub tokens: Vec<Token>,
    pub layout: Vec<Token>,
}

impl CommentRow {
    pub fn new(parent: ParentRef) -> Self {
        CommentRow {
            parent,
            tokens: Vec::new(),
            layout: Vec::new(),
        }
    }

    pub fn line(&self) -> u32 {
        self.tokens.first().map_or(0, |t| t.line)
    }

    pub fn tokens(&self) -> Vec<&Token> {
        self.tokens.iter().chain(&self.layout).collect()
    }
}

/// A line with no visible cells. Empty pipe cells on it are kept as layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmptyRow {
    pub parent: ParentRef,
    pub line: u32,
    pub layout: Vec<Token>,
}

impl EmptyRow {
    pub fn tokens(&self) -> Vec<&Token> {
        self.layout.iter().collect()
    }
}

/// Content of a `*** Comments ***` or unrecognised section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawSection {
    pub kind: SectionKind,
    pub header: Header,
    pub tokens: Vec<Token>,
}

/// One piece of a physical line as it appeared in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Piece {
    Separator(String),
    /// A data cell, looked up by its 0-based column on the line.
    Cell { column: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineLayout {
    pub number: u32,
    pub style: SeparatorStyle,
    pub pieces: Vec<Piece>,
    pub eol: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImportKind {
    Library,
    Resource,
    Variables,
}

/// Read-only view of an import setting.
#[derive(Debug, Clone, Copy)]
pub struct ImportView<'a> {
    pub kind: ImportKind,
    pub path: Option<&'a Token>,
    pub arguments: &'a [Token],
    pub alias: Option<&'a Token>,
    pub setting: &'a Setting,
}

/// What occupies a given source line.
#[derive(Debug, Clone, Copy)]
pub enum ElementRef<'a> {
    Preamble,
    Header(&'a Header),
    Setting(&'a Setting),
    Variable(&'a VariableDeclaration),
    Unit(&'a CodeUnit),
    UnitItem(&'a CodeUnit, &'a UnitItem),
    Comment(&'a CommentRow),
    Raw(&'a RawSection),
}

/// First and last line among the placed tokens.
pub fn line_span(tokens: &[&Token]) -> Option<(u32, u32)> {
    let mut lines = tokens.iter().filter(|t| t.is_placed()).map(|t| t.line);
    let first = lines.next()?;
    Some(lines.fold((first, first), |(a, b), l| (a.min(l), b.max(l))))
}

/// A parsed source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileModel {
    pub path: PathBuf,
    pub version: LanguageVersion,
    pub bom: bool,
    pub lines: Vec<LineLayout>,
    /// Cells before the first section header; always tagged as trash.
    pub preamble: Vec<Token>,
    pub settings: SettingTable,
    pub variables: VariableTable,
    pub test_cases: CodeTable,
    pub tasks: CodeTable,
    pub keywords: CodeTable,
    pub raw_sections: Vec<RawSection>,
}

impl FileModel {
    pub fn new(path: impl Into<PathBuf>, version: LanguageVersion) -> Self {
        FileModel {
            path: path.into(),
            version,
            bom: false,
            lines: Vec::new(),
            preamble: Vec::new(),
            settings: SettingTable::default(),
            variables: VariableTable::default(),
            test_cases: CodeTable::new(SectionKind::TestCases),
            tasks: CodeTable::new(SectionKind::Tasks),
            keywords: CodeTable::new(SectionKind::Keywords),
            raw_sections: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn code_table(&self, kind: SectionKind) -> Option<&CodeTable> {
        match kind {
            SectionKind::TestCases => Some(&self.test_cases),
            SectionKind::Tasks => Some(&self.tasks),
            SectionKind::Keywords => Some(&self.keywords),
            _ => None,
        }
    }

    pub fn code_table_mut(&mut self, kind: SectionKind) -> Option<&mut CodeTable> {
        match kind {
            SectionKind::TestCases => Some(&mut self.test_cases),
            SectionKind::Tasks => Some(&mut self.tasks),
            SectionKind::Keywords => Some(&mut self.keywords),
            _ => None,
        }
    }

    pub fn code_tables(&self) -> [&CodeTable; 3] {
        [&self.test_cases, &self.tasks, &self.keywords]
    }

    /// Library, Resource and Variables imports in source order.
    pub fn imports(&self) -> Vec<ImportView<'_>> {
        self.settings
            .settings
            .iter()
            .filter_map(|setting| {
                let kind = match setting.kind {
                    SettingKind::Library => ImportKind::Library,
                    SettingKind::Resource => ImportKind::Resource,
                    SettingKind::Variables => ImportKind::Variables,
                    _ => return None,
                };
                let values = setting.values.as_slice();
                let marker = values
                    .iter()
                    .position(|t| t.has_tag(TokenTag::AliasMarker))
                    .unwrap_or(values.len());
                let arguments = values.get(1..marker).unwrap_or(&[]);
                let alias = values
                    .get(marker + 1..)
                    .and_then(|rest| rest.iter().find(|t| t.has_tag(TokenTag::Alias)));
                Some(ImportView {
                    kind,
                    path: values.first(),
                    arguments,
                    alias,
                    setting,
                })
            })
            .collect()
    }

    /// The element occupying `line` (1-based).
    pub fn find_by_line(&self, line: u32) -> Option<ElementRef<'_>> {
        if self.preamble.iter().any(|t| t.line == line) {
            return Some(ElementRef::Preamble);
        }
        let headers = self
            .settings
            .headers
            .iter()
            .chain(&self.variables.headers)
            .chain(self.code_tables().into_iter().flat_map(|t| &t.headers));
        for header in headers {
            if header.line() == line {
                return Some(ElementRef::Header(header));
            }
        }
        if let Some(i) = self.settings.find_by_line(line) {
            return Some(ElementRef::Setting(&self.settings.settings[i]));
        }
        if let Some(i) = self.variables.find_by_line(line) {
            return Some(ElementRef::Variable(&self.variables.variables[i]));
        }
        for table in self.code_tables() {
            if let Some((unit, item)) = table.find_by_line(line) {
                let unit = &table.units[unit];
                return Some(match item {
                    Some(item) => ElementRef::UnitItem(unit, &unit.items[item]),
                    None => ElementRef::Unit(unit),
                });
            }
        }
        let comment_rows = self
            .settings
            .comments
            .iter()
            .chain(&self.variables.comments)
            .chain(self.code_tables().into_iter().flat_map(|t| &t.comments));
        for row in comment_rows {
            if row.tokens.iter().any(|t| t.line == line) {
                return Some(ElementRef::Comment(row));
            }
        }
        self.raw_sections
            .iter()
            .find(|raw| {
                raw.header.line() == line || raw.tokens.iter().any(|t| t.line == line)
            })
            .map(ElementRef::Raw)
    }

    /// Every token held by the model, in no particular order across tables.
    pub fn all_tokens(&self) -> Vec<&Token> {
        let mut tokens: Vec<&Token> = self.preamble.iter().collect();
        for h in &self.settings.headers {
            tokens.extend(h.tokens());
        }
        for s in &self.settings.settings {
            tokens.extend(s.tokens());
        }
        for c in &self.settings.comments {
            tokens.extend(c.tokens());
        }
        for e in &self.settings.empty_rows {
            tokens.extend(e.tokens());
        }
        for h in &self.variables.headers {
            tokens.extend(h.tokens());
        }
        for v in &self.variables.variables {
            tokens.extend(v.tokens());
        }
        for c in &self.variables.comments {
            tokens.extend(c.tokens());
        }
        for e in &self.variables.empty_rows {
            tokens.extend(e.tokens());
        }
        for table in self.code_tables() {
            for h in &table.headers {
                tokens.extend(h.tokens());
            }
            for u in &table.units {
                tokens.extend(u.tokens());
            }
            for c in &table.comments {
                tokens.extend(c.tokens());
            }
            for e in &table.empty_rows {
                tokens.extend(e.tokens());
            }
        }
        for raw in &self.raw_sections {
            tokens.extend(raw.header.tokens());
            tokens.extend(&raw.tokens);
        }
        tokens
    }

    /// True if any cell was left unclaimed or repeats a once-only declaration.
    pub fn has_anomalies(&self) -> bool {
        self.all_tokens()
            .iter()
            .any(|t| t.has_tag(TokenTag::Trash) || t.has_tag(TokenTag::Duplicated))
    }

    /// End-of-line marker used for lines added by edits.
    pub fn default_eol(&self) -> &str {
        self.lines
            .iter()
            .map(|l| l.eol.as_str())
            .find(|eol| !eol.is_empty())
            .unwrap_or("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_are_forgiving() {
        let v = LanguageVersion::LATEST;
        assert_eq!(SectionKind::from_header("*** Settings ***", v), Some(SectionKind::Settings));
        assert_eq!(SectionKind::from_header("*Setting", v), Some(SectionKind::Settings));
        assert_eq!(SectionKind::from_header("***test cases***", v), Some(SectionKind::TestCases));
        assert_eq!(SectionKind::from_header("** Keyword **", v), Some(SectionKind::Keywords));
        assert_eq!(SectionKind::from_header("*** Whatever ***", v), Some(SectionKind::Unknown));
        assert_eq!(SectionKind::from_header("Settings", v), None);
    }

    #[test]
    fn tasks_header_needs_3_1() {
        assert_eq!(
            SectionKind::from_header("*** Tasks ***", LanguageVersion::new(3, 0)),
            Some(SectionKind::Unknown)
        );
        assert_eq!(
            SectionKind::from_header("*** Tasks ***", LanguageVersion::new(3, 1)),
            Some(SectionKind::Tasks)
        );
    }

    #[test]
    fn line_span_ignores_unplaced_tokens() {
        let placed = Token::content("a", 4, 0, 0);
        let later = Token::content("b", 6, 0, 0);
        let free = Token::synthetic("c", TokenTag::Argument);
        assert_eq!(line_span(&[&free, &later, &placed]), Some((4, 6)));
        assert_eq!(line_span(&[&free]), None);
    }
}
