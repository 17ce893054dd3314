//! Settings: suite-level entries of the settings table and `[Local]`
//! settings inside test cases, tasks and keywords.

use serde::Serialize;

use super::cells;
use super::{CommentRow, EmptyRow, Header, ParentRef};
use crate::error::EditError;
use crate::token::{Token, TokenTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SettingKind {
    // Imports
    Library,
    Resource,
    Variables,
    // Suite level
    Name,
    Documentation,
    Metadata,
    SuiteSetup,
    SuiteTeardown,
    TestSetup,
    TestTeardown,
    TestTemplate,
    TestTimeout,
    ForceTags,
    DefaultTags,
    KeywordTags,
    // Test, task and keyword level
    Arguments,
    Return,
    Tags,
    Setup,
    Teardown,
    Template,
    Timeout,
    Unknown,
}

impl SettingKind {
    /// Kinds that may appear any number of times in one table or unit.
    pub fn allows_repeats(self) -> bool {
        matches!(
            self,
            SettingKind::Library
                | SettingKind::Resource
                | SettingKind::Variables
                | SettingKind::Metadata
                | SettingKind::Unknown
        )
    }

    pub fn is_import(self) -> bool {
        matches!(
            self,
            SettingKind::Library | SettingKind::Resource | SettingKind::Variables
        )
    }

    /// Spelling used when a new setting of this kind is written out.
    pub fn canonical_name(self, local: bool) -> &'static str {
        match (self, local) {
            (SettingKind::Documentation, true) => "[Documentation]",
            (SettingKind::Arguments, _) => "[Arguments]",
            (SettingKind::Return, _) => "[Return]",
            (SettingKind::Tags, _) => "[Tags]",
            (SettingKind::Setup, _) => "[Setup]",
            (SettingKind::Teardown, _) => "[Teardown]",
            (SettingKind::Template, _) => "[Template]",
            (SettingKind::Timeout, _) => "[Timeout]",
            (SettingKind::Library, _) => "Library",
            (SettingKind::Resource, _) => "Resource",
            (SettingKind::Variables, _) => "Variables",
            (SettingKind::Name, _) => "Name",
            (SettingKind::Documentation, false) => "Documentation",
            (SettingKind::Metadata, _) => "Metadata",
            (SettingKind::SuiteSetup, _) => "Suite Setup",
            (SettingKind::SuiteTeardown, _) => "Suite Teardown",
            (SettingKind::TestSetup, _) => "Test Setup",
            (SettingKind::TestTeardown, _) => "Test Teardown",
            (SettingKind::TestTemplate, _) => "Test Template",
            (SettingKind::TestTimeout, _) => "Test Timeout",
            (SettingKind::ForceTags, _) => "Force Tags",
            (SettingKind::DefaultTags, _) => "Default Tags",
            (SettingKind::KeywordTags, _) => "Keyword Tags",
            (SettingKind::Unknown, _) => "",
        }
    }
}

/// One setting. `declaration` is `None` for an anonymous setting synthesized
/// to host a continuation line that had nothing to continue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Setting {
    pub parent: ParentRef,
    pub kind: SettingKind,
    pub declaration: Option<Token>,
    pub values: Vec<Token>,
    pub comments: Vec<Token>,
    /// Repeated declarations of a once-only kind, with their cells.
    pub duplicates: Vec<Token>,
    /// Continuation markers and indentation cells.
    pub layout: Vec<Token>,
    pub trash: Vec<Token>,
}

impl Setting {
    pub fn new(parent: ParentRef, kind: SettingKind, declaration: Option<Token>) -> Self {
        Setting {
            parent,
            kind,
            declaration,
            values: Vec::new(),
            comments: Vec::new(),
            duplicates: Vec::new(),
            layout: Vec::new(),
            trash: Vec::new(),
        }
    }

    /// A fresh setting with no source position, as an editor would add it.
    pub fn create(parent: ParentRef, kind: SettingKind, values: &[&str]) -> Self {
        let local = matches!(parent, ParentRef::Unit { .. });
        let decl = Token::synthetic(kind.canonical_name(local), TokenTag::SettingDeclaration);
        let mut setting = Setting::new(parent, kind, Some(decl));
        for (i, value) in values.iter().enumerate() {
            // Column 0 is the declaration.
            let _ = setting.insert_value_at(value, i + 1);
        }
        setting
    }

    pub fn name(&self) -> &str {
        self.declaration.as_ref().map_or("", |t| t.text.as_str())
    }

    pub fn line(&self) -> u32 {
        self.declaration
            .as_ref()
            .map(|t| t.line)
            .or_else(|| self.layout.first().map(|t| t.line))
            .unwrap_or(0)
    }

    pub fn value_texts(&self) -> Vec<&str> {
        self.values.iter().map(|t| t.text.as_str()).collect()
    }

    /// Constituent tokens in logical order.
    pub fn tokens(&self) -> Vec<&Token> {
        self.declaration
            .iter()
            .chain(&self.layout)
            .chain(&self.values)
            .chain(&self.comments)
            .chain(&self.duplicates)
            .chain(&self.trash)
            .collect()
    }

    pub fn insert_value_at(&mut self, text: &str, column: usize) -> Result<(), EditError> {
        cells::insert_cell(
            &mut self.values,
            &mut self.comments,
            TokenTag::SettingValue,
            text,
            column,
        )
    }

    pub fn set_value_at(&mut self, text: &str, column: usize) -> Result<(), EditError> {
        cells::set_cell(&mut self.values, &mut self.comments, text, column)
    }

    pub fn remove_value_at(&mut self, column: usize) -> Result<Token, EditError> {
        cells::remove_cell(&mut self.values, &mut self.comments, column)
    }
}

/// The `*** Settings ***` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SettingTable {
    pub headers: Vec<Header>,
    pub settings: Vec<Setting>,
    pub comments: Vec<CommentRow>,
    pub empty_rows: Vec<EmptyRow>,
}

impl SettingTable {
    pub fn is_present(&self) -> bool {
        !self.headers.is_empty()
    }

    /// Append a setting; returns its index.
    pub fn add(&mut self, mut setting: Setting) -> usize {
        setting.parent = ParentRef::Table(super::SectionKind::Settings);
        self.settings.push(setting);
        self.settings.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&Setting> {
        self.settings.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Setting> {
        self.settings.get_mut(index)
    }

    pub fn remove(&mut self, index: usize) -> Option<Setting> {
        (index < self.settings.len()).then(|| self.settings.remove(index))
    }

    pub fn of_kind(&self, kind: SettingKind) -> impl Iterator<Item = &Setting> {
        self.settings.iter().filter(move |s| s.kind == kind)
    }

    pub fn first_of_kind(&self, kind: SettingKind) -> Option<usize> {
        self.settings.iter().position(|s| s.kind == kind)
    }

    /// Index of the setting whose cells cover `line`.
    pub fn find_by_line(&self, line: u32) -> Option<usize> {
        self.settings
            .iter()
            .position(|s| {
                super::line_span(&s.tokens()).is_some_and(|(a, b)| a <= line && line <= b)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SectionKind;

    #[test]
    fn created_setting_has_values_and_no_position() {
        let s = Setting::create(
            ParentRef::Table(SectionKind::Settings),
            SettingKind::Library,
            &["Collections", "# note"],
        );
        assert_eq!(s.name(), "Library");
        assert_eq!(s.value_texts(), vec!["Collections"]);
        assert_eq!(s.comments.len(), 1);
        assert_eq!(s.line(), 0);
    }

    #[test]
    fn local_settings_use_bracketed_names() {
        let s = Setting::create(
            ParentRef::Unit {
                section: SectionKind::Keywords,
                index: 0,
            },
            SettingKind::Documentation,
            &[],
        );
        assert_eq!(s.name(), "[Documentation]");
        assert!(!SettingKind::Documentation.allows_repeats());
        assert!(SettingKind::Library.allows_repeats());
    }
}
