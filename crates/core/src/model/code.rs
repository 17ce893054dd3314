//! Test case, task and keyword tables: named units holding local settings
//! and executable rows.

use serde::Serialize;

use super::cells;
use super::setting::{Setting, SettingKind};
use super::{line_span, CommentRow, EmptyRow, Header, ParentRef, SectionKind};
use crate::error::EditError;
use crate::token::{Token, TokenTag};
use crate::varsyntax;

/// One executable row: `[assignments] action [arguments] [# comments]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutableRow {
    pub parent: ParentRef,
    pub assignments: Vec<Token>,
    pub action: Option<Token>,
    pub arguments: Vec<Token>,
    pub comments: Vec<Token>,
    pub layout: Vec<Token>,
    pub trash: Vec<Token>,
}

impl ExecutableRow {
    pub fn new(parent: ParentRef) -> Self {
        ExecutableRow {
            parent,
            assignments: Vec::new(),
            action: None,
            arguments: Vec::new(),
            comments: Vec::new(),
            layout: Vec::new(),
            trash: Vec::new(),
        }
    }

    /// A fresh row with no source position.
    pub fn create(action: &str, arguments: &[&str]) -> Self {
        let mut row = ExecutableRow::new(ParentRef::File);
        let mut token = Token::synthetic(action, TokenTag::Action);
        if varsyntax::contains_variable(action) {
            token.add_tag(TokenTag::VariableUsage);
        }
        row.action = Some(token);
        for (i, arg) in arguments.iter().enumerate() {
            let _ = row.insert_value_at(arg, i + 1);
        }
        row
    }

    pub fn action_text(&self) -> Option<&str> {
        self.action.as_ref().map(|t| t.text.as_str())
    }

    pub fn argument_texts(&self) -> Vec<&str> {
        self.arguments.iter().map(|t| t.text.as_str()).collect()
    }

    pub fn is_for_loop(&self) -> bool {
        self.action_text().is_some_and(is_for_marker)
    }

    pub fn loop_variables(&self) -> impl Iterator<Item = &Token> {
        self.arguments
            .iter()
            .filter(|t| t.has_tag(TokenTag::LoopVariable))
    }

    pub fn line(&self) -> u32 {
        self.tokens().iter().find(|t| t.is_placed()).map_or(0, |t| t.line)
    }

    /// Constituent tokens in logical order; layout cells come last so that
    /// inserted cells anchor on data cells.
    pub fn tokens(&self) -> Vec<&Token> {
        self.assignments
            .iter()
            .chain(&self.action)
            .chain(&self.arguments)
            .chain(&self.comments)
            .chain(&self.trash)
            .chain(&self.layout)
            .collect()
    }

    /// Column 0 is the action; arguments follow, then comments.
    pub fn insert_value_at(&mut self, text: &str, column: usize) -> Result<(), EditError> {
        cells::insert_cell(
            &mut self.arguments,
            &mut self.comments,
            TokenTag::Argument,
            text,
            column,
        )
    }

    pub fn set_value_at(&mut self, text: &str, column: usize) -> Result<(), EditError> {
        cells::set_cell(&mut self.arguments, &mut self.comments, text, column)
    }

    pub fn remove_value_at(&mut self, column: usize) -> Result<Token, EditError> {
        cells::remove_cell(&mut self.arguments, &mut self.comments, column)
    }
}

/// `FOR`, and the pre-3.0 `:FOR` / `: FOR` spellings.
pub fn is_for_marker(text: &str) -> bool {
    let compact: String = text.chars().filter(|c| *c != ' ').collect();
    text == "FOR" || compact.eq_ignore_ascii_case(":for")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum UnitItem {
    Setting(Setting),
    Row(ExecutableRow),
    Comment(CommentRow),
    Empty(EmptyRow),
}

impl UnitItem {
    pub fn tokens(&self) -> Vec<&Token> {
        match self {
            UnitItem::Setting(s) => s.tokens(),
            UnitItem::Row(r) => r.tokens(),
            UnitItem::Comment(c) => c.tokens(),
            UnitItem::Empty(e) => e.tokens(),
        }
    }

    pub fn line(&self) -> u32 {
        match self {
            UnitItem::Setting(s) => s.line(),
            UnitItem::Row(r) => r.line(),
            UnitItem::Comment(c) => c.line(),
            UnitItem::Empty(e) => e.line,
        }
    }

    fn set_parent(&mut self, parent: ParentRef) {
        match self {
            UnitItem::Setting(s) => s.parent = parent,
            UnitItem::Row(r) => r.parent = parent,
            UnitItem::Comment(c) => c.parent = parent,
            UnitItem::Empty(e) => e.parent = parent,
        }
    }
}

/// A test case, task or keyword. `name` is `None` for an anonymous unit
/// synthesized to host body lines that precede any named unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeUnit {
    pub parent: ParentRef,
    pub section: SectionKind,
    /// Position of this unit in its table; items refer back through it.
    pub index: usize,
    pub name: Option<Token>,
    /// Anchor line: the name line, or the line after the last header for an
    /// anonymous unit.
    pub line: u32,
    pub items: Vec<UnitItem>,
    /// Comments on the name line.
    pub comments: Vec<Token>,
    pub layout: Vec<Token>,
    pub trash: Vec<Token>,
}

impl CodeUnit {
    pub fn new(section: SectionKind, name: Token) -> Self {
        let line = name.line;
        CodeUnit::with_name(section, Some(name), line)
    }

    pub fn anonymous(section: SectionKind, line: u32) -> Self {
        CodeUnit::with_name(section, None, line)
    }

    /// A fresh unit with no source position.
    pub fn create(section: SectionKind, name: &str) -> Self {
        let mut token = Token::synthetic(name, TokenTag::UnitName);
        if section == SectionKind::Keywords && varsyntax::contains_variable(name) {
            token.add_tag(TokenTag::EmbeddedArguments);
        }
        CodeUnit::with_name(section, Some(token), 0)
    }

    fn with_name(section: SectionKind, name: Option<Token>, line: u32) -> Self {
        CodeUnit {
            parent: ParentRef::Table(section),
            section,
            index: 0,
            name,
            line,
            items: Vec::new(),
            comments: Vec::new(),
            layout: Vec::new(),
            trash: Vec::new(),
        }
    }

    pub fn name_text(&self) -> &str {
        self.name.as_ref().map_or("", |t| t.text.as_str())
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_none()
    }

    fn item_parent(&self) -> ParentRef {
        ParentRef::Unit {
            section: self.section,
            index: self.index,
        }
    }

    /// Append an item; returns its index.
    pub fn add_item(&mut self, mut item: UnitItem) -> usize {
        item.set_parent(self.item_parent());
        self.items.push(item);
        self.items.len() - 1
    }

    pub fn insert_item(&mut self, at: usize, mut item: UnitItem) {
        item.set_parent(self.item_parent());
        let at = at.min(self.items.len());
        self.items.insert(at, item);
    }

    pub fn settings(&self) -> impl Iterator<Item = &Setting> {
        self.items.iter().filter_map(|i| match i {
            UnitItem::Setting(s) => Some(s),
            _ => None,
        })
    }

    pub fn setting(&self, kind: SettingKind) -> Option<&Setting> {
        self.settings().find(|s| s.kind == kind)
    }

    pub fn rows(&self) -> impl Iterator<Item = &ExecutableRow> {
        self.items.iter().filter_map(|i| match i {
            UnitItem::Row(r) => Some(r),
            _ => None,
        })
    }

    pub fn row_mut(&mut self, index: usize) -> Option<&mut ExecutableRow> {
        match self.items.get_mut(index) {
            Some(UnitItem::Row(r)) => Some(r),
            _ => None,
        }
    }

    pub fn setting_mut(&mut self, index: usize) -> Option<&mut Setting> {
        match self.items.get_mut(index) {
            Some(UnitItem::Setting(s)) => Some(s),
            _ => None,
        }
    }

    /// Every token of the unit, its items included, in logical order.
    pub fn tokens(&self) -> Vec<&Token> {
        let mut tokens: Vec<&Token> = self.own_tokens();
        for item in &self.items {
            tokens.extend(item.tokens());
        }
        tokens
    }

    /// Tokens on the unit itself, excluding its items.
    pub fn own_tokens(&self) -> Vec<&Token> {
        self.name
            .iter()
            .chain(&self.comments)
            .chain(&self.trash)
            .chain(&self.layout)
            .collect()
    }

    /// First and last source line the unit occupies.
    pub fn span(&self) -> (u32, u32) {
        let last_item_line = self.items.iter().map(UnitItem::line).max().unwrap_or(0);
        match line_span(&self.tokens()) {
            Some((a, b)) => (a.min(self.line), b.max(last_item_line)),
            None => (self.line, self.line.max(last_item_line)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeTable {
    pub kind: SectionKind,
    pub headers: Vec<Header>,
    pub units: Vec<CodeUnit>,
    pub comments: Vec<CommentRow>,
    pub empty_rows: Vec<EmptyRow>,
}

impl CodeTable {
    pub fn new(kind: SectionKind) -> Self {
        CodeTable {
            kind,
            headers: Vec::new(),
            units: Vec::new(),
            comments: Vec::new(),
            empty_rows: Vec::new(),
        }
    }

    pub fn is_present(&self) -> bool {
        !self.headers.is_empty()
    }

    /// Append a unit; returns its index.
    pub fn add(&mut self, mut unit: CodeUnit) -> usize {
        unit.index = self.units.len();
        unit.section = self.kind;
        unit.parent = ParentRef::Table(self.kind);
        let parent = unit.item_parent();
        for item in &mut unit.items {
            item.set_parent(parent);
        }
        self.units.push(unit);
        self.units.len() - 1
    }

    pub fn remove(&mut self, index: usize) -> Option<CodeUnit> {
        if index >= self.units.len() {
            return None;
        }
        let removed = self.units.remove(index);
        for (i, unit) in self.units.iter_mut().enumerate().skip(index) {
            unit.index = i;
            let parent = unit.item_parent();
            for item in &mut unit.items {
                item.set_parent(parent);
            }
        }
        Some(removed)
    }

    pub fn get(&self, index: usize) -> Option<&CodeUnit> {
        self.units.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut CodeUnit> {
        self.units.get_mut(index)
    }

    /// Units whose name matches `name` ignoring case, spaces and underscores.
    pub fn named<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a CodeUnit> {
        let wanted = varsyntax::normalize(name);
        self.units
            .iter()
            .filter(move |u| !u.is_anonymous() && varsyntax::normalize(u.name_text()) == wanted)
    }

    /// The unit covering `line`, and the item on that line if any.
    pub fn find_by_line(&self, line: u32) -> Option<(usize, Option<usize>)> {
        let unit = self.units.iter().rposition(|u| {
            let (first, last) = u.span();
            first <= line && line <= last
        })?;
        let item = self.units[unit].items.iter().position(|item| match item {
            UnitItem::Empty(e) => e.line == line,
            _ => line_span(&item.tokens()).is_some_and(|(a, b)| a <= line && line <= b),
        });
        Some((unit, item))
    }

    /// The most recent unit that starts at or before `line` and after
    /// `header_line`, scanning backward from the end of the table.
    pub fn nearest_unit(&self, line: u32, header_line: u32) -> Option<usize> {
        self.units
            .iter()
            .rposition(|u| u.line <= line && u.line > header_line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_markers() {
        assert!(is_for_marker("FOR"));
        assert!(is_for_marker(":FOR"));
        assert!(is_for_marker(": for"));
        assert!(!is_for_marker("for"));
        assert!(!is_for_marker("Format"));
    }

    #[test]
    fn items_refer_back_to_their_unit_slot() {
        let mut table = CodeTable::new(SectionKind::Keywords);
        table.add(CodeUnit::create(SectionKind::Keywords, "First"));
        let mut second = CodeUnit::create(SectionKind::Keywords, "Second");
        second.add_item(UnitItem::Row(ExecutableRow::create("Log", &["x"])));
        let idx = table.add(second);
        assert_eq!(idx, 1);
        let expected = ParentRef::Unit {
            section: SectionKind::Keywords,
            index: 1,
        };
        assert_eq!(table.units[1].rows().next().map(|r| r.parent), Some(expected));

        table.remove(0);
        let expected = ParentRef::Unit {
            section: SectionKind::Keywords,
            index: 0,
        };
        assert_eq!(table.units[0].rows().next().map(|r| r.parent), Some(expected));
        assert_eq!(table.named("SECOND").count(), 1);
    }

    #[test]
    fn row_columns_start_after_the_action() {
        let mut row = ExecutableRow::create("Log", &["hello"]);
        row.insert_value_at("WARN", 2).unwrap();
        assert_eq!(row.argument_texts(), vec!["hello", "WARN"]);
        assert!(row.set_value_at("x", 0).is_err());
    }
}
