//! The `*** Variables ***` table.

use serde::Serialize;

use super::cells;
use super::{CommentRow, EmptyRow, Header, ParentRef, SectionKind};
use crate::error::EditError;
use crate::token::{Token, TokenTag};
use crate::varsyntax;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VariableKind {
    Scalar,
    List,
    Dictionary,
    /// A declaration cell without variable syntax, e.g. `invalid_1`.
    Invalid,
}

impl VariableKind {
    /// Classify a declaration cell by its sigil.
    pub fn of_declaration(text: &str) -> VariableKind {
        let target = text.trim_end_matches('=').trim_end();
        if !varsyntax::is_variable(target) {
            return VariableKind::Invalid;
        }
        match target.chars().next() {
            Some('$') => VariableKind::Scalar,
            Some('@') => VariableKind::List,
            Some('&') => VariableKind::Dictionary,
            _ => VariableKind::Invalid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDeclaration {
    pub parent: ParentRef,
    pub kind: VariableKind,
    /// `None` for an anonymous entry hosting an orphaned continuation line.
    pub name: Option<Token>,
    pub values: Vec<Token>,
    pub comments: Vec<Token>,
    pub layout: Vec<Token>,
    pub trash: Vec<Token>,
}

impl VariableDeclaration {
    pub fn new(name: Option<Token>) -> Self {
        let kind = name
            .as_ref()
            .map_or(VariableKind::Invalid, |t| VariableKind::of_declaration(&t.text));
        VariableDeclaration {
            parent: ParentRef::Table(SectionKind::Variables),
            kind,
            name,
            values: Vec::new(),
            comments: Vec::new(),
            layout: Vec::new(),
            trash: Vec::new(),
        }
    }

    /// A fresh declaration with no source position.
    pub fn create(name: &str, values: &[&str]) -> Self {
        let mut var = VariableDeclaration::new(Some(Token::synthetic(
            name,
            TokenTag::VariableDeclaration,
        )));
        for (i, value) in values.iter().enumerate() {
            let _ = var.insert_value_at(value, i + 1);
        }
        var
    }

    pub fn name_text(&self) -> &str {
        self.name.as_ref().map_or("", |t| t.text.as_str())
    }

    /// Normalized lookup name. Entries without variable syntax still count as
    /// variables under their raw cell text.
    pub fn lookup_name(&self) -> Option<String> {
        let text = self.name_text();
        if text.is_empty() {
            return None;
        }
        varsyntax::base_name(text)
            .or_else(|| Some(varsyntax::normalize(text.trim_end_matches('='))))
    }

    pub fn line(&self) -> u32 {
        self.name
            .as_ref()
            .map(|t| t.line)
            .or_else(|| self.layout.first().map(|t| t.line))
            .unwrap_or(0)
    }

    pub fn tokens(&self) -> Vec<&Token> {
        self.name
            .iter()
            .chain(&self.layout)
            .chain(&self.values)
            .chain(&self.comments)
            .chain(&self.trash)
            .collect()
    }

    pub fn insert_value_at(&mut self, text: &str, column: usize) -> Result<(), EditError> {
        cells::insert_cell(
            &mut self.values,
            &mut self.comments,
            TokenTag::VariableValue,
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

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VariableTable {
    pub headers: Vec<Header>,
    pub variables: Vec<VariableDeclaration>,
    pub comments: Vec<CommentRow>,
    pub empty_rows: Vec<EmptyRow>,
}

impl VariableTable {
    pub fn is_present(&self) -> bool {
        !self.headers.is_empty()
    }

    pub fn add(&mut self, mut variable: VariableDeclaration) -> usize {
        variable.parent = ParentRef::Table(SectionKind::Variables);
        self.variables.push(variable);
        self.variables.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&VariableDeclaration> {
        self.variables.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut VariableDeclaration> {
        self.variables.get_mut(index)
    }

    pub fn remove(&mut self, index: usize) -> Option<VariableDeclaration> {
        (index < self.variables.len()).then(|| self.variables.remove(index))
    }

    pub fn find_by_line(&self, line: u32) -> Option<usize> {
        self.variables
            .iter()
            .position(|v| {
                super::line_span(&v.tokens()).is_some_and(|(a, b)| a <= line && line <= b)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_sigil() {
        assert_eq!(VariableKind::of_declaration("${x}"), VariableKind::Scalar);
        assert_eq!(VariableKind::of_declaration("@{x} ="), VariableKind::List);
        assert_eq!(VariableKind::of_declaration("&{x}="), VariableKind::Dictionary);
        assert_eq!(VariableKind::of_declaration("invalid_1"), VariableKind::Invalid);
        assert_eq!(VariableKind::of_declaration("%{ENV}"), VariableKind::Invalid);
    }

    #[test]
    fn invalid_entries_keep_their_raw_name() {
        let var = VariableDeclaration::create("invalid_1", &["50"]);
        assert_eq!(var.kind, VariableKind::Invalid);
        assert_eq!(var.lookup_name().as_deref(), Some("invalid1"));
        let var = VariableDeclaration::create("${My Var}=", &["1"]);
        assert_eq!(var.lookup_name().as_deref(), Some("myvar"));
    }
}
