//! Column-addressed cell edits shared by settings, variable declarations and
//! executable rows.
//!
//! Every such element lays its cells out the same way: column 0 holds the
//! declaration (setting name, variable name, or row action), the next
//! columns hold the primary values, and the trailing columns hold comment
//! cells. [`slot_for_column`] is the single mapping from an editor column to
//! the internal list that owns it.

use serde::Serialize;

use crate::error::EditError;
use crate::token::{Token, TokenTag};
use crate::varsyntax;

/// Where a column lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CellSlot {
    Value(usize),
    Comment(usize),
}

/// Whether the column addresses an existing cell or a gap to insert into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotMode {
    /// The column names an existing cell (set, remove).
    Existing,
    /// The column names the position a new cell will occupy.
    Insert,
}

/// Map an editor column to a slot in the value or comment list.
///
/// With `values` value cells and `comments` comment cells:
/// - column 0 is the declaration and is never addressable here;
/// - columns `1..=values` are values (`values + 1` too when inserting, which
///   appends a value);
/// - the following columns index the comment list, where inserting may
///   also append one past the last comment.
pub fn slot_for_column(
    column: usize,
    values: usize,
    comments: usize,
    mode: SlotMode,
) -> Result<CellSlot, EditError> {
    if column == 0 {
        return Err(EditError::DeclarationSlot { column });
    }
    let index = column - 1;
    if index < values || (mode == SlotMode::Insert && index == values) {
        return Ok(CellSlot::Value(index));
    }
    let comment_index = index - values;
    let in_range = match mode {
        SlotMode::Existing => comment_index < comments,
        // Comment index 0 is taken by the value append above.
        SlotMode::Insert => comment_index <= comments,
    };
    if in_range {
        return Ok(CellSlot::Comment(comment_index));
    }
    Err(EditError::OutOfRange {
        column,
        cells: 1 + values + comments,
    })
}

fn new_cell(text: &str, value_tag: TokenTag) -> Token {
    let is_comment = text.starts_with('#');
    let mut token = Token::synthetic(
        text,
        if is_comment {
            TokenTag::Comment
        } else {
            value_tag
        },
    );
    if !is_comment && varsyntax::contains_variable(text) {
        token.add_tag(TokenTag::VariableUsage);
    }
    token
}

/// Move `values[from..]` to the front of `comments`, retagging them.
fn spill_into_comments(values: &mut Vec<Token>, comments: &mut Vec<Token>, from: usize) {
    let mut moved: Vec<Token> = values.drain(from..).collect();
    for token in &mut moved {
        token.classify(TokenTag::Comment);
        token.remove_tag(TokenTag::VariableUsage);
    }
    moved.append(comments);
    *comments = moved;
}

/// Insert a new cell so that it ends up at `column`.
///
/// A `#`-prefixed text inserted among the values starts a comment: it and
/// every later value move to the front of the comment list.
pub fn insert_cell(
    values: &mut Vec<Token>,
    comments: &mut Vec<Token>,
    value_tag: TokenTag,
    text: &str,
    column: usize,
) -> Result<(), EditError> {
    let token = new_cell(text, value_tag);
    match slot_for_column(column, values.len(), comments.len(), SlotMode::Insert)? {
        CellSlot::Value(index) => {
            values.insert(index, token);
            if text.starts_with('#') {
                spill_into_comments(values, comments, index);
            }
        }
        CellSlot::Comment(index) => {
            let mut token = token;
            token.classify(TokenTag::Comment);
            comments.insert(index, token);
        }
    }
    Ok(())
}

/// Replace the text of the cell at `column`, keeping its position.
pub fn set_cell(
    values: &mut Vec<Token>,
    comments: &mut Vec<Token>,
    text: &str,
    column: usize,
) -> Result<(), EditError> {
    match slot_for_column(column, values.len(), comments.len(), SlotMode::Existing)? {
        CellSlot::Value(index) => {
            let token = &mut values[index];
            token.text = text.to_owned();
            if varsyntax::contains_variable(text) {
                token.add_tag(TokenTag::VariableUsage);
            } else {
                token.remove_tag(TokenTag::VariableUsage);
            }
            if text.starts_with('#') {
                spill_into_comments(values, comments, index);
            }
        }
        CellSlot::Comment(index) => comments[index].text = text.to_owned(),
    }
    Ok(())
}

/// Remove and return the cell at `column`.
pub fn remove_cell(
    values: &mut Vec<Token>,
    comments: &mut Vec<Token>,
    column: usize,
) -> Result<Token, EditError> {
    Ok(
        match slot_for_column(column, values.len(), comments.len(), SlotMode::Existing)? {
            CellSlot::Value(index) => values.remove(index),
            CellSlot::Comment(index) => comments.remove(index),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(texts: &[&str], tag: TokenTag) -> Vec<Token> {
        texts.iter().map(|t| Token::synthetic(*t, tag)).collect()
    }

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn column_zero_is_the_declaration() {
        assert_eq!(
            slot_for_column(0, 2, 1, SlotMode::Insert),
            Err(EditError::DeclarationSlot { column: 0 })
        );
        assert_eq!(
            slot_for_column(0, 2, 1, SlotMode::Existing),
            Err(EditError::DeclarationSlot { column: 0 })
        );
    }

    #[test]
    fn existing_columns_walk_values_then_comments() {
        // decl | v0 | v1 | c0 | c1
        let slot = |c| slot_for_column(c, 2, 2, SlotMode::Existing);
        assert_eq!(slot(1), Ok(CellSlot::Value(0)));
        assert_eq!(slot(2), Ok(CellSlot::Value(1)));
        assert_eq!(slot(3), Ok(CellSlot::Comment(0)));
        assert_eq!(slot(4), Ok(CellSlot::Comment(1)));
        assert_eq!(slot(5), Err(EditError::OutOfRange { column: 5, cells: 5 }));
    }

    #[test]
    fn insert_columns_prefer_values_at_the_boundary() {
        let slot = |c| slot_for_column(c, 2, 2, SlotMode::Insert);
        assert_eq!(slot(1), Ok(CellSlot::Value(0)));
        assert_eq!(slot(3), Ok(CellSlot::Value(2)));
        assert_eq!(slot(4), Ok(CellSlot::Comment(1)));
        assert_eq!(slot(5), Ok(CellSlot::Comment(2)));
        assert!(slot(6).is_err());
    }

    #[test]
    fn insert_without_comments_appends_value() {
        assert_eq!(slot_for_column(1, 0, 0, SlotMode::Insert), Ok(CellSlot::Value(0)));
        assert!(slot_for_column(2, 0, 0, SlotMode::Insert).is_err());
    }

    #[test]
    fn inserting_a_comment_marker_spills_later_values() {
        let mut values = cells(&["a", "b", "c"], TokenTag::Argument);
        let mut comments = cells(&["#old"], TokenTag::Comment);
        insert_cell(&mut values, &mut comments, TokenTag::Argument, "#x", 2).unwrap();
        assert_eq!(texts(&values), vec!["a"]);
        assert_eq!(texts(&comments), vec!["#x", "b", "c", "#old"]);
        assert!(comments.iter().all(|t| t.primary_tag() == Some(TokenTag::Comment)));
    }

    #[test]
    fn inserting_plain_value_keeps_comments() {
        let mut values = cells(&["a"], TokenTag::Argument);
        let mut comments = cells(&["#c"], TokenTag::Comment);
        insert_cell(&mut values, &mut comments, TokenTag::Argument, "${v}", 2).unwrap();
        assert_eq!(texts(&values), vec!["a", "${v}"]);
        assert!(values[1].has_tag(TokenTag::VariableUsage));
        assert_eq!(texts(&comments), vec!["#c"]);
    }

    #[test]
    fn set_and_remove_address_comments_after_values() {
        let mut values = cells(&["a", "b"], TokenTag::SettingValue);
        let mut comments = cells(&["#c"], TokenTag::Comment);
        set_cell(&mut values, &mut comments, "#d", 3).unwrap();
        assert_eq!(texts(&comments), vec!["#d"]);
        let removed = remove_cell(&mut values, &mut comments, 1).unwrap();
        assert_eq!(removed.text, "a");
        assert_eq!(texts(&values), vec!["b"]);
        assert_eq!(
            remove_cell(&mut values, &mut comments, 9),
            Err(EditError::OutOfRange { column: 9, cells: 3 })
        );
    }
}
