//! Line-structure mappers: headers, raw sections, comments, continuation
//! markers and pipe indentation.

use super::{DeclarationMapper, MapInput};
use crate::model::SectionKind;
use crate::parser::ParseSession;
use crate::state::ParseState;
use crate::token::{Token, TokenTag};

pub(super) struct SectionHeaderMapper;

impl DeclarationMapper for SectionHeaderMapper {
    fn name(&self) -> &'static str {
        "section-header"
    }

    fn can_map(&self, input: &MapInput<'_>) -> bool {
        input.is_first_cell()
            && !input.line.indented
            && SectionKind::from_header(input.text, input.version).is_some()
    }

    fn map(&self, session: &mut ParseSession, token: Token) {
        let kind = SectionKind::from_header(&token.text, session.version())
            .unwrap_or(SectionKind::Unknown);
        session.open_section(kind, token);
    }
}

pub(super) struct HeaderColumnMapper;

impl DeclarationMapper for HeaderColumnMapper {
    fn name(&self) -> &'static str {
        "header-column"
    }

    fn can_map(&self, input: &MapInput<'_>) -> bool {
        input.state() == ParseState::Header
    }

    fn map(&self, session: &mut ParseSession, token: Token) {
        session.add_header_column(token);
    }
}

/// Everything inside `*** Comments ***` and unrecognised sections.
pub(super) struct RawSectionMapper;

impl DeclarationMapper for RawSectionMapper {
    fn name(&self) -> &'static str {
        "raw-section"
    }

    fn can_map(&self, input: &MapInput<'_>) -> bool {
        input.section().is_some_and(SectionKind::is_raw)
    }

    fn map(&self, session: &mut ParseSession, mut token: Token) {
        match session.section() {
            Some(SectionKind::Comments) => token.classify(TokenTag::Comment),
            _ => token.classify(TokenTag::Trash),
        }
        session.add_raw(token);
    }
}

/// A `#` cell and every cell after it on the line.
pub(super) struct CommentMapper;

impl DeclarationMapper for CommentMapper {
    fn name(&self) -> &'static str {
        "comment"
    }

    fn can_map(&self, input: &MapInput<'_>) -> bool {
        input.section().is_some()
            && (input.text.starts_with('#') || input.state() == ParseState::Comment)
    }

    fn map(&self, session: &mut ParseSession, mut token: Token) {
        token.classify(TokenTag::Comment);
        if session.state() != ParseState::Comment {
            session.stack_mut().push(ParseState::Comment);
        }
        session.attach_comment(token);
    }
}

pub(super) struct ContinuationMapper;

impl DeclarationMapper for ContinuationMapper {
    fn name(&self) -> &'static str {
        "continuation"
    }

    fn can_map(&self, input: &MapInput<'_>) -> bool {
        input.is_first_cell()
            && input.text == "..."
            && input.section().is_some_and(|s| !s.is_raw())
    }

    fn map(&self, session: &mut ParseSession, token: Token) {
        session.continue_previous(token);
    }
}

/// Leading empty cells of a pipe-delimited line.
pub(super) struct EmptyCellMapper;

impl DeclarationMapper for EmptyCellMapper {
    fn name(&self) -> &'static str {
        "empty-cell"
    }

    fn can_map(&self, input: &MapInput<'_>) -> bool {
        input.is_first_cell() && input.text.is_empty()
    }

    fn map(&self, session: &mut ParseSession, token: Token) {
        session.add_indent(token);
    }
}
