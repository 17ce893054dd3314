//! `*** Variables ***` rows.

use super::{DeclarationMapper, MapInput};
use crate::model::SectionKind;
use crate::parser::{ParseSession, Slot};
use crate::state::ParseState;
use crate::token::{Token, TokenTag};
use crate::varsyntax;

pub(super) struct VariableDeclarationMapper;

impl DeclarationMapper for VariableDeclarationMapper {
    fn name(&self) -> &'static str {
        "variable-declaration"
    }

    fn can_map(&self, input: &MapInput<'_>) -> bool {
        input.state() == ParseState::Section(SectionKind::Variables) && input.is_first_cell()
    }

    fn map(&self, session: &mut ParseSession, token: Token) {
        session.declare_variable(token);
    }
}

pub(super) struct VariableValueMapper;

impl DeclarationMapper for VariableValueMapper {
    fn name(&self) -> &'static str {
        "variable-value"
    }

    fn can_map(&self, input: &MapInput<'_>) -> bool {
        input.state() == ParseState::Variable
    }

    fn map(&self, session: &mut ParseSession, mut token: Token) {
        token.classify(TokenTag::VariableValue);
        if varsyntax::contains_variable(&token.text) {
            token.add_tag(TokenTag::VariableUsage);
        }
        session.attach(Slot::Values, token);
    }
}
