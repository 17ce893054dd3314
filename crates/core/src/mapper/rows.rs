//! Test case, task and keyword bodies: unit names and executable rows.

use super::{DeclarationMapper, MapInput};
use crate::model::is_for_marker;
use crate::parser::{ParseSession, Slot};
use crate::state::ParseState;
use crate::token::{Token, TokenTag};
use crate::varsyntax;

fn mark_usage(token: &mut Token) {
    if varsyntax::contains_variable(&token.text) {
        token.add_tag(TokenTag::VariableUsage);
    }
}

/// Unindented first cell of a code section.
pub(super) struct UnitNameMapper;

impl DeclarationMapper for UnitNameMapper {
    fn name(&self) -> &'static str {
        "unit-name"
    }

    fn can_map(&self, input: &MapInput<'_>) -> bool {
        matches!(input.state(), ParseState::Section(kind) if kind.is_code())
            && input.is_first_cell()
            && !input.line.indented
    }

    fn map(&self, session: &mut ParseSession, token: Token) {
        match session.section() {
            Some(section) => session.declare_unit(section, token),
            None => session.attach_trash(token),
        }
    }
}

/// `${x}=` cells before the action.
pub(super) struct AssignmentMapper;

impl DeclarationMapper for AssignmentMapper {
    fn name(&self) -> &'static str {
        "assignment"
    }

    fn can_map(&self, input: &MapInput<'_>) -> bool {
        (input.in_unit_body() || input.state() == ParseState::Row)
            && varsyntax::is_assignment(input.text)
    }

    fn map(&self, session: &mut ParseSession, mut token: Token) {
        token.classify(TokenTag::Assignment);
        if session.state() == ParseState::Row {
            if let Some(row) = session.current_row_mut() {
                row.assignments.push(token);
                return;
            }
        }
        match session.start_row() {
            Some(row) => row.assignments.push(token),
            None => {
                session.attach_trash(token);
                return;
            }
        }
        session.stack_mut().push(ParseState::Row);
    }
}

pub(super) struct ActionMapper;

impl DeclarationMapper for ActionMapper {
    fn name(&self) -> &'static str {
        "action"
    }

    fn can_map(&self, input: &MapInput<'_>) -> bool {
        input.in_unit_body() || input.state() == ParseState::Row
    }

    fn map(&self, session: &mut ParseSession, mut token: Token) {
        token.classify(TokenTag::Action);
        mark_usage(&mut token);
        let next = if is_for_marker(&token.text) {
            ParseState::ForHeader
        } else {
            ParseState::RowArguments
        };
        if session.state() == ParseState::Row {
            if let Some(row) = session.current_row_mut() {
                row.action = Some(token);
                session.stack_mut().replace(next);
                return;
            }
        }
        match session.start_row() {
            Some(row) => row.action = Some(token),
            None => {
                session.attach_trash(token);
                return;
            }
        }
        session.stack_mut().push(next);
    }
}

/// Loop variables of a `FOR` row, up to the first non-variable cell.
pub(super) struct LoopHeaderMapper;

impl DeclarationMapper for LoopHeaderMapper {
    fn name(&self) -> &'static str {
        "loop-header"
    }

    fn can_map(&self, input: &MapInput<'_>) -> bool {
        input.state() == ParseState::ForHeader
    }

    fn map(&self, session: &mut ParseSession, mut token: Token) {
        if varsyntax::is_variable(&token.text) {
            token.classify(TokenTag::LoopVariable);
        } else {
            token.classify(TokenTag::Argument);
            mark_usage(&mut token);
            session.stack_mut().replace(ParseState::RowArguments);
        }
        session.attach(Slot::Values, token);
    }
}

pub(super) struct ArgumentMapper;

impl DeclarationMapper for ArgumentMapper {
    fn name(&self) -> &'static str {
        "argument"
    }

    fn can_map(&self, input: &MapInput<'_>) -> bool {
        input.state() == ParseState::RowArguments
    }

    fn map(&self, session: &mut ParseSession, mut token: Token) {
        token.classify(TokenTag::Argument);
        mark_usage(&mut token);
        session.attach(Slot::Values, token);
    }
}

#[cfg(test)]
mod tests {
    use crate::model::FileModel;
    use crate::parser::parse_source;
    use crate::token::TokenTag;
    use crate::version::LanguageVersion;

    fn parse(src: &str) -> FileModel {
        parse_source(src, "t.robot", LanguageVersion::LATEST)
    }

    #[test]
    fn assignments_precede_the_action() {
        let model = parse("*** Test Cases ***\nT\n    ${a}    ${b} =    Get Pair    x\n");
        let row = model.test_cases.units[0].rows().next().unwrap();
        let assigned: Vec<_> = row.assignments.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(assigned, vec!["${a}", "${b} ="]);
        assert_eq!(row.action_text(), Some("Get Pair"));
        assert_eq!(row.argument_texts(), vec!["x"]);
    }

    #[test]
    fn for_loop_variables_are_tagged() {
        let model = parse("*** Keywords ***\nK\n    FOR    ${i}    IN    a    b\n    END\n");
        let row = model.keywords.units[0].rows().next().unwrap();
        assert!(row.is_for_loop());
        assert_eq!(row.arguments[0].primary_tag(), Some(TokenTag::LoopVariable));
        assert_eq!(row.arguments[1].primary_tag(), Some(TokenTag::Argument));
        assert_eq!(row.loop_variables().count(), 1);
    }

    #[test]
    fn unit_name_and_row_on_one_line() {
        let model = parse("*** Keywords ***\nK    No Operation\n");
        let kw = &model.keywords.units[0];
        assert_eq!(kw.name_text(), "K");
        assert_eq!(kw.rows().next().unwrap().action_text(), Some("No Operation"));
    }

    #[test]
    fn indented_row_without_unit_gets_an_anonymous_one() {
        let model = parse("*** Keywords ***\n    Log    orphan\nReal\n    No Operation\n");
        assert_eq!(model.keywords.units.len(), 2);
        assert!(model.keywords.units[0].is_anonymous());
        assert_eq!(model.keywords.units[0].line, 2);
        assert_eq!(model.keywords.units[1].name_text(), "Real");
    }
}
