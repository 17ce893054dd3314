//! Grammar positions of the token-driven parser.

use serde::Serialize;

use crate::model::{SectionKind, SettingKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseState {
    /// Before any section header.
    Start,
    Section(SectionKind),
    /// Remaining cells of a section header line.
    Header,
    /// Cells after a setting declaration, suite level.
    Setting(SettingKind),
    /// Cells after a variable declaration.
    Variable,
    /// Inside a test case, task or keyword, before the line's first body cell.
    Unit,
    /// Cells after a `[Local]` setting.
    LocalSetting(SettingKind),
    /// Executable row before its action: only assignments so far.
    Row,
    /// `FOR` row before the `IN` marker.
    ForHeader,
    /// Executable row after its action.
    RowArguments,
    /// Rest of the line is comment.
    Comment,
}

/// Stack of grammar positions. The root state is never popped, so there is
/// always exactly one current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateStack {
    states: Vec<ParseState>,
}

impl Default for StateStack {
    fn default() -> Self {
        StateStack {
            states: vec![ParseState::Start],
        }
    }
}

impl StateStack {
    pub fn current(&self) -> ParseState {
        self.states.last().copied().unwrap_or(ParseState::Start)
    }

    pub fn depth(&self) -> usize {
        self.states.len()
    }

    pub fn push(&mut self, state: ParseState) {
        self.states.push(state);
    }

    /// Pop the current state unless it is the root.
    pub fn pop(&mut self) -> Option<ParseState> {
        if self.states.len() > 1 {
            self.states.pop()
        } else {
            None
        }
    }

    /// Replace the current state in place (the root stays a root).
    pub fn replace(&mut self, state: ParseState) {
        if self.states.len() > 1 {
            self.states.pop();
        }
        self.states.push(state);
    }

    /// Innermost open section.
    pub fn section(&self) -> Option<SectionKind> {
        self.states.iter().rev().find_map(|s| match s {
            ParseState::Section(kind) => Some(*kind),
            _ => None,
        })
    }

    pub fn contains(&self, state: ParseState) -> bool {
        self.states.contains(&state)
    }

    /// Drop everything above the innermost section: the start of a new line.
    pub fn unwind_to_section(&mut self) {
        while self.states.len() > 1 && !matches!(self.current(), ParseState::Section(_)) {
            self.states.pop();
        }
    }

    /// Close the current section entirely: a new header follows.
    pub fn reset(&mut self) {
        self.states.truncate(1);
    }

    /// Pop a trailing comment state so the stack can be continued.
    pub fn without_comment(&self) -> StateStack {
        let mut copy = self.clone();
        while copy.current() == ParseState::Comment && copy.pop().is_some() {}
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_never_popped() {
        let mut stack = StateStack::default();
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.current(), ParseState::Start);
        stack.replace(ParseState::Section(SectionKind::Keywords));
        assert_eq!(stack.depth(), 2);
        stack.reset();
        assert_eq!(stack.current(), ParseState::Start);
    }

    #[test]
    fn unwinding_keeps_the_section() {
        let mut stack = StateStack::default();
        stack.push(ParseState::Section(SectionKind::Keywords));
        stack.push(ParseState::Unit);
        stack.push(ParseState::RowArguments);
        stack.push(ParseState::Comment);
        assert_eq!(stack.without_comment().current(), ParseState::RowArguments);
        stack.unwind_to_section();
        assert_eq!(stack.current(), ParseState::Section(SectionKind::Keywords));
        assert_eq!(stack.section(), Some(SectionKind::Keywords));
    }
}
