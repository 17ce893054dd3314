//! Declaration mappers: the per-token rules that populate the file model.
//!
//! Each mapper answers two questions about the token under the cursor: can
//! it claim the token in the current context, and what does claiming do to
//! the parse state and the model. The chain tries mappers in a fixed order
//! and runs the first eligible one; a token nobody claims becomes trash on
//! the nearest element.

mod rows;
mod sections;
mod settings;
mod variables;

use crate::model::{FileModel, SectionKind, Setting};
use crate::parser::{Cursor, LineContext, ParseSession};
use crate::state::{ParseState, StateStack};
use crate::token::Token;
use crate::version::{LanguageVersion, VersionRange};

pub use settings::{lookup_local_setting, lookup_suite_setting, DeclarationSpec};

/// Everything a mapper may consult to decide eligibility. Read-only.
pub struct MapInput<'a> {
    pub stack: &'a StateStack,
    pub model: &'a FileModel,
    pub token: &'a Token,
    pub text: &'a str,
    pub line: &'a LineContext,
    pub version: LanguageVersion,
}

impl MapInput<'_> {
    pub fn state(&self) -> ParseState {
        self.stack.current()
    }

    pub fn section(&self) -> Option<SectionKind> {
        self.stack.section()
    }

    /// First data cell of the line, not counting indentation cells.
    pub fn is_first_cell(&self) -> bool {
        self.line.data_index() == 0
    }

    /// Whether the token starts a body line of a test case, task or keyword.
    pub fn in_unit_body(&self) -> bool {
        match self.state() {
            ParseState::Unit => true,
            ParseState::Section(kind) => kind.is_code() && self.line.indented,
            _ => false,
        }
    }

    /// The setting the line is currently filling, if any.
    pub fn cursor_setting(&self) -> Option<&Setting> {
        match self.line.cursor {
            Cursor::Setting(i) => self.model.settings.settings.get(i),
            Cursor::Item(section, unit, item) => {
                match self.model.code_table(section)?.get(unit)?.items.get(item)? {
                    crate::model::UnitItem::Setting(s) => Some(s),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// One rule of the chain.
pub trait DeclarationMapper: Send + Sync {
    fn name(&self) -> &'static str;

    /// Language versions for which the mapper is part of the chain.
    fn versions(&self) -> VersionRange {
        VersionRange::ALL
    }

    fn can_map(&self, input: &MapInput<'_>) -> bool;

    fn map(&self, session: &mut ParseSession, token: Token);
}

/// Ordered mapper list for one language version.
pub struct MapperChain {
    mappers: Vec<Box<dyn DeclarationMapper>>,
}

impl MapperChain {
    /// Every mapper in priority order, unfiltered.
    pub fn standard() -> Self {
        let mappers: Vec<Box<dyn DeclarationMapper>> = vec![
            Box::new(sections::SectionHeaderMapper),
            Box::new(sections::HeaderColumnMapper),
            Box::new(sections::RawSectionMapper),
            Box::new(sections::CommentMapper),
            Box::new(sections::ContinuationMapper),
            Box::new(sections::EmptyCellMapper),
            Box::new(settings::SettingDeclarationMapper),
            Box::new(settings::UnknownSettingMapper),
            Box::new(settings::AliasMarkerMapper {
                marker: "WITH NAME",
                versions: VersionRange::before(7, 0),
            }),
            Box::new(settings::AliasMarkerMapper {
                marker: "AS",
                versions: VersionRange::since(6, 0),
            }),
            Box::new(settings::AliasMapper),
            Box::new(settings::SettingValueMapper),
            Box::new(variables::VariableDeclarationMapper),
            Box::new(variables::VariableValueMapper),
            Box::new(rows::UnitNameMapper),
            Box::new(settings::LocalSettingMapper),
            Box::new(settings::UnknownLocalSettingMapper),
            Box::new(rows::AssignmentMapper),
            Box::new(rows::ActionMapper),
            Box::new(rows::LoopHeaderMapper),
            Box::new(rows::ArgumentMapper),
        ];
        MapperChain { mappers }
    }

    /// The standard chain restricted to mappers active for `version`.
    pub fn for_version(version: LanguageVersion) -> Self {
        let mut chain = MapperChain::standard();
        chain.mappers.retain(|m| m.versions().contains(version));
        chain
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.mappers.iter().map(|m| m.name()).collect()
    }

    /// The first mapper able to claim the token.
    pub fn select<'c>(&'c self, input: &MapInput<'_>) -> Option<&'c dyn DeclarationMapper> {
        self.mappers
            .iter()
            .find(|m| m.can_map(input))
            .map(|m| m.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_markers_follow_the_version() {
        let old = MapperChain::for_version(LanguageVersion::new(5, 0));
        let both = MapperChain::for_version(LanguageVersion::new(6, 1));
        let new = MapperChain::for_version(LanguageVersion::new(7, 0));
        let count = |c: &MapperChain| c.names().iter().filter(|n| **n == "alias-marker").count();
        assert_eq!(count(&old), 1);
        assert_eq!(count(&both), 2);
        assert_eq!(count(&new), 1);
        assert_eq!(MapperChain::standard().names()[0], "section-header");
    }
}
