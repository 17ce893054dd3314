//! Setting declarations, suite level and `[Local]`.
//!
//! Which names are recognised, and under which language versions, is data:
//! each table row pairs a spelling with the setting kind it declares and
//! the half-open version range in which it is valid.

use super::{DeclarationMapper, MapInput};
use crate::model::{SectionKind, SettingKind};
use crate::parser::{ParseSession, Slot};
use crate::state::ParseState;
use crate::token::{Token, TokenTag};
use crate::varsyntax;
use crate::version::{LanguageVersion, VersionRange};

#[derive(Debug, Clone, Copy)]
pub struct DeclarationSpec {
    pub name: &'static str,
    pub kind: SettingKind,
    pub versions: VersionRange,
}

const fn spec(name: &'static str, kind: SettingKind, versions: VersionRange) -> DeclarationSpec {
    DeclarationSpec {
        name,
        kind,
        versions,
    }
}

const ALL: VersionRange = VersionRange::ALL;

static SUITE_SETTINGS: &[DeclarationSpec] = &[
    spec("Library", SettingKind::Library, ALL),
    spec("Resource", SettingKind::Resource, ALL),
    spec("Variables", SettingKind::Variables, ALL),
    spec("Name", SettingKind::Name, VersionRange::since(7, 0)),
    spec("Documentation", SettingKind::Documentation, ALL),
    spec("Metadata", SettingKind::Metadata, ALL),
    spec("Suite Setup", SettingKind::SuiteSetup, ALL),
    spec("Suite Precondition", SettingKind::SuiteSetup, VersionRange::before(3, 0)),
    spec("Suite Teardown", SettingKind::SuiteTeardown, ALL),
    spec("Suite Postcondition", SettingKind::SuiteTeardown, VersionRange::before(3, 0)),
    spec("Test Setup", SettingKind::TestSetup, ALL),
    spec("Test Precondition", SettingKind::TestSetup, VersionRange::before(3, 0)),
    spec("Task Setup", SettingKind::TestSetup, VersionRange::since(3, 1)),
    spec("Test Teardown", SettingKind::TestTeardown, ALL),
    spec("Test Postcondition", SettingKind::TestTeardown, VersionRange::before(3, 0)),
    spec("Task Teardown", SettingKind::TestTeardown, VersionRange::since(3, 1)),
    spec("Test Template", SettingKind::TestTemplate, ALL),
    spec("Task Template", SettingKind::TestTemplate, VersionRange::since(3, 1)),
    spec("Test Timeout", SettingKind::TestTimeout, ALL),
    spec("Task Timeout", SettingKind::TestTimeout, VersionRange::since(3, 1)),
    spec("Force Tags", SettingKind::ForceTags, ALL),
    spec("Test Tags", SettingKind::ForceTags, VersionRange::since(6, 0)),
    spec("Default Tags", SettingKind::DefaultTags, ALL),
    spec("Keyword Tags", SettingKind::KeywordTags, VersionRange::since(6, 0)),
];

static TEST_SETTINGS: &[DeclarationSpec] = &[
    spec("Documentation", SettingKind::Documentation, ALL),
    spec("Tags", SettingKind::Tags, ALL),
    spec("Setup", SettingKind::Setup, ALL),
    spec("Precondition", SettingKind::Setup, VersionRange::before(3, 0)),
    spec("Teardown", SettingKind::Teardown, ALL),
    spec("Postcondition", SettingKind::Teardown, VersionRange::before(3, 0)),
    spec("Template", SettingKind::Template, ALL),
    spec("Timeout", SettingKind::Timeout, ALL),
];

static KEYWORD_SETTINGS: &[DeclarationSpec] = &[
    spec("Documentation", SettingKind::Documentation, ALL),
    spec("Arguments", SettingKind::Arguments, ALL),
    spec("Tags", SettingKind::Tags, ALL),
    spec("Setup", SettingKind::Setup, VersionRange::since(7, 0)),
    spec("Teardown", SettingKind::Teardown, ALL),
    spec("Return", SettingKind::Return, ALL),
    spec("Timeout", SettingKind::Timeout, ALL),
];

/// Lowercase, no spaces, no trailing colon.
fn normalize_declaration(text: &str) -> String {
    text.trim()
        .trim_end_matches(':')
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn lookup(table: &[DeclarationSpec], text: &str, version: LanguageVersion) -> Option<SettingKind> {
    let wanted = normalize_declaration(text);
    table
        .iter()
        .find(|spec| spec.versions.contains(version) && normalize_declaration(spec.name) == wanted)
        .map(|spec| spec.kind)
}

pub fn lookup_suite_setting(text: &str, version: LanguageVersion) -> Option<SettingKind> {
    lookup(SUITE_SETTINGS, text, version)
}

/// `[Name]` inside a unit of `section`.
pub fn lookup_local_setting(
    section: SectionKind,
    text: &str,
    version: LanguageVersion,
) -> Option<SettingKind> {
    let inner = text.trim().strip_prefix('[')?.strip_suffix(']')?;
    let table = match section {
        SectionKind::Keywords => KEYWORD_SETTINGS,
        SectionKind::TestCases | SectionKind::Tasks => TEST_SETTINGS,
        _ => return None,
    };
    lookup(table, inner, version)
}

fn value_token(mut token: Token, tag: TokenTag) -> Token {
    token.classify(tag);
    if varsyntax::contains_variable(&token.text) {
        token.add_tag(TokenTag::VariableUsage);
    }
    token
}

// ──────────────────────────────────────────────
// Suite level
// ──────────────────────────────────────────────

pub(super) struct SettingDeclarationMapper;

impl DeclarationMapper for SettingDeclarationMapper {
    fn name(&self) -> &'static str {
        "setting-declaration"
    }

    fn can_map(&self, input: &MapInput<'_>) -> bool {
        input.state() == ParseState::Section(SectionKind::Settings)
            && input.is_first_cell()
            && lookup_suite_setting(input.text, input.version).is_some()
    }

    fn map(&self, session: &mut ParseSession, token: Token) {
        let kind = lookup_suite_setting(&token.text, session.version())
            .unwrap_or(SettingKind::Unknown);
        session.declare_setting(kind, token, TokenTag::SettingDeclaration);
    }
}

pub(super) struct UnknownSettingMapper;

impl DeclarationMapper for UnknownSettingMapper {
    fn name(&self) -> &'static str {
        "unknown-setting"
    }

    fn can_map(&self, input: &MapInput<'_>) -> bool {
        input.state() == ParseState::Section(SectionKind::Settings) && input.is_first_cell()
    }

    fn map(&self, session: &mut ParseSession, token: Token) {
        session.declare_setting(SettingKind::Unknown, token, TokenTag::UnknownSetting);
    }
}

/// `WITH NAME` / `AS` after a library name. One instance per spelling, each
/// active for its own version range.
pub(super) struct AliasMarkerMapper {
    pub(super) marker: &'static str,
    pub(super) versions: VersionRange,
}

impl DeclarationMapper for AliasMarkerMapper {
    fn name(&self) -> &'static str {
        "alias-marker"
    }

    fn versions(&self) -> VersionRange {
        self.versions
    }

    fn can_map(&self, input: &MapInput<'_>) -> bool {
        input.state() == ParseState::Setting(SettingKind::Library)
            && input.text == self.marker
            && input.cursor_setting().is_some_and(|s| {
                !s.values.is_empty() && !s.values.iter().any(|v| v.has_tag(TokenTag::AliasMarker))
            })
    }

    fn map(&self, session: &mut ParseSession, mut token: Token) {
        token.classify(TokenTag::AliasMarker);
        session.attach(Slot::Values, token);
    }
}

/// The cell right after an alias marker.
pub(super) struct AliasMapper;

impl DeclarationMapper for AliasMapper {
    fn name(&self) -> &'static str {
        "alias"
    }

    fn can_map(&self, input: &MapInput<'_>) -> bool {
        input.state() == ParseState::Setting(SettingKind::Library)
            && input
                .cursor_setting()
                .and_then(|s| s.values.last())
                .is_some_and(|v| v.has_tag(TokenTag::AliasMarker))
    }

    fn map(&self, session: &mut ParseSession, mut token: Token) {
        token.classify(TokenTag::Alias);
        session.attach(Slot::Values, token);
    }
}

pub(super) struct SettingValueMapper;

impl DeclarationMapper for SettingValueMapper {
    fn name(&self) -> &'static str {
        "setting-value"
    }

    fn can_map(&self, input: &MapInput<'_>) -> bool {
        matches!(
            input.state(),
            ParseState::Setting(_) | ParseState::LocalSetting(_)
        )
    }

    fn map(&self, session: &mut ParseSession, token: Token) {
        session.attach(Slot::Values, value_token(token, TokenTag::SettingValue));
    }
}

// ──────────────────────────────────────────────
// Local settings
// ──────────────────────────────────────────────

pub(super) struct LocalSettingMapper;

impl DeclarationMapper for LocalSettingMapper {
    fn name(&self) -> &'static str {
        "local-setting"
    }

    fn can_map(&self, input: &MapInput<'_>) -> bool {
        input.in_unit_body()
            && input
                .section()
                .and_then(|s| lookup_local_setting(s, input.text, input.version))
                .is_some()
    }

    fn map(&self, session: &mut ParseSession, token: Token) {
        let kind = session
            .section()
            .and_then(|s| lookup_local_setting(s, &token.text, session.version()))
            .unwrap_or(SettingKind::Unknown);
        session.declare_local_setting(kind, token, TokenTag::LocalSettingDeclaration);
    }
}

/// Any other bracketed first cell in a unit body.
pub(super) struct UnknownLocalSettingMapper;

impl DeclarationMapper for UnknownLocalSettingMapper {
    fn name(&self) -> &'static str {
        "unknown-local-setting"
    }

    fn can_map(&self, input: &MapInput<'_>) -> bool {
        let text = input.text.trim();
        input.in_unit_body() && text.len() > 1 && text.starts_with('[') && text.ends_with(']')
    }

    fn map(&self, session: &mut ParseSession, token: Token) {
        session.declare_local_setting(SettingKind::Unknown, token, TokenTag::UnknownSetting);
    }
}
