//! Token-driven parser.
//!
//! A [`ParseSession`] owns the file model being built, the parse-state
//! stack and the per-line context. Lines are fed one at a time; every data
//! cell goes through the [`MapperChain`], whose mappers call back into the
//! session to create and extend model elements. Parsing never fails: cells
//! no mapper claims end up as trash on the nearest element.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::mapper::{MapInput, MapperChain};
use crate::model::{
    CodeUnit, CommentRow, EmptyRow, ExecutableRow, FileModel, Header, LineLayout, ParentRef,
    Piece, RawSection, SectionKind, Setting, SettingKind, UnitItem, VariableDeclaration,
};
use crate::splitter;
use crate::state::{ParseState, StateStack};
use crate::token::{SeparatorStyle, Token, TokenTag, TokenizedLine};
use crate::varsyntax;
use crate::version::LanguageVersion;

// ──────────────────────────────────────────────
// Entry points
// ──────────────────────────────────────────────

/// Split and parse a whole source text.
pub fn parse_source(text: &str, path: impl Into<PathBuf>, version: LanguageVersion) -> FileModel {
    let split = splitter::split_source(text);
    let mut model = parse_lines(split.lines, path, version);
    model.bom = split.bom;
    model
}

/// Parse an already tokenized line stream.
pub fn parse_lines(
    lines: Vec<TokenizedLine>,
    path: impl Into<PathBuf>,
    version: LanguageVersion,
) -> FileModel {
    let chain = MapperChain::for_version(version);
    let mut session = ParseSession::new(path, version);
    for line in lines {
        session.feed_line(line, &chain);
    }
    let model = session.finish();
    debug!(
        path = %model.path.display(),
        settings = model.settings.settings.len(),
        variables = model.variables.variables.len(),
        test_cases = model.test_cases.units.len(),
        tasks = model.tasks.units.len(),
        keywords = model.keywords.units.len(),
        "parsed file"
    );
    model
}

// ──────────────────────────────────────────────
// Session state
// ──────────────────────────────────────────────

/// The element the current line is filling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    None,
    Preamble,
    /// Last header of the table of this kind.
    Header(SectionKind),
    Raw(usize),
    Setting(usize),
    /// A repeated once-only setting; cells go to the existing setting's
    /// duplicate list.
    DuplicateSetting(usize),
    Variable(usize),
    TableComment(SectionKind, usize),
    Unit(SectionKind, usize),
    Item(SectionKind, usize, usize),
    DuplicateItem(SectionKind, usize, usize),
}

impl Cursor {
    pub fn is_duplicate(self) -> bool {
        matches!(self, Cursor::DuplicateSetting(_) | Cursor::DuplicateItem(..))
    }
}

/// Which list of the cursor element receives a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Values,
    Comments,
    Trash,
    Layout,
    Duplicates,
}

/// Facts about the line being parsed.
#[derive(Debug, Clone, Default)]
pub struct LineContext {
    pub number: u32,
    pub style: SeparatorStyle,
    /// Line starts with whitespace or with empty pipe cells.
    pub indented: bool,
    pub cursor: Cursor,
    cells: usize,
    indent_cells: usize,
    has_data: bool,
    pending_layout: Vec<Token>,
}

impl LineContext {
    /// Index of the next data cell, not counting indentation cells.
    pub fn data_index(&self) -> usize {
        self.cells - self.indent_cells
    }
}

#[derive(Debug, Clone)]
struct LineSnapshot {
    stack: StateStack,
    cursor: Cursor,
}

pub struct ParseSession {
    model: FileModel,
    stack: StateStack,
    line: LineContext,
    /// States of the last data line, restored by a `...` continuation.
    previous: Option<LineSnapshot>,
    version: LanguageVersion,
}

impl ParseSession {
    pub fn new(path: impl Into<PathBuf>, version: LanguageVersion) -> Self {
        ParseSession {
            model: FileModel::new(path, version),
            stack: StateStack::default(),
            line: LineContext::default(),
            previous: None,
            version,
        }
    }

    pub fn feed_line(&mut self, line: TokenizedLine, chain: &MapperChain) {
        self.begin_line(&line);
        for token in line.tokens {
            if token.is_separator() {
                continue;
            }
            self.dispatch(token, chain);
        }
        self.end_line();
    }

    pub fn finish(self) -> FileModel {
        self.model
    }

    pub fn model(&self) -> &FileModel {
        &self.model
    }

    pub fn state(&self) -> ParseState {
        self.stack.current()
    }

    pub fn version(&self) -> LanguageVersion {
        self.version
    }

    pub fn section(&self) -> Option<SectionKind> {
        self.stack.section()
    }

    pub(crate) fn stack_mut(&mut self) -> &mut StateStack {
        &mut self.stack
    }

    fn begin_line(&mut self, line: &TokenizedLine) {
        let pieces = line
            .tokens
            .iter()
            .map(|t| {
                if t.is_separator() {
                    Piece::Separator(t.text.clone())
                } else {
                    Piece::Cell { column: t.column }
                }
            })
            .collect();
        self.model.lines.push(LineLayout {
            number: line.number,
            style: line.style,
            pieces,
            eol: line.eol.clone(),
        });

        self.stack.unwind_to_section();
        self.line = LineContext {
            number: line.number,
            style: line.style,
            indented: line.style == SeparatorStyle::Whitespace
                && line.tokens.first().is_some_and(Token::is_separator),
            ..LineContext::default()
        };
    }

    fn dispatch(&mut self, token: Token, chain: &MapperChain) {
        let is_comment =
            token.text.starts_with('#') || self.stack.current() == ParseState::Comment;
        let is_indent = token.text.is_empty() && self.line.data_index() == 0;
        let mapper = {
            let input = MapInput {
                stack: &self.stack,
                model: &self.model,
                token: &token,
                text: &token.text,
                line: &self.line,
                version: self.version,
            };
            chain.select(&input)
        };
        match mapper {
            Some(mapper) => {
                trace!(
                    line = token.line,
                    column = token.column,
                    mapper = mapper.name(),
                    "mapped token"
                );
                mapper.map(self, token);
            }
            None => {
                trace!(line = token.line, column = token.column, "unclaimed token");
                self.attach_trash(token);
            }
        }
        self.line.cells += 1;
        self.line.has_data |= !is_comment && !is_indent;
    }

    fn end_line(&mut self) {
        let pending = std::mem::take(&mut self.line.pending_layout);
        let blank = !self.line.has_data && self.line.cells == self.line.indent_cells;
        if blank {
            self.record_empty_row(pending);
            return;
        }
        for token in pending {
            self.attach(Slot::Layout, token);
        }
        let continuable = self.line.has_data
            && !self.stack.contains(ParseState::Header)
            && self.stack.section().is_some_and(|s| !s.is_raw());
        if continuable {
            self.previous = Some(LineSnapshot {
                stack: self.stack.without_comment(),
                cursor: self.line.cursor,
            });
        }
    }

    fn record_empty_row(&mut self, layout: Vec<Token>) {
        let Some(section) = self.stack.section() else {
            self.model.preamble.extend(layout);
            return;
        };
        let line = self.line.number;
        let header_line = self.header_line(section);
        let row = EmptyRow {
            parent: ParentRef::Table(section),
            line,
            layout,
        };
        match section {
            SectionKind::Settings => self.model.settings.empty_rows.push(row),
            SectionKind::Variables => self.model.variables.empty_rows.push(row),
            kind if kind.is_code() => {
                if let Some(table) = self.model.code_table_mut(kind) {
                    match table.nearest_unit(line, header_line) {
                        Some(unit) => {
                            table.units[unit].add_item(UnitItem::Empty(row));
                        }
                        None => table.empty_rows.push(row),
                    }
                }
            }
            _ => {
                if let Some(raw) = self.model.raw_sections.last_mut() {
                    raw.tokens.extend(row.layout);
                }
            }
        }
    }

    // ──────────────────────────────────────────────
    // Element lookup
    // ──────────────────────────────────────────────

    /// Line of the last header of the table for `section`; 0 if none.
    fn header_line(&self, section: SectionKind) -> u32 {
        let headers = match section {
            SectionKind::Settings => &self.model.settings.headers,
            SectionKind::Variables => &self.model.variables.headers,
            kind if kind.is_code() => match self.model.code_table(kind) {
                Some(table) => &table.headers,
                None => return 0,
            },
            _ => {
                return self
                    .model
                    .raw_sections
                    .last()
                    .map_or(0, |raw| raw.header.line())
            }
        };
        headers.last().map_or(0, Header::line)
    }

    fn unit_mut(&mut self, section: SectionKind, unit: usize) -> Option<&mut CodeUnit> {
        self.model.code_table_mut(section)?.units.get_mut(unit)
    }

    /// The unit the current line belongs to: the one already under the
    /// cursor, else the nearest unit under the current header, else a new
    /// anonymous unit anchored just after that header. Pushes the unit
    /// state when entering from the section level.
    pub(crate) fn ensure_unit(&mut self) -> Option<(SectionKind, usize)> {
        let section = self.stack.section().filter(|s| s.is_code())?;
        if let Cursor::Unit(s, u) | Cursor::Item(s, u, _) | Cursor::DuplicateItem(s, u, _) =
            self.line.cursor
        {
            if s == section {
                return Some((s, u));
            }
        }
        let header_line = self.header_line(section);
        let line = self.line.number;
        let table = self.model.code_table_mut(section)?;
        let unit = match table.nearest_unit(line, header_line) {
            Some(unit) => unit,
            None => {
                debug!(line, section = ?section, "synthesizing anonymous unit");
                table.add(CodeUnit::anonymous(section, header_line + 1))
            }
        };
        self.line.cursor = Cursor::Unit(section, unit);
        if matches!(self.stack.current(), ParseState::Section(_)) {
            self.stack.push(ParseState::Unit);
        }
        Some((section, unit))
    }

    /// Cursor for the element a stray cell belongs to, creating an anonymous
    /// element when the current section has none yet.
    fn nearest_cursor(&mut self) -> Cursor {
        let Some(section) = self.stack.section() else {
            return Cursor::Preamble;
        };
        let header_line = self.header_line(section);
        let line = self.line.number;
        match section {
            SectionKind::Settings => {
                let found = self
                    .model
                    .settings
                    .settings
                    .iter()
                    .rposition(|s| s.line() > header_line);
                Cursor::Setting(found.unwrap_or_else(|| {
                    debug!(line, "synthesizing anonymous setting");
                    self.model.settings.add(Setting::new(
                        ParentRef::Table(section),
                        SettingKind::Unknown,
                        None,
                    ))
                }))
            }
            SectionKind::Variables => {
                let found = self
                    .model
                    .variables
                    .variables
                    .iter()
                    .rposition(|v| v.line() > header_line);
                Cursor::Variable(found.unwrap_or_else(|| {
                    debug!(line, "synthesizing anonymous variable");
                    self.model.variables.add(VariableDeclaration::new(None))
                }))
            }
            kind if kind.is_code() => match self.ensure_unit() {
                Some((s, u)) => Cursor::Unit(s, u),
                None => Cursor::None,
            },
            _ => match self.model.raw_sections.len() {
                0 => Cursor::Preamble,
                n => Cursor::Raw(n - 1),
            },
        }
    }

    fn list_mut(&mut self, cursor: Cursor, slot: Slot) -> Option<&mut Vec<Token>> {
        fn setting_list(s: &mut Setting, slot: Slot) -> &mut Vec<Token> {
            match slot {
                Slot::Values => &mut s.values,
                Slot::Comments => &mut s.comments,
                Slot::Trash => &mut s.trash,
                Slot::Layout => &mut s.layout,
                Slot::Duplicates => &mut s.duplicates,
            }
        }
        fn comment_list(c: &mut CommentRow, slot: Slot) -> &mut Vec<Token> {
            match slot {
                Slot::Layout => &mut c.layout,
                _ => &mut c.tokens,
            }
        }

        let model = &mut self.model;
        match cursor {
            Cursor::None => None,
            Cursor::Preamble => Some(&mut model.preamble),
            Cursor::Header(kind) => {
                let headers = match kind {
                    SectionKind::Settings => &mut model.settings.headers,
                    SectionKind::Variables => &mut model.variables.headers,
                    kind => &mut model.code_table_mut(kind)?.headers,
                };
                headers.last_mut().map(|h| &mut h.columns)
            }
            Cursor::Raw(i) => model.raw_sections.get_mut(i).map(|r| &mut r.tokens),
            Cursor::Setting(i) | Cursor::DuplicateSetting(i) => model
                .settings
                .settings
                .get_mut(i)
                .map(|s| setting_list(s, slot)),
            Cursor::Variable(i) => {
                let v = model.variables.variables.get_mut(i)?;
                Some(match slot {
                    Slot::Values => &mut v.values,
                    Slot::Comments => &mut v.comments,
                    Slot::Layout => &mut v.layout,
                    Slot::Trash | Slot::Duplicates => &mut v.trash,
                })
            }
            Cursor::TableComment(kind, i) => {
                let rows = match kind {
                    SectionKind::Settings => &mut model.settings.comments,
                    SectionKind::Variables => &mut model.variables.comments,
                    kind => &mut model.code_table_mut(kind)?.comments,
                };
                rows.get_mut(i).map(|c| comment_list(c, slot))
            }
            Cursor::Unit(kind, u) => {
                let unit = model.code_table_mut(kind)?.units.get_mut(u)?;
                Some(match slot {
                    Slot::Comments => &mut unit.comments,
                    Slot::Layout => &mut unit.layout,
                    _ => &mut unit.trash,
                })
            }
            Cursor::Item(kind, u, i) | Cursor::DuplicateItem(kind, u, i) => {
                let unit = model.code_table_mut(kind)?.units.get_mut(u)?;
                match unit.items.get_mut(i)? {
                    UnitItem::Setting(s) => Some(setting_list(s, slot)),
                    UnitItem::Row(r) => Some(match slot {
                        Slot::Values => &mut r.arguments,
                        Slot::Comments => &mut r.comments,
                        Slot::Layout => &mut r.layout,
                        Slot::Trash | Slot::Duplicates => &mut r.trash,
                    }),
                    UnitItem::Comment(c) => Some(comment_list(c, slot)),
                    UnitItem::Empty(_) => Some(&mut unit.trash),
                }
            }
        }
    }

    // ──────────────────────────────────────────────
    // Operations used by the mappers
    // ──────────────────────────────────────────────

    /// Add `token` to the cursor element, resolving the nearest element when
    /// the line has none yet.
    pub(crate) fn attach(&mut self, slot: Slot, mut token: Token) {
        if self.line.cursor == Cursor::None {
            self.line.cursor = self.nearest_cursor();
        }
        let cursor = self.line.cursor;
        let slot = if cursor.is_duplicate() && matches!(slot, Slot::Values | Slot::Comments) {
            token.add_tag(TokenTag::Duplicated);
            Slot::Duplicates
        } else {
            slot
        };
        match self.list_mut(cursor, slot) {
            Some(list) => list.push(token),
            None => {
                token.add_tag(TokenTag::Trash);
                self.model.preamble.push(token);
            }
        }
    }

    pub(crate) fn attach_trash(&mut self, mut token: Token) {
        token.classify(TokenTag::Trash);
        self.attach(Slot::Trash, token);
    }

    /// Comment cells join the line's element, or open a comment row when the
    /// line has no element yet.
    pub(crate) fn attach_comment(&mut self, token: Token) {
        if self.line.cursor == Cursor::None {
            self.line.cursor = self.open_comment_row();
        }
        self.attach(Slot::Comments, token);
    }

    fn open_comment_row(&mut self) -> Cursor {
        let Some(section) = self.stack.section() else {
            return Cursor::Preamble;
        };
        let parent = ParentRef::Table(section);
        match section {
            SectionKind::Settings => {
                self.model.settings.comments.push(CommentRow::new(parent));
                Cursor::TableComment(section, self.model.settings.comments.len() - 1)
            }
            SectionKind::Variables => {
                self.model.variables.comments.push(CommentRow::new(parent));
                Cursor::TableComment(section, self.model.variables.comments.len() - 1)
            }
            kind if kind.is_code() => {
                let header_line = self.header_line(kind);
                let has_unit = self
                    .model
                    .code_table(kind)
                    .and_then(|t| t.nearest_unit(self.line.number, header_line))
                    .is_some();
                if self.line.indented || has_unit {
                    let Some((s, u)) = self.ensure_unit() else {
                        return Cursor::None;
                    };
                    match self.unit_mut(s, u) {
                        Some(unit) => {
                            let idx = unit.add_item(UnitItem::Comment(CommentRow::new(parent)));
                            Cursor::Item(s, u, idx)
                        }
                        None => Cursor::None,
                    }
                } else {
                    match self.model.code_table_mut(kind) {
                        Some(table) => {
                            table.comments.push(CommentRow::new(parent));
                            Cursor::TableComment(kind, table.comments.len() - 1)
                        }
                        None => Cursor::None,
                    }
                }
            }
            _ => self.nearest_cursor(),
        }
    }

    /// Leading empty pipe cells: indentation, kept for write-back.
    pub(crate) fn add_indent(&mut self, mut token: Token) {
        token.classify(TokenTag::EmptyCell);
        self.line.indented = true;
        self.line.indent_cells += 1;
        self.line.pending_layout.push(token);
    }

    pub(crate) fn open_section(&mut self, kind: SectionKind, mut token: Token) {
        token.classify(TokenTag::SectionHeader);
        debug!(line = token.line, section = ?kind, "section header");
        self.stack.reset();
        self.stack.push(ParseState::Section(kind));
        self.stack.push(ParseState::Header);
        self.previous = None;
        let header = Header {
            token,
            columns: Vec::new(),
        };
        self.line.cursor = match kind {
            SectionKind::Settings => {
                self.model.settings.headers.push(header);
                Cursor::Header(kind)
            }
            SectionKind::Variables => {
                self.model.variables.headers.push(header);
                Cursor::Header(kind)
            }
            SectionKind::TestCases | SectionKind::Tasks | SectionKind::Keywords => {
                if let Some(table) = self.model.code_table_mut(kind) {
                    table.headers.push(header);
                }
                Cursor::Header(kind)
            }
            SectionKind::Comments | SectionKind::Unknown => {
                self.model.raw_sections.push(RawSection {
                    kind,
                    header,
                    tokens: Vec::new(),
                });
                Cursor::Raw(self.model.raw_sections.len() - 1)
            }
        };
    }

    pub(crate) fn add_header_column(&mut self, mut token: Token) {
        token.classify(TokenTag::HeaderColumn);
        match self.line.cursor {
            Cursor::Raw(i) => {
                if let Some(raw) = self.model.raw_sections.get_mut(i) {
                    raw.header.columns.push(token);
                }
            }
            _ => self.attach(Slot::Values, token),
        }
    }

    /// Restore the previous data line's states for a `...` line. With no
    /// previous line in this section the nearest element hosts it.
    pub(crate) fn continue_previous(&mut self, mut token: Token) {
        token.classify(TokenTag::Continuation);
        match self.previous.clone() {
            Some(snapshot) => {
                self.stack = snapshot.stack;
                self.line.cursor = snapshot.cursor;
            }
            None => {
                let cursor = self.nearest_cursor();
                self.line.cursor = cursor;
                match cursor {
                    Cursor::Setting(i) => {
                        let kind = self.model.settings.settings[i].kind;
                        self.stack.push(ParseState::Setting(kind));
                    }
                    Cursor::Variable(_) => self.stack.push(ParseState::Variable),
                    // Code units: `ensure_unit` already entered the unit.
                    _ => {}
                }
            }
        }
        self.attach(Slot::Layout, token);
    }

    pub(crate) fn declare_setting(&mut self, kind: SettingKind, mut token: Token, tag: TokenTag) {
        token.classify(tag);
        self.stack.push(ParseState::Setting(kind));
        if !kind.allows_repeats() {
            if let Some(existing) = self.model.settings.first_of_kind(kind) {
                debug!(line = token.line, kind = ?kind, "duplicate setting");
                token.add_tag(TokenTag::Duplicated);
                self.model.settings.settings[existing].duplicates.push(token);
                self.line.cursor = Cursor::DuplicateSetting(existing);
                return;
            }
        }
        let setting = Setting::new(ParentRef::Table(SectionKind::Settings), kind, Some(token));
        let idx = self.model.settings.add(setting);
        self.line.cursor = Cursor::Setting(idx);
    }

    pub(crate) fn declare_local_setting(
        &mut self,
        kind: SettingKind,
        mut token: Token,
        tag: TokenTag,
    ) {
        let Some((section, u)) = self.ensure_unit() else {
            self.attach_trash(token);
            return;
        };
        token.classify(tag);
        self.stack.push(ParseState::LocalSetting(kind));
        let Some(unit) = self.unit_mut(section, u) else {
            return;
        };
        if !kind.allows_repeats() {
            let existing = unit
                .items
                .iter()
                .position(|i| matches!(i, UnitItem::Setting(s) if s.kind == kind));
            if let Some(existing) = existing {
                debug!(line = token.line, kind = ?kind, "duplicate local setting");
                token.add_tag(TokenTag::Duplicated);
                if let UnitItem::Setting(s) = &mut unit.items[existing] {
                    s.duplicates.push(token);
                }
                self.line.cursor = Cursor::DuplicateItem(section, u, existing);
                return;
            }
        }
        let idx = unit.add_item(UnitItem::Setting(Setting::new(
            ParentRef::File,
            kind,
            Some(token),
        )));
        self.line.cursor = Cursor::Item(section, u, idx);
    }

    pub(crate) fn declare_variable(&mut self, mut token: Token) {
        token.classify(TokenTag::VariableDeclaration);
        self.stack.push(ParseState::Variable);
        let idx = self
            .model
            .variables
            .add(VariableDeclaration::new(Some(token)));
        self.line.cursor = Cursor::Variable(idx);
    }

    pub(crate) fn declare_unit(&mut self, section: SectionKind, mut token: Token) {
        token.classify(TokenTag::UnitName);
        if section == SectionKind::Keywords && varsyntax::contains_variable(&token.text) {
            token.add_tag(TokenTag::EmbeddedArguments);
        }
        self.stack.push(ParseState::Unit);
        let Some(table) = self.model.code_table_mut(section) else {
            return;
        };
        let idx = table.add(CodeUnit::new(section, token));
        self.line.cursor = Cursor::Unit(section, idx);
    }

    /// Open a new executable row in the line's unit.
    pub(crate) fn start_row(&mut self) -> Option<&mut ExecutableRow> {
        let (section, u) = self.ensure_unit()?;
        let unit = self.unit_mut(section, u)?;
        let idx = unit.add_item(UnitItem::Row(ExecutableRow::new(ParentRef::File)));
        self.line.cursor = Cursor::Item(section, u, idx);
        self.current_row_mut()
    }

    pub(crate) fn current_row_mut(&mut self) -> Option<&mut ExecutableRow> {
        match self.line.cursor {
            Cursor::Item(section, u, i) => self.unit_mut(section, u)?.row_mut(i),
            _ => None,
        }
    }

    pub(crate) fn add_raw(&mut self, token: Token) {
        match self.model.raw_sections.last_mut() {
            Some(raw) => raw.tokens.push(token),
            None => self.attach_trash(token),
        }
    }
}
