//! Write-back: regenerate source text from a file model.
//!
//! Every source line is rebuilt from its recorded layout, with cell text
//! taken from the token currently at that position. An unmodified model
//! therefore reproduces the input byte for byte. Cells created by edits
//! carry no position: they are emitted next to the nearest positioned
//! sibling, and elements with no positioned token at all become new lines
//! after the last line of their table.

use std::collections::{BTreeMap, HashMap};

use crate::model::{
    line_span, CodeTable, CodeUnit, FileModel, LineLayout, Piece, SectionKind, UnitItem,
};
use crate::token::{SeparatorStyle, Token, TokenTag};

const CELL_SEPARATOR: &str = "    ";
const PIPE_SEPARATOR: &str = " | ";

pub fn dump(model: &FileModel) -> String {
    let plan = Plan::build(model);
    let eol = model.default_eol();
    let mut out = String::new();
    if model.bom {
        out.push('\u{feff}');
    }
    for line in &model.lines {
        plan.render_line(line, &mut out);
        out.push_str(&line.eol);
        if let Some(extra) = plan.appended.get(&line.number) {
            if line.eol.is_empty() {
                out.push_str(eol);
            }
            for text in extra {
                out.push_str(text);
                out.push_str(eol);
            }
        }
    }
    if !plan.at_end.is_empty() {
        if !out.is_empty() && !out.ends_with(['\n', '\r']) {
            out.push_str(eol);
        }
        for text in &plan.at_end {
            out.push_str(text);
            out.push_str(eol);
        }
    }
    out
}

type Position = (u32, u32);

#[derive(Default)]
struct Plan<'m> {
    cells: HashMap<Position, &'m Token>,
    /// Unpositioned tokens that precede the first positioned token of their
    /// element.
    before: HashMap<Position, Vec<&'m Token>>,
    after: HashMap<Position, Vec<&'m Token>>,
    /// New lines, keyed by the source line they follow.
    appended: BTreeMap<u32, Vec<String>>,
    /// Tables whose section header is missing from the source.
    at_end: Vec<String>,
}

impl<'m> Plan<'m> {
    fn build(model: &'m FileModel) -> Self {
        let mut plan = Plan::default();
        for token in model.all_tokens() {
            if token.is_placed() {
                plan.cells.insert((token.line, token.column), token);
            }
        }

        plan.anchor(&model.preamble.iter().collect::<Vec<_>>());

        // Settings and variables share the same shape.
        let setting_rows: Vec<Vec<&Token>> =
            model.settings.settings.iter().map(|s| s.tokens()).collect();
        let setting_comments: Vec<Vec<&Token>> =
            model.settings.comments.iter().map(|c| c.tokens()).collect();
        let setting_headers: Vec<Vec<&Token>> =
            model.settings.headers.iter().map(|h| h.tokens()).collect();
        plan.place_table(
            SectionKind::Settings,
            &setting_headers,
            &setting_rows,
            &setting_comments,
        );

        let variable_rows: Vec<Vec<&Token>> =
            model.variables.variables.iter().map(|v| v.tokens()).collect();
        let variable_comments: Vec<Vec<&Token>> =
            model.variables.comments.iter().map(|c| c.tokens()).collect();
        let variable_headers: Vec<Vec<&Token>> =
            model.variables.headers.iter().map(|h| h.tokens()).collect();
        plan.place_table(
            SectionKind::Variables,
            &variable_headers,
            &variable_rows,
            &variable_comments,
        );

        for table in model.code_tables() {
            plan.place_code_table(table);
        }
        plan
    }

    /// Register unpositioned tokens of one element against its positioned
    /// ones. Returns false when the element has no positioned token.
    fn anchor(&mut self, tokens: &[&'m Token]) -> bool {
        let mut last: Option<Position> = None;
        let mut leading = Vec::new();
        for &token in tokens {
            if token.is_placed() {
                let key = (token.line, token.column);
                if last.is_none() && !leading.is_empty() {
                    self.before.entry(key).or_default().append(&mut leading);
                }
                last = Some(key);
            } else if let Some(key) = last {
                self.after.entry(key).or_default().push(token);
            } else {
                leading.push(token);
            }
        }
        last.is_some()
    }

    fn place_table(
        &mut self,
        kind: SectionKind,
        headers: &[Vec<&'m Token>],
        rows: &[Vec<&'m Token>],
        comments: &[Vec<&'m Token>],
    ) {
        let mut new_lines = Vec::new();
        for tokens in headers.iter().chain(comments) {
            self.anchor(tokens);
        }
        for tokens in rows {
            if !self.anchor(tokens) && !tokens.is_empty() {
                new_lines.push(new_line(tokens, false));
            }
        }
        if new_lines.is_empty() {
            return;
        }
        let last = headers
            .iter()
            .chain(rows)
            .chain(comments)
            .filter_map(|tokens| line_span(tokens))
            .map(|(_, last)| last)
            .max();
        self.append(kind, last, headers.is_empty(), new_lines);
    }

    fn place_code_table(&mut self, table: &'m CodeTable) {
        let mut new_lines = Vec::new();
        for header in &table.headers {
            self.anchor(&header.tokens());
        }
        for comment in &table.comments {
            self.anchor(&comment.tokens());
        }
        for unit in &table.units {
            let own = unit.own_tokens();
            let placed = self.anchor(&own);
            if placed || (unit.is_anonymous() && unit.line > 0) {
                self.place_unit_items(unit);
            } else {
                new_lines.push(new_line(&own, false));
                new_lines.extend(unit.items.iter().map(item_line));
            }
        }
        if new_lines.is_empty() {
            return;
        }
        let last = table
            .headers
            .iter()
            .map(|h| h.line())
            .chain(table.units.iter().filter_map(content_end))
            .chain(table.comments.iter().map(|c| c.line()))
            .max();
        self.append(table.kind, last, table.headers.is_empty(), new_lines);
    }

    fn place_unit_items(&mut self, unit: &'m CodeUnit) {
        let mut new_lines = Vec::new();
        for item in &unit.items {
            let tokens = item.tokens();
            if !self.anchor(&tokens) && !matches!(item, UnitItem::Empty(_)) {
                new_lines.push(item_line(item));
            }
        }
        if new_lines.is_empty() {
            return;
        }
        let after = content_end(unit).unwrap_or(unit.line);
        self.appended.entry(after).or_default().extend(new_lines);
    }

    fn append(
        &mut self,
        kind: SectionKind,
        last: Option<u32>,
        missing_header: bool,
        lines: Vec<String>,
    ) {
        match last {
            Some(line) if !missing_header => {
                self.appended.entry(line).or_default().extend(lines);
            }
            _ => {
                self.at_end.push(kind.canonical_header().to_owned());
                self.at_end.extend(lines);
            }
        }
    }

    fn render_line(&self, line: &LineLayout, out: &mut String) {
        let inserted_separator = match line.style {
            SeparatorStyle::Pipe => PIPE_SEPARATOR,
            SeparatorStyle::Whitespace => CELL_SEPARATOR,
        };
        let mut pending: Option<&str> = None;
        let mut skip_separator = false;
        for piece in &line.pieces {
            match piece {
                Piece::Separator(text) => {
                    if skip_separator {
                        skip_separator = false;
                        continue;
                    }
                    if let Some(previous) = pending.replace(text.as_str()) {
                        out.push_str(previous);
                    }
                }
                Piece::Cell { column } => {
                    let key = (line.number, *column);
                    let Some(token) = self.cells.get(&key) else {
                        // Removed cell: its separator goes with it.
                        if pending.take().is_none() {
                            skip_separator = true;
                        }
                        continue;
                    };
                    if let Some(separator) = pending.take() {
                        out.push_str(separator);
                    }
                    for extra in self.before.get(&key).into_iter().flatten() {
                        out.push_str(&extra.text);
                        out.push_str(inserted_separator);
                    }
                    out.push_str(&token.text);
                    for extra in self.after.get(&key).into_iter().flatten() {
                        out.push_str(inserted_separator);
                        out.push_str(&extra.text);
                    }
                }
            }
        }
        if let Some(separator) = pending {
            out.push_str(separator);
        }
    }
}

/// Last line holding content of the unit, ignoring trailing blank rows.
fn content_end(unit: &CodeUnit) -> Option<u32> {
    let mut tokens = unit.own_tokens();
    for item in &unit.items {
        if !matches!(item, UnitItem::Empty(_)) {
            tokens.extend(item.tokens());
        }
    }
    line_span(&tokens).map(|(_, last)| last)
}

fn item_line(item: &UnitItem) -> String {
    new_line(&item.tokens(), true)
}

fn new_line(tokens: &[&Token], indent: bool) -> String {
    let cells: Vec<&str> = tokens
        .iter()
        .filter(|t| !t.has_tag(TokenTag::EmptyCell) && !t.has_tag(TokenTag::Continuation))
        .map(|t| t.text.as_str())
        .collect();
    let mut line = String::new();
    if indent {
        line.push_str(CELL_SEPARATOR);
    }
    line.push_str(&cells.join(CELL_SEPARATOR));
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExecutableRow, ParentRef, Setting, SettingKind, VariableDeclaration};
    use crate::parser::parse_source;
    use crate::version::LanguageVersion;

    fn parse(src: &str) -> FileModel {
        parse_source(src, "t.robot", LanguageVersion::LATEST)
    }

    #[test]
    fn unmodified_models_round_trip() {
        let sources = [
            "*** Keywords ***\nMy Kw\n    Log    hello\n",
            "\u{feff}*** Settings ***\r\nLibrary  \tCollections    # why\r\n\r\n",
            "| *** Test Cases *** |\n| T | Log | x |\n|  | No Operation |\n",
            "junk before\n*** Comments ***\nanything   goes\n*** Nope ***\nstill kept",
            "*** Variables ***\n${A}    1\n...    2\n   \n",
        ];
        for source in sources {
            assert_eq!(dump(&parse(source)), source);
        }
    }

    #[test]
    fn inserted_argument_follows_its_sibling() {
        let mut model = parse("*** Keywords ***\nK\n    Log    hello    # c\n");
        let row = model.keywords.units[0].row_mut(0).unwrap();
        row.insert_value_at("WARN", 2).unwrap();
        assert_eq!(
            dump(&model),
            "*** Keywords ***\nK\n    Log    hello    WARN    # c\n"
        );
    }

    #[test]
    fn removed_value_takes_its_separator() {
        let mut model = parse("*** Settings ***\nLibrary    A    x    y\n");
        model.settings.settings[0].remove_value_at(2).unwrap();
        assert_eq!(dump(&model), "*** Settings ***\nLibrary    A    y\n");
    }

    #[test]
    fn new_elements_become_new_lines() {
        let mut model = parse("*** Settings ***\nLibrary    A\n\n*** Keywords ***\nK\n    No Operation");
        model.settings.add(Setting::create(
            ParentRef::Table(SectionKind::Settings),
            SettingKind::Resource,
            &["common.resource"],
        ));
        model.keywords.units[0].add_item(UnitItem::Row(ExecutableRow::create("Log", &["x"])));
        assert_eq!(
            dump(&model),
            "*** Settings ***\nLibrary    A\nResource    common.resource\n\n*** Keywords ***\nK\n    No Operation\n    Log    x\n"
        );
    }

    #[test]
    fn missing_section_is_created_at_the_end() {
        let mut model = parse("*** Keywords ***\nK\n    No Operation\n");
        model.variables.add(VariableDeclaration::create("${X}", &["1"]));
        assert_eq!(
            dump(&model),
            "*** Keywords ***\nK\n    No Operation\n*** Variables ***\n${X}    1\n"
        );
    }

    #[test]
    fn new_unit_lands_after_the_table() {
        let mut model = parse("*** Test Cases ***\nT\n    Log    1\n\n*** Keywords ***\nK\n    No Operation\n");
        let mut unit = CodeUnit::create(SectionKind::TestCases, "U");
        unit.add_item(UnitItem::Row(ExecutableRow::create("Log", &["2"])));
        model.test_cases.add(unit);
        assert_eq!(
            dump(&model),
            "*** Test Cases ***\nT\n    Log    1\nU\n    Log    2\n\n*** Keywords ***\nK\n    No Operation\n"
        );
    }
}
