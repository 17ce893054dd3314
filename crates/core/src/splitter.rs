//! Reference line splitter: turns source text into [`TokenizedLine`]s.
//!
//! Two cell conventions are recognised per line. Lines starting with `| `
//! (or consisting of a lone `|`) are pipe-delimited; every other line is
//! split on runs of two or more spaces or on any tab. Every character of
//! the input ends up in exactly one token, so joining a line's token texts
//! and its end-of-line marker reproduces the line.

use crate::token::{SeparatorStyle, Token, TokenizedLine};

const BOM: char = '\u{feff}';

/// Result of splitting a whole source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSource {
    /// Whether the text started with a byte-order mark (not part of any token).
    pub bom: bool,
    pub lines: Vec<TokenizedLine>,
}

pub fn split_source(text: &str) -> SplitSource {
    let (bom, body) = match text.strip_prefix(BOM) {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let bytes = body.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0usize;
    let mut number: u32 = 1;
    let mut i = 0usize;

    while i < bytes.len() {
        let (end, next, eol) = match bytes[i] {
            b'\n' => (i, i + 1, "\n"),
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => (i, i + 2, "\r\n"),
            b'\r' => (i, i + 1, "\r"),
            _ => {
                i += 1;
                continue;
            }
        };
        lines.push(split_line(&body[start..end], number, start, eol));
        start = next;
        i = next;
        number += 1;
    }
    if start < body.len() {
        lines.push(split_line(&body[start..], number, start, ""));
    }

    SplitSource { bom, lines }
}

/// Split one physical line (without its end-of-line marker).
pub fn split_line(line: &str, number: u32, offset: usize, eol: &str) -> TokenizedLine {
    let chars: Vec<(usize, char)> = line.char_indices().collect();
    let style = if line == "|" || line.starts_with("| ") || line.starts_with("|\t") {
        SeparatorStyle::Pipe
    } else {
        SeparatorStyle::Whitespace
    };
    let cells = Cells {
        line,
        chars: &chars,
        number,
        offset,
    };
    let tokens = match style {
        SeparatorStyle::Pipe => cells.split_pipes(),
        SeparatorStyle::Whitespace => cells.split_whitespace(),
    };
    TokenizedLine {
        number,
        style,
        tokens,
        eol: eol.to_owned(),
    }
}

fn is_space(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\u{a0}'
}

struct Cells<'a> {
    line: &'a str,
    chars: &'a [(usize, char)],
    number: u32,
    offset: usize,
}

impl Cells<'_> {
    fn byte(&self, idx: usize) -> usize {
        self.chars.get(idx).map_or(self.line.len(), |(b, _)| *b)
    }

    fn text(&self, from: usize, to: usize) -> &str {
        &self.line[self.byte(from)..self.byte(to)]
    }

    fn content(&self, from: usize, to: usize) -> Token {
        Token::content(
            self.text(from, to),
            self.number,
            from as u32,
            self.offset + self.byte(from),
        )
    }

    fn separator(&self, from: usize, to: usize) -> Token {
        Token::separator(
            self.text(from, to),
            self.number,
            from as u32,
            self.offset + self.byte(from),
        )
    }

    fn split_whitespace(&self) -> Vec<Token> {
        let n = self.chars.len();
        let mut tokens = Vec::new();
        let mut cell_start: Option<usize> = None;
        let mut pos = 0usize;

        while pos < n {
            let c = self.chars[pos].1;
            if !is_space(c) {
                cell_start.get_or_insert(pos);
                pos += 1;
                continue;
            }

            let mut run_end = pos;
            while run_end < n && is_space(self.chars[run_end].1) {
                run_end += 1;
            }
            let has_tab = self.chars[pos..run_end].iter().any(|(_, c)| *c == '\t');
            let is_separator = pos == 0 || run_end == n || run_end - pos >= 2 || has_tab;
            if is_separator {
                if let Some(start) = cell_start.take() {
                    tokens.push(self.content(start, pos));
                }
                tokens.push(self.separator(pos, run_end));
            }
            // A single inner space stays part of the current cell.
            pos = run_end;
        }
        if let Some(start) = cell_start {
            tokens.push(self.content(start, n));
        }
        tokens
    }

    /// End of the pipe separator starting at `i`, if any. The pipe must be
    /// preceded by whitespace (or the line start) and followed by whitespace
    /// (or the line end). Trailing whitespace alone also counts.
    fn pipe_separator_at(&self, i: usize) -> Option<usize> {
        let n = self.chars.len();
        let mut j = i;
        while j < n && is_space(self.chars[j].1) {
            j += 1;
        }
        if j == n {
            return (j > i).then_some(n);
        }
        let is_pipe = self.chars[j].1 == '|'
            && (j == 0 || is_space(self.chars[j - 1].1))
            && (j + 1 == n || is_space(self.chars[j + 1].1));
        if !is_pipe {
            return None;
        }
        let mut k = j + 1;
        while k < n && is_space(self.chars[k].1) {
            k += 1;
        }
        Some(k)
    }

    fn split_pipes(&self) -> Vec<Token> {
        let n = self.chars.len();
        let mut tokens = Vec::new();
        let mut last_was_separator = false;
        let mut pos = 0usize;

        while pos < n {
            if let Some(end) = self.pipe_separator_at(pos) {
                if last_was_separator {
                    tokens.push(self.content(pos, pos));
                }
                tokens.push(self.separator(pos, end));
                last_was_separator = true;
                pos = end;
                continue;
            }
            let start = pos;
            pos += 1;
            while pos < n && self.pipe_separator_at(pos).is_none() {
                pos += 1;
            }
            tokens.push(self.content(start, pos));
            last_was_separator = false;
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(line: &TokenizedLine) -> Vec<&str> {
        line.tokens.iter().map(|t| t.text.as_str()).collect()
    }

    fn rejoin(split: &SplitSource) -> String {
        let mut out = String::new();
        if split.bom {
            out.push(BOM);
        }
        for line in &split.lines {
            for t in &line.tokens {
                out.push_str(&t.text);
            }
            out.push_str(&line.eol);
        }
        out
    }

    #[test]
    fn whitespace_cells_split_on_two_spaces_or_tab() {
        let s = split_source("    Log    hello world\tx");
        let line = &s.lines[0];
        assert_eq!(line.style, SeparatorStyle::Whitespace);
        assert_eq!(texts(line), vec!["    ", "Log", "    ", "hello world", "\t", "x"]);
        let log = &line.tokens[1];
        assert_eq!((log.line, log.column, log.offset), (1, 4, 4));
        assert!(line.tokens[0].is_separator());
        assert!(!log.is_separator());
    }

    #[test]
    fn pipe_lines_keep_empty_cells() {
        let s = split_source("|  | Log | hi |");
        let line = &s.lines[0];
        assert_eq!(line.style, SeparatorStyle::Pipe);
        assert_eq!(texts(line), vec!["|  ", "", "| ", "Log", " | ", "hi", " |"]);
        assert_eq!(line.tokens[1].column, 3);
    }

    #[test]
    fn pipe_inside_cell_is_content() {
        let s = split_source("| a|b | c");
        assert_eq!(texts(&s.lines[0]), vec!["| ", "a|b", " | ", "c"]);
    }

    #[test]
    fn records_line_endings_and_bom() {
        let src = "\u{feff}*** Keywords ***\r\nA\rB\n\nC";
        let s = split_source(src);
        assert!(s.bom);
        let eols: Vec<&str> = s.lines.iter().map(|l| l.eol.as_str()).collect();
        assert_eq!(eols, vec!["\r\n", "\r", "\n", "\n", ""]);
        assert!(s.lines[3].tokens.is_empty());
        assert_eq!(s.lines[4].number, 5);
        assert_eq!(rejoin(&s), src);
    }

    #[test]
    fn trailing_whitespace_is_a_separator() {
        let s = split_source("Name x \n");
        assert_eq!(texts(&s.lines[0]), vec!["Name x", " "]);
    }

    #[test]
    fn every_character_lands_in_a_token() {
        let src = "*** Settings ***\nLibrary    Collections  # c\n| A | B |\n  \t \n";
        assert_eq!(rejoin(&split_source(src)), src);
    }
}
