//! Tokens and tokenized lines: the input stream of the declaration mappers.
//!
//! A [`Token`] carries its raw text, its position and a small ordered tag
//! set. Tags are mutated in place while mapping; the text is kept verbatim
//! so that write-back reproduces the source.

use serde::Serialize;

/// Syntactic classification attached to a token. A token may carry several
/// tags; the first one is its primary role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenTag {
    /// Whitespace or pipe run between cells.
    Separator,
    /// Data cell not yet claimed by any mapper.
    Content,
    /// Blank cell used for indentation in pipe-delimited rows.
    EmptyCell,
    SectionHeader,
    /// Trailing cells on a section header line.
    HeaderColumn,
    SettingDeclaration,
    SettingValue,
    UnknownSetting,
    AliasMarker,
    Alias,
    VariableDeclaration,
    VariableValue,
    UnitName,
    EmbeddedArguments,
    LocalSettingDeclaration,
    Assignment,
    LoopVariable,
    Action,
    Argument,
    Comment,
    Continuation,
    VariableUsage,
    /// Cell no mapper claimed; kept on the nearest element.
    Trash,
    /// Repeated once-only declaration (and its cells).
    Duplicated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub text: String,
    /// 1-based line; 0 for tokens created by edits that have no source position.
    pub line: u32,
    /// 0-based column in characters.
    pub column: u32,
    /// Byte offset from the start of the file (after any BOM).
    pub offset: usize,
    tags: Vec<TokenTag>,
}

impl Token {
    pub fn content(text: impl Into<String>, line: u32, column: u32, offset: usize) -> Self {
        Token {
            text: text.into(),
            line,
            column,
            offset,
            tags: vec![TokenTag::Content],
        }
    }

    pub fn separator(text: impl Into<String>, line: u32, column: u32, offset: usize) -> Self {
        Token {
            text: text.into(),
            line,
            column,
            offset,
            tags: vec![TokenTag::Separator],
        }
    }

    /// A token with no source position, as created by model edits.
    pub fn synthetic(text: impl Into<String>, tag: TokenTag) -> Self {
        Token {
            text: text.into(),
            line: 0,
            column: 0,
            offset: 0,
            tags: vec![tag],
        }
    }

    pub fn is_placed(&self) -> bool {
        self.line > 0
    }

    pub fn is_separator(&self) -> bool {
        self.has_tag(TokenTag::Separator)
    }

    /// True for cells with no visible text.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn tags(&self) -> &[TokenTag] {
        &self.tags
    }

    pub fn primary_tag(&self) -> Option<TokenTag> {
        self.tags.first().copied()
    }

    pub fn has_tag(&self, tag: TokenTag) -> bool {
        self.tags.contains(&tag)
    }

    /// Append a tag unless already present.
    pub fn add_tag(&mut self, tag: TokenTag) {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    pub fn remove_tag(&mut self, tag: TokenTag) {
        self.tags.retain(|t| *t != tag);
    }

    /// Make `tag` the primary role, dropping the unclaimed marker.
    pub fn classify(&mut self, tag: TokenTag) {
        self.tags.retain(|t| *t != TokenTag::Content && *t != tag);
        self.tags.insert(0, tag);
    }

    pub fn end_column(&self) -> u32 {
        self.column + self.text.chars().count() as u32
    }
}

/// How the cells of a line are delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SeparatorStyle {
    #[default]
    Whitespace,
    Pipe,
}

/// One physical line as produced by the line splitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedLine {
    pub number: u32,
    pub style: SeparatorStyle,
    /// Separators and content cells in source order.
    pub tokens: Vec<Token>,
    /// `"\n"`, `"\r\n"`, `"\r"` or empty for the last line.
    pub eol: String,
}

impl TokenizedLine {
    pub fn content_tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|t| !t.is_separator())
    }

    /// A line whose cells hold no visible text.
    pub fn is_blank(&self) -> bool {
        self.content_tokens().all(Token::is_blank)
    }
}
