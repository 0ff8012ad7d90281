//! Line-oriented tokenizer for config files.
//!
//! The lexer hands out one [`Token`] per call to [`Lexer::next_token`]. It
//! knows token boundaries and nothing about the grammar, with one exception:
//! the text after `=` and the text after an opening `"` follow different
//! rules than the rest of a line, and only the driver knows when it has just
//! consumed one of those. So the lexer exposes two mode switches:
//!
//! - [`parse_next_as_value`](Lexer::parse_next_as_value): call right after
//!   consuming an `=` token. The next token is the rest of the line (plus any
//!   continuation lines) as a [`TokenKind::Value`].
//! - [`parse_next_as_quoted_string`](Lexer::parse_next_as_quoted_string):
//!   call right after consuming an opening `"` token. The next token is
//!   everything up to the closing `"` or the end of the line.
//!
//! Each switch affects only the very next call to `next_token`; afterwards
//! the lexer is back in text mode.
//!
//! # Text mode
//!
//! - A **name** starts with a letter, digit or `_` and continues with those
//!   characters or `.`; a `.` is only taken when the previous character was
//!   alphanumeric, so `a..b` lexes as `a.`, `.`, `b`.
//! - A **comment** is `#` at the start of a logical line (after indentation),
//!   running to the end of the line. Leading and trailing whitespace is
//!   stripped; no escapes are processed.
//! - Anything else is a single-character **punctuation** token.
//!
//! # Value mode
//!
//! The value runs to the end of the line. If the line ends in an unescaped
//! `\`, the backslash is dropped and the next line is appended after an
//! embedded newline, repeating until a line does not end that way. Trailing
//! whitespace is stripped from the accumulated value only.
//!
//! End of input yields [`TokenKind::EndOfFile`] forever after.

use std::fmt;
use std::str::Lines;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Name,
    Value,
    Comment,
    Punctuation,
    EndOfFile,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Name => "NAME",
            TokenKind::Value => "VALUE",
            TokenKind::Comment => "COMMENT",
            TokenKind::Punctuation => "PUNCTUATION",
            TokenKind::EndOfFile => "END_OF_FILE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            column,
        }
    }

    /// True if this is the single punctuation character `ch`.
    pub fn is_punctuation(&self, ch: char) -> bool {
        self.kind == TokenKind::Punctuation && self.text.len() == ch.len_utf8() && self.text.starts_with(ch)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{:?}] at {}:{}", self.kind, self.text, self.line, self.column)
    }
}

/// True if `ch` continues a property name when preceded by `prev`.
pub fn is_name_char(ch: char, prev: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || (ch == '.' && prev.is_ascii_alphanumeric())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// At the start of a logical line; `#` begins a comment.
    AtStart,
    AtText,
    AtValue,
    AtQuotedString,
    AtEof,
}

pub struct Lexer<'a> {
    lines: Lines<'a>,
    text: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    state: State,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::with_position(input, 1, 1)
    }

    /// Start numbering at `initial_line`/`initial_column` instead of 1:1.
    /// The column offset applies to the first line only.
    pub fn with_position(input: &'a str, initial_line: usize, initial_column: usize) -> Self {
        let mut lines = input.lines();
        let (text, state) = match lines.next() {
            Some(first) => (first.chars().collect(), State::AtStart),
            None => (Vec::new(), State::AtEof),
        };
        Self {
            lines,
            text,
            pos: 0,
            line: initial_line,
            column: initial_column,
            state,
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }

    /// Lex the next token as a value. Must be called immediately after the
    /// `=` that introduces it.
    pub fn parse_next_as_value(&mut self) {
        self.state = State::AtValue;
    }

    /// Lex the next token as the body of a quoted string. Must be called
    /// immediately after the opening `"`.
    pub fn parse_next_as_quoted_string(&mut self) {
        self.state = State::AtQuotedString;
    }

    /// Read the next token. Never fails; malformed input surfaces as
    /// unexpected punctuation for the parser to report.
    pub fn next_token(&mut self) -> Token {
        match self.state {
            State::AtStart | State::AtText => self.parse_text(),
            State::AtValue => self.parse_value(),
            State::AtQuotedString => self.parse_quoted_string(),
            State::AtEof => self.end_of_file(),
        }
    }

    fn parse_text(&mut self) -> Token {
        if !self.skip_whitespace() {
            return self.end_of_file();
        }

        let ch = self.text[self.pos];
        if is_name_char(ch, '.') {
            let start = self.pos;
            let column = self.column;
            let mut prev = ch;
            self.advance();
            while let Some(&c) = self.text.get(self.pos) {
                if !is_name_char(c, prev) {
                    break;
                }
                prev = c;
                self.advance();
            }
            self.state = State::AtText;
            Token::new(TokenKind::Name, self.slice(start, self.pos), self.line, column)
        } else if ch == '#' && self.state == State::AtStart {
            self.advance();
            self.skip_whitespace_in_line();
            let column = self.column;
            let body = self.slice(self.pos, self.text.len());
            self.move_to_end_of_line();
            self.state = State::AtText;
            Token::new(TokenKind::Comment, body.trim_end(), self.line, column)
        } else {
            self.state = State::AtText;
            self.advance();
            Token::new(TokenKind::Punctuation, ch, self.line, self.column - 1)
        }
    }

    fn parse_value(&mut self) -> Token {
        self.skip_whitespace_in_line();
        let start = self.pos;
        let line = self.line;
        let column = self.column;
        self.move_to_end_of_line();
        self.state = State::AtText;

        if !ends_with_unescaped_backslash(&self.text[start..]) {
            let value = self.slice(start, self.text.len());
            return Token::new(TokenKind::Value, value.trim_end(), line, column);
        }

        let mut value = self.slice(start, self.text.len() - 1);
        while self.read_next_line() {
            value.push('\n');
            if ends_with_unescaped_backslash(&self.text) {
                value.extend(&self.text[..self.text.len() - 1]);
            } else {
                value.extend(self.text.iter());
                self.move_to_end_of_line();
                self.state = State::AtText;
                break;
            }
        }
        Token::new(TokenKind::Value, value.trim_end(), line, column)
    }

    fn parse_quoted_string(&mut self) -> Token {
        let start = self.pos;
        let column = self.column;
        while self.pos < self.text.len() && self.text[self.pos] != '"' {
            self.advance();
        }
        self.state = State::AtText;
        Token::new(TokenKind::Value, self.slice(start, self.pos), self.line, column)
    }

    fn end_of_file(&self) -> Token {
        Token::new(TokenKind::EndOfFile, "", self.line, self.column)
    }

    /// Skip whitespace across lines. Returns false at end of input.
    fn skip_whitespace(&mut self) -> bool {
        while !self.skip_whitespace_in_line() {
            if !self.read_next_line() {
                return false;
            }
        }
        true
    }

    /// Skip whitespace up to the end of the current line. Returns false if
    /// the end of the line was reached.
    fn skip_whitespace_in_line(&mut self) -> bool {
        while let Some(c) = self.text.get(self.pos) {
            if !c.is_whitespace() {
                return true;
            }
            self.advance();
        }
        false
    }

    fn read_next_line(&mut self) -> bool {
        match self.lines.next() {
            Some(next) => {
                self.text = next.chars().collect();
                self.state = State::AtStart;
                self.pos = 0;
                self.line += 1;
                self.column = 1;
                true
            }
            None => {
                self.state = State::AtEof;
                false
            }
        }
    }

    fn advance(&mut self) {
        self.pos += 1;
        self.column += 1;
    }

    fn move_to_end_of_line(&mut self) {
        self.pos = self.text.len();
        self.column = self.text.len() + 1;
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.text[start..end].iter().collect()
    }
}

/// An odd run of trailing backslashes means the last one is a continuation.
fn ends_with_unescaped_backslash(text: &[char]) -> bool {
    text.iter().rev().take_while(|&&c| c == '\\').count() % 2 == 1
}
