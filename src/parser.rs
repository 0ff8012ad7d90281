//! Recursive-descent parser producing a [`PropertyMap`].
//!
//! ```text
//! file        := statement*
//! statement   := assignment | include | block | COMMENT
//! assignment  := NAME '=' VALUE
//! include     := 'include' '"' PATH '"'
//! block       := NAME '{' file '}'
//! ```
//!
//! Block names prefix every assignment inside them, so `c = 1` inside
//! `b {` nested in `a {` defines `a.b.c`. A value runs to the end of its
//! line, so a closing `}` needs a line of its own.
//!
//! Includes are only allowed at the top level of a file and are parsed by a
//! recursive call that receives the chain of files leading to it, so include
//! loops and runaway nesting are caught before recursing.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::env::EnvSource;
use crate::error::{ConfigError, Location};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::map::PropertyMap;
use crate::merge::{insert_property, merge_properties};
use crate::property::{Property, is_legal_name};
use crate::types::DuplicateMode;
use crate::value::ValueProcessor;

/// Longest chain of including files allowed above any one file.
pub const MAX_INCLUDE_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Fallback for `${name}` references that match no property.
    #[serde(skip)]
    pub env: EnvSource,
    /// Policy for a name defined twice in the same file.
    pub duplicate_property_action: DuplicateMode,
    /// Policy for a name that already came from a different file.
    pub included_property_action: DuplicateMode,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            env: EnvSource::Process,
            duplicate_property_action: DuplicateMode::Error,
            included_property_action: DuplicateMode::Ignore,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Parser {
    options: ParserOptions,
}

impl Parser {
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<PropertyMap, ConfigError> {
        self.parse_included_file(path.as_ref(), &[])
    }

    /// Parse `text` as if it were read from `source`. Relative includes
    /// resolve against the directory part of `source`.
    pub fn parse_text(&self, source: &str, text: &str) -> Result<PropertyMap, ConfigError> {
        self.parse_text_at(source, text, 1, 1)
    }

    /// Like [`parse_text`](Self::parse_text), for text embedded in a larger
    /// document starting at `line`/`column`.
    pub fn parse_text_at(
        &self,
        source: &str,
        text: &str,
        line: usize,
        column: usize,
    ) -> Result<PropertyMap, ConfigError> {
        FileParser {
            parser: self,
            source,
            lexer: Lexer::with_position(text, line, column),
            ancestors: &[],
            prefixes: Vec::new(),
            properties: PropertyMap::new(),
        }
        .run()
    }

    fn parse_included_file(
        &self,
        path: &Path,
        ancestors: &[String],
    ) -> Result<PropertyMap, ConfigError> {
        let path = normalize(path);
        let text = fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;
        let source = path.display().to_string();
        debug!(file = %source, depth = ancestors.len(), "parsing config file");
        FileParser {
            parser: self,
            source: &source,
            lexer: Lexer::with_position(&text, 1, 1),
            ancestors,
            prefixes: Vec::new(),
            properties: PropertyMap::new(),
        }
        .run()
    }
}

/// State for parsing one file. Included files get their own.
struct FileParser<'a> {
    parser: &'a Parser,
    source: &'a str,
    lexer: Lexer<'a>,
    /// Files that (transitively) included this one, outermost first.
    ancestors: &'a [String],
    /// Full name prefix of each open block, innermost last.
    prefixes: Vec<String>,
    properties: PropertyMap,
}

impl FileParser<'_> {
    fn run(mut self) -> Result<PropertyMap, ConfigError> {
        loop {
            let token = self.lexer.next_token();
            match token.kind {
                TokenKind::EndOfFile => {
                    if !self.prefixes.is_empty() {
                        return Err(self.error_at(&token, "'}' expected"));
                    }
                    return Ok(self.properties);
                }
                TokenKind::Comment => {}
                TokenKind::Punctuation if token.is_punctuation('}') => {
                    if self.prefixes.pop().is_none() {
                        return Err(self.error_at(&token, "'}' unexpected"));
                    }
                }
                TokenKind::Name if token.text == "include" => self.include(&token)?,
                TokenKind::Name if is_legal_name(&token.text) => {
                    self.assignment_or_block(&token)?;
                }
                TokenKind::Name => {
                    let message = format!("\"{}\" is not a legal property name", token.text);
                    return Err(self.error_at(&token, message));
                }
                _ => return Err(self.error_at(&token, "property name expected")),
            }
        }
    }

    fn assignment_or_block(&mut self, name: &Token) -> Result<(), ConfigError> {
        let column = self.lexer.column();
        let next = self.lexer.next_token();
        if next.line == name.line {
            if next.is_punctuation('{') {
                let prefix = format!("{}{}.", self.prefix(), name.text);
                self.prefixes.push(prefix);
                return Ok(());
            }
            if next.is_punctuation('=') {
                return self.assignment(name);
            }
        }
        Err(self.error(name.line, column, "'=' expected"))
    }

    fn assignment(&mut self, name: &Token) -> Result<(), ConfigError> {
        self.lexer.parse_next_as_value();
        let raw = self.lexer.next_token();

        let value = ValueProcessor::new(&self.properties, &self.parser.options.env)
            .process(&raw.text)
            .map_err(|e| ConfigError::ValueFormat {
                location: Location::new(self.source, name.line, name.column),
                source: e,
            })?;

        let full_name = format!("{}{}", self.prefix(), name.text);
        let options = &self.parser.options;
        let mode = match self.properties.find(&full_name) {
            Some(existing) if existing.source != self.source => options.included_property_action,
            _ => options.duplicate_property_action,
        };
        let property = Property::new(full_name, value, self.source, name.line);
        insert_property(&mut self.properties, property, mode, name.column)
    }

    fn include(&mut self, keyword: &Token) -> Result<(), ConfigError> {
        let line = keyword.line;
        let column = self.lexer.column();
        let open = self.lexer.next_token();
        if open.line != line || !open.is_punctuation('"') {
            return Err(self.error(line, column, "'\"' expected"));
        }

        self.lexer.parse_next_as_quoted_string();
        let file_name = self.lexer.next_token();
        if file_name.kind != TokenKind::Value || file_name.text.is_empty() {
            return Err(self.error(line, file_name.column, "File name missing"));
        }

        let column = self.lexer.column();
        let close = self.lexer.next_token();
        if close.line != line || !close.is_punctuation('"') {
            return Err(self.error(line, column, "'\"' expected"));
        }

        let location = Location::new(self.source, line, keyword.column);
        if !self.prefixes.is_empty() {
            return Err(ConfigError::IncludeInBlock { location });
        }

        let target = self.resolve_include(&file_name.text);
        let target_name = target.display().to_string();
        let mut chain = self.ancestors.to_vec();
        chain.push(normalize(Path::new(self.source)).display().to_string());

        if chain.contains(&target_name) {
            return Err(ConfigError::IncludeCycle {
                location,
                target: target_name,
                chain,
            });
        }
        if self.ancestors.len() > MAX_INCLUDE_DEPTH {
            return Err(ConfigError::IncludeDepthExceeded {
                location,
                target: target_name,
                chain,
            });
        }

        debug!(from = %self.source, file = %target_name, "including config file");
        let included = self.parser.parse_included_file(&target, &chain)?;
        merge_properties(
            &mut self.properties,
            included,
            self.parser.options.included_property_action,
        )
    }

    /// Relative include paths are relative to the including file's directory.
    fn resolve_include(&self, file_name: &str) -> PathBuf {
        let path = Path::new(file_name);
        let joined = match Path::new(self.source).parent() {
            Some(dir) if !path.is_absolute() => dir.join(path),
            _ => path.to_path_buf(),
        };
        normalize(&joined)
    }

    fn prefix(&self) -> &str {
        self.prefixes.last().map_or("", String::as_str)
    }

    fn error(&self, line: usize, column: usize, message: impl Into<String>) -> ConfigError {
        ConfigError::syntax(Location::new(self.source, line, column), message)
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> ConfigError {
        self.error(token.line, token.column, message)
    }
}

/// Drop `.` segments and fold `..` into the preceding directory without
/// touching the filesystem, so one file always has one spelling in an
/// include chain.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(Component::ParentDir),
            },
            other => out.push(other),
        }
    }
    out
}
