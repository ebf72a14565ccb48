pub mod expression;
pub mod query;

use std::fmt;
use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, Severity, SourceCode};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::ast::Command;
use crate::lexer::{Token, TokenData};
use crate::spans::{Location, M};

use self::query::parse_query;

/// A recoverable problem found while lexing or parsing.
///
/// These never abort a parse; they are collected in detection order
/// and returned next to the (possibly partial) AST.
#[derive(Error, Debug, Clone, Serialize)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
    pub location: Location,
    #[serde(serialize_with = "serialize_severity")]
    pub severity: Severity,
    #[serde(skip)]
    src: Arc<NamedSource>,
}

impl SyntaxError {
    pub fn new(src: Arc<NamedSource>, message: impl Into<String>, location: Location) -> Self {
        SyntaxError {
            message: message.into(),
            location,
            severity: Severity::Error,
            src,
        }
    }
}

impl PartialEq for SyntaxError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
            && self.location == other.location
            && self.severity == other.severity
    }
}

impl Diagnostic for SyntaxError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new("esql::syntax"))
    }

    fn severity(&self) -> Option<Severity> {
        Some(self.severity)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&*self.src)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(LabeledSpan::new(
            Some(String::from("here")),
            self.location.start,
            self.location.len(),
        ))))
    }
}

fn serialize_severity<S: Serializer>(severity: &Severity, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(match severity {
        Severity::Advice => "advice",
        Severity::Warning => "warning",
        Severity::Error => "error",
    })
}

/// Commands in pipeline order, plus every syntax error found on the way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseResult {
    pub ast: Vec<Command>,
    pub errors: Vec<SyntaxError>,
}

/// Why a parse function gave up on the current command.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParserError {
    #[error("{message}")]
    Syntax { message: String, location: Location },
    /// Ran into a token the lexer already reported.
    #[error("Invalid input")]
    Lexical { location: Location },
}

pub fn parse(src: Arc<NamedSource>, source: &str, tokens: Vec<TokenData>) -> ParseResult {
    let mut parse_input = ParseInput::new(src, source, tokens);
    let mut errors = Vec::new();
    let ast = parse_query(&mut parse_input, &mut errors);
    ParseResult { ast, errors }
}

#[derive(Debug, Clone)]
pub struct ParseInput<'a> {
    src: Arc<NamedSource>,
    source: &'a str,
    tokens: Vec<TokenData>,
    index: usize,
    depth: usize,
}

/// Deepest expression nesting accepted before giving up on a command.
pub const MAX_NESTING_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    index: usize,
}

impl<'a> ParseInput<'a> {
    pub fn new(src: Arc<NamedSource>, source: &'a str, tokens: Vec<TokenData>) -> Self {
        ParseInput {
            src,
            source,
            tokens,
            index: 0,
            depth: 0,
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Turns a failure into a reportable error. Lexical failures were
    /// already reported by the lexer and yield nothing.
    pub fn to_syntax_error(&self, error: ParserError) -> Option<SyntaxError> {
        match error {
            ParserError::Syntax { message, location } => {
                Some(SyntaxError::new(self.src.clone(), message, location))
            }
            ParserError::Lexical { .. } => None,
        }
    }

    pub fn error_at(&self, location: Location, message: impl Into<String>) -> ParserError {
        ParserError::Syntax {
            message: message.into(),
            location,
        }
    }

    /// Error for the token at the cursor, which is left unconsumed.
    pub fn unexpected(&self, description: &str) -> ParserError {
        match self.tokens.get(self.index) {
            None => self.error_at(
                self.end_location(),
                format!("Unexpected end of input, expected {}", description),
            ),
            Some(data) if data.token == Token::Error => ParserError::Lexical {
                location: data.location,
            },
            Some(data) => self.error_at(
                data.location,
                format!("Unexpected {}, expected {}", data.token, description),
            ),
        }
    }

    /// Enters one level of expression nesting. Every successful call must
    /// be paired with [`ParseInput::leave`].
    pub fn enter(&mut self) -> Result<(), ParserError> {
        if self.depth >= MAX_NESTING_DEPTH {
            let location = self
                .peek()
                .map_or_else(|| self.end_location(), |data| data.location);
            return Err(self.error_at(location, "Expression is nested too deeply"));
        }
        self.depth += 1;
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint { index: self.index }
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.index = checkpoint.index
    }

    pub fn done(&self) -> bool {
        self.index >= self.tokens.len()
    }

    pub fn end_location(&self) -> Location {
        Location::point(self.source.len())
    }

    pub fn peek(&self) -> Option<&TokenData> {
        self.tokens.get(self.index)
    }

    pub fn peek_token(&self) -> Option<&Token> {
        self.peek().map(|data| &data.token)
    }

    /// Looks `offset` tokens past the cursor.
    pub fn peek_nth(&self, offset: usize) -> Option<&TokenData> {
        self.tokens.get(self.index + offset)
    }

    pub fn peek_is(&self, token: &Token) -> bool {
        self.peek_token() == Some(token)
    }

    pub fn peek_word(&self, word: &str) -> bool {
        self.peek_token().map_or(false, |token| token.is_word(word))
    }

    pub fn next(&mut self) -> Result<&TokenData, ParserError> {
        if self.done() {
            return Err(self.unexpected("more input"));
        }
        self.index += 1;
        Ok(&self.tokens[self.index - 1])
    }

    /// Location of the last consumed token.
    pub fn previous_location(&self) -> Option<Location> {
        self.index
            .checked_sub(1)
            .and_then(|index| self.tokens.get(index))
            .map(|data| data.location)
    }

    pub fn assert_next(&mut self, token: Token, description: &str) -> Result<Location, ParserError> {
        match self.next_if(token) {
            Some(location) => Ok(location),
            None => Err(self.unexpected(description)),
        }
    }

    pub fn next_if(&mut self, token: Token) -> Option<Location> {
        if !self.peek_is(&token) {
            return None;
        }
        self.next().ok().map(|data| data.location)
    }

    pub fn next_if_word(&mut self, word: &str) -> Option<Location> {
        if !self.peek_word(word) {
            return None;
        }
        self.next().ok().map(|data| data.location)
    }

    pub fn assert_word(&mut self, word: &str) -> Result<Location, ParserError> {
        match self.next_if_word(word) {
            Some(location) => Ok(location),
            None => Err(self.unexpected(&format!("'{}'", word.to_uppercase()))),
        }
    }

    /// Skips ahead to the next pipe (not consumed) or the end of input.
    pub fn skip_to_pipe(&mut self) {
        while let Some(token) = self.peek_token() {
            if *token == Token::Pipe {
                break;
            }
            self.index += 1;
        }
    }
}

fn parse_term(input: &mut ParseInput) -> Result<M<String>, ParserError> {
    match input.peek_token() {
        Some(Token::Term(_)) => {}
        _ => return Err(input.unexpected("a name")),
    }
    let data = input.next()?;
    match &data.token {
        Token::Term(s) => Ok(M::new(s.clone(), data.location)),
        _ => unreachable!("peeked a term"),
    }
}
