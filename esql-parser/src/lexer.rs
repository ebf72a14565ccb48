use std::fmt;
use std::sync::Arc;

use logos::Logos;

use miette::{Diagnostic, NamedSource};
use thiserror::Error;

use crate::spans::{LineIndex, Location, Span};

/// Words with a fixed meaning somewhere in the grammar. Matched
/// case-insensitively; they still lex as [`Token::Term`].
const KEYWORDS: &[&str] = &[
    "and", "as", "asc", "by", "desc", "dissect", "drop", "enrich", "eval", "false", "first",
    "from", "grok", "in", "info", "inlinestats", "is", "keep", "last", "like", "limit",
    "metadata", "mv_expand", "not", "null", "nulls", "on", "or", "rename", "rlike", "row",
    "show", "sort", "stats", "true", "where", "with",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|keyword| keyword.eq_ignore_ascii_case(word))
}

#[derive(Debug, PartialEq, Clone)]
pub struct TokenData {
    pub token: Token,
    pub location: Location,
    /// 1-based line of the first character
    pub line: usize,
    /// 1-based column of the first character, counted in characters
    pub column: usize,
}

impl TokenData {
    pub fn kind(&self) -> TokenKind {
        self.token.kind()
    }

    /// The source text this token was produced from.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.location.start..self.location.end).unwrap_or("")
    }
}

/// Coarse token classification used by editor tooling.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenKind {
    Keyword,
    Identifier,
    Operator,
    Literal,
    Punctuation,
    Pipe,
    Param,
    Error,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexerErrorKind {
    #[error("Unterminated string literal")]
    UnterminatedString,
    #[error("Unterminated quoted identifier")]
    UnterminatedIdentifier,
    #[error("Number literal is out of range")]
    InvalidNumber,
    #[error("Unexpected character '{0}'")]
    UnexpectedCharacter(char),
}

#[derive(Error, Debug, Diagnostic, Clone)]
#[error("{kind}")]
#[diagnostic()]
pub struct LexerError {
    pub kind: LexerErrorKind,
    #[source_code]
    src: Arc<NamedSource>,
    #[label("This text was not recognized")]
    span: Span,
    pub location: Location,
}

/// Splits `contents` into tokens.
///
/// Lexing never stops early: unrecognized text becomes a [`Token::Error`] in
/// the stream and a matching [`LexerError`], so the parser can keep going.
pub fn tokenize(src: Arc<NamedSource>, contents: &str) -> (Vec<TokenData>, Vec<LexerError>) {
    let lines = LineIndex::new(contents);

    let tokens: Vec<TokenData> = Token::lexer(contents)
        .spanned()
        .map(|(token, range)| {
            let location = Location::from(range);
            let (line, column) = lines.line_col(contents, location.start);
            TokenData {
                token,
                location,
                line,
                column,
            }
        })
        .collect();

    let errors: Vec<LexerError> = tokens
        .iter()
        .filter(|token_data| token_data.token == Token::Error)
        .map(|token_data| LexerError {
            kind: classify_error(token_data.text(contents)),
            src: src.clone(),
            span: token_data.location.into(),
            location: token_data.location,
        })
        .collect();

    (tokens, errors)
}

fn classify_error(text: &str) -> LexerErrorKind {
    match text.chars().next() {
        Some('"') => LexerErrorKind::UnterminatedString,
        Some('`') => LexerErrorKind::UnterminatedIdentifier,
        Some(c) if c.is_ascii_digit() => LexerErrorKind::InvalidNumber,
        Some('.') if text.len() > 1 => LexerErrorKind::InvalidNumber,
        Some(c) => LexerErrorKind::UnexpectedCharacter(c),
        None => LexerErrorKind::UnexpectedCharacter(' '),
    }
}

/// Decimals that overflow to infinity are invalid numbers.
fn lex_decimal(lex: &mut logos::Lexer<Token>) -> Option<f64> {
    lex.slice().parse::<f64>().ok().filter(|value| value.is_finite())
}

/// The Token type for the language.
#[derive(Logos, Debug, PartialEq, Clone)]
pub enum Token {
    #[error]
    #[regex(r"[ \t\n\r\f]+", logos::skip)]
    #[regex(r"//[^\n]*", logos::skip)]
    #[regex(r"/\*([^*]|\*+[^*/])*\*+/", logos::skip)]
    Error,

    /// Unquoted identifier or keyword (e.g. from, @timestamp, COUNT)
    #[regex(r"[a-zA-Z_@][a-zA-Z0-9_]*", |lex| String::from(lex.slice()))]
    Term(String),

    /// Backtick-quoted identifier, with "``" unescaped to "`"
    #[token("`", lex_quoted_identifier)]
    QuotedTerm(String),

    /// Integer literal
    #[regex("[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    IntegerLiteral(i64),

    /// Decimal literal
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", lex_decimal)]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", lex_decimal)]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", lex_decimal)]
    DecimalLiteral(f64),

    /// `string` literal
    #[token("\"", lex_string_literal)]
    #[token("\"\"\"", lex_triple_quoted_literal)]
    StringLiteral(String),

    /// Anonymous parameter "?"
    #[token("?")]
    Param,

    /// Named parameter (e.g. ?start)
    #[regex(r"\?[a-zA-Z_][a-zA-Z0-9_]*", |lex| String::from(&lex.slice()[1..]))]
    NamedParam(String),

    /// Positional parameter (e.g. ?1)
    #[regex(r"\?[0-9]+", |lex| lex.slice()[1..].parse::<u32>().ok())]
    PositionalParam(u32),

    // Symbols -----------------------------------------

    /// Pipe Symbol "|"
    #[token("|")]
    Pipe,

    /// Left Parenthesis Symbol "("
    #[token("(")]
    LParen,

    /// Right Parenthesis Symbol ")"
    #[token(")")]
    RParen,

    /// Left Bracket Symbol "["
    #[token("[")]
    LBracket,

    /// Right Bracket Symbol "]"
    #[token("]")]
    RBracket,

    /// The Comma Delimiter ","
    #[token(",")]
    Comma,

    /// The Period or Dot Operator "."
    #[token(".")]
    Dot,

    /// Colon ":" (cluster prefix in source names)
    #[token(":")]
    Colon,

    /// Inline cast "::"
    #[token("::")]
    Cast,

    /// Assignment Operator "="
    #[token("=")]
    Assign,

    /// Addition Operator "+"
    #[token("+")]
    Add,

    /// Subtraction Operator "-"
    #[token("-")]
    Sub,

    /// Star Operator "*" (used for multiply and wildcard)
    #[token("*")]
    Star,

    /// Division Operator "/"
    #[token("/")]
    Div,

    /// Modulo Operator "%"
    #[token("%")]
    Mod,

    /// Less-than Operator "<"
    #[token("<")]
    LT,

    /// Less-than or Equal Operator "<="
    #[token("<=")]
    LTE,

    /// Greater-than Operator ">"
    #[token(">")]
    GT,

    /// Greater-than or Equal Operator ">="
    #[token(">=")]
    GTE,

    /// Equals Operator "=="
    #[token("==")]
    EQ,

    /// Not Equals Operator "!="
    #[token("!=")]
    NEQ,

    /// Case-insensitive Equals Operator "=~"
    #[token("=~")]
    CIEQ,
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Error => TokenKind::Error,
            Token::Term(word) if is_keyword(word) => TokenKind::Keyword,
            Token::Term(_) | Token::QuotedTerm(_) => TokenKind::Identifier,
            Token::IntegerLiteral(_) | Token::DecimalLiteral(_) | Token::StringLiteral(_) => {
                TokenKind::Literal
            }
            Token::Param | Token::NamedParam(_) | Token::PositionalParam(_) => TokenKind::Param,
            Token::Pipe => TokenKind::Pipe,
            Token::LParen
            | Token::RParen
            | Token::LBracket
            | Token::RBracket
            | Token::Comma
            | Token::Dot
            | Token::Colon => TokenKind::Punctuation,
            Token::Cast
            | Token::Assign
            | Token::Add
            | Token::Sub
            | Token::Star
            | Token::Div
            | Token::Mod
            | Token::LT
            | Token::LTE
            | Token::GT
            | Token::GTE
            | Token::EQ
            | Token::NEQ
            | Token::CIEQ => TokenKind::Operator,
        }
    }

    /// True for a case-insensitive match of an unquoted word.
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self, Token::Term(term) if term.eq_ignore_ascii_case(word))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Error => write!(f, "invalid input"),
            Token::Term(word) => write!(f, "'{}'", word),
            Token::QuotedTerm(word) => write!(f, "'`{}`'", word.replace('`', "``")),
            Token::IntegerLiteral(value) => write!(f, "{}", value),
            Token::DecimalLiteral(value) => write!(f, "{}", value),
            Token::StringLiteral(value) => write!(f, "{:?}", value),
            Token::Param => write!(f, "'?'"),
            Token::NamedParam(name) => write!(f, "'?{}'", name),
            Token::PositionalParam(index) => write!(f, "'?{}'", index),
            Token::Pipe => write!(f, "'|'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::Comma => write!(f, "','"),
            Token::Dot => write!(f, "'.'"),
            Token::Colon => write!(f, "':'"),
            Token::Cast => write!(f, "'::'"),
            Token::Assign => write!(f, "'='"),
            Token::Add => write!(f, "'+'"),
            Token::Sub => write!(f, "'-'"),
            Token::Star => write!(f, "'*'"),
            Token::Div => write!(f, "'/'"),
            Token::Mod => write!(f, "'%'"),
            Token::LT => write!(f, "'<'"),
            Token::LTE => write!(f, "'<='"),
            Token::GT => write!(f, "'>'"),
            Token::GTE => write!(f, "'>='"),
            Token::EQ => write!(f, "'=='"),
            Token::NEQ => write!(f, "'!='"),
            Token::CIEQ => write!(f, "'=~'"),
        }
    }
}

/// Parses a double-quoted string. Raw line breaks end the literal unterminated.
fn lex_string_literal(lex: &mut logos::Lexer<Token>) -> Option<String> {
    let mut c_iter = lex.remainder().chars();
    let mut buf = String::new();

    while let Some(c) = c_iter.next() {
        if c == '"' {
            lex.bump(1);
            return Some(buf);
        }

        if c == '\n' || c == '\r' {
            return None;
        }

        if c == '\\' {
            lex.bump(1);
            match c_iter.next() {
                Some(c_esc) => {
                    lex.bump(c_esc.len_utf8());
                    buf.push_str(&unescape(c_esc));
                }
                None => return None,
            }
        } else {
            lex.bump(c.len_utf8());
            buf.push(c);
        }
    }

    None
}

/// Unknown escapes are kept verbatim.
fn unescape(c: char) -> String {
    match c {
        '"' => String::from('"'),
        '\\' => String::from('\\'),
        'n' => String::from('\n'),
        'r' => String::from('\r'),
        't' => String::from('\t'),
        other => format!("\\{}", other),
    }
}

/// Parses a `"""` string. No escapes, may span lines.
fn lex_triple_quoted_literal(lex: &mut logos::Lexer<Token>) -> Option<String> {
    let remainder = lex.remainder();
    match remainder.find("\"\"\"") {
        Some(end) => {
            let value = String::from(&remainder[..end]);
            lex.bump(end + 3);
            Some(value)
        }
        None => {
            lex.bump(remainder.len());
            None
        }
    }
}

fn lex_quoted_identifier(lex: &mut logos::Lexer<Token>) -> Option<String> {
    let mut c_iter = lex.remainder().chars().peekable();
    let mut buf = String::new();

    while let Some(c) = c_iter.next() {
        if c == '`' {
            if c_iter.peek() == Some(&'`') {
                c_iter.next();
                lex.bump(2);
                buf.push('`');
                continue;
            }
            lex.bump(1);
            return Some(buf);
        }

        if c == '\n' || c == '\r' {
            return None;
        }

        lex.bump(c.len_utf8());
        buf.push(c);
    }

    None
}
