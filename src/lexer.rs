use logos::Logos;
use std::fmt;
use thiserror::Error;

use crate::Span;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")] // Skip whitespace
#[logos(skip r"#[^\n\r]*")] // Skip comments
#[logos(error = LexerErrorKind)]
pub enum TokenKind {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("true", |_| true)]
    #[token("false", |_| false)]
    Boolean(bool),
    // Anything shaped like a number also matches the identifier rule, so the
    // number rule has to win ties of equal length.
    #[regex(r"-?[0-9]+(\.[0-9]+)?([eE][-+]?[0-9]+)?", |lex| {
        let slice = lex.slice();
        slice
            .parse::<f64>()
            .map_err(|_| LexerErrorKind::InvalidNumberFormat(slice.to_string()))
    }, priority = 5)]
    Number(f64),
    #[regex(r#""([^"\\]|\\.)*"?"#, |lex| unescape::string_literal(lex.slice()))]
    String(String),
    #[regex(r"[\p{Extended_Pictographic}a-zA-Z0-9!$%&*/:<=>?~_^+.\-]+", |lex| lex.slice().to_string())]
    Identifier(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

mod unescape {
    use super::{LexerErrorKind, LexerResult};

    /// Decodes a string literal, quotes included, into its content.
    pub fn string_literal(slice: &str) -> LexerResult<String> {
        // un-escaping should only ever reduce the length of the string.
        let mut result = String::with_capacity(slice.len());
        let mut chars = slice.chars().skip(1);
        while let Some(c) = chars.next() {
            match c {
                // The token regex only admits an unescaped quote at the very end.
                '"' => return Ok(result),
                '\\' => match chars.next() {
                    Some('n') => result.push('\n'),
                    Some('r') => result.push('\r'),
                    Some('t') => result.push('\t'),
                    Some('\\') => result.push('\\'),
                    Some('"') => result.push('"'),
                    Some(c) => return Err(LexerErrorKind::UnknownEscapeSequence(c)),
                    None => return Err(LexerErrorKind::UnterminatedString),
                },
                c => result.push(c),
            }
        }
        Err(LexerErrorKind::UnterminatedString)
    }
}

/// Inverse of the literal decoding: renders `s` as a quoted string literal.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

// Implement Display for easy printing
impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Boolean(b) => write!(f, "{}", b),
            TokenKind::Number(n) => write!(f, "{}", n),
            TokenKind::String(s) => write!(f, "{}", escape_string(s)),
            TokenKind::Identifier(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Error, Default, Debug, Clone, PartialEq)]
pub enum LexerErrorKind {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid number format: '{0}'")]
    InvalidNumberFormat(String),
    #[error("unknown escape sequence: '\\{0}'")]
    UnknownEscapeSequence(char),
    #[error("unrecognized token '{0}'")]
    UnrecognizedToken(String),
    // What logos reports before `tokenize` attaches the offending fragment.
    #[default]
    #[error("invalid token")]
    InvalidToken,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error} at {span}")]
pub struct LexerError {
    pub error: LexerErrorKind,
    pub span: Span,
}

// Result type alias for convenience
type LexerResult<T> = Result<T, LexerErrorKind>;

// Result type alias for convenience
type LexerRangedResult<T> = Result<T, LexerError>;

/// Scans `input` into tokens, stopping at the first fragment that matches no rule.
pub fn tokenize(input: &str) -> LexerRangedResult<Vec<Token>> {
    let tokens = TokenKind::lexer(input)
        .spanned()
        .map(|(result, range)| {
            let span = Span::from(range.clone());
            match result {
                Ok(kind) => Ok(Token { kind, span }),
                Err(LexerErrorKind::InvalidToken) => Err(LexerError {
                    error: LexerErrorKind::UnrecognizedToken(
                        input.get(range).unwrap_or_default().to_string(),
                    ),
                    span,
                }),
                Err(error) => Err(LexerError { error, span }),
            }
        })
        .collect::<LexerRangedResult<Vec<Token>>>()?;
    tracing::trace!(count = tokens.len(), "tokenized input");
    Ok(tokens)
}
