use crate::lexer::{LexerError, Token, TokenKind};
use crate::types::{Expr, Node};
use std::vec::IntoIter; // To iterate over Vec<Token>
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected '{}' at {}, expected {expected}", .found.kind, .found.span)]
    UnexpectedToken { found: Token, expected: String },
    #[error("unexpected end of input, expected {0}")]
    UnexpectedEof(String),
    // Lexer errors surface through the parser when parsing straight from a string
    #[error(transparent)]
    LexerError(#[from] LexerError),
}

// Result type alias for convenience
pub type ParseResult<T> = Result<T, ParseError>;

pub struct Parser {
    // We iterate over owned Tokens, consuming them.
    tokens: IntoIter<Token>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens: tokens.into_iter(),
        }
    }

    // Consumes the next token if available.
    fn next_token(&mut self) -> Option<Token> {
        self.tokens.next()
    }

    /// Parses a single expression starting at `token`.
    pub fn parse_expr_with_token(&mut self, token: Option<Token>) -> ParseResult<Node> {
        match token {
            Some(Token {
                kind: TokenKind::LParen,
                span,
            }) => self.parse_list(span),
            Some(
                found @ Token {
                    kind: TokenKind::RParen,
                    ..
                },
            ) => Err(ParseError::UnexpectedToken {
                found,
                expected: "an expression".to_string(),
            }),
            Some(atom) => self.parse_atom(atom),
            None => Err(ParseError::UnexpectedEof("an expression".to_string())),
        }
    }

    pub fn parse_expr(&mut self) -> ParseResult<Node> {
        let token = self.next_token();
        self.parse_expr_with_token(token)
    }

    /// Parses an atomic expression (identifier, number, boolean, string).
    fn parse_atom(&mut self, token: Token) -> ParseResult<Node> {
        Ok(Node::new(
            match token.kind {
                TokenKind::Identifier(s) => Expr::Identifier(s),
                TokenKind::Number(n) => Expr::Number(n),
                TokenKind::Boolean(b) => Expr::Boolean(b),
                TokenKind::String(s) => Expr::String(s),
                other_token => Err(ParseError::UnexpectedToken {
                    found: Token {
                        kind: other_token,
                        span: token.span,
                    },
                    expected: "an atom (identifier, number, boolean, string)".to_string(),
                })?,
            },
            token.span,
        ))
    }

    /// Parses the rest of a list whose `(` sits at `open`.
    fn parse_list(&mut self, open: crate::Span) -> ParseResult<Node> {
        let mut children = Vec::new();
        loop {
            match self.next_token() {
                Some(Token {
                    kind: TokenKind::RParen,
                    span: rparen_span,
                }) => return Ok(Node::new_list(children, open.merge(rparen_span))),
                Some(token) => children.push(self.parse_expr_with_token(Some(token))?),
                // Reached EOF before finding ')'
                None => return Err(ParseError::UnexpectedEof("')'".to_string())),
            }
        }
    }

    /// Parses every top-level expression up to the end of the token stream.
    pub fn parse_program(mut self) -> ParseResult<Vec<Node>> {
        let mut expressions = Vec::new();
        while let Some(token) = self.next_token() {
            expressions.push(self.parse_expr_with_token(Some(token))?);
        }
        Ok(expressions)
    }
}

pub fn parse(tokens: Vec<Token>) -> ParseResult<Vec<Node>> {
    Parser::new(tokens).parse_program()
}

// Helper function to lex and parse a string directly (useful for tests and REPL)
pub fn parse_str(input: &str) -> ParseResult<Vec<Node>> {
    let tokens = crate::lexer::tokenize(input)?;
    parse(tokens)
}
