use crate::evaluator::EvalError;
use crate::lexer::LexerError;
use crate::parser::ParseError;
use crate::source::Span;
use std::fmt;
use thiserror::Error;

/// The category every failure is reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    LexError,
    SyntaxError,
    NameError,
    TypeError,
    RecursionLimitError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::LexError => "LexError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::NameError => "NameError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::RecursionLimitError => "RecursionLimitError",
        };
        f.write_str(name)
    }
}

impl LexerError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::LexError
    }
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::LexerError(e) => e.kind(),
            ParseError::UnexpectedToken { .. } | ParseError::UnexpectedEof(_) => {
                ErrorKind::SyntaxError
            }
        }
    }

    /// Where the error sits in `input`; end of input for `UnexpectedEof`.
    pub fn span(&self, input: &str) -> Span {
        match self {
            ParseError::UnexpectedToken { found, .. } => found.span,
            ParseError::UnexpectedEof(_) => Span::new(input.len(), input.len()),
            ParseError::LexerError(e) => e.span,
        }
    }
}

/// Any failure while running source text through the interpreter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("{kind}: {0}", kind = .0.kind())]
    Parse(#[from] ParseError),
    #[error("{kind}: {0}", kind = .0.kind())]
    Eval(#[from] EvalError),
}

impl From<LexerError> for Error {
    fn from(e: LexerError) -> Self {
        Error::Parse(ParseError::from(e))
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Parse(e) => e.kind(),
            Error::Eval(e) => e.kind(),
        }
    }

    pub fn span(&self, input: &str) -> Span {
        match self {
            Error::Parse(e) => e.span(input),
            Error::Eval(e) => e.span(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EnvError;
    use crate::parser::parse_str;

    #[test]
    fn test_parse_error_kinds() {
        let lex = parse_str("\"open").expect_err("unterminated string");
        assert_eq!(lex.kind(), ErrorKind::LexError);
        assert_eq!(lex.span("\"open"), Span::new(0, 5));

        let eof = parse_str("(+ 1 2").expect_err("missing paren");
        assert_eq!(eof.kind(), ErrorKind::SyntaxError);
        assert_eq!(eof.span("(+ 1 2"), Span::new(6, 6));

        let stray = parse_str(")").expect_err("stray paren");
        assert_eq!(stray.kind(), ErrorKind::SyntaxError);
        assert_eq!(stray.span(")"), Span::new(0, 1));
    }

    #[test]
    fn test_error_display_prefixes_kind() {
        let err = Error::from(EvalError::from(EnvError::UnboundVariable(
            "foo".to_string(),
            Span::new(1, 4),
        )));
        assert_eq!(err.kind(), ErrorKind::NameError);
        assert_eq!(err.to_string(), "NameError: 'foo' is not defined");
        assert_eq!(err.span("(foo 1 2)"), Span::new(1, 4));

        let err = Error::from(parse_str("(+ 1 2").expect_err("missing paren"));
        assert_eq!(
            err.to_string(),
            "SyntaxError: unexpected end of input, expected ')'"
        );
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::LexError.to_string(), "LexError");
        assert_eq!(
            ErrorKind::RecursionLimitError.to_string(),
            "RecursionLimitError"
        );
    }
}
