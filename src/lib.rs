// Declare modules publicly so they are part of the library interface
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod pretty_print;
pub mod primitives;
pub mod repl;
pub mod selftest;
pub mod source;
pub mod types;
pub mod value;

pub use environment::{EnvError, Environment};
pub use error::{Error, ErrorKind};
pub use evaluator::{DEFAULT_MAX_DEPTH, EvalError, Evaluator, evaluate};
pub use interpreter::{Config, Interpreter};
pub use lexer::{LexerError, Token, TokenKind, tokenize};
pub use parser::{ParseError, Parser, parse_str};
pub use source::Span;
pub use types::{Expr, Node};
pub use value::{Procedure, Value};
