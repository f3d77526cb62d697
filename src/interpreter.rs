use crate::environment::Environment;
use crate::error::Error;
use crate::evaluator::{DEFAULT_MAX_DEPTH, Evaluator};
use crate::lexer::{Token, TokenKind, tokenize};
use crate::parser::parse;
use crate::types::Node;
use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// Settings for an [`Interpreter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Tokens and AST of one input, as shown by `--debug`.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub tokens: Vec<Token>,
    pub program: Vec<Node>,
}

/// Owns a global environment and runs source text against it. Bindings made
/// by one `run` stay visible to the next.
pub struct Interpreter {
    env: Rc<RefCell<Environment>>,
    evaluator: Evaluator,
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Interpreter {
            env: Environment::new_global_populated(),
            evaluator: Evaluator::with_max_depth(config.max_depth),
        }
    }

    pub fn env(&self) -> &Rc<RefCell<Environment>> {
        &self.env
    }

    /// Binds `name` in the global environment.
    pub fn define(&mut self, name: &str, value: Value) {
        self.env.borrow_mut().define(name.to_string(), value);
    }

    /// Tokenizes and parses `source` without evaluating it.
    pub fn trace(&self, source: &str) -> Result<Trace, Error> {
        let tokens = tokenize(source)?;
        let program = parse(tokens.clone())?;
        Ok(Trace { tokens, program })
    }

    /// Runs every expression in `source` and returns the value of the last.
    pub fn run(&mut self, source: &str) -> Result<Value, Error> {
        let tokens = tokenize(source)?;
        tracing::debug!(count = tokens.len(), "tokenized");
        let program = parse(tokens)?;
        tracing::debug!(expressions = program.len(), "parsed");
        let value = self.evaluator.eval_program(&program, &self.env)?;
        tracing::debug!(%value, "evaluated");
        Ok(value)
    }
}

/// Reads a command-line argument as an atom: a boolean or number literal
/// when the whole argument is one, otherwise the raw text as a string.
pub fn classify_arg(arg: &str) -> Value {
    match tokenize(arg).as_deref() {
        Ok([token]) if token.span.to_range() == (0..arg.len()) => match &token.kind {
            TokenKind::Number(n) => Value::Number(*n),
            TokenKind::Boolean(b) => Value::Boolean(*b),
            _ => Value::String(arg.to_string()),
        },
        _ => Value::String(arg.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn run(source: &str) -> Result<Value, Error> {
        Interpreter::new().run(source)
    }

    fn assert_run(source: &str, expected: &str) {
        match run(source) {
            Ok(value) => assert_eq!(value.to_string(), expected, "Input: '{}'", source),
            Err(e) => panic!("Running '{}' failed: {}", source, e),
        }
    }

    fn assert_run_error(source: &str, kind: ErrorKind) -> Error {
        match run(source) {
            Ok(value) => panic!("Expected '{}' to fail, got {}", source, value),
            Err(e) => {
                assert_eq!(e.kind(), kind, "Input: '{}', got: {}", source, e);
                e
            }
        }
    }

    #[test]
    fn test_run_displays_like_the_repl() {
        assert_run("(+ 55 6)", "61");
        assert_run("(/ 1 0)", "Infinity");
        assert_run("(+ (/ 8 5) (* (- (% 5 4) 6) 7))", "-33.4");
        assert_run("(+ 0.2 3)", "3.2");
        assert_run(r#"(+ "hello" " " "world")"#, r#""hello world""#);
        assert_run("(list 1 \"a\" (list))", "(1 \"a\" ())");
        assert_run("(function sq (x) (* x x))", "#<function:sq (x)>");
        assert_run("+", "#<builtin:+>");
        assert_run("", "nil");
        assert_run("(* 1e21 1)", "1e+21");
        assert_run("(- 0)", "0");
    }

    #[test]
    fn test_state_persists_between_runs() {
        let mut interpreter = Interpreter::new();
        interpreter.run("(var x 5)").expect("define");
        interpreter
            .run("(function fact (n) (if (<= n 1) then 1 else (* n (fact (- n 1)))))")
            .expect("define fact");
        assert_eq!(interpreter.run("(fact x)"), Ok(Value::Number(120.0)));
    }

    #[test]
    fn test_interpreters_are_independent() {
        let mut first = Interpreter::new();
        let mut second = Interpreter::new();
        first.run("(var only-here 1)").expect("define");
        assert!(second.run("only-here").is_err());
    }

    #[test]
    fn test_define_from_host() {
        let mut interpreter = Interpreter::new();
        interpreter.define(
            "args",
            Value::List(vec![Value::Number(1.0), Value::String("two".into())]),
        );
        assert_eq!(interpreter.run("(size args)"), Ok(Value::Number(2.0)));
        assert_eq!(
            interpreter.run("(select args 2)"),
            Ok(Value::String("two".into()))
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_run_error("\"unterminated", ErrorKind::LexError);
        assert_run_error("(+ 1 2", ErrorKind::SyntaxError);
        assert_run_error(")", ErrorKind::SyntaxError);
        assert_run_error("(if true 1 0)", ErrorKind::SyntaxError);
        let err = assert_run_error("(foo 1 2)", ErrorKind::NameError);
        assert!(err.to_string().contains("foo"));
        assert_run_error("(+ 1 true)", ErrorKind::TypeError);
    }

    #[test]
    fn test_error_aborts_only_current_run() {
        let mut interpreter = Interpreter::new();
        interpreter.run("(var a 1)").expect("define");
        assert!(interpreter.run("(var b (undefined)) (var a 2)").is_err());
        // The failing run stopped before rebinding `a`
        assert_eq!(interpreter.run("a"), Ok(Value::Number(1.0)));
    }

    #[test]
    fn test_configured_recursion_limit() {
        let mut interpreter = Interpreter::with_config(Config { max_depth: 40 });
        interpreter
            .run("(function down (n) (if (<= n 0) then 0 else (down (- n 1))))")
            .expect("define");
        assert_eq!(interpreter.run("(down 3)"), Ok(Value::Number(0.0)));
        let err = interpreter.run("(down 100)").expect_err("too deep");
        assert_eq!(err.kind(), ErrorKind::RecursionLimitError);
        assert_eq!(
            err.to_string(),
            "RecursionLimitError: maximum recursion depth of 40 exceeded"
        );
    }

    #[test]
    fn test_trace_reports_tokens_and_program() {
        let interpreter = Interpreter::new();
        let trace = interpreter.trace("(+ 1 2) x").expect("traces");
        assert_eq!(trace.tokens.len(), 6);
        assert_eq!(trace.program.len(), 2);
        assert_eq!(trace.program[0].to_string(), "(+ 1 2)");
        // Tracing never evaluates, so unbound names are fine
        assert_eq!(trace.program[1].to_string(), "x");
    }

    #[test]
    fn test_classify_arg() {
        assert_eq!(classify_arg("42"), Value::Number(42.0));
        assert_eq!(classify_arg("-1.5"), Value::Number(-1.5));
        assert_eq!(classify_arg("true"), Value::Boolean(true));
        assert_eq!(classify_arg("hello"), Value::String("hello".into()));
        assert_eq!(classify_arg("12abc"), Value::String("12abc".into()));
        assert_eq!(classify_arg("two words"), Value::String("two words".into()));
        assert_eq!(classify_arg(" 7"), Value::String(" 7".into()));
        assert_eq!(classify_arg(""), Value::String(String::new()));
    }
}
