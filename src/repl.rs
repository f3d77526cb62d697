use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Cmd, Completer, Context, Editor, EventHandler, KeyCode, KeyEvent, Modifiers};
use rustyline::{Helper, Highlighter, Hinter, Validator};

use crate::environment::Environment;
use crate::evaluator::special_form_identifiers;
use crate::interpreter::Interpreter;
use crate::lexer::{TokenKind, tokenize};

pub const PROMPT: &str = "replisp> ";
pub const HISTORY_FILE: &str = "replisp_history.txt";

pub const HELP: &str = "\
REPLisp: every expression is (operator operand ...)

  (var NAME VALUE)                    bind NAME in the current scope
  (function NAME (PARAM ...) BODY)    define a function; `& rest` collects extras
  (if COND then EXPR else EXPR)       conditional
  # comment                           ignored to end of line

Builtins: + - * / % ^ ! > >= < <= == = != not and or
          print list typeof size select

Unbalanced parentheses continue on the next line.
Commands: help, exit, :q (or Ctrl-D)";

struct ReplCompleter {
    env: Rc<RefCell<Environment>>,
}

impl ReplCompleter {
    fn candidates(&self, prefix: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .env
            .borrow()
            .get_identifiers()
            .union(&special_form_identifiers())
            .filter(|id| id.starts_with(prefix))
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl rustyline::completion::Completer for ReplCompleter {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        // Only complete an identifier that ends right at the cursor
        let prefix = match tokenize(&line[..pos]) {
            Ok(tokens) => tokens.into_iter().last().and_then(|t| match t.kind {
                TokenKind::Identifier(name) if t.span.end == pos => Some(name),
                _ => None,
            }),
            Err(_) => None,
        };
        Ok(match prefix {
            Some(prefix) => (pos - prefix.len(), self.candidates(&prefix)),
            None => (pos, vec![]),
        })
    }
}

#[derive(Completer, Helper, Highlighter, Hinter, Validator)]
struct ReplHelper {
    #[rustyline(Validator)]
    validator: ParenValidator,
    #[rustyline(Highlighter)]
    highlighter: ParenHighlighter,
    #[rustyline(Completer)]
    completer: ReplCompleter,
}

/// How each character of a line should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Plain,
    Str,
    Comment,
    Paren,
    Unmatched,
}

/// Bracket structure of a (possibly partial) input.
#[derive(Debug, Default)]
struct Scan {
    classes: Vec<(usize, char, Class)>,
    pairs: Vec<(usize, usize)>,
    unclosed: Vec<usize>,
    stray: Vec<usize>,
    in_string: bool,
}

impl Scan {
    fn new(input: &str) -> Self {
        let mut scan = Scan::default();
        let mut in_comment = false;
        let mut escape = false;

        for (i, c) in input.char_indices() {
            let class = if in_comment {
                if c == '\n' {
                    in_comment = false;
                }
                Class::Comment
            } else if scan.in_string {
                if escape {
                    escape = false;
                } else if c == '\\' {
                    escape = true;
                } else if c == '"' {
                    scan.in_string = false;
                }
                Class::Str
            } else {
                match c {
                    '"' => {
                        scan.in_string = true;
                        Class::Str
                    }
                    '#' => {
                        in_comment = true;
                        Class::Comment
                    }
                    '(' => {
                        scan.unclosed.push(i);
                        Class::Paren
                    }
                    ')' => match scan.unclosed.pop() {
                        Some(open) => {
                            scan.pairs.push((open, i));
                            Class::Paren
                        }
                        None => {
                            scan.stray.push(i);
                            Class::Unmatched
                        }
                    },
                    _ => Class::Plain,
                }
            };
            scan.classes.push((i, c, class));
        }
        scan
    }

    /// The paren under or just before the cursor, and its partner.
    fn pair_at(&self, pos: usize) -> Option<(usize, usize)> {
        let candidates = [Some(pos), pos.checked_sub(1)];
        candidates.into_iter().flatten().find_map(|at| {
            self.pairs
                .iter()
                .copied()
                .find(|&(open, close)| open == at || close == at)
        })
    }
}

struct ParenValidator;

impl Validator for ParenValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        Ok(validate_input(ctx.input()))
    }
}

fn validate_input(input: &str) -> ValidationResult {
    let scan = Scan::new(input);
    if let Some(&at) = scan.stray.first() {
        // Let the parser report it with a proper span
        tracing::trace!(at, "unmatched ')' in entry");
        ValidationResult::Valid(None)
    } else if scan.in_string || !scan.unclosed.is_empty() {
        ValidationResult::Incomplete
    } else {
        ValidationResult::Valid(None)
    }
}

struct ParenHighlighter;

impl Highlighter for ParenHighlighter {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> Cow<'l, str> {
        Cow::Owned(highlight_line(line, pos))
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

fn highlight_line(line: &str, pos: usize) -> String {
    let scan = Scan::new(line);
    let active: HashSet<usize> = scan
        .pair_at(pos)
        .map(|(open, close)| HashSet::from([open, close]))
        .unwrap_or_default();

    let mut out = String::with_capacity(line.len());
    for &(i, c, class) in &scan.classes {
        match class {
            Class::Paren if active.contains(&i) => out.push_str(&format!("\x1b[1;34m{}\x1b[0m", c)),
            Class::Str => out.push_str(&format!("\x1b[32m{}\x1b[0m", c)),
            Class::Comment => out.push_str(&format!("\x1b[90m{}\x1b[0m", c)),
            Class::Unmatched => out.push_str(&format!("\x1b[31m{}\x1b[0m", c)),
            Class::Paren | Class::Plain => out.push(c),
        }
    }
    out
}

/// Prints the tokens and AST of `source` for `--debug`.
pub fn print_trace(interpreter: &Interpreter, source: &str) {
    // Failures are left for `run` to report
    if let Ok(trace) = interpreter.trace(source) {
        println!("Tokens:");
        for token in &trace.tokens {
            println!("  {} @ {}", token.kind, token.span);
        }
        println!("AST:");
        for node in &trace.program {
            println!("  {:?}", node.kind);
        }
    }
}

/// Runs one REPL entry, printing its value or an error report.
pub fn run_entry(interpreter: &mut Interpreter, source: &str, debug: bool) {
    if debug {
        print_trace(interpreter, source);
    }
    match interpreter.run(source) {
        Ok(value) => println!("=> {}", value),
        Err(e) => {
            if e.eprint_report("REPL", source).is_err() {
                eprintln!("{}", e);
            }
        }
    }
}

pub fn run_repl(interpreter: &mut Interpreter, debug: bool) -> rustyline::Result<()> {
    println!("REPLisp v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'help' for syntax, 'exit' or Ctrl-D to quit.");

    let helper = ReplHelper {
        validator: ParenValidator,
        highlighter: ParenHighlighter,
        completer: ReplCompleter {
            env: interpreter.env().clone(),
        },
    };
    let config = rustyline::config::Config::builder()
        .auto_add_history(true)
        .build();
    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(helper));
    rl.bind_sequence(
        KeyEvent(KeyCode::Char('s'), Modifiers::CTRL),
        EventHandler::Simple(Cmd::Newline),
    );
    if let Err(err) = rl.load_history(HISTORY_FILE) {
        tracing::warn!(%err, file = HISTORY_FILE, "no previous history");
    }

    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                let entry = line.trim();
                match entry {
                    "" => continue,
                    "exit" | ":q" => break,
                    "help" => println!("{}", HELP),
                    _ => run_entry(interpreter, entry, debug),
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C
                println!("Interrupted. Type 'exit' or Ctrl-D to quit.");
            }
            Err(ReadlineError::Eof) => {
                // Ctrl-D
                println!("\nExiting.");
                break;
            }
            Err(err) => {
                eprintln!("Readline Error: {:?}", err);
                break;
            }
        }
    }
    rl.save_history(HISTORY_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_incomplete(input: &str) -> bool {
        matches!(validate_input(input), ValidationResult::Incomplete)
    }

    #[test]
    fn test_validator_waits_for_balanced_parens() {
        assert!(is_incomplete("(+ 1"));
        assert!(is_incomplete("(function f (x)\n  (+ x"));
        assert!(is_incomplete("(print \"unfinished"));
        assert!(!is_incomplete("(+ 1 2)"));
        assert!(!is_incomplete("(print \"(\")"));
        assert!(!is_incomplete("(+ 1 2) # (comment"));
        // Stray closers are handed to the parser for reporting
        assert!(!is_incomplete("(+ 1 2))"));
    }

    #[test]
    fn test_scan_pairs_and_strays() {
        let scan = Scan::new("(a (b)) )");
        assert_eq!(scan.pairs, vec![(3, 5), (0, 6)]);
        assert_eq!(scan.stray, vec![8]);
        assert!(scan.unclosed.is_empty());
        assert_eq!(scan.pair_at(6), Some((0, 6)));
        assert_eq!(scan.pair_at(7), Some((0, 6)));
        assert_eq!(scan.pair_at(2), None);
    }

    #[test]
    fn test_highlight_marks_strings_and_active_pair() {
        let out = highlight_line("(f \"x\")", 0);
        assert!(out.starts_with("\x1b[1;34m(\x1b[0m"));
        assert!(out.contains("\x1b[32mx\x1b[0m"));
        assert!(out.ends_with("\x1b[1;34m)\x1b[0m"));

        let out = highlight_line("x)", 0);
        assert_eq!(out, "x\x1b[31m)\x1b[0m");
    }

    #[test]
    fn test_completer_candidates() {
        let env = Environment::new_global_populated();
        env.borrow_mut()
            .define("select-all".to_string(), crate::value::Value::Nil);
        let completer = ReplCompleter { env };
        assert_eq!(completer.candidates("sel"), vec!["select", "select-all"]);
        assert_eq!(completer.candidates("fun"), vec!["function"]);
        assert!(completer.candidates("zzz").is_empty());
    }
}
