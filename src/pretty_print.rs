use crate::environment::EnvError;
use crate::error::Error;
use crate::evaluator::EvalError;
use crate::parser::ParseError;
use ariadne::{Config, IndexType, Label, Report, ReportKind, Source};
use std::io;
use std::ops::Range;

type ReportSpan<'a> = (&'a str, Range<usize>);

impl Error {
    fn report<'a>(
        &self,
        source_name: &'a str,
        input: &str,
        color: bool,
    ) -> Report<'a, ReportSpan<'a>> {
        let mut range = self.span(input).to_range();
        // Point at the last character when the input ran out
        if range.is_empty() && range.start == input.len() {
            range.start = range.start.saturating_sub(1);
        }
        let at = |range: Range<usize>| (source_name, range);
        let builder = Report::build(ReportKind::Error, at(range.clone()))
            // Spans are byte offsets straight from the lexer
            .with_config(
                Config::default()
                    .with_color(color)
                    .with_index_type(IndexType::Byte),
            )
            .with_message(self.to_string());

        let label = match self {
            Error::Parse(ParseError::UnexpectedToken { expected, .. }) => {
                format!("expected {} here", expected)
            }
            Error::Parse(ParseError::UnexpectedEof(expected)) => {
                format!("input ended while expecting {}", expected)
            }
            Error::Parse(ParseError::LexerError(lex_err)) => lex_err.error.to_string(),
            Error::Eval(EvalError::EnvError(EnvError::UnboundVariable(name, _))) => {
                format!("`{}` is not bound in this scope", name)
            }
            Error::Eval(EvalError::NotAProcedure(value, _)) => {
                format!("this is a {}, which cannot be called", value.type_name())
            }
            Error::Eval(EvalError::InvalidArguments(..)) => "in this call".to_string(),
            Error::Eval(EvalError::InvalidSpecialForm(..)) => {
                "this form is malformed or incomplete".to_string()
            }
            Error::Eval(EvalError::RecursionLimit { .. }) => {
                "evaluation nested too deeply here".to_string()
            }
        };

        builder
            .with_label(Label::new(at(range)).with_message(label))
            .finish()
    }

    /// Writes an uncoloured source-annotated report to `out`.
    pub fn write_report<W: io::Write>(
        &self,
        source_name: &str,
        input: &str,
        out: W,
    ) -> io::Result<()> {
        self.report(source_name, input, false)
            .write((source_name, Source::from(input)), out)
    }

    /// Prints a coloured source-annotated report to stderr.
    pub fn eprint_report(&self, source_name: &str, input: &str) -> io::Result<()> {
        self.report(source_name, input, true)
            .eprint((source_name, Source::from(input)))
    }
}
