use crate::environment::Environment;
use crate::evaluator::EvalResult;
use crate::lexer::escape_string;
use crate::source::Span;
use crate::types::Node;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A runtime value produced by evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    String(String),
    Boolean(bool),
    List(Vec<Value>),
    Procedure(Procedure),
    Nil, // Result of `()` and of side-effecting primitives such as `print`
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::List(_) => "list",
            Value::Procedure(_) => "function",
            Value::Nil => "nil",
        }
    }

    /// `false`, `0`, `NaN`, `""` and `nil` are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Nil => false,
            Value::List(_) | Value::Procedure(_) => true,
        }
    }

    /// The text used when a value is concatenated or printed: strings appear
    /// without quotes, everything else as displayed.
    pub fn to_text(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Renders a number the way JavaScript's `String(n)` does: `-0` prints as `0`,
/// and magnitudes from `1e21` up or below `1e-6` switch to exponent form.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        let exponent = format!("{:e}", n);
        match exponent.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => {
                format!("{}e+{}", mantissa, power)
            }
            _ => exponent,
        }
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{}", escape_string(s)),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Value::Procedure(procedure) => write!(f, "{}", procedure),
            Value::Nil => write!(f, "nil"),
        }
    }
}

pub type PrimitiveFunc = fn(Vec<Value>, Span) -> EvalResult;

#[derive(Clone)]
pub enum Procedure {
    Primitive(PrimitiveFunc, &'static str), // The function pointer and its name (for display/debug)
    Closure(Rc<Closure>),
}

/// A user-defined function together with the environment it was defined in.
pub struct Closure {
    pub name: String,
    pub params: Params,
    pub body: Node,
    pub env: Rc<RefCell<Environment>>,
}

/// Parameter list of a closure: positional names plus an optional `& rest` tail.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Params {
    pub required: Vec<String>,
    pub rest: Option<String>,
}

impl Params {
    pub fn accepts(&self, count: usize) -> bool {
        match self.rest {
            Some(_) => count >= self.required.len(),
            None => count == self.required.len(),
        }
    }

    /// Human-readable argument count, e.g. `2` or `at least 1`.
    pub fn arity(&self) -> String {
        match self.rest {
            Some(_) => format!("at least {}", self.required.len()),
            None => self.required.len().to_string(),
        }
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.required.join(" "))?;
        if let Some(rest) = &self.rest {
            if !self.required.is_empty() {
                write!(f, " ")?;
            }
            write!(f, "& {}", rest)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Procedure::Primitive(_, name) => write!(f, "#<builtin:{}>", name),
            Procedure::Closure(closure) => {
                write!(f, "#<function:{} {}>", closure.name, closure.params)
            }
        }
    }
}

// The captured environment usually contains the closure itself, so Debug
// must not descend into it.
impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Procedure::Primitive(_, name) => write!(f, "Primitive({})", name),
            Procedure::Closure(closure) => {
                write!(f, "Closure({} {} {})", closure.name, closure.params, closure.body)
            }
        }
    }
}

// Primitives compare by name, closures by identity.
impl PartialEq for Procedure {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Procedure::Primitive(_, n1), Procedure::Primitive(_, n2)) => n1 == n2,
            (Procedure::Closure(c1), Procedure::Closure(c2)) => Rc::ptr_eq(c1, c2),
            _ => false,
        }
    }
}
