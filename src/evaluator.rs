use crate::environment::{EnvError, Environment};
use crate::error::ErrorKind;
use crate::source::Span;
use crate::types::{Expr, Node};
use crate::value::{Closure, Params, Procedure, Value};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use thiserror::Error;

/// Number of nested function calls at which evaluation gives up unless
/// configured otherwise.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Keywords the evaluator interprets structurally rather than as calls.
pub const SPECIAL_FORMS: [&str; 3] = ["var", "function", "if"];

// --- Evaluation Error ---
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error(transparent)]
    EnvError(#[from] EnvError), // Errors from environment lookup
    #[error("{0} is not a procedure")]
    NotAProcedure(Value, Span), // Tried to call something that isn't a procedure
    #[error("{0}")]
    InvalidArguments(String, Span), // Mismatched arity or wrong type of args
    #[error("{0}")]
    InvalidSpecialForm(String, Span), // Malformed special form (e.g., (if cond 1 2))
    #[error("maximum recursion depth of {limit} exceeded")]
    RecursionLimit { limit: usize, span: Span },
}

impl EvalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::EnvError(_) => ErrorKind::NameError,
            EvalError::NotAProcedure(..) | EvalError::InvalidArguments(..) => ErrorKind::TypeError,
            EvalError::InvalidSpecialForm(..) => ErrorKind::SyntaxError,
            EvalError::RecursionLimit { .. } => ErrorKind::RecursionLimitError,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            EvalError::EnvError(EnvError::UnboundVariable(_, span))
            | EvalError::NotAProcedure(_, span)
            | EvalError::InvalidArguments(_, span)
            | EvalError::InvalidSpecialForm(_, span)
            | EvalError::RecursionLimit { span, .. } => *span,
        }
    }
}

// Result type alias for convenience
pub type EvalResult<T = Value> = Result<T, EvalError>;

/// Identifiers with meaning to the evaluator beyond the environment, for completion.
pub fn special_form_identifiers() -> HashSet<String> {
    SPECIAL_FORMS
        .iter()
        .chain(["then", "else"].iter())
        .map(|s| s.to_string())
        .collect()
}

/// Tree-walking evaluator with a bound on how deeply function calls nest.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    max_depth: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Evaluator {
    pub fn with_max_depth(max_depth: usize) -> Self {
        Evaluator { max_depth }
    }

    /// Evaluates a given AST Node within the specified environment.
    pub fn eval(&self, node: &Node, env: &Rc<RefCell<Environment>>) -> EvalResult {
        self.eval_at(node, env, 0)
    }

    /// Evaluates top-level expressions in order and returns the last value,
    /// or `nil` for an empty program.
    pub fn eval_program(&self, nodes: &[Node], env: &Rc<RefCell<Environment>>) -> EvalResult {
        let mut last = Value::Nil;
        for node in nodes {
            last = self.eval(node, env)?;
        }
        Ok(last)
    }

    fn eval_at(&self, node: &Node, env: &Rc<RefCell<Environment>>, depth: usize) -> EvalResult {
        match &node.kind {
            // 1. Self-evaluating atoms
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::String(s) => Ok(Value::String(s.clone())),
            Expr::Boolean(b) => Ok(Value::Boolean(*b)),

            // 2. Identifiers: look up in the environment chain
            Expr::Identifier(name) => Ok(env.borrow().get(name, node.span)?),

            // 3. Lists: special forms or applications
            Expr::List(elements) => match elements.split_first() {
                None => Ok(Value::Nil),
                Some((first, rest)) => match first.as_identifier() {
                    Some("var") => self.evaluate_var(rest, env, depth, node.span),
                    Some("function") => evaluate_function(rest, env, node.span),
                    Some("if") => self.evaluate_if(rest, env, depth, node.span),
                    _ => self.evaluate_procedure(first, rest, env, depth, node.span),
                },
            },
        }
    }

    fn evaluate_var(
        &self,
        operands: &[Node],
        env: &Rc<RefCell<Environment>>,
        depth: usize,
        span: Span,
    ) -> EvalResult {
        let [name_node, value_node] = operands else {
            return Err(EvalError::InvalidSpecialForm(
                "malformed var: expected (var NAME VALUE)".to_string(),
                span,
            ));
        };
        let name = expect_identifier(name_node, "var")?;
        let value = self.eval_at(value_node, env, depth)?;
        tracing::trace!(name, %value, "var");
        // `var` binds in the caller's frame, not a new child scope
        env.borrow_mut().define(name.to_string(), value.clone());
        Ok(value)
    }

    fn evaluate_if(
        &self,
        operands: &[Node],
        env: &Rc<RefCell<Environment>>,
        depth: usize,
        span: Span,
    ) -> EvalResult {
        match operands {
            [condition, then_marker, consequent, else_marker, alternate]
                if then_marker.is_identifier("then") && else_marker.is_identifier("else") =>
            {
                if self.eval_at(condition, env, depth)?.is_truthy() {
                    self.eval_at(consequent, env, depth)
                } else {
                    self.eval_at(alternate, env, depth)
                }
            }
            _ => Err(EvalError::InvalidSpecialForm(
                "malformed if: expected (if COND then EXPR else EXPR)".to_string(),
                span,
            )),
        }
    }

    fn evaluate_procedure(
        &self,
        operator: &Node,
        operands: &[Node],
        env: &Rc<RefCell<Environment>>,
        depth: usize,
        span: Span,
    ) -> EvalResult {
        // 1. Evaluate the operator and check it is callable
        let procedure = match self.eval_at(operator, env, depth)? {
            Value::Procedure(procedure) => procedure,
            other => return Err(EvalError::NotAProcedure(other, operator.span)),
        };

        // 2. Evaluate the operands, left to right
        let mut evaluated_args = Vec::with_capacity(operands.len());
        for operand_node in operands {
            evaluated_args.push(self.eval_at(operand_node, env, depth)?);
        }

        // 3. Apply
        self.apply(&procedure, evaluated_args, depth, span)
    }

    /// Calls `procedure` with already-evaluated arguments.
    pub fn apply(
        &self,
        procedure: &Procedure,
        args: Vec<Value>,
        depth: usize,
        span: Span,
    ) -> EvalResult {
        match procedure {
            Procedure::Primitive(func, _) => func(args, span),
            Procedure::Closure(closure) => {
                // `depth` counts the closure calls already in progress
                if depth >= self.max_depth {
                    return Err(EvalError::RecursionLimit {
                        limit: self.max_depth,
                        span,
                    });
                }
                if !closure.params.accepts(args.len()) {
                    return Err(EvalError::InvalidArguments(
                        format!(
                            "function '{}' expects {} arguments, got {}",
                            closure.name,
                            closure.params.arity(),
                            args.len()
                        ),
                        span,
                    ));
                }

                let call_env = Environment::new_enclosed(closure.env.clone());
                {
                    let mut frame = call_env.borrow_mut();
                    let mut args = args.into_iter();
                    for (name, value) in closure.params.required.iter().zip(&mut args) {
                        frame.define(name.clone(), value);
                    }
                    if let Some(rest) = &closure.params.rest {
                        frame.define(rest.clone(), Value::List(args.collect()));
                    }
                }

                tracing::trace!(function = %closure.name, depth, "applying closure");
                self.eval_at(&closure.body, &call_env, depth + 1)
            }
        }
    }
}

fn evaluate_function(
    operands: &[Node],
    env: &Rc<RefCell<Environment>>,
    span: Span,
) -> EvalResult {
    let [name_node, params_node, body] = operands else {
        return Err(EvalError::InvalidSpecialForm(
            "malformed function: expected (function NAME (PARAM ...) BODY)".to_string(),
            span,
        ));
    };
    let name = expect_identifier(name_node, "function")?;
    let params = parse_params(params_node)?;

    let closure = Rc::new(Closure {
        name: name.to_string(),
        params,
        body: body.clone(),
        env: env.clone(),
    });
    let value = Value::Procedure(Procedure::Closure(closure));
    tracing::trace!(name, "function");
    // Bound in the defining frame, which the closure also captured, so the
    // body can call itself recursively.
    env.borrow_mut().define(name.to_string(), value.clone());
    Ok(value)
}

fn expect_identifier<'a>(node: &'a Node, form: &str) -> EvalResult<&'a str> {
    node.as_identifier().ok_or_else(|| {
        EvalError::InvalidSpecialForm(
            format!(
                "{} expects an identifier to bind, got {} {}",
                form,
                node.kind.type_name(),
                node
            ),
            node.span,
        )
    })
}

/// Reads `(a b & rest)` into a parameter spec.
fn parse_params(node: &Node) -> EvalResult<Params> {
    let Expr::List(items) = &node.kind else {
        return Err(EvalError::InvalidSpecialForm(
            format!("function parameters must be a list, got {}", node),
            node.span,
        ));
    };

    let mut params = Params::default();
    let mut items = items.iter();
    while let Some(item) = items.next() {
        match item.as_identifier() {
            Some("&") => match (items.next(), items.next()) {
                (Some(rest), None) if rest.as_identifier().is_some_and(|r| r != "&") => {
                    params.rest = rest.as_identifier().map(str::to_string);
                }
                _ => {
                    return Err(EvalError::InvalidSpecialForm(
                        "'&' must be followed by exactly one parameter name".to_string(),
                        item.span,
                    ));
                }
            },
            Some(name) => params.required.push(name.to_string()),
            None => {
                return Err(EvalError::InvalidSpecialForm(
                    format!("function parameter must be an identifier, got {}", item),
                    item.span,
                ));
            }
        }
    }
    Ok(params)
}

/// Evaluates `node` with the default depth limit.
pub fn evaluate(node: &Node, env: &Rc<RefCell<Environment>>) -> EvalResult {
    Evaluator::default().eval(node, env)
}
