use crate::evaluator::{EvalError, EvalResult};
use crate::source::Span;
use crate::value::{PrimitiveFunc, Value};
use std::cmp::Ordering;

/// Every built-in bound in the global environment.
pub const PRIMITIVES: &[(&str, PrimitiveFunc)] = &[
    ("+", prim_add),
    ("-", prim_sub),
    ("*", prim_mul),
    ("/", prim_div),
    ("%", prim_rem),
    ("^", prim_pow),
    ("!", prim_factorial),
    (">", prim_greater_than),
    (">=", prim_greater_than_or_equals),
    ("<", prim_less_than),
    ("<=", prim_less_than_or_equals),
    ("==", prim_equals),
    ("=", prim_equals),
    ("!=", prim_not_equals),
    ("not", prim_not),
    ("and", prim_and),
    ("or", prim_or),
    ("print", prim_print),
    ("list", prim_list),
    ("typeof", prim_typeof),
    ("size", prim_size),
    ("select", prim_select),
];

fn arity_error(name: &str, expected: usize, actual: usize, span: Span) -> EvalError {
    EvalError::InvalidArguments(
        format!(
            "Primitive '{}' expects exactly {} arguments, got {}",
            name, expected, actual
        ),
        span,
    )
}

// Checks the number of arguments
macro_rules! check_arity {
    ($args:expr, $expected:expr, $span:expr, $name:expr) => {
        if $args.len() != $expected {
            return Err(arity_error($name, $expected, $args.len(), $span));
        }
    };
    // Variant for minimum number of args
    ($args:expr, min $expected:expr, $span:expr, $name:expr) => {
        if $args.len() < $expected {
            return Err(EvalError::InvalidArguments(
                format!(
                    "Primitive '{}' expects at least {} arguments, got {}",
                    $name,
                    $expected,
                    $args.len()
                ),
                $span,
            ));
        }
    };
}

// Extracts a number from a &Value or returns an InvalidArguments error
macro_rules! expect_number {
    ($value:expr, $span:expr, $name:expr, $arg_pos:expr) => {
        match $value {
            Value::Number(n) => *n,
            other => {
                return Err(EvalError::InvalidArguments(
                    format!(
                        "Primitive '{}' expects a number for argument {}, got {}",
                        $name,
                        $arg_pos,
                        other.type_name()
                    ),
                    $span,
                ));
            }
        }
    };
}

/// Moves exactly `N` arguments out of `args`.
fn exact_args<const N: usize>(
    args: Vec<Value>,
    span: Span,
    name: &str,
) -> Result<[Value; N], EvalError> {
    let count = args.len();
    <[Value; N]>::try_from(args).map_err(|_| arity_error(name, N, count, span))
}

fn number_pair(args: Vec<Value>, span: Span, name: &str) -> Result<(f64, f64), EvalError> {
    check_arity!(args, 2, span, name);
    let left = expect_number!(&args[0], span, name, 1);
    let right = expect_number!(&args[1], span, name, 2);
    Ok((left, right))
}

pub fn prim_fold_numbers<F: Fn(f64, f64) -> f64>(
    args: Vec<Value>,
    span: Span,
    start: f64,
    func: F,
    operator: &str,
) -> EvalResult {
    let mut acc = start;
    for (i, value) in args.iter().enumerate() {
        let num = expect_number!(value, span, operator, i + 1);
        acc = func(acc, num);
    }
    Ok(Value::Number(acc))
}

pub fn prim_add(args: Vec<Value>, span: Span) -> EvalResult {
    // (+ 1 2 3) -> 6
    // (+ "2 + 5 = " 7) -> "2 + 5 = 7"
    if args.iter().any(|value| matches!(value, Value::String(_))) {
        return Ok(Value::String(args.iter().map(Value::to_text).collect()));
    }
    prim_fold_numbers(args, span, 0.0, |acc, val| acc + val, "+")
}

pub fn prim_sub(args: Vec<Value>, span: Span) -> EvalResult {
    // (- x) -> -x
    // (- x y z) -> x - y - z
    check_arity!(args, min 1, span, "-");
    let first_num = expect_number!(&args[0], span, "-", 1);

    if args.len() == 1 {
        Ok(Value::Number(-first_num))
    } else {
        let mut result = first_num;
        for (i, value) in args.iter().enumerate().skip(1) {
            result -= expect_number!(value, span, "-", i + 1);
        }
        Ok(Value::Number(result))
    }
}

pub fn prim_mul(args: Vec<Value>, span: Span) -> EvalResult {
    // (*) -> 1
    // (* 1 2 3) -> 6
    prim_fold_numbers(args, span, 1.0, |acc, val| acc * val, "*")
}

pub fn prim_div(args: Vec<Value>, span: Span) -> EvalResult {
    // IEEE semantics: (/ 1 0) -> Infinity
    let (left, right) = number_pair(args, span, "/")?;
    Ok(Value::Number(left / right))
}

pub fn prim_rem(args: Vec<Value>, span: Span) -> EvalResult {
    let (left, right) = number_pair(args, span, "%")?;
    Ok(Value::Number(left % right))
}

pub fn prim_pow(args: Vec<Value>, span: Span) -> EvalResult {
    let (base, exponent) = number_pair(args, span, "^")?;
    Ok(Value::Number(base.powf(exponent)))
}

pub fn prim_factorial(args: Vec<Value>, span: Span) -> EvalResult {
    check_arity!(args, 1, span, "!");
    let n = expect_number!(&args[0], span, "!", 1);
    if n < 0.0 || n.fract() != 0.0 || !n.is_finite() {
        return Err(EvalError::InvalidArguments(
            format!("Primitive '!' expects a non-negative integer, got {}", n),
            span,
        ));
    }
    let mut acc: f64 = 1.0;
    let mut i: f64 = 2.0;
    // Past 170! the product is already infinite
    while i <= n && acc.is_finite() {
        acc *= i;
        i += 1.0;
    }
    Ok(Value::Number(acc))
}

fn prim_compare(
    args: Vec<Value>,
    span: Span,
    accept: fn(Ordering) -> bool,
    operator: &str,
) -> EvalResult {
    let [left, right] = exact_args(args, span, operator)?;
    let ordering = match (&left, &right) {
        (Value::Number(l), Value::Number(r)) => l.partial_cmp(r),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        _ => {
            return Err(EvalError::InvalidArguments(
                format!(
                    "Primitive '{}' expects two numbers or two strings, got {} and {}",
                    operator,
                    left.type_name(),
                    right.type_name()
                ),
                span,
            ));
        }
    };
    // Comparisons involving NaN are always false
    Ok(Value::Boolean(ordering.is_some_and(accept)))
}

pub fn prim_greater_than(args: Vec<Value>, span: Span) -> EvalResult {
    prim_compare(args, span, Ordering::is_gt, ">")
}

pub fn prim_greater_than_or_equals(args: Vec<Value>, span: Span) -> EvalResult {
    prim_compare(args, span, Ordering::is_ge, ">=")
}

pub fn prim_less_than(args: Vec<Value>, span: Span) -> EvalResult {
    prim_compare(args, span, Ordering::is_lt, "<")
}

pub fn prim_less_than_or_equals(args: Vec<Value>, span: Span) -> EvalResult {
    prim_compare(args, span, Ordering::is_le, "<=")
}

pub fn prim_equals(args: Vec<Value>, span: Span) -> EvalResult {
    let [left, right] = exact_args(args, span, "==")?;
    Ok(Value::Boolean(left == right))
}

pub fn prim_not_equals(args: Vec<Value>, span: Span) -> EvalResult {
    let [left, right] = exact_args(args, span, "!=")?;
    Ok(Value::Boolean(left != right))
}

// --- Logic ---
// Both operands of `and`/`or` have already been evaluated by the time these run.

pub fn prim_not(args: Vec<Value>, span: Span) -> EvalResult {
    let [value] = exact_args(args, span, "not")?;
    Ok(Value::Boolean(!value.is_truthy()))
}

pub fn prim_and(args: Vec<Value>, span: Span) -> EvalResult {
    let [left, right] = exact_args(args, span, "and")?;
    Ok(if left.is_truthy() { right } else { left })
}

pub fn prim_or(args: Vec<Value>, span: Span) -> EvalResult {
    let [left, right] = exact_args(args, span, "or")?;
    Ok(if left.is_truthy() { left } else { right })
}

// --- Utilities ---

pub fn prim_print(args: Vec<Value>, _span: Span) -> EvalResult {
    let line: String = args.iter().map(Value::to_text).collect();
    println!("{}", line);
    Ok(Value::Nil)
}

pub fn prim_list(args: Vec<Value>, _span: Span) -> EvalResult {
    // (list item1 item2 ...) -> new list containing items
    Ok(Value::List(args))
}

pub fn prim_typeof(args: Vec<Value>, span: Span) -> EvalResult {
    let [value] = exact_args(args, span, "typeof")?;
    Ok(Value::String(value.type_name().to_string()))
}

pub fn prim_size(args: Vec<Value>, span: Span) -> EvalResult {
    let [value] = exact_args(args, span, "size")?;
    match value {
        Value::List(items) => Ok(Value::Number(items.len() as f64)),
        Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
        other => Err(EvalError::InvalidArguments(
            format!(
                "Primitive 'size' expects a list or a string, got {}",
                other.type_name()
            ),
            span,
        )),
    }
}

pub fn prim_select(args: Vec<Value>, span: Span) -> EvalResult {
    // (select (list 10 20 30) 2) -> 20, indices start at 1
    let [collection, index] = exact_args(args, span, "select")?;
    let index = expect_number!(&index, span, "select", 2);
    let mut items = match collection {
        Value::List(items) => items,
        Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
        other => {
            return Err(EvalError::InvalidArguments(
                format!(
                    "Primitive 'select' expects a list or a string, got {}",
                    other.type_name()
                ),
                span,
            ));
        }
    };
    let len = items.len();
    if index.fract() != 0.0 || index < 1.0 || index > len as f64 {
        return Err(EvalError::InvalidArguments(
            format!(
                "Primitive 'select' index {} is out of range for size {}",
                index, len
            ),
            span,
        ));
    }
    Ok(items.swap_remove(index as usize - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    fn string(s: &str) -> Value {
        Value::String(s.to_string())
    }

    fn call(func: PrimitiveFunc, args: Vec<Value>) -> EvalResult {
        func(args, Span::default())
    }

    fn assert_invalid(result: EvalResult) {
        assert!(
            matches!(result, Err(EvalError::InvalidArguments(_, _))),
            "expected InvalidArguments, got {:?}",
            result
        );
    }

    #[test]
    fn test_add_numbers_and_strings() {
        assert_eq!(call(prim_add, vec![num(55.0), num(6.0)]), Ok(num(61.0)));
        assert_eq!(call(prim_add, vec![]), Ok(num(0.0)));
        assert_eq!(
            call(prim_add, vec![string("hello"), string(" "), string("world")]),
            Ok(string("hello world"))
        );
        assert_eq!(
            call(prim_add, vec![string("true = "), Value::Boolean(true)]),
            Ok(string("true = true"))
        );
        assert_eq!(
            call(prim_add, vec![num(1.5), string("x")]),
            Ok(string("1.5x"))
        );
        assert_invalid(call(prim_add, vec![num(1.0), Value::Boolean(true)]));
    }

    #[test]
    fn test_sub_uses_argument_count() {
        assert_eq!(call(prim_sub, vec![num(7.0), num(6.0)]), Ok(num(1.0)));
        assert_eq!(call(prim_sub, vec![num(5.0)]), Ok(num(-5.0)));
        assert_eq!(call(prim_sub, vec![num(5.0), num(0.0)]), Ok(num(5.0)));
        assert_eq!(
            call(prim_sub, vec![num(10.0), num(3.0), num(2.0)]),
            Ok(num(5.0))
        );
        assert_invalid(call(prim_sub, vec![]));
    }

    #[test]
    fn test_division_family() {
        assert_eq!(call(prim_div, vec![num(8.0), num(4.0)]), Ok(num(2.0)));
        assert_eq!(
            call(prim_div, vec![num(1.0), num(0.0)]),
            Ok(num(f64::INFINITY))
        );
        assert_eq!(call(prim_rem, vec![num(7.0), num(4.0)]), Ok(num(3.0)));
        assert_eq!(call(prim_rem, vec![num(-7.0), num(4.0)]), Ok(num(-3.0)));
        assert_eq!(call(prim_pow, vec![num(2.0), num(10.0)]), Ok(num(1024.0)));
        assert_invalid(call(prim_div, vec![num(1.0)]));
        assert_invalid(call(prim_div, vec![num(1.0), string("2")]));
    }

    #[test]
    fn test_factorial() {
        assert_eq!(call(prim_factorial, vec![num(5.0)]), Ok(num(120.0)));
        assert_eq!(call(prim_factorial, vec![num(0.0)]), Ok(num(1.0)));
        assert_eq!(
            call(prim_factorial, vec![num(200.0)]),
            Ok(num(f64::INFINITY))
        );
        assert_invalid(call(prim_factorial, vec![num(-1.0)]));
        assert_invalid(call(prim_factorial, vec![num(2.5)]));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(
            call(prim_greater_than, vec![num(9.0), num(5.0)]),
            Ok(Value::Boolean(true))
        );
        assert_eq!(
            call(prim_greater_than_or_equals, vec![num(8.0), num(8.0)]),
            Ok(Value::Boolean(true))
        );
        assert_eq!(
            call(prim_less_than, vec![num(7.0), num(3.0)]),
            Ok(Value::Boolean(false))
        );
        assert_eq!(
            call(prim_less_than_or_equals, vec![num(6.0), num(4.0)]),
            Ok(Value::Boolean(false))
        );
        assert_eq!(
            call(prim_less_than, vec![string("abc"), string("abd")]),
            Ok(Value::Boolean(true))
        );
        assert_eq!(
            call(prim_less_than, vec![num(f64::NAN), num(1.0)]),
            Ok(Value::Boolean(false))
        );
        assert_invalid(call(prim_less_than, vec![num(1.0), string("2")]));
        assert_invalid(call(prim_less_than, vec![num(1.0)]));
    }

    #[test]
    fn test_equality() {
        assert_eq!(
            call(prim_equals, vec![num(5.0), num(5.0)]),
            Ok(Value::Boolean(true))
        );
        assert_eq!(
            call(prim_equals, vec![num(5.0), string("5")]),
            Ok(Value::Boolean(false))
        );
        assert_eq!(
            call(
                prim_equals,
                vec![
                    Value::List(vec![num(1.0), string("a")]),
                    Value::List(vec![num(1.0), string("a")])
                ]
            ),
            Ok(Value::Boolean(true))
        );
        assert_eq!(
            call(prim_not_equals, vec![num(1.0), num(2.0)]),
            Ok(Value::Boolean(true))
        );
    }

    #[test]
    fn test_logic_is_strict_and_returns_operands() {
        assert_eq!(
            call(prim_not, vec![Value::Boolean(false)]),
            Ok(Value::Boolean(true))
        );
        assert_eq!(
            call(prim_or, vec![Value::Boolean(true), Value::Boolean(false)]),
            Ok(Value::Boolean(true))
        );
        assert_eq!(
            call(prim_and, vec![Value::Boolean(true), Value::Boolean(true)]),
            Ok(Value::Boolean(true))
        );
        assert_eq!(call(prim_and, vec![num(0.0), num(2.0)]), Ok(num(0.0)));
        assert_eq!(call(prim_or, vec![Value::Nil, string("x")]), Ok(string("x")));
        assert_invalid(call(prim_and, vec![Value::Boolean(true)]));
    }

    #[test]
    fn test_utilities() {
        assert_eq!(call(prim_print, vec![string("2 + 5 = "), num(7.0)]), Ok(Value::Nil));
        assert_eq!(
            call(prim_list, vec![num(1.0), num(2.0)]),
            Ok(Value::List(vec![num(1.0), num(2.0)]))
        );
        assert_eq!(call(prim_typeof, vec![num(1.0)]), Ok(string("number")));
        assert_eq!(call(prim_typeof, vec![Value::Nil]), Ok(string("nil")));
        assert_eq!(
            call(prim_size, vec![Value::List(vec![num(1.0), num(2.0)])]),
            Ok(num(2.0))
        );
        assert_eq!(call(prim_size, vec![string("héllo")]), Ok(num(5.0)));
        assert_invalid(call(prim_size, vec![num(3.0)]));
    }

    #[test]
    fn test_select_is_one_based() {
        let items = Value::List(vec![num(10.0), num(20.0), num(30.0)]);
        assert_eq!(call(prim_select, vec![items.clone(), num(1.0)]), Ok(num(10.0)));
        assert_eq!(call(prim_select, vec![items.clone(), num(3.0)]), Ok(num(30.0)));
        assert_eq!(call(prim_select, vec![string("abc"), num(2.0)]), Ok(string("b")));
        assert_invalid(call(prim_select, vec![items.clone(), num(0.0)]));
        assert_invalid(call(prim_select, vec![items.clone(), num(4.0)]));
        assert_invalid(call(prim_select, vec![items, num(1.5)]));
        assert_invalid(call(prim_select, vec![num(1.0), num(1.0)]));
    }
}
