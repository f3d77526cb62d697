use crate::interpreter::Interpreter;
use crate::value::Value;
use std::fmt;

/// One fixed program and the value it must produce.
pub struct Case {
    pub code: &'static str,
    pub expected: Value,
}

fn num(n: f64) -> Value {
    Value::Number(n)
}

fn boolean(b: bool) -> Value {
    Value::Boolean(b)
}

fn string(s: &str) -> Value {
    Value::String(s.to_string())
}

/// The built-in self-check suite run by `--test`.
pub fn cases() -> Vec<Case> {
    [
        ("(+ 55 6)", num(61.0)),
        ("(- 7 6)", num(1.0)),
        ("(* 3 6)", num(18.0)),
        ("(/ 8 4)", num(2.0)),
        ("(% 7 4)", num(3.0)),
        ("(^ 2 10)", num(1024.0)),
        ("(! 5)", num(120.0)),
        ("(> 9 5)", boolean(true)),
        ("(>= 8 6)", boolean(true)),
        ("(< 7 3)", boolean(false)),
        ("(<= 6 4)", boolean(false)),
        ("(== 5 5)", boolean(true)),
        ("(not false)", boolean(true)),
        ("(or true false)", boolean(true)),
        ("(and true true)", boolean(true)),
        ("(if true then 1 else 0)", num(1.0)),
        ("(+ (+ 9 9) (* 9 9))", num(99.0)),
        ("(+ (/ 8 5) (* (- (% 5 4) 6) 7))", num(-33.4)),
        ("(/ 1 0)", num(f64::INFINITY)),
        ("(+ 0.2 3)", num(3.2)),
        ("(+ -9 9)", num(0.0)),
        (r#"(+ "hello" " " "world")"#, string("hello world")),
        (r#"(+ "2 + 5 = " (+ 2 5))"#, string("2 + 5 = 7")),
        (r#"(+ "true = " true)"#, string("true = true")),
    ]
    .into_iter()
    .map(|(code, expected)| Case { code, expected })
    .collect()
}

/// Outcome of one case: what it produced, or the error text.
pub struct CaseResult {
    pub code: &'static str,
    pub expected: Value,
    pub actual: Result<Value, String>,
}

impl CaseResult {
    pub fn passed(&self) -> bool {
        matches!(&self.actual, Ok(value) if *value == self.expected)
    }
}

impl fmt::Display for CaseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actual = match &self.actual {
            Ok(value) => value.to_string(),
            Err(message) => message.clone(),
        };
        if self.passed() {
            write!(f, "PASS {} => {}", self.code, actual)
        } else {
            write!(
                f,
                "FAIL {} => {} ({} expected)",
                self.code, actual, self.expected
            )
        }
    }
}

pub struct Report {
    pub results: Vec<CaseResult>,
}

impl Report {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    pub fn all_passed(&self) -> bool {
        self.passed() == self.results.len()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.results.len();
        for (i, result) in self.results.iter().enumerate() {
            writeln!(f, "CASE {} of {}: {}", i + 1, total, result)?;
        }
        write!(f, "{}/{} passed", self.passed(), total)
    }
}

/// Runs every case in a fresh interpreter.
pub fn run_self_test() -> Report {
    let results = cases()
        .into_iter()
        .map(|case| CaseResult {
            code: case.code,
            actual: Interpreter::new()
                .run(case.code)
                .map_err(|e| e.to_string()),
            expected: case.expected,
        })
        .collect();
    Report { results }
}
