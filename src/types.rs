use crate::lexer::escape_string;
use crate::source::Span;
use std::fmt; // For custom display formatting

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: Expr, // The actual expression data
    pub span: Span, // The source span it covers
}

impl Node {
    pub fn new(kind: Expr, span: Span) -> Self {
        Node { kind, span }
    }

    pub fn new_number(n: f64, span: Span) -> Self {
        Node::new(Expr::Number(n), span)
    }

    pub fn new_string(s: &str, span: Span) -> Self {
        Node::new(Expr::String(s.to_string()), span)
    }

    pub fn new_bool(b: bool, span: Span) -> Self {
        Node::new(Expr::Boolean(b), span)
    }

    pub fn new_identifier(name: &str, span: Span) -> Self {
        Node::new(Expr::Identifier(name.to_string()), span)
    }

    pub fn new_list(children: Vec<Node>, span: Span) -> Self {
        Node::new(Expr::List(children), span)
    }

    /// The identifier name, if this node is one.
    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            Expr::Identifier(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_identifier(&self, name: &str) -> bool {
        self.as_identifier() == Some(name)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Delegate to Expr's Display implementation
        write!(f, "{}", self.kind)
    }
}

/// A REPLisp expression: an atom or a parenthesized list of expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    String(String),
    Boolean(bool),
    Identifier(String), // e.g., +, fact, var
    List(Vec<Node>),    // e.g., (+ 1 2), (var x 10), ()
}

impl Expr {
    pub fn type_name(&self) -> &'static str {
        match self {
            Expr::Number(_) => "number",
            Expr::String(_) => "string",
            Expr::Boolean(_) => "boolean",
            Expr::Identifier(_) => "identifier",
            Expr::List(_) => "list",
        }
    }
}

// Prints the expression back in source form
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::String(s) => write!(f, "{}", escape_string(s)),
            Expr::Boolean(b) => write!(f, "{}", b),
            Expr::Identifier(name) => write!(f, "{}", name),
            Expr::List(list) => {
                write!(f, "(")?;
                let mut first = true;
                for expr in list {
                    if !first {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", expr)?;
                    first = false;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_round_trips_source_form() {
        let span = Span::default();
        let node = Node::new_list(
            vec![
                Node::new_identifier("print", span),
                Node::new_string("a \"b\"", span),
                Node::new_list(vec![], span),
                Node::new_bool(false, span),
                Node::new_number(2.5, span),
            ],
            span,
        );
        assert_eq!(node.to_string(), r#"(print "a \"b\"" () false 2.5)"#);
    }

    #[test]
    fn test_identifier_helpers() {
        let node = Node::new_identifier("then", Span::default());
        assert!(node.is_identifier("then"));
        assert!(!node.is_identifier("else"));
        assert_eq!(Node::new_number(1.0, Span::default()).as_identifier(), None);
    }
}
