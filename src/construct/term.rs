use std::fmt::Display;

use crate::common::{span::Spanned, value::Value};

pub type Terms = Vec<Spanned<Term>>;

/// A term of the embedded expression language, as read from
/// a fenced block or an inline code span.
/// Lists are not yet classified into operators or calls;
/// that happens during code generation.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Symbol(String),
    Lit(Value),
    List(Terms),
}

impl Term {
    /// The symbol at the head of a list, if there is one.
    pub fn head(&self) -> Option<&str> {
        match self {
            Term::List(items) => match items.first().map(|t| &t.item) {
                Some(Term::Symbol(s)) => Some(s),
                _ => None,
            },
            _ => None,
        }
    }
}

impl Display for Term {
    /// Prints the term back out as an s-expression.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Symbol(s) => write!(f, "{}", s),
            Term::Lit(Value::String(s)) => write!(f, "{:?}", s),
            Term::Lit(l) => write!(f, "{}", l),
            Term::List(items) => {
                write!(f, "(")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item.item)?;
                }
                write!(f, ")")
            },
        }
    }
}
