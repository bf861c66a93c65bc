use std::fmt::Display;

use crate::common::{span::Spanned, value::Value};

/// Delimiters that group terms into a list.
/// Square brackets read as lists too, for authors used to EDN vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum Delim {
    Paren,
    Square,
}

impl Display for Delim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Delim::Paren => "parenthesis",
            Delim::Square => "square brackets",
        };

        write!(f, "{}", name)
    }
}

pub type Tokens = Vec<Spanned<Token>>;

/// These are the different tokens the lexer will output.
/// `Token`s with data contain that data,
/// e.g. a boolean will be a `Lit(Value::Boolean(...))`, not just a string.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Grouping
    Open(Delim),
    Close(Delim),

    // Leafs
    Symbol(String),
    Lit(Value),
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Open(delim) => write!(f, "opening {}", delim),
            Token::Close(delim) => write!(f, "closing {}", delim),
            Token::Symbol(s) => write!(f, "symbol `{}`", s),
            Token::Lit(Value::String(s)) => write!(f, "literal `{:?}`", s),
            Token::Lit(l) => write!(f, "literal `{}`", l),
        }
    }
}
