use std::fmt::{Debug, Display, Formatter, Result};

use serde::{Deserialize, Serialize};

/// Built-in dialogue datatypes.
/// Only the first four ever live on the VM's stack;
/// `Symbol` names variables, nodes, labels and functions in operands.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Boolean(bool),
    Number(f64),
    String(String),
    Nil,
    Symbol(String),
}

/// The kind of a `Value`, used for native function prototypes
/// and runtime type errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    Boolean,
    Number,
    String,
    Nil,
    Symbol,
}

impl Value {
    pub fn ty(&self) -> Type {
        match self {
            Value::Boolean(_) => Type::Boolean,
            Value::Number(_) => Type::Number,
            Value::String(_) => Type::String,
            Value::Nil => Type::Nil,
            Value::Symbol(_) => Type::Symbol,
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let name = match self {
            Type::Boolean => "boolean",
            Type::Number => "number",
            Type::String => "string",
            Type::Nil => "nil",
            Type::Symbol => "symbol",
        };
        write!(f, "{}", name)
    }
}

impl Display for Value {
    /// Displays a value the way it is spliced into a line of dialogue.
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Nil => write!(f, "nil"),
            Value::Symbol(s) => write!(f, "{}", s),
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Value::Boolean(b) => write!(f, "Boolean({:?})", b),
            Value::Number(n) => write!(f, "Number({:?})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Nil => write!(f, "Nil"),
            Value::Symbol(s) => write!(f, "Symbol({})", s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Boolean(b) }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self { Value::Number(n) }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::String(s.to_string()) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Value::String(s) }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_for_dialogue() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(0.75).to_string(), "0.75");
        assert_eq!(Value::Boolean(false).to_string(), "false");
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::from("hi").to_string(), "hi");
    }

    #[test]
    fn kinds() {
        assert_eq!(Value::Nil.ty(), Type::Nil);
        assert_eq!(Value::Symbol("x".into()).ty(), Type::Symbol);
        assert_ne!(Value::Number(1.0), Value::String("1".into()));
    }
}
