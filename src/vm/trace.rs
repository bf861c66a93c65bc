use std::fmt;

use thiserror::Error;

use crate::{
    common::{program::Instruction, value::Type},
    vm::vm::RunState,
};

/// What went wrong while running a program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Fault {
    #[error("stack underflow: needed {needed} values, found {found}")]
    StackUnderflow { needed: usize, found: usize },

    #[error("type mismatch: expected a {expected}, found a {found}")]
    TypeMismatch { expected: Type, found: Type },

    #[error("function does not exist: `{0}`")]
    UnknownFunction(String),

    #[error("`{name}` takes {expected} arguments, but only {found} are on the stack")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("argument {index} of `{name}` should be a {expected}, found a {found}")]
    ArgumentType {
        name: String,
        index: usize,
        expected: Type,
        found: Type,
    },

    #[error("`{name}` failed: {message}")]
    Native { name: String, message: String },

    #[error("choice {index} is out of range, there are {count} choices")]
    ChoiceOutOfRange { index: usize, count: usize },

    #[error("can't {action} a VM that is {state}")]
    InvalidTransition { action: &'static str, state: RunState },

    #[error("ran off the end of the program at {address} (length {length})")]
    OutOfBounds { address: usize, length: usize },
}

/// Represents a runtime error:
/// the fault, and where in the program it happened, if anywhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub fault: Fault,
    pub address: Option<usize>,
    pub instruction: Option<Instruction>,
}

impl Trace {
    /// A fault raised outside of any instruction,
    /// such as calling `resume` on a VM that isn't suspended.
    pub fn error(fault: Fault) -> Trace {
        Trace {
            fault,
            address: None,
            instruction: None,
        }
    }

    /// A fault raised while executing the instruction at `address`.
    pub fn at(fault: Fault, address: usize, instruction: Option<Instruction>) -> Trace {
        Trace {
            fault,
            address: Some(address),
            instruction,
        }
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Runtime Error")?;

        if let Some(address) = self.address {
            write!(f, " at {:04}", address)?;
        }
        if let Some(instruction) = &self.instruction {
            write!(f, " ({})", instruction)?;
        }

        write!(f, ": {}", self.fault)
    }
}

impl std::error::Error for Trace {}
