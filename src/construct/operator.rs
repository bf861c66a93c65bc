use std::fmt::Display;

use crate::common::opcode::Opcode;

/// Whether a form leaves a value on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    /// Leaves exactly one value on the stack.
    Expression,
    /// Leaves the stack as it found it.
    Statement,
}

impl Display for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Class::Expression => write!(f, "an expression"),
            Class::Statement => write!(f, "a statement"),
        }
    }
}

/// How many operands (not counting the head) a form takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (qualifier, n) = match self {
            Arity::Exactly(n) => ("exactly", n),
            Arity::AtLeast(n) => ("at least", n),
        };
        let plural = if *n == 1 { "" } else { "s" };
        write!(f, "{} {} operand{}", qualifier, n, plural)
    }
}

/// The built-in operators of the expression language.
/// Any other head symbol is a call to a native function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    GreaterThan,
    LessThan,
    Equal,
    Not,
    And,
    Or,
    Add,
    Subtract,
    Multiply,
    Divide,
    Increment,
    Decrement,
    Concat,
    Assign,
    While,
    If,
    Do,
    Asm,
    Print,
    Choose,
}

impl Operator {
    pub fn try_new(name: &str) -> Option<Operator> {
        use Operator::*;
        Some(match name {
            "gt" => GreaterThan,
            "lt" => LessThan,
            "eq" => Equal,
            "not" => Not,
            "and" => And,
            "or" => Or,
            "+" => Add,
            "-" => Subtract,
            "*" => Multiply,
            "/" => Divide,
            "inc" => Increment,
            "dec" => Decrement,
            "concat" => Concat,
            "set!" => Assign,
            "while" => While,
            "if" => If,
            "do" => Do,
            "asm" => Asm,
            "print" => Print,
            "choose" => Choose,
            _ => {
                return None;
            },
        })
    }

    pub fn name(self) -> &'static str {
        use Operator::*;
        match self {
            GreaterThan => "gt",
            LessThan => "lt",
            Equal => "eq",
            Not => "not",
            And => "and",
            Or => "or",
            Add => "+",
            Subtract => "-",
            Multiply => "*",
            Divide => "/",
            Increment => "inc",
            Decrement => "dec",
            Concat => "concat",
            Assign => "set!",
            While => "while",
            If => "if",
            Do => "do",
            Asm => "asm",
            Print => "print",
            Choose => "choose",
        }
    }

    /// The class of a well-formed use of this operator.
    /// `if` is listed as an expression, but takes the class
    /// of its branches.
    pub fn class(self) -> Class {
        use Operator::*;
        match self {
            Assign | While | Do | Asm | Print | Choose => Class::Statement,
            _ => Class::Expression,
        }
    }

    pub fn arity(self) -> Arity {
        use Operator::*;
        match self {
            Not | Increment | Decrement | Print => Arity::Exactly(1),
            GreaterThan | LessThan | Equal | Assign | While => Arity::Exactly(2),
            If => Arity::Exactly(3),
            And | Or | Add | Subtract | Multiply | Divide | Concat => Arity::AtLeast(1),
            Do | Choose => Arity::AtLeast(1),
            Asm => Arity::AtLeast(0),
        }
    }

    /// The opcode emitted after the operands of a
    /// comparison, unary or left-folding operator.
    pub fn opcode(self) -> Option<Opcode> {
        use Operator::*;
        Some(match self {
            GreaterThan => Opcode::GreaterThan,
            LessThan => Opcode::LessThan,
            Equal => Opcode::Equal,
            Not => Opcode::Not,
            And => Opcode::And,
            Or => Opcode::Or,
            Add => Opcode::Add,
            Subtract => Opcode::Subtract,
            Multiply => Opcode::Multiply,
            Divide => Opcode::Divide,
            Increment => Opcode::Increment,
            Decrement => Opcode::Decrement,
            Concat => Opcode::Concat,
            _ => {
                return None;
            },
        })
    }

    /// Operators that fold any number of operands, left to right.
    pub fn is_variadic(self) -> bool {
        matches!(self.arity(), Arity::AtLeast(_)) && self.opcode().is_some()
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
