use std::fmt::{Display, Formatter, Result};

use serde::{Deserialize, Serialize};

/// This enum represents a single opcode, without its operand.
/// See `program::Instruction` for opcodes paired with their operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// Push a string literal.
    PushString,
    /// Push a number literal.
    PushNumber,
    /// Push a boolean literal.
    PushBool,
    /// Push `nil`.
    PushNull,
    /// Delete a value off the stack.
    PopValue,
    /// Stringify and join the top two values.
    Concat,
    /// Boolean conjunction of two booleans.
    And,
    /// Boolean disjunction of two booleans.
    Or,
    /// Negate a boolean.
    Not,
    /// Structural equality of any two values.
    Equal,
    /// Compare two numbers.
    GreaterThan,
    /// Compare two numbers.
    LessThan,
    /// Add two numbers on the stack.
    Add,
    /// Subtract two numbers on the stack.
    Subtract,
    /// Multiply two numbers on the stack.
    Multiply,
    /// Divide two numbers on the stack.
    Divide,
    /// Add one to a number.
    Increment,
    /// Subtract one from a number.
    Decrement,
    /// Push a copy of a variable onto the stack, `nil` if unbound.
    LoadVariable,
    /// Pop a value into a variable.
    StoreVariable,
    /// Hand a string to the host as a line of dialogue.
    ShowLine,
    /// Jump to an address.
    Jump,
    /// Pop a boolean, jumping to an address if it is false.
    JumpIfFalse,
    /// Pop a string, buffering it as an option leading to an address.
    PushChoice,
    /// Present the buffered options and wait for the host's pick.
    ShowChoice,
    /// Mark entry into a node.
    EnterNode,
    /// Mark exit from a node.
    ExitNode,
    /// End the dialogue, stopping the VM.
    EndDialogue,
    /// Call a native function registered by the host.
    Call,
}

/// The kind of operand an opcode carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    None,
    /// A code address, written as a symbolic name in source.
    Address,
    /// A variable, node or function name.
    Name,
    String,
    Number,
    Boolean,
}

impl Opcode {
    pub const ALL: [Opcode; 29] = [
        Opcode::PushString,
        Opcode::PushNumber,
        Opcode::PushBool,
        Opcode::PushNull,
        Opcode::PopValue,
        Opcode::Concat,
        Opcode::And,
        Opcode::Or,
        Opcode::Not,
        Opcode::Equal,
        Opcode::GreaterThan,
        Opcode::LessThan,
        Opcode::Add,
        Opcode::Subtract,
        Opcode::Multiply,
        Opcode::Divide,
        Opcode::Increment,
        Opcode::Decrement,
        Opcode::LoadVariable,
        Opcode::StoreVariable,
        Opcode::ShowLine,
        Opcode::Jump,
        Opcode::JumpIfFalse,
        Opcode::PushChoice,
        Opcode::ShowChoice,
        Opcode::EnterNode,
        Opcode::ExitNode,
        Opcode::EndDialogue,
        Opcode::Call,
    ];

    /// The minimum number of values that must be on the stack
    /// before this opcode may execute.
    pub fn stack_needed(self) -> usize {
        use Opcode::*;
        match self {
            PushString | PushNumber | PushBool | PushNull => 0,
            LoadVariable | Jump | ShowChoice | EnterNode | ExitNode => 0,
            EndDialogue | Call => 0,
            PopValue | Not | Increment | Decrement => 1,
            StoreVariable | ShowLine | JumpIfFalse | PushChoice => 1,
            Concat | And | Or | Equal | GreaterThan | LessThan => 2,
            Add | Subtract | Multiply | Divide => 2,
        }
    }

    pub fn operand(self) -> Operand {
        use Opcode::*;
        match self {
            PushString => Operand::String,
            PushNumber => Operand::Number,
            PushBool => Operand::Boolean,
            Jump | JumpIfFalse | PushChoice => Operand::Address,
            LoadVariable | StoreVariable | ShowChoice | EnterNode | ExitNode | Call => {
                Operand::Name
            },
            _ => Operand::None,
        }
    }

    pub fn name(self) -> &'static str {
        use Opcode::*;
        match self {
            PushString => "PushString",
            PushNumber => "PushNumber",
            PushBool => "PushBool",
            PushNull => "PushNull",
            PopValue => "PopValue",
            Concat => "Concat",
            And => "And",
            Or => "Or",
            Not => "Not",
            Equal => "Equal",
            GreaterThan => "GreaterThan",
            LessThan => "LessThan",
            Add => "Add",
            Subtract => "Subtract",
            Multiply => "Multiply",
            Divide => "Divide",
            Increment => "Increment",
            Decrement => "Decrement",
            LoadVariable => "LoadVariable",
            StoreVariable => "StoreVariable",
            ShowLine => "ShowLine",
            Jump => "Jump",
            JumpIfFalse => "JumpIfFalse",
            PushChoice => "PushChoice",
            ShowChoice => "ShowChoice",
            EnterNode => "EnterNode",
            ExitNode => "ExitNode",
            EndDialogue => "EndDialogue",
            Call => "Call",
        }
    }

    /// Looks up an opcode by the name used in `asm` forms.
    /// `Lessthan` is accepted as an older spelling of `LessThan`.
    pub fn from_name(name: &str) -> Option<Opcode> {
        if name == "Lessthan" {
            return Some(Opcode::LessThan);
        }
        Opcode::ALL.iter().copied().find(|op| op.name() == name)
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn names_round_trip() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_name(op.name()), Some(op));
        }
        assert_eq!(Opcode::from_name("Lessthan"), Some(Opcode::LessThan));
        assert_eq!(Opcode::from_name("Label"), None);
    }

    #[test]
    fn binary_ops_need_two() {
        assert_eq!(Opcode::Add.stack_needed(), 2);
        assert_eq!(Opcode::Concat.stack_needed(), 2);
        assert_eq!(Opcode::PopValue.stack_needed(), 1);
        assert_eq!(Opcode::Call.stack_needed(), 0);
    }
}
