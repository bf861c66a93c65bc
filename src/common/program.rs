use std::fmt::{Display, Formatter, Result, Write};

use serde::{Deserialize, Serialize};

use crate::common::{
    opcode::{Opcode, Operand},
    value::Value,
};

/// A single instruction: an opcode together with its typed operand.
/// Addresses are flat, zero-based indices into `Program::code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "arg")]
pub enum Instruction {
    PushString(String),
    PushNumber(f64),
    PushBool(bool),
    PushNull,
    PopValue,
    Concat,
    And,
    Or,
    Not,
    Equal,
    GreaterThan,
    LessThan,
    Add,
    Subtract,
    Multiply,
    Divide,
    Increment,
    Decrement,
    LoadVariable(String),
    StoreVariable(String),
    ShowLine,
    Jump(usize),
    JumpIfFalse(usize),
    PushChoice(usize),
    ShowChoice(String),
    EnterNode(String),
    ExitNode(String),
    EndDialogue,
    Call(String),
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        use Instruction as I;
        match self {
            I::PushString(_) => Opcode::PushString,
            I::PushNumber(_) => Opcode::PushNumber,
            I::PushBool(_) => Opcode::PushBool,
            I::PushNull => Opcode::PushNull,
            I::PopValue => Opcode::PopValue,
            I::Concat => Opcode::Concat,
            I::And => Opcode::And,
            I::Or => Opcode::Or,
            I::Not => Opcode::Not,
            I::Equal => Opcode::Equal,
            I::GreaterThan => Opcode::GreaterThan,
            I::LessThan => Opcode::LessThan,
            I::Add => Opcode::Add,
            I::Subtract => Opcode::Subtract,
            I::Multiply => Opcode::Multiply,
            I::Divide => Opcode::Divide,
            I::Increment => Opcode::Increment,
            I::Decrement => Opcode::Decrement,
            I::LoadVariable(_) => Opcode::LoadVariable,
            I::StoreVariable(_) => Opcode::StoreVariable,
            I::ShowLine => Opcode::ShowLine,
            I::Jump(_) => Opcode::Jump,
            I::JumpIfFalse(_) => Opcode::JumpIfFalse,
            I::PushChoice(_) => Opcode::PushChoice,
            I::ShowChoice(_) => Opcode::ShowChoice,
            I::EnterNode(_) => Opcode::EnterNode,
            I::ExitNode(_) => Opcode::ExitNode,
            I::EndDialogue => Opcode::EndDialogue,
            I::Call(_) => Opcode::Call,
        }
    }

    /// The operand as a tagged value, if the opcode takes one.
    /// Addresses are numbers, names are symbols.
    pub fn operand(&self) -> Option<Value> {
        use Instruction as I;
        match self {
            I::PushString(s) => Some(Value::String(s.clone())),
            I::PushNumber(n) => Some(Value::Number(*n)),
            I::PushBool(b) => Some(Value::Boolean(*b)),
            I::Jump(a) | I::JumpIfFalse(a) | I::PushChoice(a) => {
                Some(Value::Number(*a as f64))
            },
            I::LoadVariable(s)
            | I::StoreVariable(s)
            | I::ShowChoice(s)
            | I::EnterNode(s)
            | I::ExitNode(s)
            | I::Call(s) => Some(Value::Symbol(s.clone())),
            _ => None,
        }
    }

    /// Builds an instruction from an opcode and an operand,
    /// returning `None` if the operand does not match the opcode's kind.
    /// Address operands are given as numbers.
    pub fn build(opcode: Opcode, operand: Option<Value>) -> Option<Instruction> {
        use Instruction as I;
        let instruction = match (opcode.operand(), operand) {
            (Operand::None, None) => match opcode {
                Opcode::PushNull => I::PushNull,
                Opcode::PopValue => I::PopValue,
                Opcode::Concat => I::Concat,
                Opcode::And => I::And,
                Opcode::Or => I::Or,
                Opcode::Not => I::Not,
                Opcode::Equal => I::Equal,
                Opcode::GreaterThan => I::GreaterThan,
                Opcode::LessThan => I::LessThan,
                Opcode::Add => I::Add,
                Opcode::Subtract => I::Subtract,
                Opcode::Multiply => I::Multiply,
                Opcode::Divide => I::Divide,
                Opcode::Increment => I::Increment,
                Opcode::Decrement => I::Decrement,
                Opcode::ShowLine => I::ShowLine,
                Opcode::EndDialogue => I::EndDialogue,
                _ => return None,
            },
            (Operand::String, Some(Value::String(s))) => I::PushString(s),
            (Operand::Number, Some(Value::Number(n))) => I::PushNumber(n),
            (Operand::Boolean, Some(Value::Boolean(b))) => I::PushBool(b),
            (Operand::Address, Some(Value::Number(n))) if n >= 0.0 && n.fract() == 0.0 => {
                let address = n as usize;
                match opcode {
                    Opcode::Jump => I::Jump(address),
                    Opcode::JumpIfFalse => I::JumpIfFalse(address),
                    Opcode::PushChoice => I::PushChoice(address),
                    _ => return None,
                }
            },
            (Operand::Name, Some(Value::Symbol(s))) => match opcode {
                Opcode::LoadVariable => I::LoadVariable(s),
                Opcode::StoreVariable => I::StoreVariable(s),
                Opcode::ShowChoice => I::ShowChoice(s),
                Opcode::EnterNode => I::EnterNode(s),
                Opcode::ExitNode => I::ExitNode(s),
                Opcode::Call => I::Call(s),
                _ => return None,
            },
            _ => return None,
        };

        Some(instruction)
    }

    /// Rewrites the address operand of a jump or choice.
    /// Returns false if this instruction has no address operand.
    pub fn retarget(&mut self, address: usize) -> bool {
        match self {
            Instruction::Jump(a) | Instruction::JumpIfFalse(a) | Instruction::PushChoice(a) => {
                *a = address;
                true
            },
            _ => false,
        }
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self.operand() {
            None => write!(f, "{}", self.opcode()),
            Some(Value::String(s)) => write!(f, "{} {:?}", self.opcode(), s),
            Some(operand) => write!(f, "{} {}", self.opcode(), operand),
        }
    }
}

/// A linked, immutable program: where to start and what to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub start: usize,
    pub code: Vec<Instruction>,
}

impl Program {
    pub fn new(start: usize, code: Vec<Instruction>) -> Program {
        Program { start, code }
    }

    /// Dump the program for inspection, one instruction per line.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        // writing to a String can't fail
        let _ = writeln!(out, "Addr.\tInst.\tArg?");
        let _ = writeln!(out, "---");
        for (address, instruction) in self.code.iter().enumerate() {
            let marker = if address == self.start { ">" } else { " " };
            let arg = match instruction.operand() {
                None => "--".to_string(),
                Some(Value::String(s)) => format!("{:?}", s),
                Some(other) => other.to_string(),
            };
            let _ = writeln!(out, "{}{:04}\t{}\t{}", marker, address, instruction.opcode(), arg);
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn build_checks_operand_kind() {
        assert_eq!(
            Instruction::build(Opcode::PushString, Some(Value::from("abc"))),
            Some(Instruction::PushString("abc".into())),
        );
        assert_eq!(Instruction::build(Opcode::PushString, Some(Value::Number(1.0))), None);
        assert_eq!(Instruction::build(Opcode::Add, Some(Value::Nil)), None);
        assert_eq!(Instruction::build(Opcode::Add, None), Some(Instruction::Add));
        assert_eq!(Instruction::build(Opcode::Jump, None), None);
        assert_eq!(
            Instruction::build(Opcode::Call, Some(Value::Symbol("roll".into()))),
            Some(Instruction::Call("roll".into())),
        );
    }

    #[test]
    fn every_opcode_round_trips_through_build() {
        for op in Opcode::ALL {
            let operand = match op.operand() {
                Operand::None => None,
                Operand::Address => Some(Value::Number(3.0)),
                Operand::Name => Some(Value::Symbol("x".into())),
                Operand::String => Some(Value::from("s")),
                Operand::Number => Some(Value::Number(1.5)),
                Operand::Boolean => Some(Value::Boolean(true)),
            };
            let instruction = Instruction::build(op, operand.clone()).unwrap();
            assert_eq!(instruction.opcode(), op);
            assert_eq!(instruction.operand(), operand);
        }
    }

    #[test]
    fn retarget_only_addresses() {
        let mut jump = Instruction::Jump(0);
        assert!(jump.retarget(12));
        assert_eq!(jump, Instruction::Jump(12));

        let mut line = Instruction::ShowLine;
        assert!(!line.retarget(12));
    }

    #[test]
    fn dump_marks_start() {
        let program = Program::new(0, vec![Instruction::PushNull, Instruction::EndDialogue]);
        let dump = program.dump();
        assert!(dump.contains(">0000\tPushNull\t--"));
        assert!(dump.contains(" 0001\tEndDialogue\t--"));
    }
}
