//! Contains datastructures and utility functions
//! common to both the `compiler` and `vm`.
//!
//! - Values, the datatypes dialogue manipulates.
//! - Opcodes, instructions and linked programs.
//! - Source code representation and span annotations.

pub mod source;
pub mod span;
pub mod value;
pub mod opcode;
pub mod program;
