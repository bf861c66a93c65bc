//! # Parley
//! This repository contains the core of Parley,
//! a dialogue language for games and interactive fiction:
//! the compiler, the VM, and the handful of types they share.
//!
//! ## Writing dialogue
//! A dialogue is a Markdown document.
//! Each level-one heading opens a node,
//! each paragraph is a line of dialogue,
//! a paragraph holding only a link moves to another node,
//! and an ordered list of links is a choice menu:
//! ```markdown
//! # Hallway
//!
//! The hallway is *very* dark. You have `gold` gold.
//!
//! 1. [Go back](Entrance)
//! 2. [Press on](Cellar)
//! ```
//! Inline code is an expression spliced into the line,
//! and fenced code blocks run statements, in a small
//! s-expression language: `(set! gold (+ gold 1))`.
//!
//! ## Embedding Parley in Rust
//! Compile a document, then drive a `VM` with a `Host`
//! that shows lines and choices to the player:
//! ```
//! use parley::{compile, Execution, Host, RunState, View, VM};
//!
//! struct Printer;
//!
//! impl Host for Printer {
//!     fn show_line(&mut self, _vm: &View, line: &str) -> Execution {
//!         println!("{}", line);
//!         Execution::Continue
//!     }
//! }
//!
//! let program = compile("# Start\n\nHello from Parley!\n").unwrap();
//! let mut vm = VM::init(program, Printer);
//! assert_eq!(vm.run().unwrap(), RunState::Stopped);
//! ```
//!
//! ## Overview of the compilation process
//! Within the compiler pipeline, source code is represented as a `Source` object.
//! The document is outlined into blocks by a Markdown tokenizer;
//! embedded code is lexed and read into terms;
//! blocks and terms are compiled into flat bytecode;
//! and finally the linker resolves links, choices and jumps
//! that refer to nodes later in the document.
//! See the `compiler` module for more.

pub mod common;
pub mod compiler;
pub mod construct;
pub mod vm;

pub use common::{
    opcode::Opcode,
    program::{Instruction, Program},
    source::Source,
    value::{Type, Value},
};
pub use compiler::syntax::Syntax;
pub use vm::{
    ffi::{FFIFunction, FFI},
    host::{Execution, Host, View},
    trace::{Fault, Trace},
    vm::{RunState, Step, VM},
};

/// Compiles a dialogue document into a linked program.
pub fn compile(text: &str) -> Result<Program, Syntax> {
    compiler::compile(&Source::source(text))
}
