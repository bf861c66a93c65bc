//! This module contains the compiler implementation.
//! Note that these modules are public for documentation visiblility,
//! But should never be used outside of the module by `common` or `vm`.
//!
//! Each step in the compiler pipeline turns one datatype into another,
//! starting with `Source` (string + path):
//!
//! 1. Blocks:   `outline.rs` (via the Markdown tokenizer)
//! 2. Tokens:   `lex.rs` (for each fenced block or inline code span)
//! 3. Terms:    `read.rs`
//! 4. Bytecode: `document.rs`, delegating terms to `gen.rs`
//! 5. Program:  `link.rs`

pub mod document;
pub mod gen;
pub mod lex;
pub mod link;
pub mod outline;
pub mod read;

pub mod syntax;

use std::rc::Rc;

use crate::{
    common::{
        program::Program,
        source::Source,
        span::{Span, Spanned},
    },
    construct::{block::Block, term::Term},
};
use self::{
    document::Document,
    lex::Lexer,
    link::Linker,
    outline::Outline,
    read::Reader,
    syntax::Syntax,
};

/// Reads the single term of the expression language covered by `span`.
pub fn read(span: &Span) -> Result<Spanned<Term>, Syntax> {
    Reader::read(Lexer::lex(span)?)
}

/// Splits a document into its structural blocks.
pub fn outline(source: &Rc<Source>) -> Vec<Spanned<Block>> {
    Outline::outline(source)
}

/// Compiles and links a whole document.
pub fn compile(source: &Rc<Source>) -> Result<Program, Syntax> {
    Linker::link(Document::compile(source)?)
}
