//! Intermediate trees built by the compiler on its way from
//! document source to bytecode.

pub mod block;
pub mod operator;
pub mod term;
pub mod token;
