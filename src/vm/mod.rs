//! This module contains the core VM implementation.
//! Note that these modules are public for documentation visiblility,
//! But should never be used outside of the module by `common` or `compiler`.

pub mod vm;

pub mod ffi;
pub mod host;
pub mod trace;
