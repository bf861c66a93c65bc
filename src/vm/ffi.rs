use std::collections::HashMap;

use crate::{
    common::value::{Type, Value},
    vm::host::Execution,
};

/// A function implemented by the host and callable from dialogue.
/// Arguments arrive in declaration order, already checked
/// against the `prototype`. Returning an error message
/// is a runtime fault.
pub struct FFIFunction {
    function: Box<dyn FnMut(&[Value]) -> Result<Execution, String>>,
    prototype: Vec<Type>,
}

impl FFIFunction {
    pub fn new(
        prototype: Vec<Type>,
        function: impl FnMut(&[Value]) -> Result<Execution, String> + 'static,
    ) -> FFIFunction {
        FFIFunction {
            function: Box::new(function),
            prototype,
        }
    }

    pub fn prototype(&self) -> &[Type] {
        &self.prototype
    }

    pub fn call(&mut self, args: &[Value]) -> Result<Execution, String> {
        (self.function)(args)
    }
}

impl std::fmt::Debug for FFIFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FFIFunction(...)")
    }
}

/// The table of native functions a VM can `Call`.
#[derive(Debug, Default)]
pub struct FFI(HashMap<String, FFIFunction>);

impl FFI {
    pub fn new() -> FFI {
        FFI(HashMap::new())
    }

    /// Registers a function under `name`,
    /// returning the one it replaced, if any.
    pub fn add(&mut self, name: &str, function: FFIFunction) -> Option<FFIFunction> {
        self.0.insert(name.to_string(), function)
    }

    pub fn get(&mut self, name: &str) -> Option<&mut FFIFunction> {
        self.0.get_mut(name)
    }
}
