use std::collections::HashMap;

use crate::common::value::Value;

/// Returned by host callbacks and native functions:
/// whether the VM should keep going or stop after
/// the current instruction, to be `resume`d later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    Continue,
    Pause,
}

/// A read-only look at the VM, handed to host callbacks.
#[derive(Debug, Clone, Copy)]
pub struct View<'a> {
    pub current_node: Option<&'a str>,
    pub variables: &'a HashMap<String, Value>,
    pub stack_depth: usize,
}

impl<'a> View<'a> {
    pub fn variable(&self, name: &str) -> Option<&'a Value> {
        self.variables.get(name)
    }
}

/// The embedding application.
/// Every event a player could observe is reported here;
/// callbacks that return an `Execution` may pause the VM.
/// All methods have do-nothing defaults,
/// so `()` is a host that ignores everything.
pub trait Host {
    fn enter_node(&mut self, _vm: &View, _node: &str) -> Execution {
        Execution::Continue
    }

    fn exit_node(&mut self, _vm: &View, _node: &str) -> Execution {
        Execution::Continue
    }

    fn show_line(&mut self, _vm: &View, _line: &str) -> Execution {
        Execution::Continue
    }

    /// Called once a choice menu is complete.
    /// The VM then waits for `choose`.
    fn show_choice(&mut self, _vm: &View, _choices: &[String]) {}

    fn end_dialogue(&mut self, _vm: &View) {}
}

impl Host for () {}
