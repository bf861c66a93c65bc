use std::{collections::HashMap, fmt};

use tracing::{debug, trace, warn};

use crate::{
    common::{
        program::{Instruction, Program},
        value::{Type, Value},
    },
    vm::{
        ffi::FFI,
        host::{Execution, Host, View},
        trace::{Fault, Trace},
    },
};

/// Where a `VM` is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Idle, ready to `run`.
    Stopped,
    Running,
    /// Paused by the host, ready to `resume`.
    Suspended,
    /// Showing a choice menu, ready to `choose`.
    WaitingForInput,
    /// Something went wrong; only `reset` helps now.
    Error,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Stopped => "stopped",
            RunState::Running => "running",
            RunState::Suspended => "suspended",
            RunState::WaitingForInput => "waiting for input",
            RunState::Error => "in error",
        };
        write!(f, "{}", name)
    }
}

/// The outcome of executing a single instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Suspended,
    WaitingForInput,
    Stopped,
}

/// Builds a read-only `View` from the VM's fields,
/// leaving the host free to be borrowed mutably.
macro_rules! view {
    ($vm:expr) => {
        View {
            current_node: $vm.current_node.as_deref(),
            variables: &$vm.variables,
            stack_depth: $vm.stack.len(),
        }
    };
}

/// A `VM` executes a linked dialogue program.
/// Each VM's state is self-contained,
/// So more than one can be spawned if needed.
///
/// Execution is driven by the host: `run` starts from the top,
/// and whenever the VM pauses, `resume` or `choose` picks it back up.
/// Each of these returns the state the VM halted in.
#[derive(Debug)]
pub struct VM<H: Host> {
    program: Program,
    host: H,
    ffi: FFI,
    state: RunState,
    pc: usize,
    stack: Vec<Value>,
    variables: HashMap<String, Value>,
    choices: Vec<(String, usize)>,
    current_node: Option<String>,
}

// this impl contains the state machine, inspection, and the core interpreter loop
// the next impl contains opcode implementations
impl<H: Host> VM<H> {
    /// Initialize a new VM with no native functions.
    pub fn init(program: Program, host: H) -> VM<H> {
        VM::with_ffi(program, host, FFI::new())
    }

    pub fn with_ffi(program: Program, host: H, ffi: FFI) -> VM<H> {
        VM {
            program,
            host,
            ffi,
            state: RunState::Stopped,
            pc: 0,
            stack: vec![],
            variables: HashMap::new(),
            choices: vec![],
            current_node: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn variables(&self) -> &HashMap<String, Value> {
        &self.variables
    }

    pub fn current_node(&self) -> Option<&str> {
        self.current_node.as_deref()
    }

    /// The text of each pending choice, in order.
    pub fn choices(&self) -> Vec<&str> {
        self.choices.iter().map(|(text, _)| text.as_str()).collect()
    }

    pub fn view(&self) -> View<'_> {
        view!(self)
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn ffi_mut(&mut self) -> &mut FFI {
        &mut self.ffi
    }

    /// Puts the VM into the error state, reporting why.
    fn fail(&mut self, trace: Trace) -> Trace {
        self.state = RunState::Error;
        warn!(%trace, "vm faulted");
        trace
    }

    fn invalid(&mut self, action: &'static str) -> Trace {
        let fault = Fault::InvalidTransition {
            action,
            state: self.state,
        };
        self.fail(Trace::error(fault))
    }

    /// Prepares a fresh run from the start of the program,
    /// without executing anything.
    /// Useful for single-stepping with `step`.
    pub fn start(&mut self) -> Result<(), Trace> {
        if self.state != RunState::Stopped {
            return Err(self.invalid("run"));
        }

        self.pc = self.program.start;
        self.stack.clear();
        self.variables.clear();
        self.choices.clear();
        self.current_node = None;
        self.state = RunState::Running;

        debug!(start = self.pc, "vm started");
        Ok(())
    }

    /// Runs the program from the start until it pauses, waits for a choice, or ends.
    pub fn run(&mut self) -> Result<RunState, Trace> {
        self.start()?;
        self.execute()
    }

    /// Picks up where a paused VM left off.
    pub fn resume(&mut self) -> Result<RunState, Trace> {
        if self.state != RunState::Suspended {
            return Err(self.invalid("resume"));
        }

        self.state = RunState::Running;
        debug!(pc = self.pc, "vm resumed");
        self.execute()
    }

    /// Answers a choice menu with the zero-based `index` of an option.
    /// An index out of range is reported without touching the VM,
    /// so the host may ask again.
    pub fn choose(&mut self, index: usize) -> Result<RunState, Trace> {
        if self.state != RunState::WaitingForInput {
            return Err(self.invalid("choose"));
        }

        let destination = match self.choices.get(index) {
            Some((_, destination)) => *destination,
            None => {
                return Err(Trace::error(Fault::ChoiceOutOfRange {
                    index,
                    count: self.choices.len(),
                }))
            },
        };

        self.state = RunState::Running;
        debug!(index, destination, "choice made");

        let node = self.current_node.clone().unwrap_or_default();
        let execution = self.host.exit_node(&view!(self), &node);

        self.pc = destination;
        self.choices.clear();

        if execution == Execution::Pause {
            self.state = RunState::Suspended;
            debug!(pc = self.pc, "vm suspended");
            return Ok(self.state);
        }

        self.execute()
    }

    /// Forces the VM back to `Stopped`, whatever it was doing.
    pub fn reset(&mut self) {
        debug!(from = %self.state, "vm reset");
        self.state = RunState::Stopped;
    }

    /// Steps through instructions while the VM is running.
    fn execute(&mut self) -> Result<RunState, Trace> {
        while self.state == RunState::Running {
            self.step()?;
        }
        Ok(self.state)
    }

    /// Dissasembles and interprets a single (potentially fallible) instruction.
    /// The VM must be running.
    pub fn step(&mut self) -> Result<Step, Trace> {
        if self.state != RunState::Running {
            return Err(self.invalid("step"));
        }

        let address = self.pc;
        let instruction = match self.program.code.get(address) {
            Some(instruction) => instruction.clone(),
            None => {
                let fault = Fault::OutOfBounds {
                    address,
                    length: self.program.code.len(),
                };
                return Err(self.fail(Trace::at(fault, address, None)));
            },
        };
        self.pc += 1;

        trace!(address, %instruction, depth = self.stack.len(), "step");

        let step = match self.dispatch(&instruction) {
            Ok(step) => step,
            Err(fault) => return Err(self.fail(Trace::at(fault, address, Some(instruction)))),
        };

        match step {
            Step::Continue => (),
            Step::Suspended => {
                self.state = RunState::Suspended;
                debug!(pc = self.pc, "vm suspended");
            },
            Step::WaitingForInput => {
                self.state = RunState::WaitingForInput;
                debug!(choices = self.choices.len(), "vm waiting for input");
            },
            Step::Stopped => {
                self.state = RunState::Stopped;
                debug!("vm stopped");
            },
        }

        Ok(step)
    }

    fn dispatch(&mut self, instruction: &Instruction) -> Result<Step, Fault> {
        let needed = instruction.opcode().stack_needed();
        if self.stack.len() < needed {
            return Err(Fault::StackUnderflow {
                needed,
                found: self.stack.len(),
            });
        }

        use Instruction as I;
        match instruction {
            I::PushString(s) => self.push(Value::String(s.clone())),
            I::PushNumber(n) => self.push(Value::Number(*n)),
            I::PushBool(b) => self.push(Value::Boolean(*b)),
            I::PushNull => self.push(Value::Nil),
            I::PopValue => self.pop().map(|_| Step::Continue),

            I::Concat => self.concat(),
            I::Equal => self.equal(),
            I::And => self.logic(|a, b| a && b),
            I::Or => self.logic(|a, b| a || b),
            I::Not => self.not(),

            I::GreaterThan => self.compare(|a, b| a > b),
            I::LessThan => self.compare(|a, b| a < b),
            I::Add => self.arithmetic(|a, b| a + b),
            I::Subtract => self.arithmetic(|a, b| a - b),
            I::Multiply => self.arithmetic(|a, b| a * b),
            I::Divide => self.arithmetic(|a, b| a / b),
            I::Increment => self.offset(1.0),
            I::Decrement => self.offset(-1.0),

            I::LoadVariable(name) => self.load(name),
            I::StoreVariable(name) => self.store(name),

            I::Jump(address) => self.jump(*address),
            I::JumpIfFalse(address) => self.jump_if_false(*address),

            I::ShowLine => self.show_line(),
            I::PushChoice(address) => self.push_choice(*address),
            I::ShowChoice(_) => self.show_choice(),
            I::EnterNode(node) => self.enter_node(node),
            I::ExitNode(node) => self.exit_node(node),
            I::EndDialogue => self.end_dialogue(),
            I::Call(name) => self.call(name),
        }
    }
}

/// Turns a host's execution signal into the step outcome.
fn signal(execution: Execution) -> Step {
    match execution {
        Execution::Continue => Step::Continue,
        Execution::Pause => Step::Suspended,
    }
}

// opcode implementations
impl<H: Host> VM<H> {
    fn push(&mut self, value: Value) -> Result<Step, Fault> {
        self.stack.push(value);
        Ok(Step::Continue)
    }

    fn pop(&mut self) -> Result<Value, Fault> {
        self.stack.pop().ok_or(Fault::StackUnderflow { needed: 1, found: 0 })
    }

    fn pop_number(&mut self) -> Result<f64, Fault> {
        match self.pop()? {
            Value::Number(n) => Ok(n),
            other => Err(Fault::TypeMismatch {
                expected: Type::Number,
                found: other.ty(),
            }),
        }
    }

    fn pop_boolean(&mut self) -> Result<bool, Fault> {
        match self.pop()? {
            Value::Boolean(b) => Ok(b),
            other => Err(Fault::TypeMismatch {
                expected: Type::Boolean,
                found: other.ty(),
            }),
        }
    }

    fn pop_string(&mut self) -> Result<String, Fault> {
        match self.pop()? {
            Value::String(s) => Ok(s),
            other => Err(Fault::TypeMismatch {
                expected: Type::String,
                found: other.ty(),
            }),
        }
    }

    /// Any two values, spliced together as text in the order they are popped:
    /// the top of the stack comes first.
    fn concat(&mut self) -> Result<Step, Fault> {
        let top = self.pop()?;
        let below = self.pop()?;
        self.push(Value::String(format!("{}{}", top, below)))
    }

    fn equal(&mut self) -> Result<Step, Fault> {
        let right = self.pop()?;
        let left = self.pop()?;
        self.push(Value::Boolean(left == right))
    }

    fn logic(&mut self, op: fn(bool, bool) -> bool) -> Result<Step, Fault> {
        let right = self.pop_boolean()?;
        let left = self.pop_boolean()?;
        self.push(Value::Boolean(op(left, right)))
    }

    fn not(&mut self) -> Result<Step, Fault> {
        let value = self.pop_boolean()?;
        self.push(Value::Boolean(!value))
    }

    fn compare(&mut self, op: fn(f64, f64) -> bool) -> Result<Step, Fault> {
        let right = self.pop_number()?;
        let left = self.pop_number()?;
        self.push(Value::Boolean(op(left, right)))
    }

    fn arithmetic(&mut self, op: fn(f64, f64) -> f64) -> Result<Step, Fault> {
        let right = self.pop_number()?;
        let left = self.pop_number()?;
        self.push(Value::Number(op(left, right)))
    }

    fn offset(&mut self, by: f64) -> Result<Step, Fault> {
        let value = self.pop_number()?;
        self.push(Value::Number(value + by))
    }

    /// Unbound variables are `nil`.
    fn load(&mut self, name: &str) -> Result<Step, Fault> {
        let value = self.variables.get(name).cloned().unwrap_or(Value::Nil);
        self.push(value)
    }

    fn store(&mut self, name: &str) -> Result<Step, Fault> {
        let value = self.pop()?;
        self.variables.insert(name.to_string(), value);
        Ok(Step::Continue)
    }

    fn jump(&mut self, address: usize) -> Result<Step, Fault> {
        self.pc = address;
        Ok(Step::Continue)
    }

    fn jump_if_false(&mut self, address: usize) -> Result<Step, Fault> {
        if !self.pop_boolean()? {
            self.pc = address;
        }
        Ok(Step::Continue)
    }

    fn show_line(&mut self) -> Result<Step, Fault> {
        let line = self.pop_string()?;
        Ok(signal(self.host.show_line(&view!(self), &line)))
    }

    fn push_choice(&mut self, address: usize) -> Result<Step, Fault> {
        let text = self.pop_string()?;
        self.choices.push((text, address));
        Ok(Step::Continue)
    }

    /// Presents the menu; destinations stay private until `choose`.
    fn show_choice(&mut self) -> Result<Step, Fault> {
        let texts = self.choices.iter().map(|(text, _)| text.clone()).collect::<Vec<_>>();
        self.host.show_choice(&view!(self), &texts);
        Ok(Step::WaitingForInput)
    }

    fn enter_node(&mut self, node: &str) -> Result<Step, Fault> {
        self.current_node = Some(node.to_string());
        Ok(signal(self.host.enter_node(&view!(self), node)))
    }

    fn exit_node(&mut self, node: &str) -> Result<Step, Fault> {
        Ok(signal(self.host.exit_node(&view!(self), node)))
    }

    fn end_dialogue(&mut self) -> Result<Step, Fault> {
        self.host.end_dialogue(&view!(self));
        Ok(Step::Stopped)
    }

    /// Checks the top of the stack against the function's prototype,
    /// deepest value first, before anything is popped.
    fn call(&mut self, name: &str) -> Result<Step, Fault> {
        let function = self
            .ffi
            .get(name)
            .ok_or_else(|| Fault::UnknownFunction(name.to_string()))?;

        let expected = function.prototype().len();
        if self.stack.len() < expected {
            return Err(Fault::Arity {
                name: name.to_string(),
                expected,
                found: self.stack.len(),
            });
        }

        let first = self.stack.len() - expected;
        for (index, (arg, ty)) in self.stack[first..].iter().zip(function.prototype()).enumerate() {
            if arg.ty() != *ty {
                return Err(Fault::ArgumentType {
                    name: name.to_string(),
                    index,
                    expected: *ty,
                    found: arg.ty(),
                });
            }
        }

        let args = self.stack.split_off(first);
        let execution = function.call(&args).map_err(|message| Fault::Native {
            name: name.to_string(),
            message,
        })?;

        Ok(signal(execution))
    }
}

#[cfg(test)]
mod test {
    use std::{cell::Cell, rc::Rc};

    use proptest::prelude::*;

    use super::*;
    use crate::{
        common::{source::Source, span::Span},
        compiler::{compile, gen::Compiler, link::Linker, read},
        vm::ffi::FFIFunction,
    };

    /// A host that remembers everything it was shown.
    #[derive(Debug, Default)]
    struct Recorder {
        events: Vec<String>,
        lines: Vec<String>,
        menus: Vec<Vec<String>>,
        pause_on_lines: bool,
        pause_on_enter: bool,
        pause_on_exit: bool,
    }

    fn pause_if(pause: bool) -> Execution {
        if pause {
            Execution::Pause
        } else {
            Execution::Continue
        }
    }

    impl Host for Recorder {
        fn enter_node(&mut self, _vm: &View, node: &str) -> Execution {
            self.events.push(format!("enter {}", node));
            pause_if(self.pause_on_enter)
        }

        fn exit_node(&mut self, _vm: &View, node: &str) -> Execution {
            self.events.push(format!("exit {}", node));
            pause_if(self.pause_on_exit)
        }

        fn show_line(&mut self, _vm: &View, line: &str) -> Execution {
            self.lines.push(line.to_string());
            pause_if(self.pause_on_lines)
        }

        fn show_choice(&mut self, _vm: &View, choices: &[String]) {
            self.menus.push(choices.to_vec());
        }

        fn end_dialogue(&mut self, _vm: &View) {
            self.events.push("end".to_string());
        }
    }

    /// Compiles a single term followed by `EndDialogue`,
    /// so whatever it leaves on the stack can be inspected.
    fn term(s: &str, statement: bool) -> Program {
        let source = Source::source(s);
        let term = read(&Span::whole(&source)).unwrap();
        let mut compiler = Compiler::base();
        compiler.current_node = Some("Test".into());
        if statement {
            compiler.statement(&term).unwrap();
        } else {
            compiler.expression(&term).unwrap();
        }
        compiler.emit(Instruction::EndDialogue);
        Linker::link(compiler).unwrap()
    }

    fn statement(s: &str) -> Program {
        term(s, true)
    }

    fn document(s: &str) -> Program {
        compile(&Source::source(s)).unwrap()
    }

    fn evaluate(s: &str) -> Result<Vec<Value>, Trace> {
        let mut vm = VM::init(term(s, false), ());
        vm.run()?;
        Ok(vm.stack().to_vec())
    }

    proptest! {
        #[test]
        fn arithmetic_matches(a in -1000.0..1000.0f64, b in 1.0..1000.0f64, op in 0usize..4) {
            let (instruction, expected) = match op {
                0 => (Instruction::Add, a + b),
                1 => (Instruction::Subtract, a - b),
                2 => (Instruction::Multiply, a * b),
                _ => (Instruction::Divide, a / b),
            };
            let program = Program::new(0, vec![
                Instruction::PushNumber(a),
                Instruction::PushNumber(b),
                instruction,
                Instruction::EndDialogue,
            ]);
            let mut vm = VM::init(program, ());
            prop_assert_eq!(vm.run(), Ok(RunState::Stopped));
            prop_assert_eq!(vm.stack(), &[Value::Number(expected)]);
        }
    }

    #[test]
    fn arithmetic() {
        assert_eq!(evaluate("(+ 3 4)").unwrap(), vec![Value::Number(7.0)]);
        assert_eq!(evaluate("(- 3 4)").unwrap(), vec![Value::Number(-1.0)]);
        assert_eq!(evaluate("(* 3 4)").unwrap(), vec![Value::Number(12.0)]);
        assert_eq!(evaluate("(/ 3 4)").unwrap(), vec![Value::Number(0.75)]);
        assert_eq!(evaluate("(- 10 4 3)").unwrap(), vec![Value::Number(3.0)]);
        assert_eq!(evaluate("(inc 3)").unwrap(), vec![Value::Number(4.0)]);
        assert_eq!(evaluate("(dec 3)").unwrap(), vec![Value::Number(2.0)]);
    }

    #[test]
    fn logic_and_comparison() {
        assert_eq!(evaluate("(and true false)").unwrap(), vec![Value::Boolean(false)]);
        assert_eq!(evaluate("(or false true)").unwrap(), vec![Value::Boolean(true)]);
        assert_eq!(evaluate("(not false)").unwrap(), vec![Value::Boolean(true)]);
        assert_eq!(evaluate("(gt 3 4)").unwrap(), vec![Value::Boolean(false)]);
        assert_eq!(evaluate("(lt 3 4)").unwrap(), vec![Value::Boolean(true)]);
        assert_eq!(evaluate("(eq 1 1)").unwrap(), vec![Value::Boolean(true)]);
        assert_eq!(evaluate("(eq 1 \"1\")").unwrap(), vec![Value::Boolean(false)]);
        assert_eq!(evaluate("(eq nil nil)").unwrap(), vec![Value::Boolean(true)]);
    }

    #[test]
    fn concat_follows_pop_order() {
        assert_eq!(evaluate("(concat \"a\" \"b\")").unwrap(), vec![Value::from("ba")]);
        assert_eq!(
            evaluate("(concat \"a\" 1 nil true)").unwrap(),
            vec![Value::String("truenil1a".into())]
        );

        let program = Program::new(
            0,
            vec![
                Instruction::PushString("a".into()),
                Instruction::PushString("b".into()),
                Instruction::Concat,
                Instruction::EndDialogue,
            ],
        );
        let mut vm = VM::init(program, ());
        assert_eq!(vm.run(), Ok(RunState::Stopped));
        assert_eq!(vm.stack(), &[Value::from("ba")]);
    }

    #[test]
    fn unbound_variables_are_nil() {
        assert_eq!(evaluate("missing").unwrap(), vec![Value::Nil]);
    }

    #[test]
    fn type_mismatch() {
        let trace = evaluate("(+ 1 \"a\")").unwrap_err();
        assert_eq!(
            trace.fault,
            Fault::TypeMismatch {
                expected: Type::Number,
                found: Type::String
            }
        );
        assert_eq!(trace.address, Some(2));
        assert_eq!(trace.instruction, Some(Instruction::Add));
    }

    #[test]
    fn while_loop() {
        let ticks = Rc::new(Cell::new(0));
        let counter = Rc::clone(&ticks);
        let mut ffi = FFI::new();
        ffi.add(
            "tick",
            FFIFunction::new(vec![], move |_| {
                counter.set(counter.get() + 1);
                Ok(Execution::Continue)
            }),
        );

        let program = statement("(do (set! var 0) (while (lt var 3) (do (tick) (set! var (inc var)))))");
        let mut vm = VM::with_ffi(program, (), ffi);
        assert_eq!(vm.run(), Ok(RunState::Stopped));
        assert_eq!(ticks.get(), 3);
        assert_eq!(vm.variable("var"), Some(&Value::Number(3.0)));
        assert!(vm.stack().is_empty());
    }

    #[test]
    fn if_runs_one_branch() {
        for (condition, expected) in [("true", "yes"), ("false", "no")] {
            let program = statement(&format!("(if {} (print \"yes\") (print \"no\"))", condition));
            let mut vm = VM::init(program, Recorder::default());
            vm.run().unwrap();
            assert_eq!(vm.host().lines, vec![expected.to_string()]);
        }

        assert_eq!(evaluate("(if (gt 2 1) 10 20)").unwrap(), vec![Value::Number(10.0)]);
    }

    const MENU: &str = "\
# Start

Pick one.

1. [Left](Left)
2. [Right](Right)
3. [Stay](Start)

# Left

Went left.

# Right

Went right.
";

    #[test]
    fn choices() {
        let mut vm = VM::init(document(MENU), Recorder::default());
        assert_eq!(vm.run(), Ok(RunState::WaitingForInput));
        assert_eq!(vm.host().menus, vec![vec!["Left", "Right", "Stay"]]);
        assert_eq!(vm.choices(), vec!["Left", "Right", "Stay"]);
        assert_eq!(vm.current_node(), Some("Start"));

        // out of range leaves the vm as it was
        let trace = vm.choose(3).unwrap_err();
        assert_eq!(trace.fault, Fault::ChoiceOutOfRange { index: 3, count: 3 });
        assert_eq!(vm.state(), RunState::WaitingForInput);
        assert_eq!(vm.choices().len(), 3);

        assert_eq!(vm.choose(1), Ok(RunState::Stopped));
        assert!(vm.choices().is_empty());
        assert_eq!(vm.host().lines, vec!["Pick one.", "Went right."]);
        assert_eq!(
            vm.host().events,
            vec!["enter Start", "exit Start", "enter Right", "exit Right", "end"]
        );
    }

    #[test]
    fn choosing_loops_back() {
        let mut vm = VM::init(document(MENU), Recorder::default());
        vm.run().unwrap();
        assert_eq!(vm.choose(2), Ok(RunState::WaitingForInput));
        assert_eq!(vm.host().menus.len(), 2);
        assert_eq!(vm.host().lines, vec!["Pick one.", "Pick one."]);
    }

    #[test]
    fn end_dialogue_only() {
        let mut vm = VM::init(Program::new(0, vec![Instruction::EndDialogue]), Recorder::default());
        assert_eq!(vm.run(), Ok(RunState::Stopped));
        assert!(vm.stack().is_empty());
        assert_eq!(vm.host().events, vec!["end"]);
    }

    #[test]
    fn lone_pop_underflows() {
        let mut vm = VM::init(Program::new(0, vec![Instruction::PopValue]), ());
        let trace = vm.run().unwrap_err();
        assert_eq!(trace.fault, Fault::StackUnderflow { needed: 1, found: 0 });
        assert_eq!(vm.state(), RunState::Error);

        // nothing works until reset
        assert!(vm.run().is_err());
        vm.reset();
        assert_eq!(vm.state(), RunState::Stopped);
    }

    #[test]
    fn empty_program() {
        let mut vm = VM::init(Program::new(0, vec![]), ());
        let trace = vm.run().unwrap_err();
        assert_eq!(trace.fault, Fault::OutOfBounds { address: 0, length: 0 });
        assert_eq!(vm.state(), RunState::Error);
    }

    #[test]
    fn wrong_state() {
        let mut vm = VM::init(Program::new(0, vec![Instruction::EndDialogue]), ());
        let trace = vm.resume().unwrap_err();
        assert_eq!(
            trace.fault,
            Fault::InvalidTransition {
                action: "resume",
                state: RunState::Stopped
            }
        );
        assert_eq!(vm.state(), RunState::Error);

        vm.reset();
        assert!(vm.choose(0).is_err());
    }

    #[test]
    fn reset_starts_fresh() {
        let counter = "# A\n\n```\n(if (eq runs nil) (set! runs 1) (set! runs (inc runs)))\n```\n";
        let mut vm = VM::init(document(counter), ());
        assert_eq!(vm.run(), Ok(RunState::Stopped));
        assert_eq!(vm.variable("runs"), Some(&Value::Number(1.0)));

        // a stopped vm can run again, from scratch
        assert_eq!(vm.run(), Ok(RunState::Stopped));
        assert_eq!(vm.variable("runs"), Some(&Value::Number(1.0)));

        let mut vm = VM::init(document(MENU), Recorder::default());
        vm.run().unwrap();
        vm.reset();
        assert_eq!(vm.state(), RunState::Stopped);
        assert_eq!(vm.run(), Ok(RunState::WaitingForInput));
        assert_eq!(vm.choices().len(), 3);
        assert!(vm.stack().is_empty());
    }

    #[test]
    fn pause_and_resume() {
        let host = Recorder {
            pause_on_lines: true,
            ..Recorder::default()
        };
        let mut vm = VM::init(document("# A\n\nOne.\n\nTwo.\n"), host);

        assert_eq!(vm.run(), Ok(RunState::Suspended));
        assert_eq!(vm.host().lines, vec!["One."]);
        assert_eq!(vm.resume(), Ok(RunState::Suspended));
        assert_eq!(vm.host().lines, vec!["One.", "Two."]);
        assert_eq!(vm.resume(), Ok(RunState::Stopped));
        assert_eq!(vm.host().events, vec!["enter A", "exit A", "end"]);
    }

    #[test]
    fn exit_pauses_a_choice() {
        let host = Recorder {
            pause_on_exit: true,
            ..Recorder::default()
        };
        let mut vm = VM::init(document(MENU), host);
        assert_eq!(vm.run(), Ok(RunState::WaitingForInput));

        let right = vm
            .program()
            .code
            .iter()
            .position(|i| *i == Instruction::EnterNode("Right".into()))
            .unwrap();

        // the jump happens before the vm suspends
        assert_eq!(vm.choose(1), Ok(RunState::Suspended));
        assert_eq!(vm.pc(), right);
        assert!(vm.choices().is_empty());
        assert_eq!(vm.current_node(), Some("Start"));

        // leaving Right pauses again, on the way to the end
        assert_eq!(vm.resume(), Ok(RunState::Suspended));
        assert_eq!(vm.current_node(), Some("Right"));
        assert_eq!(vm.host().lines, vec!["Pick one.", "Went right."]);
        assert_eq!(vm.resume(), Ok(RunState::Stopped));
        assert_eq!(
            vm.host().events,
            vec!["enter Start", "exit Start", "enter Right", "exit Right", "end"]
        );
    }

    #[test]
    fn enter_pauses() {
        let host = Recorder {
            pause_on_enter: true,
            ..Recorder::default()
        };
        let mut vm = VM::init(document("# A\n\nHi.\n"), host);
        assert_eq!(vm.run(), Ok(RunState::Suspended));
        assert_eq!(vm.current_node(), Some("A"));
        assert!(vm.host().lines.is_empty());
        assert_eq!(vm.resume(), Ok(RunState::Stopped));
        assert_eq!(vm.host().lines, vec!["Hi."]);
    }

    #[test]
    fn reset_while_suspended() {
        let host = Recorder {
            pause_on_lines: true,
            ..Recorder::default()
        };
        let mut vm = VM::init(document("# A\n\nOne.\n\nTwo.\n"), host);
        assert_eq!(vm.run(), Ok(RunState::Suspended));

        vm.reset();
        assert_eq!(vm.state(), RunState::Stopped);
        assert!(vm.resume().is_err());

        vm.reset();
        assert_eq!(vm.run(), Ok(RunState::Suspended));
        assert_eq!(vm.host().lines, vec!["One.", "One."]);
        assert!(vm.stack().is_empty());
        assert_eq!(vm.resume(), Ok(RunState::Suspended));
        assert_eq!(vm.host().lines, vec!["One.", "One.", "Two."]);
    }

    #[test]
    fn single_step() {
        let mut vm = VM::init(document("# A\n\nHi.\n"), ());
        vm.start().unwrap();
        assert_eq!(vm.step(), Ok(Step::Continue));
        assert_eq!(vm.current_node(), Some("A"));
        assert_eq!(vm.step(), Ok(Step::Continue));
        assert_eq!(vm.stack(), &[Value::from("Hi.")]);
        assert_eq!(vm.pc(), 2);
        while vm.step() == Ok(Step::Continue) {}
        assert_eq!(vm.state(), RunState::Stopped);
    }

    #[test]
    fn natives() {
        let rolled = Rc::new(Cell::new(0.0));
        let seen = Rc::clone(&rolled);
        let mut ffi = FFI::new();
        ffi.add(
            "roll",
            FFIFunction::new(vec![Type::Number, Type::String], move |args| match args {
                [Value::Number(n), Value::String(_)] => {
                    seen.set(*n);
                    Ok(Execution::Pause)
                },
                _ => Err("bad arguments".to_string()),
            }),
        );

        let mut vm = VM::with_ffi(statement("(roll 6 \"d6\")"), (), ffi);
        assert_eq!(vm.run(), Ok(RunState::Suspended));
        assert_eq!(rolled.get(), 6.0);
        assert!(vm.stack().is_empty());
        assert_eq!(vm.resume(), Ok(RunState::Stopped));

        // arguments are checked deepest first, before anything is popped
        let program = Program::new(
            0,
            vec![
                Instruction::PushString("d6".into()),
                Instruction::PushNumber(6.0),
                Instruction::Call("roll".into()),
            ],
        );
        let mut vm = VM::init(program, ());
        vm.ffi_mut().add(
            "roll",
            FFIFunction::new(vec![Type::Number, Type::String], |_| Ok(Execution::Continue)),
        );
        assert_eq!(
            vm.run().unwrap_err().fault,
            Fault::ArgumentType {
                name: "roll".into(),
                index: 0,
                expected: Type::Number,
                found: Type::String,
            }
        );
        assert_eq!(vm.stack().len(), 2);

        let mut vm = VM::init(Program::new(0, vec![Instruction::Call("roll".into())]), ());
        vm.ffi_mut().add("roll", FFIFunction::new(vec![Type::Number], |_| Ok(Execution::Continue)));
        assert_eq!(
            vm.run().unwrap_err().fault,
            Fault::Arity {
                name: "roll".into(),
                expected: 1,
                found: 0
            }
        );

        let mut vm = VM::init(statement("(fail)"), ());
        assert_eq!(vm.run().unwrap_err().fault, Fault::UnknownFunction("fail".into()));

        let mut vm = VM::init(statement("(fail)"), ());
        vm.ffi_mut().add("fail", FFIFunction::new(vec![], |_| Err("no dice".to_string())));
        assert_eq!(
            vm.run().unwrap_err().fault,
            Fault::Native {
                name: "fail".into(),
                message: "no dice".into()
            }
        );
    }
}
