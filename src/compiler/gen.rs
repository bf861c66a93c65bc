use std::collections::HashMap;

use crate::{
    common::{
        opcode::{Opcode, Operand},
        program::Instruction,
        span::{Span, Spanned},
        value::Value,
    },
    compiler::syntax::{Note, Syntax},
    construct::{
        operator::{Class, Operator},
        term::Term,
    },
};

/// An operand that will only be known once the whole document
/// has been compiled: the address of the instruction to patch,
/// and the name of the node or label it should point to.
#[derive(Debug, Clone, PartialEq)]
pub struct Backref {
    pub target: Spanned<String>,
    pub address: usize,
}

/// Compiler is a bytecode generator that walks terms of the
/// expression language and produces flat, unlinked bytecode.
/// It also holds everything the document compiler and linker
/// need to share: the symbol table, the pending backreferences,
/// and the node currently being emitted.
#[derive(Debug, Default)]
pub struct Compiler {
    pub code: Vec<Instruction>,
    pub symbols: HashMap<String, Spanned<usize>>,
    pub backrefs: Vec<Backref>,
    pub current_node: Option<String>,
}

impl Compiler {
    pub fn base() -> Compiler {
        Compiler::default()
    }

    /// The address the next instruction will be written to.
    pub fn pc(&self) -> usize {
        self.code.len()
    }

    /// Appends an instruction, returning its address.
    pub fn emit(&mut self, instruction: Instruction) -> usize {
        self.code.push(instruction);
        self.code.len() - 1
    }

    /// Emits an instruction whose address operand is a placeholder,
    /// to be filled in by the linker once `target` is known.
    pub fn forward(&mut self, instruction: Instruction, target: Spanned<String>) -> usize {
        let address = self.emit(instruction);
        self.backrefs.push(Backref { target, address });
        address
    }

    /// Points an already-emitted jump at `target`.
    pub fn patch(&mut self, address: usize, target: usize) {
        if let Some(instruction) = self.code.get_mut(address) {
            let patched = instruction.retarget(target);
            debug_assert!(patched, "tried to patch a non-jump instruction");
        }
    }

    /// Binds a node or label name to the current address.
    pub fn define(&mut self, name: &str, span: &Span) -> Result<(), Syntax> {
        if let Some(previous) = self.symbols.get(name) {
            return Err(Syntax::error_with_note(
                "Duplicate symbol",
                Note::new_with_hint(&format!("`{}` is defined here", name), &previous.span),
            )
            .add_note(Note::new_with_hint("and defined again here", span)));
        }

        self.symbols.insert(name.to_string(), Spanned::new(self.pc(), span.clone()));
        Ok(())
    }

    /// Compiles a term that must leave exactly one value on the stack.
    pub fn expression(&mut self, term: &Spanned<Term>) -> Result<(), Syntax> {
        match self.walk(term)? {
            Class::Expression => Ok(()),
            Class::Statement => Err(Syntax::error_with_note(
                "Expected an expression",
                Note::new_with_hint("this is a statement, which produces no value", &term.span),
            )),
        }
    }

    /// Compiles a term that must leave the stack as it found it.
    pub fn statement(&mut self, term: &Spanned<Term>) -> Result<(), Syntax> {
        match self.walk(term)? {
            Class::Statement => Ok(()),
            Class::Expression => Err(Syntax::error_with_note(
                "Expected a statement",
                Note::new_with_hint(
                    "this value is never used; try `set!` or `print`",
                    &term.span,
                ),
            )),
        }
    }

    /// Walks a term to generate bytecode,
    /// returning whether the generated code leaves a value behind.
    fn walk(&mut self, term: &Spanned<Term>) -> Result<Class, Syntax> {
        let instruction = match &term.item {
            Term::Symbol(name) => Instruction::LoadVariable(name.clone()),
            Term::Lit(Value::String(s)) => Instruction::PushString(s.clone()),
            Term::Lit(Value::Number(n)) => Instruction::PushNumber(*n),
            Term::Lit(Value::Boolean(b)) => Instruction::PushBool(*b),
            Term::Lit(Value::Nil) => Instruction::PushNull,
            Term::Lit(Value::Symbol(name)) => Instruction::LoadVariable(name.clone()),
            Term::List(items) => return self.form(items, &term.span),
        };

        self.emit(instruction);
        Ok(Class::Expression)
    }

    /// A list is either a built-in operator or a call to a native function.
    fn form(&mut self, items: &[Spanned<Term>], span: &Span) -> Result<Class, Syntax> {
        let (head, operands) = items.split_first().ok_or_else(|| {
            Syntax::error_with_note(
                "Invalid form",
                Note::new_with_hint("an empty list has no operator to apply", span),
            )
        })?;

        let name = match &head.item {
            Term::Symbol(name) => name,
            _ => {
                return Err(Syntax::error_with_note(
                    "Invalid form",
                    Note::new_with_hint("expected an operator or function name", &head.span),
                ))
            },
        };

        let operator = match Operator::try_new(name) {
            Some(operator) => operator,
            None => return self.call(name, operands),
        };

        if !operator.arity().accepts(operands.len()) {
            return Err(Syntax::error_with_note(
                "Invalid form",
                Note::new_with_hint(
                    &format!(
                        "`{}` takes {}, found {}",
                        operator,
                        operator.arity(),
                        operands.len()
                    ),
                    span,
                ),
            ));
        }

        use Operator::*;
        match operator {
            Assign => self.assign(&operands[0], &operands[1])?,
            While => self.while_loop(&operands[0], &operands[1])?,
            If => return self.conditional(&operands[0], &operands[1], &operands[2]),
            Do => self.sequence(operands)?,
            Print => self.print(&operands[0])?,
            Choose => self.choose(operands, span)?,
            Asm => self.asm(operands)?,
            _ => self.fold(operator, operands)?,
        }

        Ok(operator.class())
    }

    /// Comparisons, unary operators, and left-folding variadic operators:
    /// every operand is compiled in order, with the operator's opcode
    /// emitted after each operand past the first.
    /// Unary operators emit their opcode once, after their only operand.
    fn fold(&mut self, operator: Operator, operands: &[Spanned<Term>]) -> Result<(), Syntax> {
        let instruction = operator
            .opcode()
            .and_then(|opcode| Instruction::build(opcode, None))
            .ok_or_else(|| Syntax::error_no_note(&format!("`{}` can't be folded", operator)))?;

        if operands.len() == 1 && !operator.is_variadic() {
            self.expression(&operands[0])?;
            self.emit(instruction);
            return Ok(());
        }

        for (index, operand) in operands.iter().enumerate() {
            self.expression(operand)?;
            if index > 0 {
                self.emit(instruction.clone());
            }
        }

        Ok(())
    }

    fn assign(&mut self, target: &Spanned<Term>, value: &Spanned<Term>) -> Result<(), Syntax> {
        let name = match &target.item {
            Term::Symbol(name) => name.clone(),
            _ => {
                return Err(Syntax::error_with_note(
                    "Invalid form",
                    Note::new_with_hint("`set!` can only assign to a variable name", &target.span),
                ))
            },
        };

        self.expression(value)?;
        self.emit(Instruction::StoreVariable(name));
        Ok(())
    }

    /// ```plain
    /// top:
    ///     <condition>
    ///     JumpIfFalse end
    ///     <body>
    ///     Jump top
    /// end:
    /// ```
    fn while_loop(&mut self, condition: &Spanned<Term>, body: &Spanned<Term>) -> Result<(), Syntax> {
        let top = self.pc();
        self.expression(condition)?;
        let exit = self.emit(Instruction::JumpIfFalse(0));
        self.statement(body)?;
        self.emit(Instruction::Jump(top));
        self.patch(exit, self.pc());
        Ok(())
    }

    /// ```plain
    ///     <condition>
    ///     JumpIfFalse alternative
    ///     <consequence>
    ///     Jump end
    /// alternative:
    ///     <alternative>
    /// end:
    /// ```
    /// The branches must agree: both expressions, or both statements.
    fn conditional(
        &mut self,
        condition: &Spanned<Term>,
        consequence: &Spanned<Term>,
        alternative: &Spanned<Term>,
    ) -> Result<Class, Syntax> {
        self.expression(condition)?;
        let skip = self.emit(Instruction::JumpIfFalse(0));
        let class = self.walk(consequence)?;
        let end = self.emit(Instruction::Jump(0));
        self.patch(skip, self.pc());
        match class {
            Class::Expression => self.expression(alternative)?,
            Class::Statement => self.statement(alternative)?,
        }
        self.patch(end, self.pc());
        Ok(class)
    }

    fn sequence(&mut self, terms: &[Spanned<Term>]) -> Result<(), Syntax> {
        for term in terms {
            self.statement(term)?;
        }
        Ok(())
    }

    fn print(&mut self, line: &Spanned<Term>) -> Result<(), Syntax> {
        self.expression(line)?;
        self.emit(Instruction::ShowLine);
        Ok(())
    }

    /// Each option is a `(text Destination)` pair.
    fn choose(&mut self, options: &[Spanned<Term>], span: &Span) -> Result<(), Syntax> {
        let node = self.current_node.clone().ok_or_else(|| {
            Syntax::error_with_note(
                "Invalid form",
                Note::new_with_hint("`choose` can only be used inside a node", span),
            )
        })?;

        for option in options {
            let (text, destination) = match &option.item {
                Term::List(pair) if pair.len() == 2 => match &pair[1].item {
                    Term::Symbol(name) => (&pair[0], Spanned::new(name.clone(), pair[1].span.clone())),
                    _ => {
                        return Err(Syntax::error_with_note(
                            "Invalid form",
                            Note::new_with_hint("the destination must be a node name", &pair[1].span),
                        ))
                    },
                },
                _ => {
                    return Err(Syntax::error_with_note(
                        "Invalid form",
                        Note::new_with_hint(
                            "each option is a list like `(\"Leave\" Hallway)`",
                            &option.span,
                        ),
                    ))
                },
            };

            self.expression(text)?;
            self.forward(Instruction::PushChoice(0), destination);
        }

        self.emit(Instruction::ShowChoice(node));
        Ok(())
    }

    /// Raw bytecode: each element is `(Opcode operand?)`, or `(Label name)`
    /// which names the address of the next instruction.
    fn asm(&mut self, elements: &[Spanned<Term>]) -> Result<(), Syntax> {
        let invalid = |hint: &str, span: &Span| {
            Syntax::error_with_note("Invalid asm", Note::new_with_hint(hint, span))
        };

        for element in elements {
            let (head, args) = match (&element.item, element.item.head()) {
                (Term::List(items), Some(head)) => (head, &items[1..]),
                (Term::List(_), None) => {
                    return Err(invalid("expected an opcode name", &element.span))
                },
                _ => {
                    return Err(invalid(
                        "each instruction is a list like `(PushNumber 3)`",
                        &element.span,
                    ))
                },
            };

            let operand = match args {
                [] => None,
                [Spanned { item: Term::Symbol(name), .. }] => Some(Value::Symbol(name.clone())),
                [Spanned { item: Term::Lit(lit), .. }] => Some(lit.clone()),
                _ => return Err(invalid("an instruction takes at most one operand", &element.span)),
            };

            if head == "Label" {
                match operand {
                    Some(Value::Symbol(label)) => self.define(&label, &element.span)?,
                    _ => return Err(invalid("a label needs a name", &element.span)),
                }
                continue;
            }

            let opcode = Opcode::from_name(head)
                .ok_or_else(|| invalid(&format!("`{}` is not an opcode", head), &element.span))?;

            let mismatch = || {
                invalid(
                    &format!("`{}` does not take this operand", opcode),
                    &element.span,
                )
            };

            if opcode.operand() == Operand::Address {
                let target = match operand {
                    Some(Value::Symbol(target)) => target,
                    _ => return Err(mismatch()),
                };
                let placeholder =
                    Instruction::build(opcode, Some(Value::Number(0.0))).ok_or_else(mismatch)?;
                let target_span = args[0].span.clone();
                self.forward(placeholder, Spanned::new(target, target_span));
            } else {
                let instruction = Instruction::build(opcode, operand).ok_or_else(mismatch)?;
                self.emit(instruction);
            }
        }

        Ok(())
    }

    /// Arguments are pushed left to right, then the function is called by name.
    fn call(&mut self, name: &str, args: &[Spanned<Term>]) -> Result<Class, Syntax> {
        for arg in args {
            self.expression(arg)?;
        }
        self.emit(Instruction::Call(name.to_string()));
        Ok(Class::Statement)
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;
    use crate::{common::source::Source, compiler::read};

    fn gen(s: &str) -> Result<Vec<Instruction>, Syntax> {
        let source = Source::source(s);
        let term = read(&Span::whole(&source))?;
        let mut compiler = Compiler::base();
        compiler.current_node = Some("Test".into());
        compiler.walk(&term)?;
        Ok(compiler.code)
    }

    #[test]
    fn atoms() {
        use Instruction::*;
        assert_eq!(gen("abc123").unwrap(), vec![LoadVariable("abc123".into())]);
        assert_eq!(gen("\"abc123\"").unwrap(), vec![PushString("abc123".into())]);
        assert_eq!(gen("123").unwrap(), vec![PushNumber(123.0)]);
        assert_eq!(gen("true").unwrap(), vec![PushBool(true)]);
        assert_eq!(gen("false").unwrap(), vec![PushBool(false)]);
        assert_eq!(gen("nil").unwrap(), vec![PushNull]);
    }

    #[test]
    fn arithmetic_folds_left() {
        use Instruction::*;
        assert_eq!(
            gen("(+ 3 4 5)").unwrap(),
            vec![PushNumber(3.0), PushNumber(4.0), Add, PushNumber(5.0), Add]
        );
        assert_eq!(gen("(/ 3 4)").unwrap(), vec![PushNumber(3.0), PushNumber(4.0), Divide]);
        assert_eq!(gen("(- 3)").unwrap(), vec![PushNumber(3.0)]);
        assert_eq!(
            gen("(concat \"3\" \"4\")").unwrap(),
            vec![PushString("3".into()), PushString("4".into()), Concat]
        );
    }

    #[test]
    fn comparisons_and_unary() {
        use Instruction::*;
        assert_eq!(gen("(gt 3 4)").unwrap(), vec![PushNumber(3.0), PushNumber(4.0), GreaterThan]);
        assert_eq!(gen("(lt 3 4)").unwrap(), vec![PushNumber(3.0), PushNumber(4.0), LessThan]);
        assert_eq!(gen("(eq 3 4)").unwrap(), vec![PushNumber(3.0), PushNumber(4.0), Equal]);
        assert_eq!(gen("(inc 3)").unwrap(), vec![PushNumber(3.0), Increment]);
        assert_eq!(gen("(dec 3)").unwrap(), vec![PushNumber(3.0), Decrement]);
        assert_eq!(gen("(not true)").unwrap(), vec![PushBool(true), Not]);
    }

    #[test]
    fn strict_arity() {
        for bad in ["(inc 1 2)", "(gt 1)", "(not)", "(if a b)", "(set! a)", "(+)", "(do)", "()"] {
            let error = gen(bad).unwrap_err();
            assert_eq!(error.reason, "Invalid form", "{}", bad);
        }
    }

    #[test]
    fn while_layout() {
        use Instruction::*;
        assert_eq!(
            gen("(while (lt var 3) (set! var (inc var)))").unwrap(),
            vec![
                LoadVariable("var".into()),
                PushNumber(3.0),
                LessThan,
                JumpIfFalse(8),
                LoadVariable("var".into()),
                Increment,
                StoreVariable("var".into()),
                Jump(0),
            ]
        );
    }

    #[test]
    fn if_layout() {
        use Instruction::*;
        assert_eq!(
            gen("(if (lt var 3) (set! var (inc var)) (set! var (dec var)))").unwrap(),
            vec![
                LoadVariable("var".into()),
                PushNumber(3.0),
                LessThan,
                JumpIfFalse(8),
                LoadVariable("var".into()),
                Increment,
                StoreVariable("var".into()),
                Jump(11),
                LoadVariable("var".into()),
                Decrement,
                StoreVariable("var".into()),
            ]
        );
    }

    #[test]
    fn if_classes() {
        // as an expression
        assert!(gen("(print (if flag \"yes\" \"no\"))").is_ok());
        // as a statement
        assert!(gen("(do (if flag (print \"yes\") (print \"no\")))").is_ok());
        // mixed branches
        assert_eq!(gen("(if flag 1 (print \"no\"))").unwrap_err().reason, "Expected an expression");
        // a statement where a value is needed
        assert_eq!(
            gen("(print (if flag (print \"a\") (print \"b\")))").unwrap_err().reason,
            "Expected an expression"
        );
    }

    #[test]
    fn statements_and_expressions() {
        assert_eq!(gen("(+ 1 (set! a 2))").unwrap_err().reason, "Expected an expression");
        assert_eq!(gen("(do 1)").unwrap_err().reason, "Expected a statement");
        assert_eq!(gen("(while true 1)").unwrap_err().reason, "Expected a statement");
        assert_eq!(gen("(set! (a) 1)").unwrap_err().reason, "Invalid form");
    }

    #[test]
    fn calls() {
        use Instruction::*;
        assert_eq!(
            gen("(give_item \"lamp\" 2)").unwrap(),
            vec![PushString("lamp".into()), PushNumber(2.0), Call("give_item".into())]
        );
        assert_eq!(gen("(print (roll))").unwrap_err().reason, "Expected an expression");
    }

    #[test]
    fn choose() {
        let source = Source::source("(choose (\"Left\" West) ((concat \"Ri\" \"ght\") East))");
        let term = read(&Span::whole(&source)).unwrap();
        let mut compiler = Compiler::base();
        compiler.current_node = Some("Fork".into());
        compiler.statement(&term).unwrap();

        use Instruction::*;
        assert_eq!(
            compiler.code,
            vec![
                PushString("Left".into()),
                PushChoice(0),
                PushString("Ri".into()),
                PushString("ght".into()),
                Concat,
                PushChoice(0),
                ShowChoice("Fork".into()),
            ]
        );
        let targets = compiler
            .backrefs
            .iter()
            .map(|b| (b.target.item.as_str(), b.address))
            .collect::<Vec<_>>();
        assert_eq!(targets, vec![("West", 1), ("East", 5)]);
    }

    #[test]
    fn choose_needs_a_node() {
        let source = Source::source("(choose (\"Left\" West))");
        let term = read(&Span::whole(&source)).unwrap();
        let mut compiler = Compiler::base();
        assert!(compiler.statement(&term).is_err());
    }

    #[test]
    fn asm() {
        let source = Source::source(
            "(asm (Label top) (LoadVariable, abc) (PushNumber 1) (Add) (StoreVariable abc) (Jump top) (Lessthan))",
        );
        let term = read(&Span::whole(&source)).unwrap();
        let mut compiler = Compiler::base();
        compiler.statement(&term).unwrap();

        use Instruction::*;
        assert_eq!(
            compiler.code,
            vec![
                LoadVariable("abc".into()),
                PushNumber(1.0),
                Add,
                StoreVariable("abc".into()),
                Jump(0),
                LessThan,
            ]
        );
        assert_eq!(compiler.symbols["top"].item, 0);
        assert_eq!(compiler.backrefs[0].target.item, "top");
        assert_eq!(compiler.backrefs[0].address, 4);
    }

    #[test]
    fn invalid_asm() {
        for bad in [
            "(asm (PushString 3))",
            "(asm (PushNumber \"3\"))",
            "(asm (Add 1))",
            "(asm (Jump 3))",
            "(asm (Frobnicate))",
            "(asm (Label))",
            "(asm PushNull)",
            "(asm (\"Add\"))",
            "(asm (LoadVariable \"a\"))",
        ] {
            assert_eq!(gen(bad).unwrap_err().reason, "Invalid asm", "{}", bad);
        }
    }

    #[test]
    fn duplicate_labels() {
        let error = gen("(asm (Label a) (Label a))").unwrap_err();
        assert_eq!(error.reason, "Duplicate symbol");
        assert_eq!(error.notes.len(), 2);
    }

    proptest! {
        #[test]
        fn variadic_fold_count(
            op in prop::sample::select(vec!["+", "-", "*", "/", "concat", "and", "or"]),
            n in 1usize..24,
        ) {
            let operands = (0..n).map(|i| format!("x{}", i)).collect::<Vec<_>>().join(" ");
            let code = gen(&format!("({} {})", op, operands)).unwrap();
            let opcode = Operator::try_new(op).unwrap().opcode().unwrap();

            prop_assert_eq!(code.len(), 2 * n - 1);
            let folds = code.iter().filter(|i| i.opcode() == opcode).count();
            prop_assert_eq!(folds, n - 1);
            // left-folded: every operand after the first is followed by the operator
            prop_assert_eq!(&code[0], &Instruction::LoadVariable("x0".into()));
            for i in 1..n {
                prop_assert_eq!(&code[2 * i - 1], &Instruction::LoadVariable(format!("x{}", i)));
                prop_assert_eq!(code[2 * i].opcode(), opcode);
            }
        }
    }
}
