use tracing::debug;

use crate::{
    common::program::Program,
    compiler::{
        gen::Compiler,
        syntax::{Note, Syntax},
    },
};

/// Resolves every forward reference recorded during compilation
/// against the symbol table, producing an immutable program.
pub struct Linker;

impl Linker {
    pub fn link(compiler: Compiler) -> Result<Program, Syntax> {
        let Compiler {
            mut code,
            symbols,
            backrefs,
            ..
        } = compiler;

        for backref in backrefs.iter() {
            let address = symbols.get(&backref.target.item).ok_or_else(|| {
                Syntax::error_with_note(
                    "Unresolved symbol",
                    Note::new_with_hint(
                        &format!("there is no node or label named `{}`", backref.target.item),
                        &backref.target.span,
                    ),
                )
            })?;

            let patched = code
                .get_mut(backref.address)
                .map_or(false, |instruction| instruction.retarget(address.item));

            if !patched {
                return Err(Syntax::error_with_note(
                    "Invalid backreference",
                    Note::new_with_hint("only jumps and choices can refer to a node", &backref.target.span),
                ));
            }
        }

        debug!(backrefs = backrefs.len(), symbols = symbols.len(), "linked program");
        Ok(Program::new(0, code))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::{
        program::Instruction,
        source::Source,
        span::{Span, Spanned},
    };

    #[test]
    fn resolves_forward_references() {
        let source = Source::source("Later");
        let span = Span::whole(&source);
        let mut compiler = Compiler::base();
        compiler.forward(Instruction::Jump(0), Spanned::new("Later".into(), span.clone()));
        compiler.emit(Instruction::PushNull);
        compiler.define("Later", &span).unwrap();
        compiler.emit(Instruction::EndDialogue);

        let program = Linker::link(compiler).unwrap();
        assert_eq!(program.code[0], Instruction::Jump(2));
        assert_eq!(program.start, 0);
    }

    #[test]
    fn unresolved() {
        let source = Source::source("Nowhere");
        let mut compiler = Compiler::base();
        compiler.forward(
            Instruction::PushChoice(0),
            Spanned::new("Nowhere".into(), Span::whole(&source)),
        );

        let error = Linker::link(compiler).unwrap_err();
        assert_eq!(error.reason, "Unresolved symbol");
        assert_eq!(error.notes[0].span.contents(), "Nowhere");
    }
}
