use std::{collections::VecDeque, rc::Rc};

use tracing::debug;

use crate::{
    common::{
        program::Instruction,
        source::Source,
        span::{Span, Spanned},
    },
    compiler::{
        gen::Compiler,
        outline::Outline,
        read,
        syntax::{Note, Syntax},
    },
    construct::block::{Block, Inline},
};

/// Markup passed through to the host for bold and italic text.
const STRONG: (&str, &str) = ("<b>", "</b>");
const EMPHASIS: (&str, &str) = ("<i>", "</i>");

/// Walks the structural blocks of a document:
/// headings open nodes, paragraphs become lines or links,
/// ordered lists become choice menus, and fenced code is
/// handed to the expression compiler.
pub struct Document {
    compiler: Compiler,
    blocks: VecDeque<Spanned<Block>>,
}

impl Document {
    /// Compiles a whole document into unlinked bytecode.
    pub fn compile(source: &Rc<Source>) -> Result<Compiler, Syntax> {
        let mut document = Document {
            compiler: Compiler::base(),
            blocks: Outline::outline(source).into(),
        };

        while let Some(block) = document.blocks.pop_front() {
            document.block(block)?;
        }

        // The last node is always left open, so close it.
        document.close_node();

        debug!(
            instructions = document.compiler.code.len(),
            nodes = document.compiler.symbols.len(),
            "compiled document"
        );
        Ok(document.compiler)
    }

    fn block(&mut self, block: Spanned<Block>) -> Result<(), Syntax> {
        let span = block.span;
        match block.item {
            Block::Heading { level, title } => self.heading(level, &title, &span),
            Block::Paragraph(inlines) => self.paragraph(inlines, &span),
            Block::List { ordered, items } => self.list(ordered, items, &span),
            Block::Fence(code) => {
                let term = read(&code.span)?;
                self.compiler.statement(&term)
            },
            Block::Unsupported(name) => Err(Syntax::error_with_note(
                "Unsupported Markdown element",
                Note::new_with_hint(&format!("{} can't be used in dialogue", name), &span),
            )),
        }
    }

    /// Closes out the current node, if there is one,
    /// ending the dialogue if control falls through.
    fn close_node(&mut self) {
        if let Some(node) = self.compiler.current_node.take() {
            self.compiler.emit(Instruction::ExitNode(node));
            self.compiler.emit(Instruction::EndDialogue);
        }
    }

    fn current_node(&self, span: &Span, what: &str) -> Result<String, Syntax> {
        self.compiler.current_node.clone().ok_or_else(|| {
            Syntax::error_with_note(
                "Malformed paragraph",
                Note::new_with_hint(&format!("{} can only appear inside a node", what), span),
            )
        })
    }

    fn heading(&mut self, level: usize, title: &str, span: &Span) -> Result<(), Syntax> {
        if level != 1 {
            return Err(Syntax::error_with_note(
                "Invalid header",
                Note::new_with_hint("only level-one headings (`# Name`) open nodes", span),
            ));
        }
        if title.is_empty() {
            return Err(Syntax::error_with_note(
                "Invalid header",
                Note::new_with_hint("a node needs a name", span),
            ));
        }

        self.close_node();
        self.compiler.define(title, span)?;
        self.compiler.emit(Instruction::EnterNode(title.to_string()));
        self.compiler.current_node = Some(title.to_string());

        debug!(node = title, address = self.compiler.pc() - 1, "opened node");
        Ok(())
    }

    /// A paragraph is either a single link, which moves to another node,
    /// or a line of text, formatting, and inline expressions.
    fn paragraph(&mut self, inlines: Vec<Spanned<Inline>>, span: &Span) -> Result<(), Syntax> {
        if let [Spanned { item: Inline::Link { dest, text }, span: link }] = inlines.as_slice() {
            let node = self.current_node(span, "links")?;
            self.compiler.emit(Instruction::PushString(text.clone()));
            self.compiler.emit(Instruction::ShowLine);
            self.compiler.emit(Instruction::ExitNode(node));
            self.compiler.forward(Instruction::Jump(0), Spanned::new(dest.clone(), link.clone()));
            return Ok(());
        }

        for (index, inline) in inlines.into_iter().enumerate() {
            self.inline(inline)?;
            if index > 0 {
                self.compiler.emit(Instruction::Concat);
            }
        }

        self.compiler.emit(Instruction::ShowLine);
        Ok(())
    }

    fn inline(&mut self, inline: Spanned<Inline>) -> Result<(), Syntax> {
        let markup = match inline.item {
            Inline::Text(text) => text,
            Inline::Strong(open) => Document::markup(STRONG, open),
            Inline::Emphasis(open) => Document::markup(EMPHASIS, open),
            Inline::Code(code) => {
                let term = read(&code.span)?;
                return self.compiler.expression(&term);
            },
            Inline::Link { .. } => {
                return Err(Syntax::error_with_note(
                    "Malformed paragraph",
                    Note::new_with_hint("a link must be on a line of its own", &inline.span),
                ))
            },
            Inline::Unsupported(name) => {
                return Err(Syntax::error_with_note(
                    "Malformed paragraph",
                    Note::new_with_hint(&format!("{} can't be used in a line", name), &inline.span),
                ))
            },
        };

        self.compiler.emit(Instruction::PushString(markup));
        Ok(())
    }

    fn markup((open, close): (&str, &str), opening: bool) -> String {
        let marker = if opening { open } else { close };
        marker.to_string()
    }

    /// An ordered list of links is a choice menu.
    fn list(
        &mut self,
        ordered: bool,
        items: Vec<Spanned<Vec<Spanned<Inline>>>>,
        span: &Span,
    ) -> Result<(), Syntax> {
        if !ordered {
            return Err(Syntax::error_with_note(
                "Unsupported Markdown element",
                Note::new_with_hint("choices are written as an ordered list: `1. [Text](Node)`", span),
            ));
        }

        let node = self.current_node(span, "choices")?;

        for item in items {
            match item.item.as_slice() {
                [Spanned { item: Inline::Link { dest, text }, span: link }] => {
                    self.compiler.emit(Instruction::PushString(text.clone()));
                    self.compiler
                        .forward(Instruction::PushChoice(0), Spanned::new(dest.clone(), link.clone()));
                },
                _ => {
                    return Err(Syntax::error_with_note(
                        "Malformed list",
                        Note::new_with_hint("each choice must be a single link", &item.span),
                    ))
                },
            }
        }

        self.compiler.emit(Instruction::ShowChoice(node));
        Ok(())
    }
}
