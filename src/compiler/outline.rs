use std::{collections::VecDeque, ops::Range, rc::Rc};

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};

use crate::{
    common::{
        source::Source,
        span::{Span, Spanned},
    },
    construct::block::{Block, Inline},
};

/// Walks the events of the Markdown tokenizer and gathers them
/// into the handful of structural blocks a dialogue is made of.
/// Outlining never fails: elements dialogue has no use for are
/// kept as `Unsupported` for the compiler to report.
pub struct Outline<'a> {
    source: Rc<Source>,
    events: VecDeque<(Event<'a>, Range<usize>)>,
}

impl<'a> Outline<'a> {
    pub fn outline(source: &'a Rc<Source>) -> Vec<Spanned<Block>> {
        let mut outline = Outline {
            source: Rc::clone(source),
            events: Parser::new(&source.contents).into_offset_iter().collect(),
        };

        let mut blocks = vec![];
        while let Some((event, range)) = outline.events.pop_front() {
            let span = outline.span(&range);
            let block = outline.block(event, span);
            blocks.push(block);
        }

        blocks
    }

    fn span(&self, range: &Range<usize>) -> Span {
        Span::new(&self.source, range.start, range.end - range.start)
    }

    /// A short human-readable name for a Markdown element.
    fn describe(tag: &Tag) -> String {
        match tag {
            Tag::CodeBlock(CodeBlockKind::Indented) => "indented code block".to_string(),
            Tag::List(None) => "unordered list".to_string(),
            other => {
                // `BlockQuote(None)` -> `BlockQuote`
                let debug = format!("{:?}", other);
                debug
                    .split(|c: char| !c.is_alphanumeric())
                    .next()
                    .unwrap_or("element")
                    .to_string()
            },
        }
    }

    /// Discards events up to and including the end of the element
    /// that was just opened.
    fn skip(&mut self) {
        let mut depth = 1;
        while let Some((event, _)) = self.events.pop_front() {
            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) => depth -= 1,
                _ => (),
            }
            if depth == 0 {
                break;
            }
        }
    }

    fn block(&mut self, event: Event<'a>, span: Span) -> Spanned<Block> {
        let block = match event {
            Event::Start(Tag::Heading { level, .. }) => {
                let mut title = String::new();
                for inline in self.inlines() {
                    match inline.item {
                        Inline::Text(text) => title.push_str(&text),
                        Inline::Code(code) => title.push_str(&code.item),
                        _ => (),
                    }
                }
                Block::Heading {
                    level: level as usize,
                    title: title.trim().to_string(),
                }
            },
            Event::Start(Tag::Paragraph) => Block::Paragraph(self.inlines()),
            Event::Start(Tag::List(start)) => Block::List {
                ordered: start.is_some(),
                items: self.items(),
            },
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(_))) => Block::Fence(self.fence(&span)),
            Event::Start(tag) => {
                let name = Outline::describe(&tag);
                self.skip();
                Block::Unsupported(name)
            },
            Event::Rule => Block::Unsupported("thematic break".to_string()),
            Event::Html(_) | Event::InlineHtml(_) => Block::Unsupported("HTML".to_string()),
            other => Block::Unsupported(format!("{:?}", other)),
        };

        Spanned::new(block, span)
    }

    /// Gathers the text of a fenced code block.
    /// The content points back into the document when it can,
    /// so errors in the code are reported in place.
    fn fence(&mut self, block: &Span) -> Spanned<String> {
        let mut content = String::new();
        let mut spans = vec![];

        while let Some((event, range)) = self.events.pop_front() {
            match event {
                Event::Text(text) => {
                    content.push_str(&text);
                    spans.push(self.span(&range));
                },
                Event::End(_) => break,
                _ => (),
            }
        }

        let within = Span::join(&spans).unwrap_or_else(|| Span::point(&self.source, block.offset()));
        self.located(content, &within)
    }

    /// Pairs `content` with its span in the document if `within`
    /// contains it verbatim, otherwise with a source of its own.
    fn located(&self, content: String, within: &Span) -> Spanned<String> {
        let haystack = &self.source.contents[within.offset()..within.end()];
        match haystack.find(&content) {
            Some(index) => {
                let span = Span::new(&self.source, within.offset() + index, content.len());
                Spanned::new(content, span)
            },
            None => {
                let source = Source::new(&content, &self.source.path);
                let span = Span::whole(&source);
                Spanned::new(content, span)
            },
        }
    }

    fn items(&mut self) -> Vec<Spanned<Vec<Spanned<Inline>>>> {
        let mut items = vec![];

        while let Some((event, range)) = self.events.pop_front() {
            match event {
                Event::Start(Tag::Item) => {
                    let span = self.span(&range);
                    items.push(Spanned::new(self.inlines(), span));
                },
                Event::End(_) => break,
                _ => (),
            }
        }

        items
    }

    /// Gathers inline content up to the end of the current element.
    /// Loose list items wrap their content in a paragraph,
    /// which is looked through.
    /// Adjacent text and line breaks are merged into one run.
    fn inlines(&mut self) -> Vec<Spanned<Inline>> {
        let mut inlines: Vec<Spanned<Inline>> = vec![];

        while let Some((event, range)) = self.events.pop_front() {
            let span = self.span(&range);
            let inline = match event {
                Event::End(TagEnd::Strong) => Inline::Strong(false),
                Event::End(TagEnd::Emphasis) => Inline::Emphasis(false),
                Event::End(_) => break,
                Event::Text(text) => Inline::Text(text.to_string()),
                Event::SoftBreak | Event::HardBreak => Inline::Text(" ".to_string()),
                Event::Code(code) => Inline::Code(self.located(code.to_string(), &span)),
                Event::Start(Tag::Strong) => Inline::Strong(true),
                Event::Start(Tag::Emphasis) => Inline::Emphasis(true),
                Event::Start(Tag::Paragraph) => {
                    inlines.extend(self.inlines());
                    continue;
                },
                Event::Start(Tag::Link { dest_url, .. }) => {
                    let mut text = String::new();
                    for inline in self.inlines() {
                        match inline.item {
                            Inline::Text(t) => text.push_str(&t),
                            Inline::Code(c) => text.push_str(&c.item),
                            _ => (),
                        }
                    }
                    Inline::Link {
                        dest: dest_url.to_string(),
                        text,
                    }
                },
                Event::Start(tag) => {
                    let name = Outline::describe(&tag);
                    self.skip();
                    Inline::Unsupported(name)
                },
                other => Inline::Unsupported(format!("{:?}", other)),
            };

            Outline::push(&mut inlines, Spanned::new(inline, span));
        }

        inlines
    }

    fn push(inlines: &mut Vec<Spanned<Inline>>, inline: Spanned<Inline>) {
        if let (Some(last), Inline::Text(next)) = (inlines.last_mut(), &inline.item) {
            if let Inline::Text(text) = &mut last.item {
                text.push_str(next);
                last.span = Span::combine(&last.span, &inline.span);
                return;
            }
        }
        inlines.push(inline);
    }
}
