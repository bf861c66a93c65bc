use std::{
    fmt::{self, Debug, Display, Formatter},
    rc::Rc,
};

use crate::common::source::Source;

/// A `Span` refers to a section of a source,
/// much like a `&str`, but with a reference to a `Source` rather than a
/// `String`. A `Span` is meant to be paired with other datastructures,
/// to be used during error reporting.
#[derive(Clone, Eq, PartialEq)]
pub struct Span {
    source: Rc<Source>,
    offset: usize,
    length: usize,
}

impl Span {
    /// Create a new `Span` from an offset with a length.
    pub fn new(source: &Rc<Source>, offset: usize, length: usize) -> Span {
        Span {
            source: Rc::clone(source),
            offset,
            length,
        }
    }

    /// A `Span` that points at a specific point in the source.
    /// Has a length of `0`.
    pub fn point(source: &Rc<Source>, offset: usize) -> Span {
        Span::new(source, offset, 0)
    }

    /// A `Span` covering the whole source.
    pub fn whole(source: &Rc<Source>) -> Span {
        Span::new(source, 0, source.contents.len())
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Return the index of the end of the `Span`.
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn source(&self) -> &Rc<Source> {
        &self.source
    }

    /// Creates a new `Span` which spans the space of the previous two.
    /// ```plain
    /// hello this is cool
    /// ^^^^^              | Span a
    ///            ^^      | Span b
    /// ^^^^^^^^^^^^^      | combined
    /// ```
    pub fn combine(a: &Span, b: &Span) -> Span {
        if a.source != b.source {
            panic!("Can't combine two Spans with separate sources");
        }

        let offset = a.offset.min(b.offset);
        let end = a.end().max(b.end());

        Span::new(&a.source, offset, end - offset)
    }

    /// Combines a set of `Span`s (think fold-left over `Span::combine`).
    /// Returns `None` if there are no spans to join.
    pub fn join(spans: &[Span]) -> Option<Span> {
        let (first, rest) = spans.split_first()?;
        Some(rest.iter().fold(first.clone(), |a, b| Span::combine(&a, b)))
    }

    /// Returns the contents of a `Span`.
    pub fn contents(&self) -> String {
        self.source.contents[self.offset..self.end()].to_string()
    }

    /// Zero-based line of the byte at `index`.
    pub fn line(&self, index: usize) -> usize {
        self.source.contents[..index].matches('\n').count()
    }

    /// Zero-based column (in chars) of the byte at `index`.
    pub fn col(&self, index: usize) -> usize {
        self.source.contents[..index]
            .rsplit('\n')
            .next()
            .unwrap_or("")
            .chars()
            .count()
    }

    /// The full source lines this span touches.
    pub fn lines(&self) -> Vec<String> {
        let start_line = self.line(self.offset);
        let last = if self.is_empty() { self.offset } else { self.end() - 1 };
        let end_line = self.line(last.max(self.offset));

        self.source
            .contents
            .split('\n')
            .skip(start_line)
            .take(end_line - start_line + 1)
            .map(|s| s.to_string())
            .collect()
    }

    pub fn path(&self) -> String {
        self.source.path.to_string_lossy().to_string()
    }

    pub fn format(&self) -> FormattedSpan {
        let lines = self.lines();
        let end_col = if lines.len() == 1 {
            self.col(self.offset) + self.contents().chars().count()
        } else {
            self.col(self.end())
        };

        FormattedSpan {
            path: self.path(),
            start: self.line(self.offset),
            lines,
            start_col: self.col(self.offset),
            end_col,
        }
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Span")
            .field("contents", &self.contents())
            .field("start", &self.offset)
            .field("end", &self.end())
            .finish()
    }
}

impl Display for Span {
    /// Given a `Span`, `fmt` will print out where the `Span` occurs in its
    /// source. Single-line `Span`s:
    /// ```plain
    /// 12 | [Go back](Hallway)
    ///    | ^^^^^^^^^^^^^^^^^^
    /// ```
    /// Multi-line `Span`s:
    /// ```plain
    /// 12 > (do
    /// 13 >   (set! x 1)
    /// 14 >   (print x))
    /// ```
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

/// Represents a formatted span, ready to be displayed.
/// Contains information about where the span is from,
/// and where in the text it starts and ends
/// relative to the lines in the source.
pub struct FormattedSpan {
    pub path: String,
    pub start: usize,
    pub lines: Vec<String>,
    pub start_col: usize,
    pub end_col: usize,
}

impl FormattedSpan {
    pub fn is_multiline(&self) -> bool {
        self.lines.len() != 1
    }

    pub fn gutter_padding(&self) -> usize {
        (self.start + self.lines.len()).to_string().len()
    }

    /// If a single line span, returns the number of carrots between cols.
    pub fn carrots(&self) -> Option<usize> {
        if self.is_multiline() {
            None
        } else {
            Some(self.end_col.saturating_sub(self.start_col).max(1))
        }
    }
}

impl Display for FormattedSpan {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let padding = " ".repeat(self.gutter_padding());
        writeln!(f, "In {}:{}:{}", self.path, self.start + 1, self.start_col + 1)?;
        writeln!(f, "{} |", padding)?;

        match self.carrots() {
            Some(carrots) => {
                writeln!(f, "{:>width$} | {}", self.start + 1, self.lines[0], width = padding.len())?;
                writeln!(
                    f,
                    "{} | {}{}",
                    padding,
                    " ".repeat(self.start_col),
                    "^".repeat(carrots),
                )?;
            },
            None => {
                for (index, line) in self.lines.iter().enumerate() {
                    let line_no = self.start + index + 1;
                    writeln!(f, "{:>width$} > {}", line_no, line, width = padding.len())?;
                }
            },
        }

        Ok(())
    }
}

/// A wrapper for spanning types.
/// For example, a term such as `(set! x 3)` can be spanned to indicate
/// where in the document it was read from (a `Spanned<Term>`).
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub item: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    /// Takes a generic item, and wraps in in a `Span` to make it `Spanned`.
    pub fn new(item: T, span: Span) -> Spanned<T> {
        Spanned { item, span }
    }

    /// Joins a slice of spanned items into a single span.
    pub fn build(spanneds: &[Spanned<T>]) -> Option<Span> {
        let spans = spanneds.iter().map(|s| s.span.clone()).collect::<Vec<Span>>();
        Span::join(&spans)
    }

    /// Applies a function to a `Spanned`'s item, keeping the span.
    pub fn map<B>(self, f: impl FnOnce(T) -> B) -> Spanned<B> {
        Spanned::new(f(self.item), self.span)
    }
}
