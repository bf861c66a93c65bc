use crate::common::span::Spanned;

/// A structural element of a dialogue document,
/// as produced by `compiler::outline`.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// `# Title` opens a node named `Title`.
    Heading { level: usize, title: String },
    /// A run of inline content, i.e. one line of dialogue or a link.
    Paragraph(Vec<Spanned<Inline>>),
    /// Each item is the inline content of one list item's paragraph.
    List { ordered: bool, items: Vec<Spanned<Vec<Spanned<Inline>>>> },
    /// The contents of a fenced code block.
    Fence(Spanned<String>),
    /// Anything else, by name.
    Unsupported(String),
}

/// Inline content of a paragraph.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    /// Bold markers; `true` opens, `false` closes.
    Strong(bool),
    /// Italic markers; `true` opens, `false` closes.
    Emphasis(bool),
    /// The contents of an inline code span.
    Code(Spanned<String>),
    Link { dest: String, text: String },
    Unsupported(String),
}
