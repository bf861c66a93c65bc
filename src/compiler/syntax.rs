use std::fmt;

use crate::common::span::Span;

/// Represents a note attached to a Syntax error,
/// i.e. a location in the document with an optional
/// specific hint or tip corresponding to this specific location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub span: Span,
    pub hint: Option<String>,
}

impl Note {
    pub fn new(span: Span) -> Note {
        Note { span, hint: None }
    }

    pub fn new_with_hint(hint: &str, span: &Span) -> Note {
        Note {
            span: span.clone(),
            hint: Some(hint.to_string()),
        }
    }
}

/// Represents a static error found while compiling a document:
/// a structural problem with the Markdown, a malformed term,
/// a misused form, or a link to a node that doesn't exist.
/// Ideally, each note included should have a distinct `Span` and hint.
/// Usually, one `Note` per error is enough.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Syntax {
    pub reason: String,
    pub notes: Vec<Note>,
}

impl Syntax {
    /// Creates a new static error with a single note that does not have a hint.
    pub fn error(reason: &str, span: &Span) -> Syntax {
        Syntax::error_with_note(reason, Note::new(span.clone()))
    }

    /// Creates a new static error with a single note that may or may not have a
    /// hint.
    pub fn error_with_note(reason: &str, note: Note) -> Syntax {
        Syntax {
            reason: reason.to_string(),
            notes: vec![note],
        }
    }

    /// Creates a syntax error without a note. This syntax error will not
    /// contain any location information, so only use it if you plan to add
    /// additional notes with [`Syntax::add_note`] later.
    pub fn error_no_note(reason: &str) -> Syntax {
        Syntax {
            reason: reason.to_string(),
            notes: vec![],
        }
    }

    /// Extend a syntax error by adding another note to the error.
    pub fn add_note(mut self, note: Note) -> Self {
        self.notes.push(note);
        self
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for note in self.notes.iter() {
            let formatted = note.span.format();
            let padding = " ".repeat(formatted.gutter_padding());

            match (&note.hint, formatted.carrots()) {
                (Some(hint), Some(carrots)) => {
                    writeln!(
                        f,
                        "In {}:{}:{}",
                        formatted.path,
                        formatted.start + 1,
                        formatted.start_col + 1,
                    )?;
                    writeln!(f, "{} |", padding)?;
                    writeln!(
                        f,
                        "{:>width$} | {}",
                        formatted.start + 1,
                        formatted.lines[0],
                        width = padding.len(),
                    )?;
                    writeln!(
                        f,
                        "{} | {}{} note: {}",
                        padding,
                        " ".repeat(formatted.start_col),
                        "^".repeat(carrots),
                        hint,
                    )?;
                },
                (Some(hint), None) => {
                    write!(f, "{}", formatted)?;
                    writeln!(f, "{} |- note: {}", padding, hint)?;
                },
                (None, _) => write!(f, "{}", formatted)?,
            }
        }
        write!(f, "Syntax Error: {}", self.reason)
    }
}

impl std::error::Error for Syntax {}
