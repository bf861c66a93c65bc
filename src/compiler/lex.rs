use std::{
    iter::{once, Iterator, Peekable},
    rc::Rc,
    str::{Chars, FromStr},
};

use crate::{
    common::{
        source::Source,
        span::{Span, Spanned},
        value::Value,
    },
    compiler::syntax::{Note, Syntax},
    construct::token::{Delim, Token, Tokens},
};

/// Characters that end a symbol or number.
const BREAK_CHARS: &str = "()[]{}\";,";

macro_rules! RemainingIter {
    () => { Peekable<impl Iterator<Item = char>> };
}

/// Splits a snippet of the expression language into tokens.
/// The snippet is a `Span` so that tokens point back into
/// the document the snippet was embedded in.
#[derive(Debug)]
pub struct Lexer {
    source: Rc<Source>,
    index: usize,
    end: usize,
    tokens: Tokens,
}

impl Lexer {
    /// Lexes the region of source covered by `span` into a stream of tokens.
    pub fn lex(span: &Span) -> Result<Spanned<Tokens>, Syntax> {
        let mut lexer = Lexer {
            source: Rc::clone(span.source()),
            index: span.offset(),
            end: span.end(),
            tokens: vec![],
        };

        // prime the lexer
        lexer.strip();

        while lexer.index < lexer.end {
            let token = lexer.next_token()?;
            lexer.tokens.push(token);
            lexer.strip();
        }

        Ok(Spanned::new(lexer.tokens, span.clone()))
    }

    /// Selects a range of a string of length `len` from the
    /// current index position.
    fn grab_from_index(&self, len: usize) -> &str {
        &self.source.contents[self.index..self.index + len]
    }

    /// Returns all characters after the current index position,
    /// up to the end of the snippet.
    fn remaining(&self) -> Chars<'_> {
        self.source.contents[self.index..self.end].chars()
    }

    /// Strips whitespace, commas, and `;` line comments.
    fn strip(&mut self) {
        loop {
            let mut remaining = self.remaining().peekable();
            let old_index = self.index;
            let mut new_index = self.index;

            while let Some(c) = remaining.peek() {
                if !c.is_whitespace() && *c != ',' {
                    break;
                }
                new_index += c.len_utf8();
                remaining.next();
            }

            if let Some(';') = remaining.next() {
                new_index += 1;
                for c in remaining {
                    if c == '\n' {
                        break;
                    }
                    new_index += c.len_utf8();
                }
            }

            self.index = new_index;
            if old_index == new_index {
                break;
            }
        }
    }

    /// Starting at the lexer's current index,
    /// consumes characters one at a time according to a
    /// `pred`icate. After the predicate returns false,
    /// the string is passed to a `wrap` function, which
    /// converts the string slice of consumed characters
    /// into a type `T`, and returns that type along
    /// with the number of bytes consumed.
    fn take_while<T>(
        &self,
        remaining: &mut RemainingIter!(),
        wrap: impl Fn(&str) -> T,
        pred: impl Fn(char) -> bool,
    ) -> (T, usize) {
        let mut len = 0;
        while let Some(n) = remaining.peek() {
            if !pred(*n) {
                break;
            }
            len += n.len_utf8();
            remaining.next();
        }
        let inside = self.grab_from_index(len);
        (wrap(inside), len)
    }

    fn is_symbol_char(c: char) -> bool {
        !c.is_whitespace() && !BREAK_CHARS.contains(c)
    }

    fn string(&self, remaining: RemainingIter!()) -> Result<(Token, usize), Syntax> {
        // expects opening quote to have been parsed
        let mut len = 1;
        let mut escape = false;
        let mut string = String::new();

        for c in remaining {
            let bytes = c.len_utf8();
            len += bytes;
            if escape {
                escape = false;
                string.push(match c {
                    '"' => '"',
                    '\\' => '\\',
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    '0' => '\0',
                    o => {
                        return Err(Syntax::error_with_note(
                            &format!("Unknown escape code `\\{}` in string literal", o),
                            Note::new_with_hint(
                                "To include a single backslash `\\`, escape it first: `\\\\`",
                                &Span::new(&self.source, self.index + len - bytes - 1, bytes + 1),
                            ),
                        ))
                    },
                })
            } else {
                match c {
                    '\\' => escape = true,
                    '"' => return Ok((Token::Lit(Value::String(string)), len)),
                    c => string.push(c),
                }
            }
        }

        Err(Syntax::error(
            "Unexpected end of source while parsing string literal",
            &Span::new(&self.source, self.index, len),
        ))
    }

    /// Numbers are read whole, up to the next break character,
    /// so that `3abc` is an error rather than two terms.
    fn number(&self, mut remaining: RemainingIter!()) -> Result<(Token, usize), Syntax> {
        let (text, len) = self.take_while(&mut remaining, |s| s.to_string(), Lexer::is_symbol_char);

        let number = f64::from_str(&text).map_err(|_| {
            Syntax::error(
                &format!("Invalid number literal `{}`", text),
                &Span::new(&self.source, self.index, len),
            )
        })?;

        Ok((Token::Lit(Value::Number(number)), len))
    }

    /// Parses the next token.
    /// Expects all whitespace and comments to be stripped.
    fn next_token(&mut self) -> Result<Spanned<Token>, Syntax> {
        let mut remaining = self.remaining().peekable();

        let first = match remaining.next() {
            Some(c) => c,
            None => {
                return Err(Syntax::error(
                    "Unexpected end of source",
                    &Span::point(&self.source, self.index),
                ))
            },
        };

        let second = remaining.peek().copied();

        let (token, len) = match first {
            // Grouping
            '(' => (Token::Open(Delim::Paren), 1),
            '[' => (Token::Open(Delim::Square), 1),
            ')' => (Token::Close(Delim::Paren), 1),
            ']' => (Token::Close(Delim::Square), 1),

            // String
            '"' => self.string(remaining)?,

            // Number literal: 3, -4, +0.75, 1e3
            c if c.is_ascii_digit() => self.number(once(c).chain(remaining).peekable())?,
            c @ ('-' | '+') if second.map_or(false, |n| n.is_ascii_digit()) => {
                self.number(once(c).chain(remaining).peekable())?
            },

            '{' | '}' => {
                return Err(Syntax::error_with_note(
                    "Maps are not supported in dialogue expressions",
                    Note::new_with_hint(
                        "use parenthesis to group terms into a list",
                        &Span::point(&self.source, self.index),
                    ),
                ))
            },

            // Symbols, and the literals that look like them
            c => self.take_while(
                &mut once(c).chain(remaining).peekable(),
                |s| match s {
                    "true" => Token::Lit(Value::Boolean(true)),
                    "false" => Token::Lit(Value::Boolean(false)),
                    "nil" => Token::Lit(Value::Nil),
                    _ => Token::Symbol(s.to_string()),
                },
                Lexer::is_symbol_char,
            ),
        };

        let spanned = Spanned::new(token, Span::new(&self.source, self.index, len));

        self.index += len;
        Ok(spanned)
    }
}
