use crate::{
    common::span::{Span, Spanned},
    compiler::syntax::{Note, Syntax},
    construct::{
        term::{Term, Terms},
        token::{Delim, Token, Tokens},
    },
};

/// Takes a flat list of tokens and nests them into terms,
/// matching up delimiters as it goes.
pub struct Reader {
    tokens: Tokens,
    index: usize,
    // stack of nested groupings
    opening: Vec<Spanned<Delim>>,
}

impl Reader {
    /// Reads every top-level term in a snippet.
    pub fn read_all(tokens: Spanned<Tokens>) -> Result<Terms, Syntax> {
        let mut reader = Reader {
            tokens: tokens.item,
            index: 0,
            opening: vec![],
        };

        let terms = reader.terms()?;

        // if there are still unclosed delimiters on the opening stack
        if let Some(still_opened) = reader.opening.last() {
            return Err(Syntax::error(
                &format!("Unclosed {}", still_opened.item),
                &still_opened.span,
            ));
        }

        Ok(terms)
    }

    /// Reads a snippet that must hold exactly one term,
    /// as fenced blocks and inline code spans do.
    pub fn read(tokens: Spanned<Tokens>) -> Result<Spanned<Term>, Syntax> {
        let span = tokens.span.clone();
        let mut terms = Reader::read_all(tokens)?;

        if terms.len() > 1 {
            let extra = Spanned::build(&terms[1..]).unwrap_or_else(|| span.clone());
            return Err(Syntax::error_with_note(
                "Expected a single term",
                Note::new_with_hint("wrap these in a `do` form to run them in sequence", &extra),
            ));
        }

        terms
            .pop()
            .ok_or_else(|| Syntax::error("Expected a term, found nothing", &span))
    }

    /// Returns the next token, advancing the reader by 1.
    fn next_token(&mut self) -> Option<Spanned<Token>> {
        let token = self.tokens.get(self.index)?.clone();
        self.index += 1;
        Some(token)
    }

    /// Reads terms until the group being read is closed,
    /// or until the tokens run out.
    fn terms(&mut self) -> Result<Terms, Syntax> {
        let mut terms = vec![];

        while let Some(token) = self.next_token() {
            let span = token.span;
            let term = match token.item {
                Token::Open(delim) => self.enter_group(Spanned::new(delim, span))?,
                Token::Close(delim) => {
                    self.exit_group(Spanned::new(delim, span))?;
                    break;
                },
                Token::Symbol(symbol) => Spanned::new(Term::Symbol(symbol), span),
                Token::Lit(lit) => Spanned::new(Term::Lit(lit), span),
            };

            terms.push(term);
        }

        Ok(terms)
    }

    fn enter_group(&mut self, delim: Spanned<Delim>) -> Result<Spanned<Term>, Syntax> {
        self.opening.push(delim.clone());
        let depth = self.opening.len();
        let items = self.terms()?;

        // the group was closed if it's no longer on the opening stack;
        // otherwise the error is reported once all tokens are read.
        let end = if self.opening.len() < depth {
            self.tokens[self.index - 1].span.clone()
        } else {
            Spanned::build(&items).unwrap_or_else(|| delim.span.clone())
        };

        Ok(Spanned::new(Term::List(items), Span::combine(&delim.span, &end)))
    }

    fn exit_group(&mut self, closing_delim: Spanned<Delim>) -> Result<(), Syntax> {
        let opening_delim = self.opening.pop().ok_or_else(|| {
            Syntax::error(
                &format!("Unexpected closing {}", closing_delim.item),
                &closing_delim.span,
            )
        })?;

        if opening_delim.item == closing_delim.item {
            return Ok(());
        }

        let error = Syntax::error_no_note(&format!(
            "Mismatched opening {} and closing {}",
            opening_delim.item, closing_delim.item,
        ))
        .add_note(Note::new(opening_delim.span))
        .add_note(Note::new(closing_delim.span));

        Err(error)
    }
}
