use crate::common::span::{Span, Spanned};
use crate::compiler::error::Error;
use crate::construct::{
    form::{Form, Forms},
    token::{Delim, Token, Tokens},
};

/// What a closing delimiter is expected to produce,
/// tracked on the opening stack so mismatches can name
/// both sides.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Opening {
    List,
    Vector,
    Map,
    Set,
}

impl Opening {
    fn delim(self) -> Delim {
        match self {
            Opening::List => Delim::Paren,
            Opening::Vector => Delim::Square,
            Opening::Map | Opening::Set => Delim::Curly,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Opening::List => "list",
            Opening::Vector => "vector",
            Opening::Map => "map",
            Opening::Set => "set",
        }
    }
}

/// The reader pairs delimiters up, turning a flat token
/// stream into a sequence of symbolic forms. Sugar (quote
/// sigils) survives this stage; the canonicalizer removes it.
pub struct Reader {
    tokens: Spanned<Tokens>,
    index: usize,
    // stack of nested groupings
    opening: Vec<Spanned<Opening>>,
}

impl Reader {
    /// Reads a token stream into an ordered sequence of
    /// top-level forms. Empty input yields an empty sequence.
    pub fn read(tokens: Spanned<Tokens>) -> Result<Forms, Error> {
        let mut reader = Reader {
            tokens,
            index: 0,
            opening: vec![],
        };

        let mut forms = vec![];
        while let Some(token) = reader.next_token() {
            forms.push(reader.form(token)?);
        }

        Ok(forms)
    }

    /// Returns the next token, advancing the reader by 1.
    fn next_token(&mut self) -> Option<Spanned<Token>> {
        let token = self.tokens.item.get(self.index)?;
        self.index += 1;
        Some(token.clone())
    }

    /// Reads one complete form starting at `token`.
    fn form(&mut self, token: Spanned<Token>) -> Result<Spanned<Form>, Error> {
        let span = token.span.clone();
        match token.item {
            Token::Open(Delim::Paren) => {
                let (items, span) = self.group(Opening::List, span)?;
                Ok(Spanned::new(Form::List(items), span))
            },
            Token::Open(Delim::Square) => {
                let (items, span) = self.group(Opening::Vector, span)?;
                Ok(Spanned::new(Form::Vector(items), span))
            },
            Token::Open(Delim::Curly) => {
                let (items, span) = self.group(Opening::Map, span)?;
                let pairs = self.pair_up(items, &span)?;
                Ok(Spanned::new(Form::Map(pairs), span))
            },
            Token::SetOpen => {
                let (items, span) = self.group(Opening::Set, span)?;
                Ok(Spanned::new(Form::Set(items), span))
            },

            Token::Close(delim) => Err(Error::parse(
                &format!(
                    "Unexpected closing {} with no matching opener",
                    delim
                ),
                &span,
            )),

            Token::Quote => self.sigil(Form::Quote, "quote", span),
            Token::Quasiquote => {
                self.sigil(Form::Quasiquote, "quasiquote", span)
            },
            Token::Unquote => self.sigil(Form::Unquote, "unquote", span),

            Token::Iden(name) => Ok(Spanned::new(Form::Symbol(name), span)),
            Token::Lit(lit) => Ok(Spanned::new(Form::Lit(lit), span)),
        }
    }

    /// Reads a prefix sigil followed by the form it wraps.
    fn sigil(
        &mut self,
        wrap: impl Fn(Box<Spanned<Form>>) -> Form,
        name: &str,
        span: Span,
    ) -> Result<Spanned<Form>, Error> {
        let next = self.next_token().ok_or_else(|| {
            Error::parse(
                &format!("Expected a form after {}, found end of input", name),
                &span,
            )
        })?;
        let inner = self.form(next)?;
        let span = Span::combine(&span, &inner.span);
        Ok(Spanned::new(wrap(Box::new(inner)), span))
    }

    /// Reads forms until the matching closing delimiter.
    /// Returns the items along with the span from opener to
    /// closer.
    fn group(
        &mut self,
        opening: Opening,
        open_span: Span,
    ) -> Result<(Forms, Span), Error> {
        self.opening.push(Spanned::new(opening, open_span.clone()));
        let mut items = vec![];

        loop {
            let token = match self.next_token() {
                Some(t) => t,
                None => {
                    return Err(Error::parse(
                        &format!(
                            "Unclosed {}: expected a closing {} before end of input",
                            opening.name(),
                            opening.delim(),
                        ),
                        &open_span,
                    ));
                },
            };

            if let Token::Close(close) = token.item {
                // `group` pushed, so the stack can't be empty here
                let opened = self.opening.pop().unwrap();
                if close == opened.item.delim() {
                    return Ok((items, Span::combine(&open_span, &token.span)));
                }
                return Err(Error::parse(
                    &format!(
                        "Mismatched delimiters: {} opened here, but found closing {}",
                        opened.item.name(),
                        close,
                    ),
                    &token.span,
                ));
            }

            items.push(self.form(token)?);
        }
    }

    /// Turns the flat contents of a map literal into
    /// key-value pairs.
    fn pair_up(
        &self,
        items: Forms,
        span: &Span,
    ) -> Result<Vec<(Spanned<Form>, Spanned<Form>)>, Error> {
        if items.len() % 2 != 0 {
            return Err(Error::parse(
                "Map literal requires an even number of forms (key value pairs)",
                span,
            ));
        }

        let mut pairs = vec![];
        let mut iter = items.into_iter();
        while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
            pairs.push((key, value));
        }
        Ok(pairs)
    }
}
