use std::{rc::Rc, str::FromStr};

use crate::common::{
    lit::Lit,
    source::Source,
    span::{Span, Spanned},
};
use crate::compiler::error::Error;
use crate::construct::token::{Delim, Token, Tokens};

/// Characters that may start a symbol, besides alphabetics.
const SYMBOL_START: &str = "+-*/<>=!?_&.%$";
/// Characters that may continue a symbol.
const SYMBOL_CONTINUE: &str = "+-*/<>=!?_&.%$#";

#[derive(Debug)]
pub struct Lexer {
    source: Rc<Source>,
    index: usize,
    tokens: Tokens,
}

impl Lexer {
    /// Lexes a source file into a stream of tokens.
    /// Comments, whitespace, and commas (which are
    /// whitespace here) never make it into the stream.
    pub fn lex(source: Rc<Source>) -> Result<Spanned<Tokens>, Error> {
        // a span that covers the entire source file
        let span = Span::new(&source, 0, source.contents.len());

        let mut lexer = Lexer {
            source,
            index: 0,
            tokens: vec![],
        };

        // prime the lexer
        lexer.strip();

        while lexer.index < lexer.source.contents.len() {
            let token = lexer.next_token()?;
            lexer.tokens.push(token);
            lexer.strip();
        }

        Ok(Spanned::new(lexer.tokens, span))
    }

    fn remaining(&self) -> &str {
        &self.source.contents[self.index..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.remaining().chars().nth(1)
    }

    /// Strip whitespace, commas, and `;` line comments.
    fn strip(&mut self) {
        loop {
            let old_index = self.index;

            while let Some(c) = self.peek() {
                if !c.is_whitespace() && c != ',' {
                    break;
                }
                self.index += c.len_utf8();
            }

            if self.peek() == Some(';') {
                let mut advance = 0;
                for c in self.remaining().chars() {
                    if c == '\n' {
                        break;
                    }
                    advance += c.len_utf8();
                }
                self.index += advance;
            }

            if old_index == self.index {
                break;
            }
        }
    }

    /// Consume characters from the current index while
    /// `pred` holds, returning the consumed slice length.
    fn take_while(&self, start: usize, pred: impl Fn(char) -> bool) -> usize {
        let mut len = start;
        for c in self.source.contents[self.index + start..].chars() {
            if !pred(c) {
                break;
            }
            len += c.len_utf8();
        }
        len
    }

    /// Reads a string literal. Expects the opening quote to
    /// have been consumed by the caller.
    fn string(&self) -> Result<(Token, usize), Error> {
        let mut len = 1;
        let mut escape = false;
        let mut string = String::new();

        for c in self.remaining().chars().skip(1) {
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
                    other => {
                        return Err(Error::parse(
                            &format!(
                                "Unknown escape code `\\{}` in string literal",
                                other
                            ),
                            &Span::new(
                                &self.source,
                                self.index + len - bytes,
                                bytes,
                            ),
                        ))
                    },
                })
            } else {
                match c {
                    '\\' => escape = true,
                    '"' => return Ok((Token::Lit(Lit::String(string)), len)),
                    c => string.push(c),
                }
            }
        }

        Err(Error::parse(
            "Unterminated string literal",
            &Span::new(&self.source, self.index, len),
        ))
    }

    /// Reads a number. `start` is the length of any sign
    /// already accepted.
    fn number(&self, start: usize) -> Result<(Token, usize), Error> {
        let mut len = self.take_while(start, |c| c.is_ascii_digit());

        // a fractional part, but only if a digit follows the dot
        let rest = &self.source.contents[self.index + len..];
        if rest.starts_with('.')
            && rest[1..].starts_with(|c: char| c.is_ascii_digit())
        {
            len = self.take_while(len + 1, |c| c.is_ascii_digit());
        }

        let slice = &self.source.contents[self.index..self.index + len];
        let number = f64::from_str(slice).map_err(|_| {
            Error::parse(
                &format!("`{}` is not a valid number literal", slice),
                &Span::new(&self.source, self.index, len),
            )
        })?;

        Ok((Token::Lit(Lit::Number(number)), len))
    }

    fn symbol(&self) -> (Token, usize) {
        let len = self.take_while(0, |c| {
            c.is_alphanumeric() || SYMBOL_CONTINUE.contains(c)
        });
        let name = &self.source.contents[self.index..self.index + len];

        let token = match name {
            "true" => Token::Lit(Lit::Boolean(true)),
            "false" => Token::Lit(Lit::Boolean(false)),
            "nil" => Token::Lit(Lit::Nil),
            _ => Token::Iden(name.to_string()),
        };

        (token, len)
    }

    /// Parses the next token.
    /// Expects all whitespace and comments to be stripped.
    fn next_token(&mut self) -> Result<Spanned<Token>, Error> {
        // `lex` checked that source isn't exhausted
        let c = self.peek().unwrap();

        let (token, len) = match c {
            '(' => (Token::Open(Delim::Paren), 1),
            '[' => (Token::Open(Delim::Square), 1),
            '{' => (Token::Open(Delim::Curly), 1),
            ')' => (Token::Close(Delim::Paren), 1),
            ']' => (Token::Close(Delim::Square), 1),
            '}' => (Token::Close(Delim::Curly), 1),

            '#' if self.peek_second() == Some('{') => (Token::SetOpen, 2),

            '\'' => (Token::Quote, 1),
            '`' => (Token::Quasiquote, 1),
            '~' => (Token::Unquote, 1),

            '"' => self.string()?,

            '-' if self.peek_second().map_or(false, |c| c.is_ascii_digit()) => {
                self.number(1)?
            },
            c if c.is_ascii_digit() => self.number(0)?,

            c if c.is_alphabetic() || SYMBOL_START.contains(c) => self.symbol(),

            unknown => {
                return Err(Error::parse(
                    &format!(
                        "The character `{}` is not recognized here - check for encoding issues or typos",
                        unknown,
                    ),
                    &Span::point(&self.source, self.index),
                ))
            },
        };

        let spanned =
            Spanned::new(token, Span::new(&self.source, self.index, len));

        self.index += len;
        Ok(spanned)
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn doesnt_crash(s in "\\PC*") {
            let result = Lexer::lex(Source::source(&s));
            format!("{:?}", result);
        }

        #[test]
        fn numbers_lex(n in -1000000.0..1000000.0f64) {
            let formatted = format!("{}", n);
            let result = Lexer::lex(Source::source(&formatted)).unwrap();
            prop_assert_eq!(result.item.len(), 1);
            prop_assert_eq!(
                &result.item[0].item,
                &Token::Lit(Lit::Number(formatted.parse().unwrap()))
            );
        }
    }

    fn tokens(src: &str) -> Vec<Token> {
        Lexer::lex(Source::source(src))
            .unwrap()
            .item
            .into_iter()
            .map(|t| t.item)
            .collect()
    }

    #[test]
    fn simple_form() {
        assert_eq!(
            tokens("(+ 1 2)"),
            vec![
                Token::Open(Delim::Paren),
                Token::Iden("+".to_string()),
                Token::Lit(Lit::Number(1.0)),
                Token::Lit(Lit::Number(2.0)),
                Token::Close(Delim::Paren),
            ]
        );
    }

    #[test]
    fn sigils_and_sets() {
        assert_eq!(
            tokens("'x `y ~z #{1}"),
            vec![
                Token::Quote,
                Token::Iden("x".to_string()),
                Token::Quasiquote,
                Token::Iden("y".to_string()),
                Token::Unquote,
                Token::Iden("z".to_string()),
                Token::SetOpen,
                Token::Lit(Lit::Number(1.0)),
                Token::Close(Delim::Curly),
            ]
        );
    }

    #[test]
    fn negative_number_vs_minus() {
        assert_eq!(
            tokens("(- 1 -2.5)"),
            vec![
                Token::Open(Delim::Paren),
                Token::Iden("-".to_string()),
                Token::Lit(Lit::Number(1.0)),
                Token::Lit(Lit::Number(-2.5)),
                Token::Close(Delim::Paren),
            ]
        );
    }

    #[test]
    fn reserved_words_are_literals() {
        assert_eq!(
            tokens("true false nil"),
            vec![
                Token::Lit(Lit::Boolean(true)),
                Token::Lit(Lit::Boolean(false)),
                Token::Lit(Lit::Nil),
            ]
        );
    }

    #[test]
    fn comments_and_commas_are_whitespace() {
        assert_eq!(
            tokens("[1, 2] ; trailing comment\n3"),
            vec![
                Token::Open(Delim::Square),
                Token::Lit(Lit::Number(1.0)),
                Token::Lit(Lit::Number(2.0)),
                Token::Close(Delim::Square),
                Token::Lit(Lit::Number(3.0)),
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            tokens(r#""a\nb""#),
            vec![Token::Lit(Lit::String("a\nb".to_string()))]
        );
    }

    #[test]
    fn unterminated_string() {
        let result = Lexer::lex(Source::source("\"asdf"));
        assert!(matches!(result, Err(Error::Parse { .. })));
    }

    #[test]
    fn kebab_symbols() {
        assert_eq!(
            tokens("my-fn? console.log"),
            vec![
                Token::Iden("my-fn?".to_string()),
                Token::Iden("console.log".to_string()),
            ]
        );
    }

    #[test]
    fn empty_source() {
        assert!(tokens("").is_empty());
        assert!(tokens("  ; only a comment").is_empty());
    }
}
