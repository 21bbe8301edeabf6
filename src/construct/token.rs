use std::fmt::Display;

use crate::common::{lit::Lit, span::Spanned};

#[derive(Debug, Clone, Copy, PartialEq, Eq, proptest_derive::Arbitrary)]
pub enum Delim {
    Paren,
    Square,
    Curly,
}

impl Display for Delim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Delim::Paren => "parenthesis",
            Delim::Square => "square bracket",
            Delim::Curly => "curly bracket",
        };

        write!(f, "{}", name)
    }
}

pub type Tokens = Vec<Spanned<Token>>;

/// These are the different tokens the lexer will output.
/// `Token`s with data contain that data;
/// e.g. a number will be a `Lit::Number(...)`, not just a string.
/// `Token`s can be spanned using `Spanned<Token>`.
#[derive(Debug, Clone, PartialEq, proptest_derive::Arbitrary)]
pub enum Token {
    // Grouping
    Open(Delim),
    Close(Delim),
    /// `#{`, which opens a set literal closed by `}`.
    SetOpen,

    // Prefix sigils
    Quote,
    Quasiquote,
    Unquote,

    // Leafs
    Iden(String),
    Lit(Lit),
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // pretty formatting for tokens,
        // just use debug if you're not printing a message.
        use Token::*;
        match self {
            Open(d) => write!(f, "opening {}", d),
            Close(d) => write!(f, "closing {}", d),
            SetOpen => write!(f, "opening set literal `#{{`"),
            Quote => write!(f, "quote `'`"),
            Quasiquote => write!(f, "quasiquote `` ` ``"),
            Unquote => write!(f, "unquote `~`"),
            Iden(i) => write!(f, "symbol `{}`", i),
            Lit(l) => write!(f, "literal `{}`", l),
        }
    }
}
