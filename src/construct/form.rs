use std::fmt::Display;

use crate::common::{lit::Lit, span::Spanned};

pub type Forms = Vec<Spanned<Form>>;

/// A symbolic form: the tree the reader produces and every
/// rewriting stage consumes. Rewrites always build new trees,
/// no stage mutates another stage's output in place.
///
/// The `Quote`/`Quasiquote`/`Unquote` variants are reader
/// sugar for the `'`/`` ` ``/`~` sigils; the canonicalizer
/// rewrites them into plain `(quote ...)`-shaped lists, so
/// stages past canonicalization never see them.
#[derive(Debug, Clone, PartialEq)]
pub enum Form {
    Symbol(String),
    List(Forms),
    Vector(Forms),
    Map(Vec<(Spanned<Form>, Spanned<Form>)>),
    Set(Forms),
    Lit(Lit),

    // reader sugar, removed by canonicalization
    Quote(Box<Spanned<Form>>),
    Quasiquote(Box<Spanned<Form>>),
    Unquote(Box<Spanned<Form>>),
}

impl Form {
    pub fn symbol(name: &str) -> Form {
        Form::Symbol(name.to_string())
    }

    /// The symbol's name, if this form is a symbol.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Form::Symbol(name) => Some(name),
            _ => None,
        }
    }

    /// The name of the head symbol, if this form is a list
    /// that leads with a symbol, e.g. `def` for `(def x 1)`.
    pub fn head_symbol(&self) -> Option<&str> {
        match self {
            Form::List(items) => match items.first() {
                Some(Spanned {
                    item: Form::Symbol(name),
                    ..
                }) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }

    /// A short one-line rendering used in error messages.
    /// Truncated so a huge form doesn't flood the report.
    pub fn summary(&self) -> String {
        let full = self.to_string();
        if full.chars().count() > 60 {
            let cut: String = full.chars().take(57).collect();
            format!("{}...", cut)
        } else {
            full
        }
    }
}

fn write_items(
    f: &mut std::fmt::Formatter<'_>,
    items: &[Spanned<Form>],
) -> std::fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i != 0 {
            write!(f, " ")?;
        }
        write!(f, "{}", item.item)?;
    }
    Ok(())
}

impl Display for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Form::Symbol(name) => write!(f, "{}", name),
            Form::List(items) => {
                write!(f, "(")?;
                write_items(f, items)?;
                write!(f, ")")
            },
            Form::Vector(items) => {
                write!(f, "[")?;
                write_items(f, items)?;
                write!(f, "]")
            },
            Form::Map(pairs) => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i != 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{} {}", k.item, v.item)?;
                }
                write!(f, "}}")
            },
            Form::Set(items) => {
                write!(f, "#{{")?;
                write_items(f, items)?;
                write!(f, "}}")
            },
            Form::Lit(lit) => write!(f, "{}", lit),
            Form::Quote(inner) => write!(f, "'{}", inner.item),
            Form::Quasiquote(inner) => write!(f, "`{}", inner.item),
            Form::Unquote(inner) => write!(f, "~{}", inner.item),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::{source::Source, span::Span};

    fn spanned(form: Form) -> Spanned<Form> {
        let source = Source::source("");
        Spanned::new(form, Span::point(&source, 0))
    }

    #[test]
    fn head_symbol() {
        let form = Form::List(vec![
            spanned(Form::symbol("def")),
            spanned(Form::symbol("x")),
            spanned(Form::Lit(Lit::Number(1.0))),
        ]);

        assert_eq!(form.head_symbol(), Some("def"));
        assert_eq!(Form::symbol("def").head_symbol(), None);
        assert_eq!(Form::List(vec![]).head_symbol(), None);
    }

    #[test]
    fn display_round() {
        let form = Form::List(vec![
            spanned(Form::symbol("+")),
            spanned(Form::Lit(Lit::Number(1.0))),
            spanned(Form::Lit(Lit::Number(2.0))),
        ]);

        assert_eq!(form.to_string(), "(+ 1 2)");
    }

    #[test]
    fn summary_truncates() {
        let long = Form::symbol(&"x".repeat(100));
        assert_eq!(long.summary().chars().count(), 60);
    }
}
