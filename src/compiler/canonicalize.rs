use crate::common::span::{Span, Spanned};
use crate::compiler::error::Error;
use crate::construct::form::{Form, Forms};

/// The canonicalizer removes reader sugar, producing the
/// normalized form shape every later stage assumes:
///
/// - `'x` / `` `x `` / `~x` become `(quote x)` /
///   `(quasiquote x)` / `(unquote x)` lists;
/// - `(defn name params body...)` becomes
///   `(def name (fn name params body...))`.
///
/// Its output contains only the plain symbolic-form
/// variants: symbol, list, vector, map, set, literal.
pub struct Canonicalizer;

impl Canonicalizer {
    pub fn canonicalize(forms: Forms) -> Result<Forms, Error> {
        forms.into_iter().map(Canonicalizer::walk).collect()
    }

    fn walk(form: Spanned<Form>) -> Result<Spanned<Form>, Error> {
        let Spanned { item, span } = form;

        let item = match item {
            Form::Quote(inner) => desugar_sigil("quote", *inner, &span)?,
            Form::Quasiquote(inner) => {
                desugar_sigil("quasiquote", *inner, &span)?
            },
            Form::Unquote(inner) => desugar_sigil("unquote", *inner, &span)?,

            Form::List(items) => {
                let items = items
                    .into_iter()
                    .map(Canonicalizer::walk)
                    .collect::<Result<Forms, _>>()?;
                match items.first().map(|head| head.item.clone()) {
                    Some(Form::Symbol(name)) if name == "defn" => {
                        rewrite_defn(items, &span)?
                    },
                    _ => Form::List(items),
                }
            },
            Form::Vector(items) => Form::Vector(
                items
                    .into_iter()
                    .map(Canonicalizer::walk)
                    .collect::<Result<Forms, _>>()?,
            ),
            Form::Set(items) => Form::Set(
                items
                    .into_iter()
                    .map(Canonicalizer::walk)
                    .collect::<Result<Forms, _>>()?,
            ),
            Form::Map(pairs) => Form::Map(
                pairs
                    .into_iter()
                    .map(|(k, v)| {
                        Ok((Canonicalizer::walk(k)?, Canonicalizer::walk(v)?))
                    })
                    .collect::<Result<Vec<_>, Error>>()?,
            ),

            leaf @ (Form::Symbol(_) | Form::Lit(_)) => leaf,
        };

        Ok(Spanned::new(item, span))
    }
}

fn desugar_sigil(
    name: &str,
    inner: Spanned<Form>,
    span: &Span,
) -> Result<Form, Error> {
    let inner = Canonicalizer::walk(inner)?;
    Ok(Form::List(vec![
        Spanned::new(Form::symbol(name), span.clone()),
        inner,
    ]))
}

/// `(defn name params body...)` -> `(def name (fn name params body...))`.
/// The items passed in are already canonicalized.
fn rewrite_defn(items: Forms, span: &Span) -> Result<Form, Error> {
    let mut items = items.into_iter();
    let defn = items.next();
    debug_assert!(defn.is_some());

    let name = match items.next() {
        Some(
            name @ Spanned {
                item: Form::Symbol(_),
                ..
            },
        ) => name,
        other => {
            return Err(Error::transform(
                "canonicalize",
                other
                    .map(|f| f.item.summary())
                    .unwrap_or_else(|| "(defn)".to_string()),
                "defn requires a symbol name".to_string(),
            ))
        },
    };

    let mut lambda = vec![
        Spanned::new(Form::symbol("fn"), span.clone()),
        name.clone(),
    ];
    lambda.extend(items);
    if lambda.len() < 3 {
        return Err(Error::transform(
            "canonicalize",
            format!("(defn {} ...)", name.item),
            "defn requires a parameter list".to_string(),
        ));
    }

    Ok(Form::List(vec![
        Spanned::new(Form::symbol("def"), span.clone()),
        name,
        Spanned::new(Form::List(lambda), span.clone()),
    ]))
}
