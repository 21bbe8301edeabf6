use std::{cell::RefCell, path::Path, rc::Rc};

use indexmap::IndexMap;

use crate::common::span::{Span, Spanned};
use crate::compiler::error::Error;
use crate::construct::{
    env::{Env, MacroDef},
    form::{Form, Forms},
};

/// Bound macro parameters: name to unevaluated argument form.
type Bindings = IndexMap<String, Spanned<Form>>;

/// Expands every macro call in `forms`, leaving no list head
/// bound to a macro in the result.
///
/// `(defmacro ...)` forms at the top level are collected into
/// `env` first and removed from the output, so a macro may be
/// used anywhere in the file that defines it. Expansion is
/// depth-first, and each replacement is re-scanned before its
/// siblings, since an expansion may itself contain macro
/// calls. Each top-level form gets `fuel` expansion steps;
/// running out is reported as a `Macro` error naming the last
/// macro expanded, which turns a non-terminating macro into
/// an ordinary error instead of a hang.
pub fn expand(
    forms: Forms,
    env: &Rc<RefCell<Env>>,
    fuel: usize,
    origin: &Path,
) -> Result<Forms, Error> {
    let mut remaining = Vec::with_capacity(forms.len());
    for form in forms {
        if form.item.head_symbol() == Some("defmacro") {
            let def = parse_defmacro(form, origin)?;
            log::trace!("registering macro `{}` from {:?}", def.name, origin);
            env.borrow_mut().define_macro(def);
        } else {
            remaining.push(form);
        }
    }

    let mut expanded = Vec::with_capacity(remaining.len());
    for form in remaining {
        let mut expander = Expander {
            env: Rc::clone(env),
            fuel,
            budget: fuel,
        };
        expanded.push(expander.walk(form)?);
    }
    Ok(expanded)
}

/// `(defmacro name [params] body...)` -> a `MacroDef`.
/// The parameter list may be a vector or a list; `& rest`
/// marks a variadic tail.
fn parse_defmacro(form: Spanned<Form>, origin: &Path) -> Result<MacroDef, Error> {
    let summary = form.item.summary();
    let shape_error = |message: &str| {
        Error::transform("expand", summary.clone(), message.to_string())
    };

    let Form::List(items) = form.item else {
        return Err(shape_error("defmacro must be a list form"));
    };
    let mut items = items.into_iter().skip(1);

    let name = match items.next() {
        Some(Spanned {
            item: Form::Symbol(name),
            ..
        }) => name,
        _ => return Err(shape_error("defmacro requires a symbol name")),
    };

    let param_forms = match items.next() {
        Some(Spanned {
            item: Form::Vector(params) | Form::List(params),
            ..
        }) => params,
        _ => {
            return Err(shape_error(
                "defmacro requires a parameter vector or list",
            ))
        },
    };

    let mut params = vec![];
    let mut rest = None;
    let mut param_iter = param_forms.into_iter();
    while let Some(param) = param_iter.next() {
        let Form::Symbol(param_name) = param.item else {
            return Err(shape_error("macro parameters must be symbols"));
        };
        if param_name == "&" {
            match (param_iter.next(), param_iter.next()) {
                (
                    Some(Spanned {
                        item: Form::Symbol(rest_name),
                        ..
                    }),
                    None,
                ) => {
                    rest = Some(rest_name);
                    break;
                },
                _ => {
                    return Err(shape_error(
                        "`&` must be followed by exactly one rest parameter",
                    ))
                },
            }
        }
        params.push(param_name);
    }

    let body: Forms = items.collect();
    if body.is_empty() {
        return Err(shape_error("defmacro requires at least one body form"));
    }

    Ok(MacroDef {
        name,
        params,
        rest,
        body,
        origin: origin.to_owned(),
    })
}

struct Expander {
    env: Rc<RefCell<Env>>,
    fuel: usize,
    budget: usize,
}

impl Expander {
    /// Depth-first expansion of one form.
    fn walk(&mut self, form: Spanned<Form>) -> Result<Spanned<Form>, Error> {
        // quoted data is data, not code to expand into
        if matches!(
            form.item.head_symbol(),
            Some("quote") | Some("quasiquote")
        ) {
            return Ok(form);
        }

        if let Some(head) = form.item.head_symbol() {
            let def = self.env.borrow().lookup_macro(head);
            if let Some(def) = def {
                let replacement = self.apply(&def, form)?;
                // the replacement may contain further macro
                // calls, so re-scan before moving on
                return self.walk(replacement);
            }
        }

        let Spanned { item, span } = form;
        let item = match item {
            Form::List(items) => Form::List(self.walk_all(items)?),
            Form::Vector(items) => Form::Vector(self.walk_all(items)?),
            Form::Set(items) => Form::Set(self.walk_all(items)?),
            Form::Map(pairs) => Form::Map(
                pairs
                    .into_iter()
                    .map(|(k, v)| Ok((self.walk(k)?, self.walk(v)?)))
                    .collect::<Result<Vec<_>, Error>>()?,
            ),
            leaf => leaf,
        };

        Ok(Spanned::new(item, span))
    }

    fn walk_all(&mut self, forms: Forms) -> Result<Forms, Error> {
        forms.into_iter().map(|form| self.walk(form)).collect()
    }

    /// Replace one macro call with its substituted body.
    fn apply(
        &mut self,
        def: &MacroDef,
        call: Spanned<Form>,
    ) -> Result<Spanned<Form>, Error> {
        if self.fuel == 0 {
            return Err(Error::macro_error(
                &def.name,
                format!(
                    "expansion did not terminate within {} steps; \
                     `{}` most likely expands into itself",
                    self.budget, def.name,
                ),
            ));
        }
        self.fuel -= 1;
        log::trace!("expanding `{}` ({} fuel left)", def.name, self.fuel);

        let span = call.span.clone();
        let Form::List(mut items) = call.item else {
            // `walk` only calls `apply` on lists with symbol heads
            unreachable!("macro call must be a list form");
        };
        items.remove(0);

        let bindings = bind_params(def, items, &span)?;
        let mut body: Forms = def
            .body
            .iter()
            .map(|form| substitute(form, &bindings))
            .collect();

        let replacement = if body.len() == 1 {
            // keep the substituted body's structure, but
            // attribute the result to the call site
            let only = body.pop().unwrap();
            Spanned::new(only.item, span)
        } else {
            let mut forms = vec![Spanned::new(Form::symbol("do"), span.clone())];
            forms.append(&mut body);
            Spanned::new(Form::List(forms), span)
        };

        Ok(replacement)
    }
}

/// Pair the call's argument forms with the macro's formal
/// parameters, checking arity. A rest parameter binds the
/// remaining arguments as a list form.
fn bind_params(
    def: &MacroDef,
    args: Forms,
    call_span: &Span,
) -> Result<Bindings, Error> {
    let fixed = def.params.len();

    if def.rest.is_none() && args.len() != fixed {
        return Err(Error::macro_error(
            &def.name,
            format!(
                "`{}` takes {} argument{}, but {} were given",
                def.name,
                fixed,
                if fixed == 1 { "" } else { "s" },
                args.len(),
            ),
        ));
    }
    if def.rest.is_some() && args.len() < fixed {
        return Err(Error::macro_error(
            &def.name,
            format!(
                "`{}` takes at least {} argument{}, but {} were given",
                def.name,
                fixed,
                if fixed == 1 { "" } else { "s" },
                args.len(),
            ),
        ));
    }

    let mut args = args.into_iter();
    let mut bindings = Bindings::new();
    for param in &def.params {
        // arity was checked above
        let arg = args.next().unwrap();
        bindings.insert(param.clone(), arg);
    }
    if let Some(rest) = &def.rest {
        let remaining: Forms = args.collect();
        bindings.insert(
            rest.clone(),
            Spanned::new(Form::List(remaining), call_span.clone()),
        );
    }

    Ok(bindings)
}

/// Structural substitution of a macro body form.
///
/// The body is treated purely as a template, never evaluated
/// as target-language code. Three template operators are
/// folded while substituting:
///
/// - `(quote x)` produces `x` verbatim, with no substitution
///   inside it;
/// - `(list a b ...)` produces a list form of its substituted
///   elements;
/// - `(quasiquote x)` produces `x` verbatim except at
///   `(unquote y)` positions, which substitute.
///
/// Everything else substitutes bound symbols structurally.
fn substitute(form: &Spanned<Form>, bindings: &Bindings) -> Spanned<Form> {
    let span = form.span.clone();

    match &form.item {
        Form::Symbol(name) => bindings
            .get(name)
            .cloned()
            .unwrap_or_else(|| form.clone()),

        Form::List(items) => match form.item.head_symbol() {
            Some("quote") if items.len() == 2 => items[1].clone(),
            Some("quasiquote") if items.len() == 2 => {
                quasi(&items[1], bindings)
            },
            Some("list") => {
                let folded = items[1..]
                    .iter()
                    .map(|item| substitute(item, bindings))
                    .collect();
                Spanned::new(Form::List(folded), span)
            },
            _ => Spanned::new(
                Form::List(
                    items
                        .iter()
                        .map(|item| substitute(item, bindings))
                        .collect(),
                ),
                span,
            ),
        },

        Form::Vector(items) => Spanned::new(
            Form::Vector(
                items
                    .iter()
                    .map(|item| substitute(item, bindings))
                    .collect(),
            ),
            span,
        ),
        Form::Set(items) => Spanned::new(
            Form::Set(
                items
                    .iter()
                    .map(|item| substitute(item, bindings))
                    .collect(),
            ),
            span,
        ),
        Form::Map(pairs) => Spanned::new(
            Form::Map(
                pairs
                    .iter()
                    .map(|(k, v)| {
                        (substitute(k, bindings), substitute(v, bindings))
                    })
                    .collect(),
            ),
            span,
        ),

        _ => form.clone(),
    }
}

/// Quasiquote walk: everything is verbatim data except
/// `(unquote x)`, which substitutes.
fn quasi(form: &Spanned<Form>, bindings: &Bindings) -> Spanned<Form> {
    if let Form::List(items) = &form.item {
        if form.item.head_symbol() == Some("unquote") && items.len() == 2 {
            return substitute(&items[1], bindings);
        }
        return Spanned::new(
            Form::List(items.iter().map(|i| quasi(i, bindings)).collect()),
            form.span.clone(),
        );
    }
    form.clone()
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::common::source::Source;
    use crate::compiler::{
        canonicalize::Canonicalizer, lex::Lexer, read::Reader,
    };

    fn forms(src: &str) -> Forms {
        let tokens = Lexer::lex(Source::source(src)).unwrap();
        Canonicalizer::canonicalize(Reader::read(tokens).unwrap()).unwrap()
    }

    fn expand_str(src: &str) -> Result<Vec<String>, Error> {
        let env = Env::root();
        let expanded =
            expand(forms(src), &env, 64, &PathBuf::from("<test>"))?;
        Ok(expanded.iter().map(|f| f.item.to_string()).collect())
    }

    #[test]
    fn expansion_is_identity_without_macros() {
        let input = "(def x 1) (+ x [2 3] {\"k\" 4})";
        let env = Env::root();
        let before = forms(input);
        let after = expand(
            before.clone(),
            &env,
            64,
            &PathBuf::from("<test>"),
        )
        .unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn twice_duplicates_its_argument() {
        let result = expand_str(
            "(defmacro twice (x) (list (quote do) x x)) \
             (twice (print \"hi\"))",
        )
        .unwrap();
        assert_eq!(result, vec!["(do (print \"hi\") (print \"hi\"))"]);
    }

    #[test]
    fn quasiquote_template() {
        let result = expand_str(
            "(defmacro when [test body] `(if ~test ~body nil)) \
             (when (> x 1) (print x))",
        )
        .unwrap();
        assert_eq!(result, vec!["(if (> x 1) (print x) nil)"]);
    }

    #[test]
    fn nested_expansion_terminates() {
        let result = expand_str(
            "(defmacro inner [x] (list (quote print) x)) \
             (defmacro outer [x] (list (quote inner) x)) \
             (outer 1)",
        )
        .unwrap();
        assert_eq!(result, vec!["(print 1)"]);
    }

    #[test]
    fn self_recursive_macro_is_rejected() {
        let result = expand_str(
            "(defmacro forever [x] (list (quote forever) x)) \
             (forever 1)",
        );
        match result {
            Err(Error::Macro { macro_name, .. }) => {
                assert_eq!(macro_name, "forever");
            },
            other => panic!("expected macro error, got {:?}", other),
        }
    }

    #[test]
    fn arity_mismatch_is_rejected() {
        let result = expand_str(
            "(defmacro pair [a b] (list a b)) (pair 1)",
        );
        match result {
            Err(Error::Macro { macro_name, message }) => {
                assert_eq!(macro_name, "pair");
                assert!(message.contains("2 arguments"));
            },
            other => panic!("expected macro error, got {:?}", other),
        }
    }

    #[test]
    fn rest_parameter_binds_remaining_args() {
        let result = expand_str(
            "(defmacro capture [a & rest] (list (quote pair) a (quote rest) rest)) \
             (capture 1 2 3)",
        )
        .unwrap();
        assert_eq!(result, vec!["(pair 1 rest (2 3))"]);
    }

    #[test]
    fn quote_blocks_substitution_and_expansion() {
        let result = expand_str(
            "(defmacro m [x] (list (quote f) x)) '(m 1)",
        )
        .unwrap();
        // quoted data is untouched by expansion
        assert_eq!(result, vec!["(quote (m 1))"]);
    }

    #[test]
    fn user_macro_shadows_outer_macro() {
        let env = Env::root();
        let origin = PathBuf::from("<test>");

        // a "system" macro in the root scope
        expand(
            forms("(defmacro greet [x] (list (quote system) x))"),
            &env,
            64,
            &origin,
        )
        .unwrap();

        // a user macro of the same name in a child scope wins
        let child = Env::child(&env);
        let result = expand(
            forms(
                "(defmacro greet [x] (list (quote user) x)) (greet 1)",
            ),
            &child,
            64,
            &origin,
        )
        .unwrap();

        assert_eq!(result[0].item.to_string(), "(user 1)");
    }

    #[test]
    fn multi_form_body_wraps_in_do() {
        let result = expand_str(
            "(defmacro both [x] (list (quote print) x) (list (quote print) x)) \
             (both 1)",
        )
        .unwrap();
        assert_eq!(result, vec!["(do (print 1) (print 1))"]);
    }

    #[test]
    fn malformed_defmacro_rejected() {
        assert!(matches!(
            expand_str("(defmacro 1 [x] x)"),
            Err(Error::Transform { .. })
        ));
        assert!(matches!(
            expand_str("(defmacro m [x])"),
            Err(Error::Transform { .. })
        ));
        assert!(matches!(
            expand_str("(defmacro m [x &] x)"),
            Err(Error::Transform { .. })
        ));
    }
}
