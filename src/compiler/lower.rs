use crate::common::span::{Span, Spanned};
use crate::compiler::error::Error;
use crate::construct::{
    ast::{Ast, Params, Program},
    form::{Form, Forms},
    module::ImportRecord,
};

/// Lowers macro-free symbolic forms into the AST, checking
/// every special form's shape along the way. Import records
/// come first in the program body so the generated module
/// starts with its import statements.
pub struct Lower;

impl Lower {
    /// `module_span` is where the generated import statements
    /// are attributed, since the import forms themselves were
    /// consumed during resolution.
    pub fn lower(
        forms: &Forms,
        imports: &[ImportRecord],
        module_span: &Span,
    ) -> Result<Program, Error> {
        let mut body: Vec<Spanned<Ast>> = imports
            .iter()
            .filter(|record| !record.value_bindings.is_empty())
            .map(|record| {
                Spanned::new(
                    Ast::Import {
                        bindings: record.value_bindings.clone(),
                        path: record.resolved.clone(),
                    },
                    module_span.clone(),
                )
            })
            .collect();

        for form in forms {
            body.push(Lower::walk(form)?);
        }

        Ok(Program { body })
    }

    fn walk(form: &Spanned<Form>) -> Result<Spanned<Ast>, Error> {
        let span = form.span.clone();
        let item = match &form.item {
            Form::Lit(lit) => Ast::Lit(lit.clone()),
            Form::Symbol(name) => Ast::Symbol(name.clone()),
            Form::Vector(items) => Ast::Vector(Lower::walk_all(items)?),
            Form::Set(items) => Ast::Set(Lower::walk_all(items)?),
            Form::Map(pairs) => Ast::Map(
                pairs
                    .iter()
                    .map(|(k, v)| Ok((Lower::walk(k)?, Lower::walk(v)?)))
                    .collect::<Result<Vec<_>, Error>>()?,
            ),
            Form::List(items) => return Lower::list(form, items),

            // the canonical form has no sigils left
            Form::Quote(_) | Form::Quasiquote(_) | Form::Unquote(_) => {
                return Err(Lower::error(form, "sigil form survived canonicalization"))
            },
        };
        Ok(Spanned::new(item, span))
    }

    fn walk_all(forms: &[Spanned<Form>]) -> Result<Vec<Spanned<Ast>>, Error> {
        forms.iter().map(Lower::walk).collect()
    }

    fn list(
        form: &Spanned<Form>,
        items: &Forms,
    ) -> Result<Spanned<Ast>, Error> {
        let span = form.span.clone();

        if items.is_empty() {
            return Err(Lower::error(form, "`()` is not a valid expression"));
        }

        let ast = match form.item.head_symbol() {
            Some("def") => Lower::def(form, items)?,
            Some("fn") => Lower::function(form, items)?,
            Some("let") => Lower::let_form(form, items)?,
            Some("if") => Lower::if_form(form, items)?,
            Some("do") => Ast::Do(Lower::walk_all(&items[1..])?),
            Some("quote") => Lower::quote(form, items)?,

            // these only make sense upstream; reaching lowering
            // means they sat in expression position
            Some(head @ ("quasiquote" | "unquote" | "import" | "export"
            | "defmacro")) => {
                return Err(Lower::error(
                    form,
                    &format!("`{}` is not valid in expression position", head),
                ))
            },

            _ => Ast::Call {
                fun: Box::new(Lower::walk(&items[0])?),
                args: Lower::walk_all(&items[1..])?,
            },
        };

        Ok(Spanned::new(ast, span))
    }

    /// `(def name value)`
    fn def(form: &Spanned<Form>, items: &Forms) -> Result<Ast, Error> {
        match items.as_slice() {
            [_, name, value] => {
                let Some(name) = name.item.as_symbol() else {
                    return Err(Lower::error(form, "def requires a symbol name"));
                };
                Ok(Ast::Def {
                    name: name.to_string(),
                    value: Box::new(Lower::walk(value)?),
                })
            },
            _ => Err(Lower::error(form, "def takes a name and one value")),
        }
    }

    /// `(fn name? [params] body...)`
    fn function(form: &Spanned<Form>, items: &Forms) -> Result<Ast, Error> {
        let mut rest = &items[1..];

        let name = match rest.first().map(|form| &form.item) {
            Some(Form::Symbol(name)) => {
                rest = &rest[1..];
                Some(name.clone())
            },
            _ => None,
        };

        let Some(Spanned {
            item: Form::Vector(param_forms),
            ..
        }) = rest.first()
        else {
            return Err(Lower::error(form, "fn requires a parameter vector"));
        };
        let params = Lower::params(form, param_forms)?;

        let body = Lower::walk_all(&rest[1..])?;
        if body.is_empty() {
            return Err(Lower::error(form, "fn requires at least one body form"));
        }

        Ok(Ast::Fn { name, params, body })
    }

    fn params(form: &Spanned<Form>, param_forms: &Forms) -> Result<Params, Error> {
        let mut fixed = vec![];
        let mut iter = param_forms.iter();
        while let Some(param) = iter.next() {
            let Some(name) = param.item.as_symbol() else {
                return Err(Lower::error(form, "parameters must be symbols"));
            };
            if name == "&" {
                return match (iter.next(), iter.next()) {
                    (Some(rest_form), None) => {
                        let Some(rest) = rest_form.item.as_symbol() else {
                            return Err(Lower::error(
                                form,
                                "parameters must be symbols",
                            ));
                        };
                        Ok(Params::Variadic {
                            fixed,
                            rest: rest.to_string(),
                        })
                    },
                    _ => Err(Lower::error(
                        form,
                        "`&` must be followed by exactly one rest parameter",
                    )),
                };
            }
            fixed.push(name.to_string());
        }
        Ok(Params::Fixed(fixed))
    }

    /// `(let [name value ...] body...)`
    fn let_form(form: &Spanned<Form>, items: &Forms) -> Result<Ast, Error> {
        let Some(Spanned {
            item: Form::Vector(binding_forms),
            ..
        }) = items.get(1)
        else {
            return Err(Lower::error(form, "let requires a binding vector"));
        };
        if binding_forms.len() % 2 != 0 {
            return Err(Lower::error(
                form,
                "let bindings must come in name/value pairs",
            ));
        }

        let mut bindings = vec![];
        for pair in binding_forms.chunks(2) {
            let Some(name) = pair[0].item.as_symbol() else {
                return Err(Lower::error(form, "let binds symbols only"));
            };
            bindings.push((name.to_string(), Lower::walk(&pair[1])?));
        }

        let body = Lower::walk_all(&items[2..])?;
        if body.is_empty() {
            return Err(Lower::error(form, "let requires at least one body form"));
        }

        Ok(Ast::Let { bindings, body })
    }

    /// `(if cond then else?)`
    fn if_form(form: &Spanned<Form>, items: &Forms) -> Result<Ast, Error> {
        match items.as_slice() {
            [_, cond, then] => Ok(Ast::If {
                cond: Box::new(Lower::walk(cond)?),
                then: Box::new(Lower::walk(then)?),
                otherwise: None,
            }),
            [_, cond, then, otherwise] => Ok(Ast::If {
                cond: Box::new(Lower::walk(cond)?),
                then: Box::new(Lower::walk(then)?),
                otherwise: Some(Box::new(Lower::walk(otherwise)?)),
            }),
            _ => Err(Lower::error(
                form,
                "if takes a condition, a then branch, and an optional else branch",
            )),
        }
    }

    /// `(quote form)` keeps its argument as symbolic data.
    fn quote(form: &Spanned<Form>, items: &Forms) -> Result<Ast, Error> {
        match items.as_slice() {
            [_, quoted] => Ok(Ast::Quoted(quoted.clone())),
            _ => Err(Lower::error(form, "quote takes exactly one form")),
        }
    }

    fn error(form: &Spanned<Form>, message: &str) -> Error {
        Error::transform("lower", form.item.summary(), message.to_string())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::common::source::Source;
    use crate::compiler::{
        canonicalize::Canonicalizer, lex::Lexer, read::Reader,
    };

    fn lower(src: &str) -> Result<Program, Error> {
        let source = Source::source(src);
        let tokens = Lexer::lex(source.clone()).unwrap();
        let forms =
            Canonicalizer::canonicalize(Reader::read(tokens).unwrap()).unwrap();
        Lower::lower(&forms, &[], &Span::point(&source, 0))
    }

    fn only(src: &str) -> Ast {
        let mut program = lower(src).unwrap();
        assert_eq!(program.body.len(), 1);
        program.body.pop().unwrap().item
    }

    #[test]
    fn def_and_call() {
        match only("(def x (+ 1 2))") {
            Ast::Def { name, value } => {
                assert_eq!(name, "x");
                match value.item {
                    Ast::Call { fun, args } => {
                        assert_eq!(fun.item, Ast::Symbol("+".to_string()));
                        assert_eq!(args.len(), 2);
                    },
                    other => panic!("expected call, got {:?}", other),
                }
            },
            other => panic!("expected def, got {:?}", other),
        }
    }

    #[test]
    fn variadic_params() {
        match only("(fn [a b & rest] a)") {
            Ast::Fn { params, .. } => assert_eq!(
                params,
                Params::Variadic {
                    fixed: vec!["a".to_string(), "b".to_string()],
                    rest: "rest".to_string(),
                }
            ),
            other => panic!("expected fn, got {:?}", other),
        }
    }

    #[test]
    fn named_fn_keeps_its_name() {
        match only("(fn fact [n] n)") {
            Ast::Fn { name, params, .. } => {
                assert_eq!(name, Some("fact".to_string()));
                assert_eq!(params, Params::Fixed(vec!["n".to_string()]));
            },
            other => panic!("expected fn, got {:?}", other),
        }
    }

    #[test]
    fn if_without_else() {
        match only("(if c 1)") {
            Ast::If { otherwise, .. } => assert!(otherwise.is_none()),
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn quoted_data_stays_symbolic() {
        match only("'(+ 1 2)") {
            Ast::Quoted(form) => {
                assert_eq!(form.item.to_string(), "(+ 1 2)");
            },
            other => panic!("expected quoted, got {:?}", other),
        }
    }

    #[test]
    fn shape_errors() {
        assert!(matches!(lower("()"), Err(Error::Transform { .. })));
        assert!(matches!(lower("(def x)"), Err(Error::Transform { .. })));
        assert!(matches!(lower("(def 1 2)"), Err(Error::Transform { .. })));
        assert!(matches!(lower("(fn [a])"), Err(Error::Transform { .. })));
        assert!(matches!(
            lower("(let [a] a)"),
            Err(Error::Transform { .. })
        ));
        assert!(matches!(lower("(if c)"), Err(Error::Transform { .. })));
        assert!(matches!(lower("(unquote x)"), Err(Error::Transform { .. })));
    }

    #[test]
    fn let_bindings_in_order() {
        match only("(let [a 1 b 2] b)") {
            Ast::Let { bindings, .. } => {
                let names: Vec<_> =
                    bindings.iter().map(|(n, _)| n.as_str()).collect();
                assert_eq!(names, vec!["a", "b"]);
            },
            other => panic!("expected let, got {:?}", other),
        }
    }
}
