use std::{
    cell::RefCell,
    env,
    path::PathBuf,
    rc::Rc,
};

use crate::common::span::Spanned;
use crate::compiler::error::Error;
use crate::construct::{
    env::{Binding, Env},
    form::{Form, Forms},
    module::ImportRecord,
    session::Session,
};

/// One parsed `(import [name as alias ...] from "path")` form.
struct ImportSpec {
    /// `(name, alias)` pairs; a plain name aliases to itself.
    names: Vec<(String, String)>,
    path: String,
}

/// Removes every top-level import form from `forms`, loads
/// the modules they name, and merges the requested bindings
/// into `env`. Macros cross the boundary at compile time;
/// value bindings come back as records for the code generator
/// to turn into module imports.
pub struct Resolver;

impl Resolver {
    pub fn resolve(
        forms: &mut Forms,
        env: &Rc<RefCell<Env>>,
        session: &mut Session,
    ) -> Result<Vec<ImportRecord>, Error> {
        let mut records = vec![];
        let mut remaining = Vec::with_capacity(forms.len());

        for form in forms.drain(..) {
            if form.item.head_symbol() == Some("import") {
                let spec = ImportSpec::parse(&form)?;
                records.push(load(spec, env, session)?);
            } else {
                remaining.push(form);
            }
        }

        *forms = remaining;
        Ok(records)
    }
}

impl ImportSpec {
    fn parse(form: &Spanned<Form>) -> Result<ImportSpec, Error> {
        let summary = form.item.summary();
        let shape_error = |message: &str| {
            Error::transform("resolve", summary.clone(), message.to_string())
        };

        let Form::List(items) = &form.item else {
            return Err(shape_error("import must be a list form"));
        };

        // (import [names...] from "path")
        let (names_form, from, path_form) =
            match (items.get(1), items.get(2), items.get(3)) {
                (Some(names), Some(from), Some(path)) if items.len() == 4 => {
                    (names, from, path)
                },
                _ => {
                    return Err(shape_error(
                        "import takes a binding vector, `from`, and a path string",
                    ))
                },
            };

        if from.item.as_symbol() != Some("from") {
            return Err(shape_error("expected `from` after the binding vector"));
        }

        let Form::Vector(name_forms) = &names_form.item else {
            return Err(shape_error("import bindings must be a vector"));
        };

        let mut names = vec![];
        let mut name_iter = name_forms.iter().peekable();
        while let Some(name_form) = name_iter.next() {
            let Some(name) = name_form.item.as_symbol() else {
                return Err(shape_error("imported names must be symbols"));
            };
            let alias = if name_iter
                .peek()
                .and_then(|next| next.item.as_symbol())
                == Some("as")
            {
                name_iter.next();
                match name_iter.next().and_then(|form| form.item.as_symbol()) {
                    Some(alias) => alias.to_string(),
                    None => {
                        return Err(shape_error(
                            "`as` must be followed by an alias symbol",
                        ))
                    },
                }
            } else {
                name.to_string()
            };
            names.push((name.to_string(), alias));
        }

        if names.is_empty() {
            return Err(shape_error("import requires at least one binding"));
        }

        let Form::Lit(crate::common::lit::Lit::String(path)) = &path_form.item
        else {
            return Err(shape_error("import path must be a string literal"));
        };

        Ok(ImportSpec {
            names,
            path: path.clone(),
        })
    }
}

/// Load the module behind one import spec, compiling it first
/// if this session has not seen it yet, then merge bindings.
fn load(
    spec: ImportSpec,
    env: &Rc<RefCell<Env>>,
    session: &mut Session,
) -> Result<ImportRecord, Error> {
    let resolved = locate(&spec.path, session)?;

    if let Some(cycle) = session.modules.cycle(&resolved) {
        return Err(Error::import_cycle(&spec.path, cycle));
    }

    if !session.modules.is_processed(&resolved) {
        log::debug!("import `{}` -> compiling {:?}", spec.path, resolved);
        super::compile_module(&resolved, session)?;
    }

    // compile_module inserts the unit before returning
    let unit =
        session
            .modules
            .get(&resolved)
            .ok_or_else(|| Error::Validation {
                context: "module table".to_string(),
                expected: format!("a compiled unit for {:?}", resolved),
                actual: "no unit".to_string(),
                message: format!(
                    "`{}` compiled without registering a unit",
                    spec.path
                ),
            })?;
    let mut value_bindings = vec![];

    for (name, alias) in &spec.names {
        if let Some(mut def) = unit.macros.get(name).cloned() {
            def.name = alias.clone();
            env.borrow_mut().define_macro(def);
        } else if unit.exports.contains_key(name) {
            env.borrow_mut().define(
                alias,
                Binding::Imported {
                    from: resolved.clone(),
                    original: name.clone(),
                },
            );
            value_bindings.push((name.clone(), alias.clone()));
        } else {
            return Err(Error::import_missing_export(
                &spec.path,
                name,
                &resolved,
            ));
        }
    }

    Ok(ImportRecord {
        import_path: spec.path,
        resolved,
        value_bindings,
    })
}

/// Search order for an import path: the importing file's own
/// directory, the configured source root, the configured
/// stdlib root, then the process working directory. The first
/// candidate that exists wins, and is canonicalized so the
/// module table keys stay stable however a file was reached.
fn locate(import_path: &str, session: &Session) -> Result<PathBuf, Error> {
    let mut candidates: Vec<PathBuf> = vec![];
    let mut push = |root: Option<PathBuf>| {
        if let Some(root) = root {
            let candidate = root.join(import_path);
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
    };

    push(session.current_dir());
    push(session.config.source_root.clone());
    push(session.config.stdlib_root.clone());
    push(env::current_dir().ok());

    for candidate in &candidates {
        if candidate.is_file() {
            return candidate.canonicalize().map_err(|cause| {
                Error::import_io(import_path, candidate.clone(), cause)
            });
        }
    }

    Err(Error::import_not_found(import_path, candidates))
}

/// Removes every `(export [names...])` form from `forms` and
/// returns the union of the exported names, or `None` when the
/// file has no export form at all (meaning everything defined
/// at the top level is exported).
pub fn collect_exports(forms: &mut Forms) -> Result<Option<Vec<String>>, Error> {
    let mut exports: Option<Vec<String>> = None;
    let mut remaining = Vec::with_capacity(forms.len());

    for form in forms.drain(..) {
        if form.item.head_symbol() != Some("export") {
            remaining.push(form);
            continue;
        }

        let summary = form.item.summary();
        let shape_error = |message: &str| {
            Error::transform("resolve", summary.clone(), message.to_string())
        };

        let Form::List(items) = &form.item else { unreachable!() };
        let Some(Spanned {
            item: Form::Vector(name_forms),
            ..
        }) = items.get(1)
        else {
            return Err(shape_error("export takes a vector of symbols"));
        };
        if items.len() != 2 {
            return Err(shape_error("export takes a vector of symbols"));
        }

        let names = exports.get_or_insert_with(Vec::new);
        for name_form in name_forms {
            let Some(name) = name_form.item.as_symbol() else {
                return Err(shape_error("exported names must be symbols"));
            };
            if !names.iter().any(|existing| existing == name) {
                names.push(name.to_string());
            }
        }
    }

    *forms = remaining;
    Ok(exports)
}
