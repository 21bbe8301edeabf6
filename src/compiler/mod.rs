//! The compilation pipeline. Each stage turns one datatype
//! into the next, starting from `Source` (string + path):
//!
//! 1. Tokens:          `lex.rs`
//! 2. Symbolic forms:  `read.rs`
//! 3. Canonical forms: `canonicalize.rs` (sigils and `defn` rewritten)
//! 4. Imports removed: `resolve.rs` (modules loaded, bindings merged)
//! 5. Macro-free forms: `expand.rs`
//! 6. AST:             `lower.rs`
//! 7. JavaScript:      `gen.rs`
//!
//! The driver functions here glue the stages together around
//! a `Session`, which owns every piece of cross-file state.

pub mod canonicalize;
pub mod error;
pub mod expand;
pub mod gen;
pub mod lex;
pub mod lower;
pub mod prelude;
pub mod read;
pub mod resolve;

use std::{path::Path, rc::Rc};

use indexmap::IndexMap;

use crate::common::{
    source::Source,
    span::Span,
};
use crate::construct::{
    env::{Binding, Env},
    form::Form,
    module::Unit,
    session::Session,
};

use canonicalize::Canonicalizer;
use error::Error;
use gen::Gen;
use lex::Lexer;
use lower::Lower;
use read::Reader;
use resolve::Resolver;

/// Compile one source to JavaScript within `session`.
/// The entry file participates in cycle detection like any
/// other module, so an import chain leading back to it is
/// reported rather than recursed into.
pub fn compile(source: Rc<Source>, session: &mut Session) -> Result<String, Error> {
    prelude::ensure_loaded(session)?;

    let path = source.path.clone();
    log::debug!("compiling {:?}", path);

    session.modules.begin(path.clone());
    session.push_file(path.clone());
    let result = compile_unit(source, session);
    session.pop_file()?;
    session.modules.finish(&path);

    result.map(|unit| unit.code)
}

/// Compile an imported module and park its unit in the
/// session's module table. Expects a canonical path that the
/// resolver has already cycle-checked.
pub(crate) fn compile_module(path: &Path, session: &mut Session) -> Result<(), Error> {
    let source = Source::path(path).map_err(|cause| {
        Error::import_io(&path.to_string_lossy(), path.to_owned(), cause)
    })?;
    log::debug!("compiling module {:?}", path);

    session.modules.begin(path.to_owned());
    session.push_file(path.to_owned());
    let result = compile_unit(source, session);
    session.pop_file()?;
    session.modules.finish(path);

    session.modules.insert(result?);
    Ok(())
}

/// The per-file pipeline. Runs in a scope of its own under
/// the session root, so file-level macros shadow the prelude
/// without replacing it.
fn compile_unit(source: Rc<Source>, session: &mut Session) -> Result<Unit, Error> {
    let path = source.path.clone();
    let env = Env::child(&session.root());
    let module_span = Span::point(&source, 0);

    let tokens = Lexer::lex(source)?;
    let mut forms = Canonicalizer::canonicalize(Reader::read(tokens)?)?;

    // imports first: they may bring in macros the rest of the
    // file expands with
    let imports = Resolver::resolve(&mut forms, &env, session)?;
    let mut forms = expand::expand(forms, &env, session.config.macro_fuel, &path)?;
    let export_list = resolve::collect_exports(&mut forms)?;

    // every top-level definition left after expansion is a
    // candidate export
    let mut exports: IndexMap<String, Binding> = IndexMap::new();
    for form in &forms {
        if form.item.head_symbol() != Some("def") {
            continue;
        }
        let Form::List(items) = &form.item else { continue };
        if let Some(name) = items.get(1).and_then(|form| form.item.as_symbol()) {
            let binding = Binding::Def {
                origin: path.clone(),
            };
            env.borrow_mut().define(name, binding.clone());
            exports.insert(name.to_string(), binding);
        }
    }

    if let Some(list) = &export_list {
        for name in list {
            if !exports.contains_key(name) {
                return Err(Error::transform(
                    "resolve",
                    format!("(export [{}])", name),
                    format!(
                        "exported name `{}` is not defined at the top level",
                        name
                    ),
                ));
            }
        }
        exports.retain(|name, _| list.iter().any(|kept| kept == name));
    }

    let export_names: Vec<String> = exports.keys().cloned().collect();
    let program = Lower::lower(&forms, &imports, &module_span)?;
    let code = Gen::gen(&program, &export_names)?;
    let macros = env.borrow().own_macros();

    Ok(Unit {
        path,
        exports,
        macros,
        code,
    })
}
