use std::path::PathBuf;

use crate::common::source::Source;
use crate::compiler::{
    canonicalize::Canonicalizer, error::Error, expand, lex::Lexer,
    read::Reader,
};
use crate::construct::session::Session;

/// Declares the bundled prelude files, compiled into the
/// binary so a session needs no installed library directory.
macro_rules! declare_prelude {
    ($(($name:expr, $path:expr)),* $(,)?) => {
        const PRELUDE: &[(&str, &str)] = &[
            $(($name, include_str!($path))),*
        ];
    };
}

declare_prelude!(("core", "../prelude/core.hql"));

/// Loads the prelude macros into the session's root scope.
/// Runs once per session; later calls are no-ops. Macros
/// defined by a compiled file land in that file's child scope,
/// so they shadow these without replacing them.
pub fn ensure_loaded(session: &mut Session) -> Result<(), Error> {
    if session.prelude_loaded() {
        return Ok(());
    }

    let root = session.root();
    let fuel = session.config.macro_fuel;

    for (name, contents) in PRELUDE {
        let path = PathBuf::from(format!("<prelude:{}>", name));
        log::debug!("loading prelude file `{}`", name);

        let source = Source::new(contents, &path);
        session.push_file(path.clone());
        let result = (|| -> Result<(), Error> {
            let tokens = Lexer::lex(source)?;
            let forms = Canonicalizer::canonicalize(Reader::read(tokens)?)?;
            // registers the defmacros; the prelude has no
            // runtime forms of its own to keep
            expand::expand(forms, &root, fuel, &path)?;
            Ok(())
        })();
        session.pop_file()?;
        result?;
    }

    session.set_prelude_loaded();
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn loads_once_and_registers_macros() {
        let mut session = Session::new();
        ensure_loaded(&mut session).unwrap();
        assert!(session.prelude_loaded());

        let root = session.root();
        for name in ["when", "unless", "if-not", "twice"] {
            assert!(
                root.borrow().lookup_macro(name).is_some(),
                "prelude should define `{}`",
                name
            );
        }

        // a second call is a no-op, not a reload
        ensure_loaded(&mut session).unwrap();
    }

    #[test]
    fn prelude_leaves_the_file_stack_balanced() {
        let mut session = Session::new();
        ensure_loaded(&mut session).unwrap();
        assert_eq!(session.current_file(), None);
    }
}
