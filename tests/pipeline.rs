//! End-to-end tests for the whole pipeline, compiling real
//! fixture files through a fresh session each.

use std::path::PathBuf;

use hql::{compile_file, compile_source, Error, Session};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// A fresh session with stage logging visible under
/// `RUST_LOG=debug`.
fn session() -> Session {
    let _ = env_logger::builder().is_test(true).try_init();
    Session::new()
}

#[test]
fn standalone_addition() {
    let mut session = session();
    let js = compile_source("(+ 1 1)", &mut session).unwrap();
    assert!(js.contains("(1 + 1)"), "got: {}", js);
}

#[test]
fn empty_source_compiles_to_nothing() {
    let mut session = session();
    assert_eq!(compile_source("", &mut session).unwrap(), "");
}

#[test]
fn import_across_files() {
    let mut session = session();
    let js = compile_file(&fixture("a.hql"), &mut session).unwrap();

    assert!(js.contains("import { add } from "), "got: {}", js);
    assert!(js.contains("console.log(add(1, 2))"), "got: {}", js);
}

#[test]
fn imported_module_marks_its_exports() {
    let mut session = session();
    compile_file(&fixture("a.hql"), &mut session).unwrap();

    let resolved = fixture("b.hql").canonicalize().unwrap();
    let unit = session.modules.get(&resolved).unwrap();
    assert!(unit.code.contains("export const add"), "got: {}", unit.code);
    // sub is defined but not in the export list
    assert!(unit.code.contains("\nconst sub"), "got: {}", unit.code);
}

#[test]
fn importing_a_private_name_fails() {
    let mut session = session();
    let result = compile_file(&fixture("bad-import.hql"), &mut session);
    match result {
        Err(Error::Import { message, .. }) => {
            assert!(message.contains("does not export `sub`"), "got: {}", message);
        },
        other => panic!("expected import error, got {:?}", other),
    }
}

#[test]
fn user_macro_expands_away() {
    let mut session = session();
    let js = compile_source(
        "(defmacro twice (x) (list (quote do) x x)) \
         (twice (print \"hi\"))",
        &mut session,
    )
    .unwrap();

    assert_eq!(js.matches("console.log(\"hi\")").count(), 2, "got: {}", js);
    assert!(!js.contains("twice"), "got: {}", js);
}

#[test]
fn prelude_macros_are_available() {
    let mut session = session();
    let js = compile_source("(when true (print 1))", &mut session).unwrap();
    assert!(js.contains("(true ? console.log(1) : null)"), "got: {}", js);
}

#[test]
fn file_macro_shadows_prelude() {
    let mut session = session();
    let js = compile_source(
        "(defmacro twice [x] x) (twice (print 1))",
        &mut session,
    )
    .unwrap();

    // the prelude `twice` would print twice; the shadow prints once
    assert_eq!(js.matches("console.log(1)").count(), 1, "got: {}", js);
}

#[test]
fn unclosed_list_is_a_parse_error_on_line_one() {
    let mut session = session();
    let result = compile_source("(+ 1", &mut session);
    match result {
        Err(Error::Parse { line, message, .. }) => {
            assert_eq!(line, 1);
            assert!(message.contains("Unclosed list"), "got: {}", message);
        },
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn missing_import_reports_attempted_paths() {
    let mut session = session();
    let result = compile_source(
        "(import [x] from \"definitely-missing.hql\")",
        &mut session,
    );
    match result {
        Err(Error::Import {
            import_path,
            attempted,
            cycle,
            ..
        }) => {
            assert_eq!(import_path, "definitely-missing.hql");
            assert!(!attempted.is_empty());
            assert!(cycle.is_empty());
        },
        other => panic!("expected import error, got {:?}", other),
    }
}

#[test]
fn import_cycle_reports_the_chain() {
    let mut session = session();
    let result = compile_file(&fixture("cycle-a.hql"), &mut session);
    match result {
        Err(Error::Import { cycle, message, .. }) => {
            // a -> b -> a
            assert_eq!(cycle.len(), 3);
            assert_eq!(cycle.first(), cycle.last());
            assert!(message.contains("cycle"), "got: {}", message);
        },
        other => panic!("expected cycle error, got {:?}", other),
    }
}

#[test]
fn nested_imports_restore_the_importing_file() {
    let mut session = session();
    let js = compile_file(&fixture("outer.hql"), &mut session).unwrap();

    // lib/mid.hql resolved leaf.hql against its own directory,
    // and afterwards b.hql still resolved against fixtures/
    assert!(js.contains("import { mid } from "), "got: {}", js);
    assert!(js.contains("import { add } from "), "got: {}", js);
    assert!(js.contains("console.log(mid(add(1, 2)))"), "got: {}", js);
}

#[test]
fn macros_cross_module_boundaries_at_compile_time() {
    let mut session = session();
    let js = compile_file(&fixture("use-mac.hql"), &mut session).unwrap();

    // the macro expanded here; only the value binding is imported
    assert!(js.contains("(base * 2)"), "got: {}", js);
    assert!(js.contains("import { base } from "), "got: {}", js);
    assert!(!js.contains("double"), "got: {}", js);
}

#[test]
fn modules_compile_once_per_session() {
    let mut session = session();
    compile_file(&fixture("a.hql"), &mut session).unwrap();
    // a second entry file importing b.hql reuses the cached unit
    compile_file(&fixture("bad-import.hql"), &mut session).unwrap_err();
    compile_file(&fixture("a.hql"), &mut session).unwrap();
}

#[test]
fn output_is_identical_across_sessions() {
    let compile = || {
        let mut session = session();
        compile_file(&fixture("outer.hql"), &mut session).unwrap()
    };
    assert_eq!(compile(), compile());
}

#[test]
fn runaway_macro_is_cut_off() {
    let mut session = session();
    let result = compile_source(
        "(defmacro forever [x] (list (quote forever) x)) (forever 1)",
        &mut session,
    );
    match result {
        Err(Error::Macro { macro_name, message }) => {
            assert_eq!(macro_name, "forever");
            assert!(message.contains("did not terminate"), "got: {}", message);
        },
        other => panic!("expected macro error, got {:?}", other),
    }
}

#[test]
fn sessions_are_independent() {
    let mut first = session();
    compile_source("(defmacro m [x] x)", &mut first).unwrap();

    // the macro lives in the first session's scopes only; in a
    // fresh session `m` is an ordinary call
    let mut second = session();
    let js = compile_source("(m 1)", &mut second).unwrap();
    assert!(js.contains("m(1)"), "got: {}", js);
}
