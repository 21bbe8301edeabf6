//! # hql
//! A compiler from a small Lisp-syntax language to JavaScript.
//!
//! Source files (`.hql`) go through a fixed pipeline: lexing,
//! reading into symbolic forms, canonicalization, import
//! resolution, macro expansion, lowering to an AST, and code
//! generation. Every piece of cross-file state, the root macro
//! scope, the table of compiled modules, and the stack of
//! files being compiled, lives in a [`Session`] the caller
//! owns; there is no global state anywhere in the crate.
//!
//! ## Compiling a file
//! ```no_run
//! use hql::{compile_file, Session};
//!
//! fn main() -> Result<(), hql::Error> {
//!     let mut session = Session::new();
//!     let js = compile_file("main.hql".as_ref(), &mut session)?;
//!     print!("{}", js);
//!     Ok(())
//! }
//! ```
//!
//! ## Compiling a standalone expression
//! ```
//! use hql::{compile_source, Session};
//!
//! let mut session = Session::new();
//! let js = compile_source("(+ 1 1)", &mut session).unwrap();
//! assert!(js.contains("(1 + 1)"));
//! ```

pub mod common;
pub mod compiler;
pub mod construct;

use std::path::Path;

use common::source::Source;

pub use compiler::error::Error;
pub use construct::session::{Session, SessionConfig};

/// Compile the file at `path` to JavaScript.
///
/// The path is canonicalized first, so the module table keys
/// agree however the file is later imported. Modules pulled in
/// by the file stay cached in the session; compiling a second
/// entry file with the same session reuses them.
pub fn compile_file(path: &Path, session: &mut Session) -> Result<String, Error> {
    let shown = path.to_string_lossy().to_string();
    let path = path
        .canonicalize()
        .map_err(|cause| Error::import_io(&shown, path.to_owned(), cause))?;
    let source = Source::path(&path)
        .map_err(|cause| Error::import_io(&shown, path.clone(), cause))?;
    compiler::compile(source, session)
}

/// Compile a standalone source string to JavaScript.
///
/// The source is attributed to `./expr`; relative imports
/// resolve against the session's configured roots and the
/// process working directory.
pub fn compile_source(text: &str, session: &mut Session) -> Result<String, Error> {
    compiler::compile(Source::source(text), session)
}
