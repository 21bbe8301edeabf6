//! Datastructures threaded through the compilation pipeline:
//! tokens, symbolic forms, the lowered AST, the scope-chained
//! compilation environment, the module table, and the session
//! that owns them all.

pub mod ast;
pub mod env;
pub mod form;
pub mod module;
pub mod session;
pub mod token;

pub use ast::{Ast, Params, Program};
pub use env::{Binding, Env, MacroDef};
pub use form::{Form, Forms};
pub use module::{ImportRecord, ModuleTable, Unit};
pub use session::{Session, SessionConfig};
pub use token::{Delim, Token, Tokens};
