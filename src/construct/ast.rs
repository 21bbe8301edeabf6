use std::path::PathBuf;

use crate::common::{lit::Lit, span::Spanned};
use crate::construct::form::Form;

/// Formal parameters of a function: either a fixed list of
/// names, or a fixed prefix plus a rest parameter that
/// collects the remaining arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    Fixed(Vec<String>),
    Variadic { fixed: Vec<String>, rest: String },
}

/// The target-agnostic AST produced by lowering.
/// By this point every macro has been expanded and every
/// special form shape-checked, so the generator can walk
/// this tree without re-validating it.
#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    Lit(Lit),
    Symbol(String),
    Vector(Vec<Spanned<Ast>>),
    Map(Vec<(Spanned<Ast>, Spanned<Ast>)>),
    Set(Vec<Spanned<Ast>>),

    /// Quoted data, kept as the original symbolic form.
    Quoted(Spanned<Form>),

    Def {
        name: String,
        value: Box<Spanned<Ast>>,
    },
    Fn {
        name: Option<String>,
        params: Params,
        body: Vec<Spanned<Ast>>,
    },
    Call {
        fun: Box<Spanned<Ast>>,
        args: Vec<Spanned<Ast>>,
    },
    Let {
        bindings: Vec<(String, Spanned<Ast>)>,
        body: Vec<Spanned<Ast>>,
    },
    If {
        cond: Box<Spanned<Ast>>,
        then: Box<Spanned<Ast>>,
        otherwise: Option<Box<Spanned<Ast>>>,
    },
    Do(Vec<Spanned<Ast>>),

    /// An ES-module import of value bindings.
    /// `bindings` pairs the exported name with the local alias.
    Import {
        bindings: Vec<(String, String)>,
        path: PathBuf,
    },
}

impl Ast {
    /// The node's type name, used by `CodeGen` errors.
    pub fn node_type(&self) -> &'static str {
        match self {
            Ast::Lit(_) => "Lit",
            Ast::Symbol(_) => "Symbol",
            Ast::Vector(_) => "Vector",
            Ast::Map(_) => "Map",
            Ast::Set(_) => "Set",
            Ast::Quoted(_) => "Quoted",
            Ast::Def { .. } => "Def",
            Ast::Fn { .. } => "Fn",
            Ast::Call { .. } => "Call",
            Ast::Let { .. } => "Let",
            Ast::If { .. } => "If",
            Ast::Do(_) => "Do",
            Ast::Import { .. } => "Import",
        }
    }
}

/// A lowered compilation unit: the ordered top-level nodes
/// of one file or standalone expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Spanned<Ast>>,
}
