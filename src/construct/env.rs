use std::{cell::RefCell, path::PathBuf, rc::Rc};

use indexmap::IndexMap;

use crate::construct::form::Forms;

/// What a name in scope refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// A top-level definition made in `origin`.
    Def { origin: PathBuf },
    /// A value imported from another module under a
    /// possibly different `original` name.
    Imported { from: PathBuf, original: String },
}

/// A user- or system-defined macro. The body is one or more
/// symbolic forms that are structurally substituted at each
/// call site; it is never evaluated as target-language code.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroDef {
    pub name: String,
    pub params: Vec<String>,
    /// Rest parameter for variadic macros: `[a b & rest]`.
    pub rest: Option<String>,
    pub body: Forms,
    /// The file the macro was defined in.
    pub origin: PathBuf,
}

/// A single scope in the compilation environment: value
/// bindings, macro bindings, and a link to the enclosing
/// scope. Lookup walks the parent chain and returns `None`
/// rather than failing, so callers decide what a missing
/// name means.
///
/// The tables are insertion-ordered (`IndexMap`) so that
/// anything derived from them — export lists, generated
/// import statements — is deterministic.
#[derive(Debug)]
pub struct Env {
    bindings: IndexMap<String, Binding>,
    macros: IndexMap<String, MacroDef>,
    parent: Option<Rc<RefCell<Env>>>,
}

impl Env {
    /// A root scope with no parent. The session's prelude
    /// macros are registered here.
    pub fn root() -> Rc<RefCell<Env>> {
        Rc::new(RefCell::new(Env {
            bindings: IndexMap::new(),
            macros: IndexMap::new(),
            parent: None,
        }))
    }

    /// A fresh scope enclosed by `parent`.
    pub fn child(parent: &Rc<RefCell<Env>>) -> Rc<RefCell<Env>> {
        Rc::new(RefCell::new(Env {
            bindings: IndexMap::new(),
            macros: IndexMap::new(),
            parent: Some(Rc::clone(parent)),
        }))
    }

    /// Bind a name in this scope. Redefinition overwrites.
    pub fn define(&mut self, name: &str, binding: Binding) {
        self.bindings.insert(name.to_string(), binding);
    }

    /// Look a name up, walking the parent chain.
    pub fn lookup(&self, name: &str) -> Option<Binding> {
        if let Some(binding) = self.bindings.get(name) {
            return Some(binding.clone());
        }
        self.parent
            .as_ref()
            .and_then(|parent| parent.borrow().lookup(name))
    }

    /// Register a macro in this scope. Redefinition overwrites.
    pub fn define_macro(&mut self, def: MacroDef) {
        self.macros.insert(def.name.clone(), def);
    }

    /// Look a macro up, walking the parent chain.
    /// Lookup starts at the innermost scope, so a user-defined
    /// macro shadows a system macro of the same name (the
    /// prelude lives in the root scope).
    pub fn lookup_macro(&self, name: &str) -> Option<MacroDef> {
        if let Some(def) = self.macros.get(name) {
            return Some(def.clone());
        }
        self.parent
            .as_ref()
            .and_then(|parent| parent.borrow().lookup_macro(name))
    }

    /// The macros registered directly in this scope,
    /// without walking the chain. Used to extract a
    /// module's exportable macros.
    pub fn own_macros(&self) -> IndexMap<String, MacroDef> {
        self.macros.clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn dummy_macro(name: &str) -> MacroDef {
        MacroDef {
            name: name.to_string(),
            params: vec!["x".to_string()],
            rest: None,
            body: vec![],
            origin: PathBuf::from("<test>"),
        }
    }

    #[test]
    fn lookup_walks_chain() {
        let root = Env::root();
        root.borrow_mut().define(
            "x",
            Binding::Def {
                origin: PathBuf::from("a.hql"),
            },
        );

        let child = Env::child(&root);
        assert!(child.borrow().lookup("x").is_some());
        assert!(child.borrow().lookup("y").is_none());
    }

    #[test]
    fn inner_macro_shadows_outer() {
        let root = Env::root();
        root.borrow_mut().define_macro(dummy_macro("when"));

        let child = Env::child(&root);
        let mut shadow = dummy_macro("when");
        shadow.params.push("y".to_string());
        child.borrow_mut().define_macro(shadow.clone());

        assert_eq!(child.borrow().lookup_macro("when"), Some(shadow));
        assert_eq!(
            root.borrow().lookup_macro("when"),
            Some(dummy_macro("when"))
        );
    }

    #[test]
    fn redefinition_overwrites() {
        let root = Env::root();
        root.borrow_mut().define_macro(dummy_macro("m"));
        let mut redef = dummy_macro("m");
        redef.rest = Some("rest".to_string());
        root.borrow_mut().define_macro(redef.clone());

        assert_eq!(root.borrow().lookup_macro("m"), Some(redef));
    }

    #[test]
    fn own_macros_skips_parent() {
        let root = Env::root();
        root.borrow_mut().define_macro(dummy_macro("inherited"));
        let child = Env::child(&root);
        child.borrow_mut().define_macro(dummy_macro("own"));

        let own = child.borrow().own_macros();
        assert!(own.contains_key("own"));
        assert!(!own.contains_key("inherited"));
    }
}
