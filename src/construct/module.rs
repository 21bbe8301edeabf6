use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::construct::env::{Binding, MacroDef};

/// One import form after resolution: the path as written,
/// where it resolved to, and the value bindings it pulls in
/// (exported name paired with the local alias). Macro
/// imports are compile-time only and leave no record here.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRecord {
    pub import_path: String,
    pub resolved: PathBuf,
    pub value_bindings: Vec<(String, String)>,
}

/// A fully compiled module: its exported value bindings,
/// its macros, and its generated code. Units live in the
/// session's module table for the lifetime of the session;
/// nothing is persisted across runs.
#[derive(Debug, Clone)]
pub struct Unit {
    pub path: PathBuf,
    pub exports: IndexMap<String, Binding>,
    pub macros: IndexMap<String, MacroDef>,
    pub code: String,
}

/// The arena of compiled units, keyed by canonical path,
/// plus the stack of files currently being resolved.
///
/// The `resolving` stack is distinct from the processed set:
/// a path on it has entered the pipeline but not finished,
/// so seeing it again means an import cycle. Because it is a
/// stack, it doubles as the chain reported in the cycle error.
#[derive(Debug, Default)]
pub struct ModuleTable {
    units: IndexMap<PathBuf, Unit>,
    resolving: Vec<PathBuf>,
}

impl ModuleTable {
    pub fn new() -> ModuleTable {
        ModuleTable::default()
    }

    pub fn is_processed(&self, path: &Path) -> bool {
        self.units.contains_key(path)
    }

    pub fn get(&self, path: &Path) -> Option<&Unit> {
        self.units.get(path)
    }

    pub fn insert(&mut self, unit: Unit) {
        self.units.insert(unit.path.clone(), unit);
    }

    /// If compiling `path` now would close a cycle, returns
    /// the chain of files from the first occurrence of the
    /// path back around to it. Otherwise `None`.
    pub fn cycle(&self, path: &Path) -> Option<Vec<PathBuf>> {
        let start = self.resolving.iter().position(|p| p == path)?;
        let mut chain: Vec<PathBuf> = self.resolving[start..].to_vec();
        chain.push(path.to_owned());
        Some(chain)
    }

    /// Mark `path` as currently resolving.
    /// Callers must check `cycle` first.
    pub fn begin(&mut self, path: PathBuf) {
        self.resolving.push(path);
    }

    /// Remove `path` from the resolving stack.
    pub fn finish(&mut self, path: &Path) {
        let popped = self.resolving.pop();
        debug_assert_eq!(popped.as_deref(), Some(path));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cycle_reports_full_chain() {
        let mut table = ModuleTable::new();
        let a = PathBuf::from("/a.hql");
        let b = PathBuf::from("/b.hql");

        table.begin(a.clone());
        table.begin(b.clone());

        assert_eq!(
            table.cycle(&a),
            Some(vec![a.clone(), b.clone(), a.clone()])
        );
        assert_eq!(table.cycle(&PathBuf::from("/c.hql")), None);

        table.finish(&b);
        table.finish(&a);
        assert_eq!(table.cycle(&a), None);
    }

    #[test]
    fn processed_is_separate_from_resolving() {
        let mut table = ModuleTable::new();
        let a = PathBuf::from("/a.hql");

        table.insert(Unit {
            path: a.clone(),
            exports: IndexMap::new(),
            macros: IndexMap::new(),
            code: String::new(),
        });

        // processed, but not resolving: no cycle
        assert!(table.is_processed(&a));
        assert_eq!(table.cycle(&a), None);
    }
}
