use std::{
    cell::RefCell,
    path::{Path, PathBuf},
    rc::Rc,
};

use crate::compiler::error::Error;
use crate::construct::{env::Env, module::ModuleTable};

/// Default macro-expansion fuel per top-level form.
pub const DEFAULT_MACRO_FUEL: usize = 512;

/// Caller-supplied knobs for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Optional project source root, tried when an import
    /// does not resolve relative to the importing file.
    pub source_root: Option<PathBuf>,
    /// Optional standard-library directory, tried after the
    /// source root.
    pub stdlib_root: Option<PathBuf>,
    /// Expansion steps allowed per top-level form before a
    /// macro is reported as non-terminating.
    pub macro_fuel: usize,
}

impl Default for SessionConfig {
    fn default() -> SessionConfig {
        SessionConfig {
            source_root: None,
            stdlib_root: None,
            macro_fuel: DEFAULT_MACRO_FUEL,
        }
    }
}

/// All state shared across one compilation run: the root
/// environment, the module table, and the current-file
/// stack. There are no module-level singletons; whether a
/// session is shared, reused, or thrown away is entirely
/// the caller's decision, which also makes concurrent use
/// a caller-level concern by construction.
#[derive(Debug)]
pub struct Session {
    root: Rc<RefCell<Env>>,
    pub modules: ModuleTable,
    file_stack: Vec<PathBuf>,
    prelude_loaded: bool,
    pub config: SessionConfig,
}

impl Session {
    pub fn new() -> Session {
        Session::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Session {
        Session {
            root: Env::root(),
            modules: ModuleTable::new(),
            file_stack: vec![],
            prelude_loaded: false,
            config,
        }
    }

    /// The root environment, holding the system macros.
    pub fn root(&self) -> Rc<RefCell<Env>> {
        Rc::clone(&self.root)
    }

    /// Enter a file: relative imports now resolve against
    /// its directory, and errors are attributed to it.
    /// Every `push_file` must be paired with a `pop_file`,
    /// including on error paths.
    pub fn push_file(&mut self, path: PathBuf) {
        self.file_stack.push(path);
    }

    /// Leave the file entered by the matching `push_file`.
    pub fn pop_file(&mut self) -> Result<PathBuf, Error> {
        self.file_stack.pop().ok_or_else(|| Error::Validation {
            context: "session file stack".to_string(),
            expected: "a current file to pop".to_string(),
            actual: "empty stack".to_string(),
            message: "pop_file called without a matching push_file".to_string(),
        })
    }

    /// The file currently being compiled, if any.
    pub fn current_file(&self) -> Option<&Path> {
        self.file_stack.last().map(PathBuf::as_path)
    }

    /// The directory of the current file, used as the first
    /// import-resolution strategy.
    pub fn current_dir(&self) -> Option<PathBuf> {
        self.current_file()
            .and_then(Path::parent)
            .map(Path::to_owned)
    }

    pub fn prelude_loaded(&self) -> bool {
        self.prelude_loaded
    }

    pub fn set_prelude_loaded(&mut self) {
        self.prelude_loaded = true;
    }
}

impl Default for Session {
    fn default() -> Session {
        Session::new()
    }
}
