use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    rc::Rc,
};

/// The file extension of source files.
pub const EXTENSION: &str = "hql";

/// `Source` represents some literal source code.
/// Whether a whole file on disk, a bundled prelude file,
/// or a standalone expression handed in by an inline
/// evaluation caller. It's essentially a string with a
/// path, the path serving as the source's name.
/// Sources without a path point to `./expr`.
#[derive(Debug, PartialEq, Eq)]
pub struct Source {
    pub contents: String,
    pub path: PathBuf,
}

impl Source {
    /// Creates a new `Source` given both an `&str` and a
    /// `Path`. Note that this function does not check that
    /// the contents of the file match the source.
    /// `Source::path` or `Source::source` should be used
    /// instead.
    pub fn new(source: &str, path: &Path) -> Rc<Source> {
        Rc::new(Source {
            contents: source.to_string(),
            path: path.to_owned(),
        })
    }

    /// Build a `Source` from a path.
    /// This will read a file to create a new source.
    pub fn path(path: &Path) -> std::io::Result<Rc<Source>> {
        let mut source = String::new();
        let mut file = File::open(path)?;
        file.read_to_string(&mut source)?;

        Ok(Source::new(&source, path))
    }

    /// Build a `Source` containing just a string, for
    /// standalone-expression callers.
    /// Note that this source will point towards `./expr`.
    pub fn source(source: &str) -> Rc<Source> {
        Source::new(source, &PathBuf::from("./expr"))
    }
}
