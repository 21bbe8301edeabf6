use std::{
    fmt, io,
    path::{Path, PathBuf},
};

use crate::common::span::Span;

/// A compile-time error, classified by the stage that
/// detected it. Every variant carries enough structure for
/// the (external) reporting layer to render: kind, message,
/// and source position where one exists. Rendering itself —
/// code frames, color, suggestions — is not this crate's job.
#[derive(Debug)]
pub enum Error {
    /// The reader rejected the source text.
    Parse {
        line: usize,
        column: usize,
        offset: usize,
        message: String,
    },
    /// An import could not be resolved, or closed a cycle.
    /// `attempted` lists every candidate path tried;
    /// `cycle` is the chain of files for a cyclic import,
    /// empty otherwise.
    Import {
        import_path: String,
        attempted: Vec<PathBuf>,
        cycle: Vec<PathBuf>,
        message: String,
        cause: Option<io::Error>,
    },
    /// Macro expansion failed or ran out of fuel.
    Macro {
        macro_name: String,
        message: String,
    },
    /// A stage was handed a form it cannot rewrite.
    Transform {
        phase: &'static str,
        form_summary: String,
        message: String,
    },
    /// The generator met an AST node it cannot emit.
    CodeGen {
        node_type: &'static str,
        message: String,
    },
    /// The crate's API was misused.
    Validation {
        context: String,
        expected: String,
        actual: String,
        message: String,
    },
}

impl Error {
    /// A parse error located at `span`.
    pub fn parse(message: &str, span: &Span) -> Error {
        Error::Parse {
            line: span.line(),
            column: span.column(),
            offset: span.offset(),
            message: message.to_string(),
        }
    }

    /// An import whose path exists nowhere on the
    /// resolution path.
    pub fn import_not_found(import_path: &str, attempted: Vec<PathBuf>) -> Error {
        Error::Import {
            import_path: import_path.to_string(),
            message: format!(
                "could not resolve import `{}`; tried {} location{}",
                import_path,
                attempted.len(),
                if attempted.len() == 1 { "" } else { "s" },
            ),
            attempted,
            cycle: vec![],
            cause: None,
        }
    }

    /// An import that closes a cycle. `chain` runs from the
    /// first occurrence of the repeated file back to it.
    pub fn import_cycle(import_path: &str, chain: Vec<PathBuf>) -> Error {
        let rendered = chain
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        Error::Import {
            import_path: import_path.to_string(),
            attempted: vec![],
            message: format!("import cycle detected: {}", rendered),
            cycle: chain,
            cause: None,
        }
    }

    /// A resolved import that failed at the filesystem,
    /// keeping the io error as the inner cause.
    pub fn import_io(import_path: &str, path: PathBuf, cause: io::Error) -> Error {
        Error::Import {
            import_path: import_path.to_string(),
            message: format!(
                "could not read `{}`: {}",
                path.to_string_lossy(),
                cause
            ),
            attempted: vec![path],
            cycle: vec![],
            cause: Some(cause),
        }
    }

    /// A module that resolved and compiled fine, but does not
    /// export the requested name.
    pub fn import_missing_export(
        import_path: &str,
        name: &str,
        resolved: &Path,
    ) -> Error {
        Error::Import {
            import_path: import_path.to_string(),
            message: format!(
                "`{}` does not export `{}`",
                resolved.to_string_lossy(),
                name
            ),
            attempted: vec![resolved.to_owned()],
            cycle: vec![],
            cause: None,
        }
    }

    pub fn macro_error(macro_name: &str, message: String) -> Error {
        Error::Macro {
            macro_name: macro_name.to_string(),
            message,
        }
    }

    pub fn transform(phase: &'static str, form_summary: String, message: String) -> Error {
        Error::Transform {
            phase,
            form_summary,
            message,
        }
    }

    pub fn codegen(node_type: &'static str, message: String) -> Error {
        Error::CodeGen { node_type, message }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse {
                line,
                column,
                message,
                ..
            } => write!(f, "parse error at {}:{}: {}", line, column, message),
            Error::Import {
                message, attempted, ..
            } => {
                write!(f, "import error: {}", message)?;
                for path in attempted {
                    write!(f, "\n  tried {}", path.to_string_lossy())?;
                }
                Ok(())
            },
            Error::Macro {
                macro_name,
                message,
            } => write!(f, "macro error in `{}`: {}", macro_name, message),
            Error::Transform {
                phase,
                form_summary,
                message,
            } => write!(
                f,
                "{} error on `{}`: {}",
                phase, form_summary, message
            ),
            Error::CodeGen { node_type, message } => {
                write!(f, "codegen error on {} node: {}", node_type, message)
            },
            Error::Validation {
                context,
                expected,
                actual,
                message,
            } => write!(
                f,
                "validation error in {}: {} (expected {}, got {})",
                context, message, expected, actual
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Import {
                cause: Some(cause), ..
            } => Some(cause),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::source::Source;

    #[test]
    fn parse_error_position() {
        let source = Source::source("(+ 1\n(oops");
        let span = Span::point(&source, 5);
        let error = Error::parse("unclosed list", &span);

        match error {
            Error::Parse {
                line,
                column,
                offset,
                ..
            } => {
                assert_eq!(line, 2);
                assert_eq!(column, 1);
                assert_eq!(offset, 5);
            },
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn import_cycle_names_every_file() {
        let chain = vec![
            PathBuf::from("/a.hql"),
            PathBuf::from("/b.hql"),
            PathBuf::from("/a.hql"),
        ];
        let error = Error::import_cycle("./b.hql", chain);
        let rendered = error.to_string();

        assert!(rendered.contains("/a.hql -> /b.hql -> /a.hql"));
    }

    #[test]
    fn io_cause_is_kept() {
        use std::error::Error as _;

        let cause = io::Error::new(io::ErrorKind::NotFound, "gone");
        let error =
            Error::import_io("./x.hql", PathBuf::from("/x.hql"), cause);

        assert!(error.source().is_some());
    }
}
