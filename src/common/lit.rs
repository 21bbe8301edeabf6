use std::fmt::{Display, Formatter, Result};

/// Literal values as they appear in source code.
/// The target is JavaScript, so there is a single
/// floating-point number type, and `nil` maps to `null`.
#[derive(Debug, Clone, PartialEq, proptest_derive::Arbitrary)]
pub enum Lit {
    Number(f64),

    /// A UTF-8 encoded string.
    String(String),

    Boolean(bool),
    Nil,
}

impl Display for Lit {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Lit::Number(n) => write!(f, "{}", n),
            Lit::String(s) => write!(f, "{:?}", s),
            Lit::Boolean(b) => write!(f, "{}", b),
            Lit::Nil => write!(f, "nil"),
        }
    }
}
