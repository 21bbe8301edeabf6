//! Datastructures shared by every stage of the pipeline:
//! source code representation, span annotations, and literals.

pub mod lit;
pub mod source;
pub mod span;

pub use lit::Lit;
pub use source::Source;
pub use span::{Span, Spanned};
