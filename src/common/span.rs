use std::{
    fmt::{self, Debug, Formatter},
    rc::Rc,
};

use crate::common::source::Source;

/// A `Span` refers to a section of a source,
/// much like a `&str`, but with a reference to a `Source`
/// rather than a `String`. A `Span` is meant to be paired
/// with other datastructures, to be used when attributing
/// errors to a location in source code.
#[derive(Clone, Eq, PartialEq)]
pub struct Span {
    source: Rc<Source>,
    offset: usize,
    length: usize,
}

impl Span {
    /// Create a new `Span` from an offset with a length.
    /// All `Span`s have access to the `Source` from whence they came,
    /// so they can't be misinterpreted or miscombined.
    pub fn new(source: &Rc<Source>, offset: usize, length: usize) -> Span {
        Span {
            source: Rc::clone(source),
            offset,
            length,
        }
    }

    /// A `Span` that points at a specific point in the source.
    /// Has a length of `0`.
    pub fn point(source: &Rc<Source>, offset: usize) -> Span {
        Span {
            source: Rc::clone(source),
            offset,
            length: 0,
        }
    }

    pub fn source(&self) -> &Rc<Source> {
        &self.source
    }

    /// The byte offset of the start of the `Span`.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Return the index of the end of the `Span`.
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// The 1-based line number of the start of the `Span`.
    pub fn line(&self) -> usize {
        self.source.contents[..self.offset]
            .matches('\n')
            .count()
            + 1
    }

    /// The 1-based column of the start of the `Span`,
    /// counted in characters from the start of the line.
    pub fn column(&self) -> usize {
        let line_start = self.source.contents[..self.offset]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        self.source.contents[line_start..self.offset]
            .chars()
            .count()
            + 1
    }

    /// Creates a new `Span` which spans the space of the previous two.
    /// ```plain
    /// hello this is cool
    /// ^^^^^              | Span a
    ///            ^^      | Span b
    /// ^^^^^^^^^^^^^      | combined
    /// ```
    /// Panics if the two spans come from different sources.
    pub fn combine(a: &Span, b: &Span) -> Span {
        if a.source != b.source {
            panic!("Can't combine two Spans with separate sources");
        }

        let offset = a.offset.min(b.offset);
        let end = a.end().max(b.end());

        Span::new(&a.source, offset, end - offset)
    }

    /// Returns the contents of a `Span`.
    /// This indexes into the source file,
    /// so if the `Span` is along an invalid byte boundary,
    /// the program will panic.
    pub fn contents(&self) -> String {
        self.source.as_ref().contents[self.offset..self.end()].to_string()
    }

    pub fn path(&self) -> String {
        self.source.path.to_string_lossy().to_string()
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Span")
            .field("path", &self.path())
            .field("start", &self.offset)
            .field("end", &self.end())
            .finish()
    }
}

/// A wrapper for spanning types.
/// For example, a token can be spanned to indicate
/// where it was lexed from (a `Spanned<Token>`).
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub item: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    /// Takes a generic item, and wraps it in a `Span` to make it `Spanned`.
    pub fn new(item: T, span: Span) -> Spanned<T> {
        Spanned { item, span }
    }

    /// Applies a function to a `Spanned`'s item,
    /// keeping the span untouched.
    pub fn map<B>(self, f: impl FnOnce(T) -> B) -> Spanned<B> {
        Spanned::new(f(self.item), self.span)
    }
}
