//! Source position tracking, grounded in the teacher's `parser::span`.

use nom_locate::LocatedSpan;

/// Input wrapper carrying line/column/offset alongside the `&str` slice.
pub type Span<'a> = LocatedSpan<&'a str>;

/// A value tagged with the byte range of source it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub value: T,
    pub start: usize,
    pub end: usize,
}

impl<T> Spanned<T> {
    pub fn new(value: T, start: usize, end: usize) -> Self {
        Self { value, start, end }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned::new(f(self.value), self.start, self.end)
    }

    pub fn as_ref(&self) -> Spanned<&T> {
        Spanned::new(&self.value, self.start, self.end)
    }
}

/// Byte offset of a `Span`, for building a `Spanned<T>` from before/after
/// positions around a `nom` combinator call.
pub fn offset(span: &Span) -> usize {
    span.location_offset()
}
