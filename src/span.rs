/// Byte-offset span in source code, carrying the line/column of its start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
    pub file_id: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self { start, end, line, column, file_id: 0 }
    }

    pub fn with_file(start: usize, end: usize, line: u32, column: u32, file_id: u32) -> Self {
        Self { start, end, line, column, file_id }
    }

    pub fn dummy() -> Self {
        Self { start: 0, end: 0, line: 1, column: 1, file_id: 0 }
    }

    /// Join two spans into one covering both. Keeps the left span's start
    /// position for line/column reporting.
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start,
            end: other.end.max(self.end),
            line: self.line,
            column: self.column,
            file_id: self.file_id,
        }
    }

    pub fn contains(self, other: Span) -> bool {
        self.file_id == other.file_id && self.start <= other.start && other.end <= self.end
    }
}

/// A value annotated with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned { node: f(self.node), span: self.span }
    }
}
