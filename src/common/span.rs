use std::fmt;

/// Source position attached to AST nodes by the parser.
///
/// Only the line is tracked; diagnostics highlight the whole line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Span {
    /// 1-based line number, 0 when unknown
    pub line: usize,
}

impl Span {
    pub fn new(line: usize) -> Self {
        Self { line }
    }

    pub fn unknown() -> Self {
        Self { line: 0 }
    }

    pub fn is_known(&self) -> bool {
        self.line != 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_known() {
            write!(f, "line {}", self.line)
        } else {
            write!(f, "<unknown line>")
        }
    }
}

pub type Spanned<T> = (T, Span);
