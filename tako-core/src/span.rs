//! Source locations.

use std::fmt;
use std::sync::Arc;

/// Byte offset into a source text.
pub type Offset = usize;

/// A span of source text in a named file.
///
/// `start` and `length` are byte offsets into the text the location was
/// built from; `start + length` never exceeds that text's length.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub start: Offset,
    pub length: Offset,
    pub file: Arc<str>,
}

impl Location {
    pub fn new(start: Offset, length: Offset, file: Arc<str>) -> Self {
        Location {
            start,
            length,
            file,
        }
    }

    /// One past the last byte covered by this location.
    pub fn end(&self) -> Offset {
        self.start + self.length
    }

    /// The slice of `source` this location covers, if it is in bounds.
    pub fn text<'src>(&self, source: &'src str) -> Option<&'src str> {
        source.get(self.start..self.end())
    }

    /// 1-based line and column of the first byte.
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let mut line = 1;
        let mut col = 1;
        for (i, ch) in source.char_indices() {
            if i >= self.start {
                break;
            }
            if ch == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        (line, col)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}+{}", self.file, self.start, self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(start: Offset, length: Offset) -> Location {
        Location::new(start, length, Arc::from("<test>"))
    }

    #[test]
    fn slices_source_text() {
        assert_eq!(loc(4, 3).text("let foo = 1"), Some("foo"));
        assert_eq!(loc(10, 5).text("short"), None);
    }

    #[test]
    fn computes_line_and_column() {
        let source = "a\nbc\nd";
        assert_eq!(loc(0, 1).line_col(source), (1, 1));
        assert_eq!(loc(3, 1).line_col(source), (2, 2));
        assert_eq!(loc(5, 1).line_col(source), (3, 1));
    }
}
