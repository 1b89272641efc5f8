use serde::{Deserialize, Serialize};
use std::fmt;

/// A region of one input chunk, 1-based line and column at both ends.
///
/// Serialized with the `line` / `column` keys diagnostics use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    #[serde(rename = "line")]
    pub start_line: u32,
    #[serde(rename = "column")]
    pub start_col: u32,
    pub end_line: u32,
    #[serde(rename = "end_column")]
    pub end_col: u32,
}

impl Span {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Zero-width span, used for end-of-input and synthesized nodes.
    pub fn point(line: u32, col: u32) -> Self {
        Self::new(line, col, line, col)
    }

    /// Smallest span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        let start = (self.start_line, self.start_col).min((other.start_line, other.start_col));
        let end = (self.end_line, self.end_col).max((other.end_line, other.end_col));
        Span::new(start.0, start.1, end.0, end.1)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// The text of one submitted chunk, named for diagnostics.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub source: String,
    /// Byte offset of the first character of every line.
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            name: name.into(),
            source,
            line_starts,
        }
    }

    /// Line `line_number` (1-based) without its terminator.
    pub fn line(&self, line_number: u32) -> Option<&str> {
        let idx = usize::try_from(line_number.checked_sub(1)?).ok()?;
        let start = *self.line_starts.get(idx)?;
        let end = self
            .line_starts
            .get(idx + 1)
            .copied()
            .unwrap_or(self.source.len());
        let text = &self.source[start..end];
        let text = text.strip_suffix('\n').unwrap_or(text);
        Some(text.strip_suffix('\r').unwrap_or(text))
    }

    /// The line a diagnostic at `span` points into; empty when the span lies
    /// past the end of the chunk.
    pub fn snippet(&self, span: Span) -> &str {
        self.line(span.start_line).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_takes_earliest_start_and_latest_end() {
        let decl = Span::new(1, 1, 1, 6);
        let body = Span::new(2, 3, 4, 2);
        assert_eq!(decl.merge(body), Span::new(1, 1, 4, 2));
        assert_eq!(body.merge(decl), Span::new(1, 1, 4, 2));
    }

    #[test]
    fn merge_on_one_line_compares_columns() {
        let merged = Span::new(1, 5, 1, 10).merge(Span::new(1, 3, 1, 8));
        assert_eq!((merged.start_col, merged.end_col), (3, 10));
    }

    #[test]
    fn display_is_start_position() {
        assert_eq!(Span::new(3, 7, 3, 15).to_string(), "3:7");
        assert_eq!(Span::point(2, 1).to_string(), "2:1");
    }

    #[test]
    fn serializes_with_diagnostic_keys() {
        let json = serde_json::to_value(Span::new(1, 2, 3, 4)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "line": 1, "column": 2, "end_line": 3, "end_column": 4 })
        );
    }

    #[test]
    fn lines_of_a_multi_line_chunk() {
        let chunk = SourceFile::new("{interactive}", "int x = 1;\r\nx++;\nx");
        assert_eq!(chunk.line(1), Some("int x = 1;"));
        assert_eq!(chunk.line(2), Some("x++;"));
        assert_eq!(chunk.line(3), Some("x"));
        assert_eq!(chunk.line(0), None);
        assert_eq!(chunk.line(4), None);
    }

    #[test]
    fn trailing_newline_opens_an_empty_line() {
        let chunk = SourceFile::new("{interactive}", "if (true) {\n");
        assert_eq!(chunk.line(2), Some(""));
        assert_eq!(chunk.snippet(Span::point(2, 1)), "");
        assert_eq!(chunk.snippet(Span::point(1, 11)), "if (true) {");
    }

    #[test]
    fn snippet_past_the_end_is_empty() {
        let chunk = SourceFile::new("{interactive}", "");
        assert_eq!(chunk.snippet(Span::point(1, 1)), "");
        assert_eq!(chunk.snippet(Span::point(9, 1)), "");
    }
}
