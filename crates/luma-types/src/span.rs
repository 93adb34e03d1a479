use serde::{Deserialize, Serialize};
use std::fmt;

/// Source location span.
///
/// `start`/`end` are character offsets into the source (end exclusive);
/// `line`/`col` locate `start` and are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    #[serde(rename = "column")]
    pub col: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, col: u32) -> Self {
        Self {
            start,
            end: end.max(start),
            line,
            col,
        }
    }

    /// A zero-width span at a single position.
    pub fn point(offset: usize, line: u32, col: u32) -> Self {
        Self::new(offset, offset, line, col)
    }

    /// Smallest span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        let (first, _) = if self.start <= other.start {
            (self, other)
        } else {
            (other, self)
        };
        Span {
            start: first.start,
            end: self.end.max(other.end),
            line: first.line,
            col: first.col,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Named source text with a line index, used for diagnostics.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub source: String,
    /// Byte offset at which each line begins.
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

    /// The text of a 1-based line, without its terminator.
    pub fn line(&self, line_number: u32) -> Option<&str> {
        let idx = (line_number as usize).checked_sub(1)?;
        let start = *self.line_starts.get(idx)?;
        let end = match self.line_starts.get(idx + 1) {
            Some(next) => next - 1,
            None => self.source.len(),
        };
        Some(self.source[start..end].trim_end_matches('\r'))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Render a caret diagnostic for `span`:
    ///
    /// ```text
    /// error[E100]: expected ';'
    ///  --> sketch.ino:3:5
    ///   |
    /// 3 |   let x
    ///   |     ^
    /// ```
    pub fn render(&self, header: &str, span: Span) -> String {
        let gutter = span.line.to_string().len();
        let pad = " ".repeat(gutter);
        let text = self.line(span.line).unwrap_or("");
        let line_chars = text.chars().count();
        let col = (span.col as usize).saturating_sub(1).min(line_chars);
        let width = span.len().clamp(1, (line_chars - col).max(1));
        format!(
            "{header}\n{pad}--> {}:{}:{}\n{pad} |\n{} | {text}\n{pad} | {}{}",
            self.name,
            span.line,
            span.col,
            span.line,
            " ".repeat(col),
            "^".repeat(width),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge_orders_by_offset() {
        let a = Span::new(10, 14, 2, 3);
        let b = Span::new(4, 6, 1, 5);
        let merged = a.merge(b);
        assert_eq!(merged.start, 4);
        assert_eq!(merged.end, 14);
        assert_eq!((merged.line, merged.col), (1, 5));
    }

    #[test]
    fn test_span_end_never_precedes_start() {
        let s = Span::new(8, 3, 1, 9);
        assert_eq!(s.end, 8);
        assert!(s.is_empty());
    }

    #[test]
    fn test_span_display() {
        assert_eq!(Span::new(0, 4, 3, 7).to_string(), "3:7");
    }

    #[test]
    fn test_source_file_lines() {
        let src = SourceFile::new("sketch.ino", "void setup() {}\r\nvoid loop() {}\n");
        assert_eq!(src.line(1), Some("void setup() {}"));
        assert_eq!(src.line(2), Some("void loop() {}"));
        assert_eq!(src.line(3), Some(""));
        assert_eq!(src.line(0), None);
        assert_eq!(src.line(4), None);
        assert_eq!(src.line_count(), 3);
    }

    #[test]
    fn test_render_points_at_column() {
        let src = SourceFile::new("sketch.ino", "let a = 1;\nlet = 2;");
        let out = src.render("error[E100]: expected identifier", Span::new(15, 16, 2, 5));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "error[E100]: expected identifier");
        assert_eq!(lines[1], " --> sketch.ino:2:5");
        assert_eq!(lines[3], "2 | let = 2;");
        assert_eq!(lines[4], "  |     ^");
    }

    #[test]
    fn test_span_json_uses_column() {
        let json = serde_json::to_string(&Span::new(1, 2, 3, 4)).unwrap();
        assert!(json.contains("\"column\":4"));
        assert!(json.contains("\"line\":3"));
    }
}
