//! Single-line diagnostics for parse errors.
//!
//! ```
//! use fetchxml_sql::parse_sql;
//!
//! let source = "SELECT FROM account";
//! let err = parse_sql(source).unwrap_err();
//! let context = err.context(source);
//!
//! assert_eq!((context.line, context.column), (1, 8));
//! assert!(context.snippet.contains("FROM account"));
//! ```

use serde::Serialize;
use std::fmt;

/// Width of the source window shown around an error.
pub const DEFAULT_CONTEXT_WIDTH: usize = 30;

/// An error message with a fixed-width window of the offending source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorContext {
    pub message: String,
    pub line: usize,
    pub column: usize,
    /// At most `width` characters of the failing line, centered on `column`
    pub snippet: String,
    /// Character offset of the failing column inside `snippet`
    pub caret: usize,
}

impl ErrorContext {
    /// Build the window; positions outside the source are clamped.
    pub fn new(message: &str, source: &str, line: usize, column: usize, width: usize) -> Self {
        let line_text = source.lines().nth(line.saturating_sub(1)).unwrap_or("");
        let chars: Vec<char> = line_text
            .chars()
            .map(|c| if c == '\t' { ' ' } else { c })
            .collect();

        let width = width.max(1);
        let index = column.saturating_sub(1).min(chars.len());
        let start = index.saturating_sub(width / 2);
        let end = (start + width).min(chars.len());
        // Near the end of the line, slide the window left to keep it full
        let start = start.min(end.saturating_sub(width));

        ErrorContext {
            message: message.to_string(),
            line,
            column,
            snippet: chars[start..end].iter().collect(),
            caret: index - start,
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} (line {}, column {})",
            self.message, self.line, self.column
        )?;
        writeln!(f, "  {}", self.snippet)?;
        write!(f, "  {}^", " ".repeat(self.caret))
    }
}
