//! CLI support for fetchxml-sql
//!
//! The commands behind the `fxsql` binary, callable from other tools
//! without going through the argument parser.

mod check;
mod convert;
mod docs;

pub use check::{CheckOptions, execute_check};
pub use convert::{execute_to_fetchxml, execute_to_sql, tokens_json};
pub use docs::{DocCategory, get_doc_category, get_docs_overview};

use crate::ErrorContext;
use std::io;
use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    /// SQL that failed to parse, with its source window
    #[error("Parse error: {0}")]
    Parse(ErrorContext),

    /// FetchXML that could not be translated
    #[error("Translation failed: {0}")]
    Transpile(String),

    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("No input provided. Pass it as an argument or pipe it to stdin.")]
    NoInput,

    #[error("Unknown category: '{0}'\nRun 'fxsql docs' to see available categories.")]
    UnknownCategory(String),
}
