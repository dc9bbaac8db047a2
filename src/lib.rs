//! Bidirectional translation between a SQL `SELECT` subset and FetchXML,
//! the XML query language of Dataverse / Dynamics 365.
//!
//! ```
//! use fetchxml_sql::{fetchxml_to_sql, parse_sql, sql_to_fetchxml};
//!
//! let statement = parse_sql("SELECT TOP 10 name FROM account WHERE statecode = 0").unwrap();
//! let xml = sql_to_fetchxml(&statement);
//! assert!(xml.contains(r#"<fetch top="10">"#));
//!
//! let result = fetchxml_to_sql(&xml);
//! assert!(result.success);
//! assert!(result.sql.unwrap().contains("WHERE statecode = 0"));
//! ```

pub mod ast;
pub mod cli;
pub mod diagnostics;
pub mod fetchxml;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod semantic;
pub mod value;

pub use ast::{Expression, SelectStatement, Token, TokenKind};
pub use diagnostics::{DEFAULT_CONTEXT_WIDTH, ErrorContext};
pub use fetchxml::{
    FetchXmlError, FetchXmlOptions, FetchXmlTranspiler, FetchXmlWriter, SqlOptions,
    TranspileResult, Warning,
};
pub use lexer::{Lexer, Position};
pub use output::{to_sql, to_sql_compact};
pub use parser::{ParseError, ParseOptions, Parser};
pub use value::Value;

/// Split `source` into tokens, ending with [`TokenKind::Eof`].
///
/// Lexical problems show up as [`TokenKind::Error`] tokens instead of
/// stopping the scan.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}

/// Parse a single `SELECT` statement with default options.
pub fn parse_sql(source: &str) -> Result<SelectStatement, ParseError> {
    parse_sql_with_options(source, ParseOptions::default())
}

pub fn parse_sql_with_options(
    source: &str,
    options: ParseOptions,
) -> Result<SelectStatement, ParseError> {
    Parser::with_options(Lexer::new(source), options)?.parse_statement()
}

/// Render `statement` as indented FetchXML.
pub fn sql_to_fetchxml(statement: &SelectStatement) -> String {
    FetchXmlWriter::default().write(statement)
}

/// Translate FetchXML into pretty-printed SQL. Never panics.
pub fn fetchxml_to_sql(xml: &str) -> TranspileResult {
    FetchXmlTranspiler::default().transpile(xml)
}

/// Render `statement` back to SQL text.
pub fn render_sql(statement: &SelectStatement) -> String {
    to_sql(statement)
}
