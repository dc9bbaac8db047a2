//! SQL <-> FetchXML conversion commands

use super::CliError;
use crate::{
    FetchXmlOptions, FetchXmlTranspiler, FetchXmlWriter, ParseOptions, SqlOptions,
    TranspileResult, parse_sql_with_options, tokenize,
};

/// Parse `sql` and render it as FetchXML.
pub fn execute_to_fetchxml(
    sql: &str,
    options: FetchXmlOptions,
    parse_options: ParseOptions,
) -> Result<String, CliError> {
    let statement =
        parse_sql_with_options(sql, parse_options).map_err(|e| CliError::Parse(e.context(sql)))?;
    Ok(FetchXmlWriter::new(options).write(&statement))
}

/// Translate `xml` to SQL.
///
/// The full result is returned even on failure so callers can print it as
/// JSON; use [`TranspileResult::success`] to decide the exit status.
pub fn execute_to_sql(xml: &str, options: SqlOptions) -> TranspileResult {
    FetchXmlTranspiler::new(options).transpile(xml)
}

/// Token stream of `sql` as JSON, including error tokens.
pub fn tokens_json(sql: &str, pretty: bool) -> Result<String, CliError> {
    let tokens = tokenize(sql);
    let json = if pretty {
        serde_json::to_string_pretty(&tokens)?
    } else {
        serde_json::to_string(&tokens)?
    };
    Ok(json)
}
