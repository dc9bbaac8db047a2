//! Syntax and binding check for SQL input

use super::CliError;
use crate::{DEFAULT_CONTEXT_WIDTH, ParseOptions, SelectStatement, parse_sql_with_options};

/// Options for the check command
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// The SQL to check
    pub sql: String,
    /// Width of the source window shown with an error
    pub context_width: usize,
    /// Bind unqualified columns to the FROM entity even when joins are present
    pub allow_unqualified: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        CheckOptions {
            sql: String::new(),
            context_width: DEFAULT_CONTEXT_WIDTH,
            allow_unqualified: false,
        }
    }
}

/// Parse without translating; the error carries a source window of
/// `context_width` characters.
pub fn execute_check(options: &CheckOptions) -> Result<SelectStatement, CliError> {
    let parse_options = ParseOptions {
        allow_unqualified_columns: options.allow_unqualified,
    };
    parse_sql_with_options(&options.sql, parse_options)
        .map_err(|e| CliError::Parse(e.context_with_width(&options.sql, options.context_width)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_sql() {
        let options = CheckOptions {
            sql: "SELECT name FROM account".to_string(),
            ..CheckOptions::default()
        };
        let statement = execute_check(&options).unwrap();
        assert_eq!(statement.from.entity_name, "account");
    }

    #[test]
    fn test_context_width_is_applied() {
        let options = CheckOptions {
            sql: "SELECT name FROM account WHERE name = ".to_string(),
            context_width: 8,
            ..CheckOptions::default()
        };
        match execute_check(&options) {
            Err(CliError::Parse(context)) => assert!(context.snippet.chars().count() <= 8),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_unqualified_columns_in_joins() {
        let sql = "SELECT name FROM contact c JOIN account a ON c.parentcustomerid = a.accountid";
        let strict = CheckOptions {
            sql: sql.to_string(),
            ..CheckOptions::default()
        };
        match execute_check(&strict) {
            Err(CliError::Parse(context)) => {
                assert!(context.message.starts_with("Ambiguous column reference 'name'"))
            }
            other => panic!("expected parse error, got {:?}", other),
        }

        let lenient = CheckOptions {
            allow_unqualified: true,
            ..strict
        };
        assert!(execute_check(&lenient).is_ok());
    }
}
