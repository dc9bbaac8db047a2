//! SQL text rendering of a [`SelectStatement`].
//!
//! The printer is the inverse of the parser: whatever it prints parses back
//! to the same statement.
//!
//! # Features
//!
//! - **Pretty output** via [`to_sql()`] - one clause per line
//! - **Compact output** via [`to_sql_compact()`] - everything on one line
//! - **Identifier quoting** - keywords and unusual names are written as `[name]`
//! - **Minimal parentheses** - only where AND/OR/NOT precedence needs them
//!
//! # Examples
//!
//! ```
//! use fetchxml_sql::parse_sql;
//! use fetchxml_sql::output::{to_sql, to_sql_compact};
//!
//! let statement = parse_sql("select name from account where statecode = 0").unwrap();
//!
//! assert_eq!(to_sql_compact(&statement), "SELECT name FROM account WHERE statecode = 0");
//! assert_eq!(to_sql(&statement), "SELECT name\nFROM account\nWHERE statecode = 0");
//! ```

use crate::ast::{
    AggregateArgument, ColumnExpr, ColumnRef, Expression, Keyword, LogicalOp, SelectColumn,
    SelectStatement,
};
use crate::value::Value;
use regex::Regex;
use std::sync::LazyLock;

static PLAIN_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

/// Quote `name` as `[name]` unless it lexes as a plain identifier.
pub fn quote_identifier(name: &str) -> String {
    if PLAIN_IDENTIFIER.is_match(name) && Keyword::from_word(name).is_none() {
        name.to_string()
    } else {
        format!("[{}]", name.replace(']', "]]"))
    }
}

pub struct SqlPrinter {
    pretty: bool,
}

impl SqlPrinter {
    pub fn new(pretty: bool) -> Self {
        SqlPrinter { pretty }
    }

    pub fn print(&self, statement: &SelectStatement) -> String {
        let mut clauses = Vec::new();
        clauses.push(self.print_select(statement));
        clauses.push(self.print_from(statement));
        for join in &statement.joins {
            let parent = join
                .parent
                .as_deref()
                .unwrap_or_else(|| statement.from.qualifier());
            let mut clause = format!(
                "{} {}",
                join.kind.as_sql(),
                quote_identifier(&join.entity_name)
            );
            if let Some(alias) = &join.alias {
                clause.push_str(" AS ");
                clause.push_str(&quote_identifier(alias));
            }
            clause.push_str(&format!(
                " ON {}.{} = {}.{}",
                quote_identifier(parent),
                quote_identifier(&join.from_attribute),
                quote_identifier(join.qualifier()),
                quote_identifier(&join.to_attribute)
            ));
            clauses.push(clause);
        }

        let printer = ColumnPrinter { statement };
        if let Some(expr) = &statement.where_clause {
            clauses.push(format!("WHERE {}", printer.expression(expr, 0)));
        }
        if !statement.group_by.is_empty() {
            let columns: Vec<String> = statement
                .group_by
                .iter()
                .map(|c| printer.column(c))
                .collect();
            clauses.push(format!("GROUP BY {}", columns.join(", ")));
        }
        if !statement.order_by.is_empty() {
            let items: Vec<String> = statement
                .order_by
                .iter()
                .map(|item| {
                    let column = if printer.is_select_alias(&item.column) {
                        quote_identifier(&item.column.name)
                    } else {
                        printer.column(&item.column)
                    };
                    format!("{} {}", column, item.direction.as_sql())
                })
                .collect();
            clauses.push(format!("ORDER BY {}", items.join(", ")));
        }

        let separator = if self.pretty { "\n" } else { " " };
        let mut result = String::new();
        for comment in &statement.leading_comments {
            // A line comment always needs its own line
            for line in comment.lines() {
                result.push_str("-- ");
                result.push_str(line.trim());
                result.push('\n');
            }
        }
        result.push_str(&clauses.join(separator));
        result
    }

    fn print_select(&self, statement: &SelectStatement) -> String {
        let mut select = "SELECT".to_string();
        if statement.distinct {
            select.push_str(" DISTINCT");
        }
        if let Some(top) = statement.top {
            select.push_str(&format!(" TOP {}", top));
        }

        let printer = ColumnPrinter { statement };
        let items: Vec<String> = statement
            .all_columns()
            .map(|c| printer.select_item(c))
            .collect();
        if items.is_empty() {
            select.push_str(" *");
        } else {
            select.push(' ');
            select.push_str(&items.join(", "));
        }
        select
    }

    fn print_from(&self, statement: &SelectStatement) -> String {
        let mut from = format!("FROM {}", quote_identifier(&statement.from.entity_name));
        if let Some(alias) = &statement.from.alias {
            from.push_str(" AS ");
            from.push_str(&quote_identifier(alias));
        }
        from
    }
}

/// Column and expression rendering with the statement's qualifier rules.
struct ColumnPrinter<'a> {
    statement: &'a SelectStatement,
}

impl ColumnPrinter<'_> {
    /// Root references are qualified once joins make them ambiguous.
    fn column(&self, column: &ColumnRef) -> String {
        match &column.qualifier {
            Some(q) => format!("{}.{}", quote_identifier(q), quote_identifier(&column.name)),
            None if !self.statement.joins.is_empty() => format!(
                "{}.{}",
                quote_identifier(self.statement.from.qualifier()),
                quote_identifier(&column.name)
            ),
            None => quote_identifier(&column.name),
        }
    }

    fn is_select_alias(&self, column: &ColumnRef) -> bool {
        column.qualifier.is_none()
            && self
                .statement
                .all_columns()
                .any(|c| c.alias.as_deref() == Some(column.name.as_str()))
    }

    fn select_item(&self, item: &SelectColumn) -> String {
        let expr = match &item.expr {
            ColumnExpr::Column(c) => self.column(c),
            ColumnExpr::Wildcard(Some(q)) => format!("{}.*", quote_identifier(q)),
            ColumnExpr::Wildcard(None) if !self.statement.joins.is_empty() => {
                format!("{}.*", quote_identifier(self.statement.from.qualifier()))
            }
            ColumnExpr::Wildcard(None) => "*".to_string(),
            ColumnExpr::Aggregate(call) => {
                let argument = match &call.argument {
                    AggregateArgument::Star => "*".to_string(),
                    AggregateArgument::Column(c) => self.column(c),
                };
                let distinct = if call.distinct { "DISTINCT " } else { "" };
                format!("{}({}{})", call.function.as_sql(), distinct, argument)
            }
        };
        match &item.alias {
            Some(alias) => format!("{} AS {}", expr, quote_identifier(alias)),
            None => expr,
        }
    }

    /// Render `expr`, parenthesized when it binds looser than `min_level`.
    /// Levels: OR 1, AND 2, NOT 3, predicates 4.
    fn expression(&self, expr: &Expression, min_level: u8) -> String {
        let (text, level) = match expr {
            Expression::Logical { op, left, right } => {
                let level = match op {
                    LogicalOp::Or => 1,
                    LogicalOp::And => 2,
                };
                // Left-associative: only the right operand needs a tighter bound
                let text = format!(
                    "{} {} {}",
                    self.expression(left, level),
                    op.as_sql(),
                    self.expression(right, level + 1)
                );
                (text, level)
            }
            Expression::Not(inner) => match inner.as_ref() {
                Expression::Like { column, pattern } => (
                    format!("{} NOT LIKE {}", self.column(column), Value::String(pattern.clone())),
                    4,
                ),
                Expression::InList { column, values } => {
                    (format!("{} NOT IN ({})", self.column(column), list(values)), 4)
                }
                Expression::Between { column, low, high } => (
                    format!("{} NOT BETWEEN {} AND {}", self.column(column), low, high),
                    4,
                ),
                other => (format!("NOT {}", self.expression(other, 4)), 3),
            },
            Expression::Comparison { column, op, value } => (
                format!("{} {} {}", self.column(column), op.as_sql(), value),
                4,
            ),
            Expression::Null { column, is_null } => {
                let test = if *is_null { "IS NULL" } else { "IS NOT NULL" };
                (format!("{} {}", self.column(column), test), 4)
            }
            Expression::InList { column, values } => {
                (format!("{} IN ({})", self.column(column), list(values)), 4)
            }
            Expression::Between { column, low, high } => (
                format!("{} BETWEEN {} AND {}", self.column(column), low, high),
                4,
            ),
            Expression::Like { column, pattern } => (
                format!("{} LIKE {}", self.column(column), Value::String(pattern.clone())),
                4,
            ),
        };

        if level < min_level {
            format!("({})", text)
        } else {
            text
        }
    }
}

fn list(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a statement with one clause per line.
pub fn to_sql(statement: &SelectStatement) -> String {
    SqlPrinter::new(true).print(statement)
}

/// Render a statement on a single line.
pub fn to_sql_compact(statement: &SelectStatement) -> String {
    SqlPrinter::new(false).print(statement)
}
