//! Property-based tests for SQL <-> FetchXML round-tripping
//!
//! Generated statements are translated to FetchXML and back to SQL. The
//! statement parsed from that SQL must be equivalent to the original, and
//! translating it again must give the same FetchXML.
//!
//! Equivalence allows for what FetchXML itself cannot carry: `NOT` is
//! pushed into the operators, runs of the same connective are flattened
//! and literals compare by the untyped text they are sent as.

use fetchxml_sql::ast::{Expression, LogicalOp, SelectStatement};
use fetchxml_sql::{Value, fetchxml_to_sql, parse_sql, sql_to_fetchxml};
use proptest::prelude::*;

const ACCOUNT_COLUMNS: &[&str] = &["name", "revenue", "statecode", "city", "createdon"];
const JOINED_COLUMNS: &[&str] = &["c.fullname", "c.statecode", "a.name", "a.revenue"];

/// Strategy for column references drawn from `pool`
fn column_strategy(pool: &'static [&'static str]) -> impl Strategy<Value = String> {
    prop::sample::select(pool).prop_map(String::from)
}

/// Strategy for SQL literals: numbers, strings and booleans
fn literal_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        (-1000i64..1000).prop_map(|n| n.to_string()),
        (0u32..10000, 1u32..100).prop_map(|(whole, cents)| format!("{}.{:02}", whole, cents)),
        "[a-zA-Z0-9 .-]{0,8}".prop_map(|s| format!("'{}'", s)),
        prop::sample::select(vec!["'42'", "'-3.50'", "'007'", "'true'", "'false'"])
            .prop_map(String::from),
        Just("TRUE".to_string()),
        Just("FALSE".to_string()),
    ]
}

fn comparison_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["=", "<>", "!=", "<", "<=", ">", ">="])
}

fn not_prefix(negated: bool) -> &'static str {
    if negated { "NOT " } else { "" }
}

/// Strategy for a single predicate on one column
fn predicate_strategy(pool: &'static [&'static str]) -> impl Strategy<Value = String> {
    prop_oneof![
        (column_strategy(pool), comparison_strategy(), literal_strategy())
            .prop_map(|(c, op, v)| format!("{} {} {}", c, op, v)),
        (column_strategy(pool), any::<bool>())
            .prop_map(|(c, negated)| format!("{} IS {}NULL", c, not_prefix(negated))),
        (
            column_strategy(pool),
            any::<bool>(),
            prop::collection::vec(literal_strategy(), 1..4)
        )
            .prop_map(|(c, negated, values)| {
                format!("{} {}IN ({})", c, not_prefix(negated), values.join(", "))
            }),
        (
            column_strategy(pool),
            any::<bool>(),
            literal_strategy(),
            literal_strategy()
        )
            .prop_map(|(c, negated, low, high)| {
                format!("{} {}BETWEEN {} AND {}", c, not_prefix(negated), low, high)
            }),
        (column_strategy(pool), any::<bool>(), "[a-z%_]{0,6}").prop_map(|(c, negated, pattern)| {
            format!("{} {}LIKE '{}'", c, not_prefix(negated), pattern)
        }),
    ]
}

/// Strategy for WHERE conditions with nested AND / OR / NOT
fn condition_strategy(pool: &'static [&'static str]) -> impl Strategy<Value = String> {
    predicate_strategy(pool).prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{} AND {}", a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({} OR {})", a, b)),
            inner.prop_map(|a| format!("NOT ({})", a)),
        ]
    })
}

/// Strategy for complete statements; `from` is everything between FROM and
/// WHERE and `pool` the columns it makes available.
fn query_strategy(
    from: impl Strategy<Value = String>,
    pool: &'static [&'static str],
) -> impl Strategy<Value = String> {
    (
        any::<bool>(),
        prop::option::of(1u64..500),
        prop::collection::vec((column_strategy(pool), any::<bool>()), 1..4),
        from,
        prop::option::of(condition_strategy(pool)),
        prop::collection::vec((column_strategy(pool), any::<bool>()), 0..3),
    )
        .prop_map(|(distinct, top, columns, from, condition, order)| {
            let mut sql = "SELECT".to_string();
            if distinct {
                sql.push_str(" DISTINCT");
            }
            if let Some(top) = top {
                sql.push_str(&format!(" TOP {}", top));
            }
            let columns: Vec<String> = columns
                .into_iter()
                .enumerate()
                .map(|(i, (column, aliased))| {
                    if aliased {
                        format!("{} AS c{}", column, i)
                    } else {
                        column
                    }
                })
                .collect();
            sql.push_str(&format!(" {} FROM {}", columns.join(", "), from));
            if let Some(condition) = condition {
                sql.push_str(&format!(" WHERE {}", condition));
            }
            if !order.is_empty() {
                let items: Vec<String> = order
                    .into_iter()
                    .map(|(column, descending)| {
                        format!("{} {}", column, if descending { "DESC" } else { "ASC" })
                    })
                    .collect();
                sql.push_str(&format!(" ORDER BY {}", items.join(", ")));
            }
            sql
        })
}

/// Literals as FetchXML sees them.
fn as_sent(value: &Value) -> Value {
    Value::String(value.to_fetchxml())
}

#[derive(Debug, PartialEq)]
enum Normal {
    Group(LogicalOp, Vec<Normal>),
    Leaf(Expression),
}

fn normalize(expr: &Expression, negated: bool) -> Normal {
    match expr {
        Expression::Logical { op, left, right } => {
            let op = if negated { op.dual() } else { *op };
            let mut children = Vec::new();
            for side in [left, right] {
                match normalize(side, negated) {
                    Normal::Group(inner, nested) if inner == op => children.extend(nested),
                    node => children.push(node),
                }
            }
            Normal::Group(op, children)
        }
        Expression::Not(inner) => normalize(inner, !negated),
        Expression::Comparison { column, op, value } => Normal::Leaf(Expression::Comparison {
            column: column.clone(),
            op: if negated { op.negate() } else { *op },
            value: as_sent(value),
        }),
        Expression::Null { column, is_null } => Normal::Leaf(Expression::Null {
            column: column.clone(),
            is_null: *is_null != negated,
        }),
        Expression::InList { column, values } => {
            let leaf = Expression::InList {
                column: column.clone(),
                values: values.iter().map(as_sent).collect(),
            };
            Normal::Leaf(if negated { Expression::negated(leaf) } else { leaf })
        }
        Expression::Between { column, low, high } => {
            let leaf = Expression::Between {
                column: column.clone(),
                low: as_sent(low),
                high: as_sent(high),
            };
            Normal::Leaf(if negated { Expression::negated(leaf) } else { leaf })
        }
        Expression::Like { .. } => {
            let leaf = expr.clone();
            Normal::Leaf(if negated { Expression::negated(leaf) } else { leaf })
        }
    }
}

fn single_entity() -> impl Strategy<Value = String> {
    Just("account".to_string())
}

fn contact_with_account() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["JOIN", "INNER JOIN", "LEFT JOIN", "LEFT OUTER JOIN"]).prop_map(
        |kind| format!("contact c {} account a ON c.parentcustomerid = a.accountid", kind),
    )
}

/// FetchXML has no alias for the root entity, so only its name is compared.
fn assert_equivalent(original: &SelectStatement, back: &SelectStatement) -> Result<(), TestCaseError> {
    prop_assert_eq!(&back.from.entity_name, &original.from.entity_name);
    prop_assert_eq!(back.distinct, original.distinct);
    prop_assert_eq!(back.top, original.top);
    prop_assert_eq!(&back.columns, &original.columns);
    prop_assert_eq!(&back.joins, &original.joins);
    prop_assert_eq!(&back.order_by, &original.order_by);
    prop_assert_eq!(
        back.where_clause.as_ref().map(|e| normalize(e, false)),
        original.where_clause.as_ref().map(|e| normalize(e, false))
    );
    Ok(())
}

/// SQL -> FetchXML -> SQL gives an equivalent statement without warnings,
/// and that statement translates to the same FetchXML.
fn check_round_trip(sql: &str) -> Result<(), TestCaseError> {
    let first = parse_sql(sql).map_err(|e| TestCaseError::fail(format!("{}: {}", sql, e)))?;
    let xml = sql_to_fetchxml(&first);

    let result = fetchxml_to_sql(&xml);
    prop_assert!(result.success, "{:?}", result.error);
    prop_assert!(result.warnings.is_empty(), "{:?}", result.warnings);

    let back = result.sql.unwrap_or_default();
    let second = parse_sql(&back).map_err(|e| TestCaseError::fail(format!("{}: {}", back, e)))?;
    assert_equivalent(&first, &second)?;
    prop_assert_eq!(sql_to_fetchxml(&second), xml);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn test_round_trip_preserves_single_entity_queries(
        sql in query_strategy(single_entity(), ACCOUNT_COLUMNS)
    ) {
        check_round_trip(&sql)?;
    }

    #[test]
    fn test_round_trip_preserves_joined_queries(
        sql in query_strategy(contact_with_account(), JOINED_COLUMNS)
    ) {
        check_round_trip(&sql)?;
    }

    #[test]
    fn test_parser_never_panics(input in "[ -~\\n]{0,80}") {
        let _ = parse_sql(&input);
    }

    #[test]
    fn test_fetchxml_reader_never_panics(input in "[<>/a-z =\"!-]{0,80}") {
        let result = fetchxml_to_sql(&input);
        prop_assert_eq!(result.success, result.sql.is_some());
    }
}
