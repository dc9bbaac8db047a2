// tests/integration_tests.rs

use fetchxml_sql::{fetchxml_to_sql, parse_sql, render_sql, sql_to_fetchxml};

/// SQL -> FetchXML -> SQL -> FetchXML must reach a fixed point without
/// warnings; the generated SQL must itself parse.
fn assert_round_trip(sql: &str) -> String {
    let first = parse_sql(sql).unwrap_or_else(|e| panic!("{}: {}", sql, e));
    let xml = sql_to_fetchxml(&first);

    let result = fetchxml_to_sql(&xml);
    assert!(result.success, "{}: {:?}", sql, result.error);
    assert!(
        result.warnings.is_empty(),
        "{}: unexpected warnings {:?}",
        sql,
        result.warnings
    );
    let back = result.sql.unwrap_or_default();

    let second = parse_sql(&back).unwrap_or_else(|e| panic!("re-parse of {:?} failed: {}", back, e));
    assert_eq!(sql_to_fetchxml(&second), xml, "{} came back as {}", sql, back);
    back
}

// ============================================================================
// Round Trips
// ============================================================================

#[test]
fn test_round_trip_simple_queries() {
    let cases = vec![
        "SELECT * FROM account",
        "SELECT name FROM account",
        "SELECT accountid AS id, name FROM account",
        "SELECT DISTINCT TOP 25 name FROM account",
        "SELECT name FROM account WHERE statecode = 0",
        "SELECT name FROM account WHERE revenue >= -1000.25 AND name <> 'O''Brien'",
        "SELECT name FROM contact WHERE donotemail = TRUE OR donotphone = FALSE",
        "SELECT name FROM account WHERE statecode IN (0, 1, 2)",
        "SELECT name FROM account WHERE city IN ('Paris', 'Oslo')",
        "SELECT name FROM account WHERE revenue BETWEEN 10 AND 20.5",
        "SELECT name FROM account WHERE name LIKE '%corp%' AND name NOT LIKE 'X%'",
        "SELECT name FROM account WHERE parentaccountid IS NULL OR telephone1 IS NOT NULL",
        "SELECT name FROM account ORDER BY name DESC, createdon",
        "SELECT [order], [first name] FROM account",
    ];
    for sql in cases {
        assert_round_trip(sql);
    }
}

#[test]
fn test_round_trip_nested_logic() {
    let cases = vec![
        "SELECT name FROM account WHERE a = 1 AND (b = 2 OR c = 3)",
        "SELECT name FROM account WHERE (a = 1 OR b = 2) AND (c = 3 OR d = 4)",
        "SELECT name FROM account WHERE a = 1 OR b = 2 AND c = 3",
        "SELECT name FROM account WHERE NOT (a = 1 OR b IS NULL)",
        "SELECT name FROM account WHERE NOT (a IN (1, 2) AND b BETWEEN 1 AND 2)",
        "SELECT name FROM account WHERE a = 1 AND (b = 2 AND c = 3)",
    ];
    for sql in cases {
        assert_round_trip(sql);
    }
}

#[test]
fn test_round_trip_aggregates() {
    let cases = vec![
        "SELECT COUNT(*) AS total FROM account",
        "SELECT COUNT(contactid) FROM contact",
        "SELECT statecode, COUNT(*) AS total FROM account GROUP BY statecode ORDER BY total DESC",
        "SELECT COUNT(DISTINCT ownerid) AS owners, SUM(revenue) AS rev FROM account",
        "SELECT COUNT(*) AS n FROM account GROUP BY statecode",
        "SELECT statecode, MAX(revenue) AS top_revenue FROM account GROUP BY statecode ORDER BY statecode",
    ];
    for sql in cases {
        assert_round_trip(sql);
    }
}

#[test]
fn test_round_trip_joins() {
    let cases = vec![
        "SELECT c.fullname, a.name FROM contact c JOIN account a ON c.parentcustomerid = a.accountid",
        "SELECT c.fullname FROM contact c LEFT JOIN account a ON a.accountid = c.parentcustomerid WHERE a.name LIKE 'C%'",
        "SELECT contact.fullname, account.* FROM contact INNER JOIN account ON contact.parentcustomerid = account.accountid",
        "SELECT c.fullname, u.fullname AS owner FROM contact c \
         JOIN account a ON c.parentcustomerid = a.accountid \
         LEFT OUTER JOIN systemuser u ON a.ownerid = u.systemuserid \
         WHERE u.isdisabled = FALSE ORDER BY c.fullname, u.fullname DESC",
    ];
    for sql in cases {
        assert_round_trip(sql);
    }
}

#[test]
fn test_join_first_order_keeps_primary_sort_key() {
    let sql = "SELECT c.fullname, a.name FROM contact c JOIN account a ON c.parentcustomerid = a.accountid \
               ORDER BY a.name DESC, c.fullname ASC";
    let back = assert_round_trip(sql);
    assert!(
        back.ends_with("ORDER BY a.name DESC, contact.fullname ASC"),
        "{}",
        back
    );
    assert_eq!(
        parse_sql(&back).unwrap().order_by,
        parse_sql(sql).unwrap().order_by
    );
}

#[test]
fn test_round_trip_keeps_leading_comments() {
    let back = assert_round_trip("-- accounts in Paris\nSELECT name FROM account WHERE city = 'Paris'");
    assert!(back.starts_with("-- accounts in Paris\n"), "{}", back);
}

// ============================================================================
// Mapping Properties
// ============================================================================

#[test]
fn test_alias_propagation() {
    let statement = parse_sql("SELECT accountid AS id FROM account").unwrap();
    let xml = sql_to_fetchxml(&statement);
    assert!(xml.contains(r#"<attribute name="accountid" alias="id"/>"#), "{}", xml);

    let back = fetchxml_to_sql(&xml).sql.unwrap_or_default();
    assert!(back.contains("accountid AS id"), "{}", back);
}

#[test]
fn test_untyped_values_keep_their_text() {
    let sql = "SELECT name FROM account WHERE accountnumber = '42' AND flag = 'true' AND code = '007'";
    let xml = sql_to_fetchxml(&parse_sql(sql).unwrap());
    assert!(xml.contains(r#"attribute="accountnumber" operator="eq" value="42""#), "{}", xml);
    assert!(xml.contains(r#"attribute="flag" operator="eq" value="true""#), "{}", xml);

    // FetchXML does not say which values are text, so they come back typed
    let back = assert_round_trip(sql);
    assert!(
        back.ends_with("WHERE accountnumber = 42 AND flag = TRUE AND code = '007'"),
        "{}",
        back
    );
}

#[test]
fn test_aggregate_requires_alias() {
    let statement = parse_sql("SELECT COUNT(contactid) FROM contact").unwrap();
    let xml = sql_to_fetchxml(&statement);
    assert!(xml.contains(r#"aggregate="count""#), "{}", xml);
    assert!(xml.contains(r#"alias="count_contactid""#), "{}", xml);
    assert!(xml.contains(r#"<fetch aggregate="true">"#), "{}", xml);

    let back = fetchxml_to_sql(&xml).sql.unwrap_or_default();
    assert!(back.contains("AS count_contactid"), "{}", back);
}

#[test]
fn test_join_mapping() {
    let statement = parse_sql(
        "SELECT c.fullname FROM contact c LEFT JOIN account a ON c.parentcustomerid = a.accountid",
    )
    .unwrap();
    let xml = sql_to_fetchxml(&statement);
    assert!(xml.contains(r#"name="account""#), "{}", xml);
    assert!(xml.contains(r#"from="accountid""#), "{}", xml);
    assert!(xml.contains(r#"to="parentcustomerid""#), "{}", xml);
    assert!(xml.contains(r#"link-type="outer""#), "{}", xml);
    assert!(xml.contains(r#"alias="a""#), "{}", xml);
}

#[test]
fn test_top_both_directions() {
    let statement = parse_sql("SELECT TOP 10 * FROM account").unwrap();
    assert!(sql_to_fetchxml(&statement).contains(r#"<fetch top="10">"#));

    let result = fetchxml_to_sql(r#"<fetch top="5"><entity name="account"><all-attributes/></entity></fetch>"#);
    assert!(result.sql.unwrap_or_default().contains("TOP 5"));
}

#[test]
fn test_render_sql_matches_pretty_output() {
    let statement = parse_sql("select name from account where statecode = 0 order by name").unwrap();
    assert_eq!(
        render_sql(&statement),
        "SELECT name\nFROM account\nWHERE statecode = 0\nORDER BY name ASC"
    );
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_parse_error_precision() {
    let source = "SELECT FROM account";
    let err = parse_sql(source).unwrap_err();
    assert_eq!((err.line, err.column), (1, 8));

    let context = err.context(source);
    assert!(context.snippet.contains("FROM account"));
    assert_eq!(context.snippet.chars().nth(context.caret), Some('F'));
}

#[test]
fn test_error_context_on_long_line() {
    let source = "SELECT name, revenue, telephone1, address1_city FROM account WHERE revenue > AND statecode = 0";
    let err = parse_sql(source).unwrap_err();
    let context = err.context(source);
    assert_eq!(context.snippet.chars().count(), 30);
    assert!(context.snippet.contains("AND"), "{}", context.snippet);
    assert_eq!(context.snippet.chars().nth(context.caret), Some('A'));
}

#[test]
fn test_malformed_xml() {
    let result = fetchxml_to_sql("<fetch><entity>");
    assert!(!result.success);
    assert!(result.sql.is_none());
    assert!(!result.error.unwrap_or_default().is_empty());
}

#[test]
fn test_result_serializes_to_json() {
    let result = fetchxml_to_sql(
        r#"<fetch count="5"><entity name="account"><attribute name="name"/></entity></fetch>"#,
    );
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["success"], serde_json::Value::Bool(true));
    assert_eq!(json["warnings"].as_array().map(Vec::len), Some(1));
    assert!(json["warnings"][0]["message"].is_string());
}
