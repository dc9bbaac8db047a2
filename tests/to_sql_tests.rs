// tests/to_sql_tests.rs

use fetchxml_sql::{FetchXmlTranspiler, SqlOptions, TranspileResult, fetchxml_to_sql};

fn compact(xml: &str) -> TranspileResult {
    FetchXmlTranspiler::new(SqlOptions { pretty: false }).transpile(xml)
}

fn sql_of(xml: &str) -> String {
    let result = compact(xml);
    assert!(result.success, "{:?}", result.error);
    assert!(result.warnings.is_empty(), "unexpected warnings: {:?}", result.warnings);
    result.sql.unwrap_or_default()
}

fn entity(name: &str, body: &str) -> String {
    format!("<fetch><entity name=\"{}\">{}</entity></fetch>", name, body)
}

fn filtered(conditions: &str) -> String {
    entity(
        "account",
        &format!(r#"<attribute name="name"/><filter>{}</filter>"#, conditions),
    )
}

fn warnings_of(xml: &str) -> Vec<String> {
    let result = compact(xml);
    assert!(result.success, "{:?}", result.error);
    result.warnings.into_iter().map(|w| w.message).collect()
}

// ============================================================================
// Select List
// ============================================================================

#[test]
fn test_top() {
    assert_eq!(
        sql_of(r#"<fetch top="5"><entity name="account"><attribute name="name"/></entity></fetch>"#),
        "SELECT TOP 5 name FROM account"
    );
}

#[test]
fn test_distinct() {
    assert_eq!(
        sql_of(r#"<fetch distinct="true"><entity name="account"><attribute name="name"/></entity></fetch>"#),
        "SELECT DISTINCT name FROM account"
    );
}

#[test]
fn test_alias_is_re_emitted() {
    assert_eq!(
        sql_of(&entity("account", r#"<attribute name="accountid" alias="id"/>"#)),
        "SELECT accountid AS id FROM account"
    );
}

#[test]
fn test_all_attributes_and_no_attributes() {
    assert_eq!(
        sql_of(&entity("account", "<all-attributes/>")),
        "SELECT * FROM account"
    );
    assert_eq!(sql_of(&entity("account", "")), "SELECT * FROM account");
}

#[test]
fn test_keyword_names_are_quoted() {
    assert_eq!(
        sql_of(&entity("account", r#"<attribute name="order"/>"#)),
        "SELECT [order] FROM account"
    );
}

#[test]
fn test_comments_become_line_comments() {
    let result = compact(&format!(
        "<!-- active accounts -->{}",
        entity("account", r#"<attribute name="name"/>"#)
    ));
    assert_eq!(
        result.sql.as_deref(),
        Some("-- active accounts\nSELECT name FROM account")
    );
}

#[test]
fn test_pretty_output_is_the_default() {
    let result = fetchxml_to_sql(&filtered(
        r#"<condition attribute="statecode" operator="eq" value="0"/>"#,
    ));
    assert_eq!(
        result.sql.as_deref(),
        Some("SELECT name\nFROM account\nWHERE statecode = 0")
    );
}

// ============================================================================
// Aggregates
// ============================================================================

#[test]
fn test_aggregate_with_group_by() {
    let xml = concat!(
        r#"<fetch aggregate="true"><entity name="account">"#,
        r#"<attribute name="statecode" alias="statecode" groupby="true"/>"#,
        r#"<attribute name="accountid" alias="total" aggregate="count"/>"#,
        r#"<order alias="total" descending="true"/>"#,
        "</entity></fetch>"
    );
    assert_eq!(
        sql_of(xml),
        "SELECT statecode, COUNT(*) AS total FROM account GROUP BY statecode ORDER BY total DESC"
    );
}

#[test]
fn test_aggregate_uses_its_alias() {
    let xml = entity(
        "account",
        r#"<attribute name="revenue" alias="avg_rev" aggregate="avg"/><attribute name="ownerid" alias="owners" aggregate="countcolumn" distinct="true"/>"#,
    );
    assert_eq!(
        sql_of(&xml),
        "SELECT AVG(revenue) AS avg_rev, COUNT(DISTINCT ownerid) AS owners FROM account"
    );
}

#[test]
fn test_aggregate_without_alias_is_synthesized() {
    let result = compact(&entity(
        "account",
        r#"<attribute name="revenue" aggregate="sum"/>"#,
    ));
    assert_eq!(
        result.sql.as_deref(),
        Some("SELECT SUM(revenue) AS sum_revenue FROM account")
    );
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].message.contains("no alias"));
}

#[test]
fn test_mixed_aggregate_and_raw_attribute_warns() {
    let warnings = warnings_of(&entity(
        "account",
        r#"<attribute name="name"/><attribute name="accountid" alias="n" aggregate="count"/>"#,
    ));
    assert!(
        warnings.iter().any(|w| w.contains("'name' is neither aggregated nor grouped")),
        "{:?}",
        warnings
    );
}

#[test]
fn test_dategrouping_warns() {
    let warnings = warnings_of(&entity(
        "account",
        r#"<attribute name="createdon" alias="year" groupby="true" dategrouping="year"/><attribute name="accountid" alias="n" aggregate="count"/>"#,
    ));
    assert!(warnings.iter().any(|w| w.contains("dategrouping")), "{:?}", warnings);
}

// ============================================================================
// Filters
// ============================================================================

#[test]
fn test_comparison_operators() {
    let cases = vec![
        ("eq", "="),
        ("ne", "<>"),
        ("neq", "<>"),
        ("lt", "<"),
        ("le", "<="),
        ("gt", ">"),
        ("ge", ">="),
    ];
    for (fetch_op, sql_op) in cases {
        let xml = filtered(&format!(
            r#"<condition attribute="revenue" operator="{}" value="10.50"/>"#,
            fetch_op
        ));
        assert_eq!(
            sql_of(&xml),
            format!("SELECT name FROM account WHERE revenue {} 10.50", sql_op),
            "Failed for operator {}",
            fetch_op
        );
    }
}

#[test]
fn test_value_typing() {
    let xml = filtered(concat!(
        r#"<condition attribute="a" operator="eq" value="Contoso"/>"#,
        r#"<condition attribute="b" operator="eq" value="01234"/>"#,
        r#"<condition attribute="c" operator="eq" value="true"/>"#,
        r#"<condition attribute="d" operator="eq" value="O'Brien"/>"#,
    ));
    assert_eq!(
        sql_of(&xml),
        "SELECT name FROM account WHERE a = 'Contoso' AND b = '01234' AND c = TRUE AND d = 'O''Brien'"
    );
}

#[test]
fn test_or_filter_and_null_tests() {
    let xml = entity(
        "account",
        concat!(
            r#"<attribute name="name"/><filter type="or">"#,
            r#"<condition attribute="statecode" operator="eq" value="0"/>"#,
            r#"<condition attribute="parentaccountid" operator="not-null"/>"#,
            r#"<condition attribute="telephone1" operator="null"/>"#,
            "</filter>"
        ),
    );
    assert_eq!(
        sql_of(&xml),
        "SELECT name FROM account WHERE statecode = 0 OR parentaccountid IS NOT NULL OR telephone1 IS NULL"
    );
}

#[test]
fn test_nested_filters_are_parenthesized() {
    let xml = filtered(concat!(
        r#"<condition attribute="a" operator="eq" value="1"/>"#,
        r#"<filter type="or">"#,
        r#"<condition attribute="b" operator="eq" value="2"/>"#,
        r#"<condition attribute="c" operator="eq" value="3"/>"#,
        "</filter>"
    ));
    assert_eq!(
        sql_of(&xml),
        "SELECT name FROM account WHERE a = 1 AND (b = 2 OR c = 3)"
    );
}

#[test]
fn test_list_operators() {
    let xml = filtered(concat!(
        r#"<condition attribute="statecode" operator="in"><value>0</value><value>1</value></condition>"#,
        r#"<condition attribute="industrycode" operator="not-in"><value>7</value></condition>"#,
        r#"<condition attribute="revenue" operator="between"><value>10</value><value>20</value></condition>"#,
        r#"<condition attribute="employees" operator="not-between"><value>1</value><value>5</value></condition>"#,
    ));
    assert_eq!(
        sql_of(&xml),
        concat!(
            "SELECT name FROM account WHERE statecode IN (0, 1) AND industrycode NOT IN (7) ",
            "AND revenue BETWEEN 10 AND 20 AND employees NOT BETWEEN 1 AND 5"
        )
    );
}

#[test]
fn test_like_family() {
    let xml = filtered(concat!(
        r#"<condition attribute="a" operator="like" value="%x%"/>"#,
        r#"<condition attribute="b" operator="not-like" value="y%"/>"#,
        r#"<condition attribute="c" operator="begins-with" value="Con"/>"#,
        r#"<condition attribute="d" operator="ends-with" value="Ltd"/>"#,
        r#"<condition attribute="e" operator="not-begin-with" value="Z"/>"#,
    ));
    assert_eq!(
        sql_of(&xml),
        concat!(
            "SELECT name FROM account WHERE a LIKE '%x%' AND b NOT LIKE 'y%' ",
            "AND c LIKE 'Con%' AND d LIKE '%Ltd' AND e NOT LIKE 'Z%'"
        )
    );
}

#[test]
fn test_value_text_is_unescaped() {
    let xml = filtered(r#"<condition attribute="name" operator="eq" value="A &amp; B"/>"#);
    assert_eq!(sql_of(&xml), "SELECT name FROM account WHERE name = 'A & B'");
}

// ============================================================================
// Joins
// ============================================================================

#[test]
fn test_link_entity_becomes_join() {
    let xml = entity(
        "contact",
        concat!(
            r#"<attribute name="fullname"/>"#,
            r#"<filter><condition entityname="a" attribute="name" operator="like" value="C%"/></filter>"#,
            r#"<link-entity name="account" from="accountid" to="parentcustomerid" link-type="inner" alias="a">"#,
            r#"<attribute name="name"/>"#,
            "</link-entity>"
        ),
    );
    assert_eq!(
        sql_of(&xml),
        concat!(
            "SELECT contact.fullname, a.name FROM contact ",
            "INNER JOIN account AS a ON contact.parentcustomerid = a.accountid ",
            "WHERE a.name LIKE 'C%'"
        )
    );
}

#[test]
fn test_outer_link_without_alias() {
    let xml = entity(
        "contact",
        r#"<attribute name="fullname"/><link-entity name="account" from="accountid" to="parentcustomerid" link-type="outer"><attribute name="name"/></link-entity>"#,
    );
    assert_eq!(
        sql_of(&xml),
        concat!(
            "SELECT contact.fullname, account.name FROM contact ",
            "LEFT OUTER JOIN account ON contact.parentcustomerid = account.accountid"
        )
    );
}

#[test]
fn test_nested_link_entities() {
    let xml = entity(
        "contact",
        concat!(
            r#"<attribute name="fullname"/>"#,
            r#"<link-entity name="account" from="accountid" to="parentcustomerid" alias="a">"#,
            r#"<link-entity name="systemuser" from="systemuserid" to="ownerid" alias="u">"#,
            r#"<attribute name="fullname" alias="owner"/>"#,
            r#"<order attribute="fullname"/>"#,
            "</link-entity></link-entity>"
        ),
    );
    assert_eq!(
        sql_of(&xml),
        concat!(
            "SELECT contact.fullname, u.fullname AS owner FROM contact ",
            "INNER JOIN account AS a ON contact.parentcustomerid = a.accountid ",
            "INNER JOIN systemuser AS u ON a.ownerid = u.systemuserid ",
            "ORDER BY u.fullname ASC"
        )
    );
}

#[test]
fn test_filter_in_inner_link_entity_is_merged_silently() {
    let xml = entity(
        "contact",
        concat!(
            r#"<attribute name="fullname"/>"#,
            r#"<link-entity name="account" from="accountid" to="parentcustomerid" alias="a">"#,
            r#"<filter><condition attribute="statecode" operator="eq" value="0"/></filter>"#,
            "</link-entity>"
        ),
    );
    assert_eq!(
        sql_of(&xml),
        concat!(
            "SELECT contact.fullname FROM contact ",
            "INNER JOIN account AS a ON contact.parentcustomerid = a.accountid ",
            "WHERE a.statecode = 0"
        )
    );
}

#[test]
fn test_filter_in_outer_link_entity_warns() {
    let warnings = warnings_of(&entity(
        "contact",
        concat!(
            r#"<link-entity name="account" from="accountid" to="parentcustomerid" link-type="outer" alias="a">"#,
            r#"<filter><condition attribute="statecode" operator="eq" value="0"/></filter>"#,
            "</link-entity>"
        ),
    ));
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("merged into WHERE"));
}

#[test]
fn test_unknown_link_type_is_approximated() {
    let result = compact(&entity(
        "contact",
        r#"<link-entity name="account" from="accountid" to="parentcustomerid" link-type="exists"/>"#,
    ));
    assert!(result.success);
    assert!(result.sql.unwrap_or_default().contains("INNER JOIN account"));
    assert!(result.warnings[0].message.contains("link-type 'exists'"));
}

// ============================================================================
// Warnings
// ============================================================================

#[test]
fn test_unsupported_operator_is_omitted() {
    let result = compact(&filtered(concat!(
        r#"<condition attribute="statecode" operator="eq" value="0"/>"#,
        r#"<condition attribute="createdon" operator="last-x-days" value="7"/>"#,
    )));
    assert_eq!(
        result.sql.as_deref(),
        Some("SELECT name FROM account WHERE statecode = 0")
    );
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0]
        .message
        .contains("Unsupported condition operator 'last-x-days'"));
}

#[test]
fn test_paging_attributes() {
    let result = compact(
        r#"<fetch count="50" page="2"><entity name="account"><attribute name="name"/></entity></fetch>"#,
    );
    assert_eq!(result.sql.as_deref(), Some("SELECT TOP 50 name FROM account"));
    assert_eq!(result.warnings.len(), 2);

    // Page 1 is what SQL returns anyway
    let result = compact(
        r#"<fetch top="5" page="1"><entity name="account"><attribute name="name"/></entity></fetch>"#,
    );
    assert!(result.warnings.is_empty());
}

#[test]
fn test_structural_warnings() {
    let cases = vec![
        (filtered(r#"<condition attribute="a" operator="eq" value="1"/>"#).replace("<filter>", r#"<filter type="xor">"#), "Unknown filter type 'xor'"),
        (entity("account", "<attribute name=\"name\"/><filter/>"), "Empty <filter>"),
        (entity("account", "<attribute name=\"name\"/><unknown/>"), "Unknown element <unknown>"),
        (filtered(r#"<condition attribute="a" operator="between"><value>1</value></condition>"#), "exactly two values"),
    ];
    for (xml, expected) in cases {
        let warnings = warnings_of(&xml);
        assert!(
            warnings.iter().any(|w| w.contains(expected)),
            "expected '{}' in {:?}",
            expected,
            warnings
        );
    }
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_failures() {
    let cases = vec![
        "<fetch><entity>",
        "<fetch><entity name=\"a\"></fetch>",
        "not xml at all",
        "",
        "<fetch/>",
        "<query><entity name=\"account\"/></query>",
        "<fetch><entity><attribute name=\"x\"/></entity></fetch>",
        "<fetch><entity name=\"contact\"><link-entity name=\"account\" to=\"x\"/></entity></fetch>",
    ];
    for xml in cases {
        let result = compact(xml);
        assert!(!result.success, "expected failure for {}", xml);
        assert!(result.sql.is_none());
        assert!(
            result.error.as_deref().is_some_and(|e| !e.is_empty()),
            "missing error for {}",
            xml
        );
    }
}

#[test]
fn test_failure_messages() {
    assert_eq!(
        compact("<fetch/>").error.as_deref(),
        Some("FetchXML has no <entity> element")
    );
    assert_eq!(
        compact("<fetch><entity/></fetch>").error.as_deref(),
        Some("<entity> is missing the required 'name' attribute")
    );
    assert_eq!(
        compact("<query/>").error.as_deref(),
        Some("Expected <fetch> as the root element, found <query>")
    );
}
