//! Documentation content for the fxsql CLI

use super::CliError;

/// Available documentation categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocCategory {
    Select,
    Joins,
    Filters,
    Aggregates,
    Ordering,
    FetchXml,
}

impl DocCategory {
    /// Parse category name from string
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "select" | "columns" => Some(Self::Select),
            "joins" | "join" | "link-entity" => Some(Self::Joins),
            "filters" | "filter" | "where" | "operators" => Some(Self::Filters),
            "aggregates" | "aggregate" | "group-by" => Some(Self::Aggregates),
            "ordering" | "order" | "order-by" | "paging" => Some(Self::Ordering),
            "fetchxml" | "fetch-xml" | "to-sql" | "warnings" => Some(Self::FetchXml),
            _ => None,
        }
    }
}

/// Get the docs overview (category listing)
pub fn get_docs_overview() -> &'static str {
    r#"FXSQL DOCUMENTATION

fxsql translates between a subset of SQL SELECT and FetchXML, the XML query
language of Dataverse. SQL is parsed, checked and written out as FetchXML;
FetchXML is read back into SQL, with warnings for anything SQL cannot say
exactly.

DOCUMENTATION CATEGORIES

  select        Select list, aliases, DISTINCT, TOP and LIMIT
  joins         INNER / LEFT OUTER JOIN and how they become link-entities
  filters       WHERE operators, NOT, AND/OR grouping
  aggregates    COUNT, SUM, AVG, MIN, MAX and GROUP BY
  ordering      ORDER BY on attributes, aliases and joined entities
  fetchxml      FetchXML to SQL: what is supported and what is reported

QUICK REFERENCE

  fxsql to-fetchxml "SELECT name FROM account"
  fxsql to-sql '<fetch><entity name="account"><all-attributes/></entity></fetch>'
  fxsql check "SELECT name FROM account WHERE statecode = 0"
  fxsql tokens "SELECT TOP 5 * FROM contact"

Run 'fxsql doc <category>' for detailed documentation.
"#
}

/// Get documentation for a specific category
pub fn get_doc_category(name: &str) -> Result<&'static str, CliError> {
    match DocCategory::from_name(name) {
        Some(DocCategory::Select) => Ok(SELECT_DOC),
        Some(DocCategory::Joins) => Ok(JOINS_DOC),
        Some(DocCategory::Filters) => Ok(FILTERS_DOC),
        Some(DocCategory::Aggregates) => Ok(AGGREGATES_DOC),
        Some(DocCategory::Ordering) => Ok(ORDERING_DOC),
        Some(DocCategory::FetchXml) => Ok(FETCHXML_DOC),
        None => Err(CliError::UnknownCategory(name.to_string())),
    }
}

const SELECT_DOC: &str = r#"SELECT

One statement per input, optionally ending in a semicolon. Keywords are
case-insensitive; identifiers keep their spelling.

  SELECT [DISTINCT] [TOP n] columns FROM entity [[AS] alias] ...

COLUMNS

  *                       <all-attributes/>
  name                    <attribute name="name"/>
  accountid AS id         <attribute name="accountid" alias="id"/>
  a.*                     <all-attributes/> inside the link-entity of a

Identifiers that clash with keywords or contain other characters are quoted
with brackets or double quotes: [order], "first name".

DISTINCT AND TOP

  SELECT DISTINCT name FROM account       <fetch distinct="true">
  SELECT TOP 10 * FROM account            <fetch top="10">
  SELECT * FROM account LIMIT 10          same as TOP 10

TOP and LIMIT cannot be combined.

COMMENTS

Comments in front of SELECT are carried over as XML comments before <fetch>
and come back as -- lines. Other comments are dropped.
"#;

const JOINS_DOC: &str = r#"JOINS

  [INNER] JOIN entity [[AS] alias] ON left = right      link-type="inner"
  LEFT [OUTER] JOIN entity [[AS] alias] ON left = right link-type="outer"

The ON condition must compare one column of the joined entity with one
column of an entity already in scope. Either order works:

  SELECT c.fullname, a.name
  FROM contact c
  JOIN account a ON c.parentcustomerid = a.accountid

  <entity name="contact">
    <attribute name="fullname"/>
    <link-entity name="account" from="accountid" to="parentcustomerid"
                 link-type="inner" alias="a">
      <attribute name="name"/>
    </link-entity>
  </entity>

"from" names the joined entity's column, "to" the parent's. A join whose
condition references an earlier join is nested inside that link-entity.

NAMES

Once joins are present every column must be qualified with its entity
or alias; '--allow-unqualified' binds bare names to the FROM entity
instead. Two joins of the same entity need distinct aliases.

NOT SUPPORTED

  RIGHT JOIN, FULL JOIN, CROSS JOIN, conditions other than one equality
"#;

const FILTERS_DOC: &str = r#"FILTERS

  SQL                         FetchXML operator
  a = v                       eq
  a <> v, a != v              ne
  a < v, a <= v               lt, le
  a > v, a >= v               gt, ge
  a LIKE 'x%'                 like
  a NOT LIKE 'x%'             not-like
  a IN (v1, v2)               in        (one <value> per item)
  a NOT IN (v1, v2)           not-in
  a BETWEEN v1 AND v2         between   (two <value> elements)
  a NOT BETWEEN v1 AND v2     not-between
  a IS NULL                   null
  a IS NOT NULL               not-null

Values are strings ('O''Brien'), numbers (-12.50) or TRUE / FALSE. A
literal may come first: 100 < revenue is revenue > 100.

GROUPING

AND binds tighter than OR; parentheses group. Each connective becomes a
<filter type="and"> or <filter type="or">; runs of the same connective
share one filter.

NOT

NOT is pushed down to the conditions: NOT (a = 1 OR b IS NULL) becomes
a filter of type "and" over ne and not-null.

Conditions on joined columns carry entityname="alias".

NOT SUPPORTED

  column-to-column comparisons, subqueries, functions, arithmetic
"#;

const AGGREGATES_DOC: &str = r#"AGGREGATES

  COUNT(*)                    aggregate="count" on <entity>id
  COUNT(col)                  aggregate="count"
  COUNT(DISTINCT col)         aggregate="count" distinct="true"
  SUM(col), AVG(col)          aggregate="sum", "avg"
  MIN(col), MAX(col)          aggregate="min", "max"

Any aggregate or GROUP BY sets aggregate="true" on <fetch>. Every aggregate
needs an alias in FetchXML; without AS one is generated as
<function>_<column>, for example count_contactid.

GROUP BY

  SELECT statecode, COUNT(*) AS total FROM account GROUP BY statecode

  <attribute name="statecode" alias="statecode" groupby="true"/>
  <attribute name="accountid" alias="total" aggregate="count"/>

Columns next to aggregates must be grouped. HAVING is not supported.
"#;

const ORDERING_DOC: &str = r#"ORDERING

  ORDER BY name                 <order attribute="name" descending="false"/>
  ORDER BY name DESC            <order attribute="name" descending="true"/>
  ORDER BY a.name               <order entityname="a" attribute="name" .../>
  ORDER BY total                alias of a select item

All <order> elements are written on the root <entity> in ORDER BY order,
so the first item stays the primary sort key. In aggregate queries FetchXML
sorts by alias, so ORDER BY on an aggregate or grouped column becomes
<order alias="..."/>. In other queries an alias is resolved to its
attribute.

When reading FetchXML, orders inside a link-entity belong to that entity.
"#;

const FETCHXML_DOC: &str = r#"FETCHXML TO SQL

  fxsql to-sql [XML] [--compact] [--json]

The document must have a <fetch> root with an <entity name="...">.
Malformed XML, a missing entity or a link-entity without name, from or to
fails the translation.

Everything else translates, possibly with warnings:

  begins-with / ends-with     become LIKE 'x%' / LIKE '%x'
  other operators             omitted
  filter in a link-entity     merged into WHERE (changes outer joins)
  unknown filter type         treated as "and"
  other link-types            approximated as inner joins
  count / page                count becomes TOP; page is dropped
  dategrouping                grouped by the raw value
  aggregate without alias     alias generated
  between with != 2 values    omitted
  unknown entityname          condition or order omitted
  empty filters               ignored
  unknown elements            ignored

Warnings go to stderr; with --json the whole result is printed:

  {"success": true, "sql": "...", "error": null, "warnings": [...]}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_aliases() {
        assert_eq!(DocCategory::from_name("JOINS"), Some(DocCategory::Joins));
        assert_eq!(DocCategory::from_name("order_by"), Some(DocCategory::Ordering));
        assert_eq!(DocCategory::from_name("nope"), None);
    }

    #[test]
    fn test_unknown_category_is_an_error() {
        assert!(matches!(
            get_doc_category("nope"),
            Err(CliError::UnknownCategory(_))
        ));
        assert!(get_doc_category("filters").unwrap().contains("not-between"));
    }
}
