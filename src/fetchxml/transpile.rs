//! FetchXML → SQL.
//!
//! The document is read into an element tree, mapped onto a
//! [`SelectStatement`] and rendered by the SQL printer. Anything SQL cannot
//! express exactly is approximated or dropped and reported as a
//! [`Warning`]; only structural problems fail the translation.

use crate::ast::{
    AggregateArgument, AggregateCall, AggregateFunction, ColumnExpr, ColumnRef, ComparisonOp,
    Expression, JoinClause, JoinKind, LogicalOp, OrderItem, SelectColumn, SelectStatement,
    SortDirection, TableRef,
};
use crate::fetchxml::reader::{XmlElement, parse_document};
use crate::fetchxml::{FetchXmlError, TranspileResult, Warning};
use crate::output::SqlPrinter;
use crate::value::Value;

/// Output settings for [`FetchXmlTranspiler`].
#[derive(Debug, Clone, Copy)]
pub struct SqlOptions {
    /// One clause per line; `false` renders a single line.
    pub pretty: bool,
}

impl Default for SqlOptions {
    fn default() -> Self {
        SqlOptions { pretty: true }
    }
}

/// Translates FetchXML documents into SQL text.
///
/// # Examples
///
/// ```
/// use fetchxml_sql::{FetchXmlTranspiler, SqlOptions};
///
/// let transpiler = FetchXmlTranspiler::new(SqlOptions { pretty: false });
/// let result = transpiler.transpile(
///     r#"<fetch top="5"><entity name="account"><attribute name="name"/></entity></fetch>"#,
/// );
///
/// assert!(result.success);
/// assert_eq!(result.sql.as_deref(), Some("SELECT TOP 5 name FROM account"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FetchXmlTranspiler {
    options: SqlOptions,
}

impl FetchXmlTranspiler {
    pub fn new(options: SqlOptions) -> Self {
        FetchXmlTranspiler { options }
    }

    /// Translate `xml`; never panics, failures are reported in the result.
    pub fn transpile(&self, xml: &str) -> TranspileResult {
        match self.to_statement(xml) {
            Ok((statement, warnings)) => {
                let sql = SqlPrinter::new(self.options.pretty).print(&statement);
                TranspileResult::success(sql, warnings)
            }
            Err(e) => {
                tracing::debug!(error = %e, "FetchXML rejected");
                TranspileResult::failure(e.to_string())
            }
        }
    }

    /// Map `xml` onto a statement without rendering it.
    pub fn to_statement(&self, xml: &str) -> Result<(SelectStatement, Vec<Warning>), FetchXmlError> {
        tracing::debug!(bytes = xml.len(), "reading FetchXML");

        let document = parse_document(xml)?;
        let fetch = &document.root;
        if fetch.name != "fetch" {
            return Err(FetchXmlError::UnexpectedRoot(fetch.name.clone()));
        }

        let mut translation = Translation::default();
        translation.statement.leading_comments = document.comments.clone();
        translation.fetch_attributes(fetch);

        let mut entities = fetch.children_named("entity");
        let entity = entities.next().ok_or(FetchXmlError::MissingEntity)?;
        if entities.next().is_some() {
            translation.warn("Only the first <entity> is translated; further <entity> elements are ignored");
        }
        for other in fetch.children.iter().filter(|c| c.name != "entity") {
            translation.warn(format!("Unknown element <{}> ignored", other.name));
        }

        let entity_name = entity.attr("name").ok_or(FetchXmlError::MissingAttribute {
            element: "entity",
            attribute: "name",
        })?;
        translation.statement.from = TableRef::new(entity_name);

        let columns = translation.entity(entity, None, entity_name, JoinKind::Inner)?;
        translation.statement.columns = columns;
        Ok(translation.finish())
    }
}

#[derive(Debug, Default)]
struct Translation {
    statement: SelectStatement,
    warnings: Vec<Warning>,
    filters: Vec<Expression>,
}

impl Translation {
    fn warn(&mut self, message: impl Into<String>) {
        let warning = Warning::new(message);
        tracing::debug!(warning = %warning, "lossy FetchXML mapping");
        self.warnings.push(warning);
    }

    fn fetch_attributes(&mut self, fetch: &XmlElement) {
        if let Some(top) = fetch.attr("top") {
            match top.trim().parse::<u64>() {
                Ok(n) => self.statement.top = Some(n),
                Err(_) => self.warn(format!("Invalid top value '{}' ignored", top)),
            }
        }
        self.statement.distinct = fetch.flag("distinct");

        if let Some(count) = fetch.attr("count") {
            match (count.trim().parse::<u64>(), self.statement.top) {
                (Ok(n), None) => {
                    self.statement.top = Some(n);
                    self.warn(format!(
                        "Paging attribute count=\"{}\" approximated as TOP {}",
                        count, n
                    ));
                }
                _ => self.warn(format!("Paging attribute count=\"{}\" dropped", count)),
            }
        }
        if let Some(page) = fetch.attr("page") {
            if page.trim() != "1" {
                self.warn(format!(
                    "Paging attribute page=\"{}\" dropped; SQL returns the first page",
                    page
                ));
            }
        }
    }

    /// Translate the children of `<entity>` (owner `None`) or of a
    /// `<link-entity>`, returning the select-list items it owns.
    fn entity(
        &mut self,
        element: &XmlElement,
        owner: Option<&str>,
        entity_name: &str,
        kind: JoinKind,
    ) -> Result<Vec<SelectColumn>, FetchXmlError> {
        let mut columns = Vec::new();

        for child in &element.children {
            match child.name.as_str() {
                "attribute" => {
                    if let Some(column) = self.attribute(child, owner, entity_name) {
                        columns.push(column);
                    }
                }
                "all-attributes" => {
                    columns.push(SelectColumn {
                        expr: ColumnExpr::Wildcard(owner.map(str::to_string)),
                        alias: None,
                    });
                }
                "order" => self.order(child, owner),
                "filter" => {
                    if let Some(qualifier) = owner {
                        if kind == JoinKind::Outer {
                            self.warn(format!(
                                "Filter inside outer link-entity '{}' merged into WHERE; rows without a match are now excluded",
                                qualifier
                            ));
                        }
                    }
                    if let Some(expr) = self.filter(child, owner) {
                        self.filters.push(expr);
                    }
                }
                "link-entity" => self.link_entity(child, owner)?,
                other => self.warn(format!("Unknown element <{}> ignored", other)),
            }
        }
        Ok(columns)
    }

    fn column_ref(owner: Option<&str>, name: &str) -> ColumnRef {
        ColumnRef {
            qualifier: owner.map(str::to_string),
            name: name.to_string(),
        }
    }

    fn attribute(
        &mut self,
        element: &XmlElement,
        owner: Option<&str>,
        entity_name: &str,
    ) -> Option<SelectColumn> {
        let Some(name) = element.attr("name") else {
            self.warn("<attribute> without a name ignored");
            return None;
        };
        let alias = element.attr("alias").map(str::to_string);

        if let Some(dategrouping) = element.attr("dategrouping") {
            self.warn(format!(
                "dategrouping=\"{}\" on '{}' is not supported; grouping by the raw value",
                dategrouping, name
            ));
        }

        if let Some(aggregate) = element.attr("aggregate") {
            let Some(function) = AggregateFunction::from_fetchxml(aggregate) else {
                self.warn(format!(
                    "Unsupported aggregate '{}' on '{}' omitted",
                    aggregate, name
                ));
                return None;
            };

            // `count` over the primary key is how COUNT(*) is written
            let argument = if aggregate == "count" && owner.is_none() && name == format!("{}id", entity_name) {
                AggregateArgument::Star
            } else {
                AggregateArgument::Column(Self::column_ref(owner, name))
            };
            let call = AggregateCall {
                function,
                argument,
                distinct: element.flag("distinct"),
            };
            let alias = match alias {
                Some(alias) => alias,
                None => {
                    let synthesized = call.default_alias(entity_name);
                    self.warn(format!(
                        "Aggregate attribute '{}' has no alias; using '{}'",
                        name, synthesized
                    ));
                    synthesized
                }
            };
            return Some(SelectColumn {
                expr: ColumnExpr::Aggregate(call),
                alias: Some(alias),
            });
        }

        let column = Self::column_ref(owner, name);
        if element.flag("groupby") {
            if !self.statement.group_by.contains(&column) {
                self.statement.group_by.push(column.clone());
            }
            // The writer aliases grouped columns by their own name
            let alias = alias.filter(|a| a != name);
            return Some(SelectColumn {
                expr: ColumnExpr::Column(column),
                alias,
            });
        }

        Some(SelectColumn {
            expr: ColumnExpr::Column(column),
            alias,
        })
    }

    fn order(&mut self, element: &XmlElement, owner: Option<&str>) {
        let direction = if element.flag("descending") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        let column = match (element.attr("attribute"), element.attr("alias")) {
            (Some(attribute), _) => {
                Self::column_ref(element.attr("entityname").or(owner), attribute)
            }
            (None, Some(alias)) => ColumnRef::new(alias),
            (None, None) => {
                self.warn("<order> without attribute or alias ignored");
                return;
            }
        };
        self.statement.order_by.push(OrderItem { column, direction });
    }

    fn filter(&mut self, element: &XmlElement, owner: Option<&str>) -> Option<Expression> {
        let op = match element.attr("type") {
            None | Some("and") => LogicalOp::And,
            Some("or") => LogicalOp::Or,
            Some(other) => {
                self.warn(format!("Unknown filter type '{}' treated as 'and'", other));
                LogicalOp::And
            }
        };

        let mut operands = Vec::new();
        for child in &element.children {
            let operand = match child.name.as_str() {
                "condition" => self.condition(child, owner),
                "filter" => self.filter(child, owner),
                other => {
                    self.warn(format!("Unknown element <{}> inside <filter> ignored", other));
                    None
                }
            };
            operands.extend(operand);
        }

        if operands.is_empty() {
            self.warn("Empty <filter> ignored");
            return None;
        }
        Expression::chain(op, operands)
    }

    fn condition(&mut self, element: &XmlElement, owner: Option<&str>) -> Option<Expression> {
        let Some(attribute) = element.attr("attribute") else {
            self.warn("<condition> without an attribute ignored");
            return None;
        };
        let Some(operator) = element.attr("operator") else {
            self.warn(format!("<condition> on '{}' has no operator; omitted", attribute));
            return None;
        };
        let column = Self::column_ref(element.attr("entityname").or(owner), attribute);

        let mut values: Vec<&str> = element
            .children_named("value")
            .map(|v| v.text.as_str())
            .collect();
        if let Some(value) = element.attr("value") {
            values.insert(0, value);
        }

        let single = |this: &mut Self| -> Option<String> {
            match values.first() {
                Some(v) => Some(v.to_string()),
                None => {
                    this.warn(format!(
                        "Condition '{}' on '{}' has no value; omitted",
                        operator, attribute
                    ));
                    None
                }
            }
        };

        if let Some(op) = ComparisonOp::from_fetchxml(operator) {
            let value = Value::from_fetchxml(&single(self)?);
            return Some(Expression::Comparison { column, op, value });
        }

        let (positive, negated) = match operator.strip_prefix("not-") {
            Some(rest) => (rest, true),
            None => (operator, false),
        };

        let expr = match positive {
            "like" => Expression::Like {
                column,
                pattern: single(self)?,
            },
            "begins-with" | "begin-with" => Expression::Like {
                column,
                pattern: format!("{}%", single(self)?),
            },
            "ends-with" | "end-with" => Expression::Like {
                column,
                pattern: format!("%{}", single(self)?),
            },
            "in" => {
                if values.is_empty() {
                    self.warn(format!("Condition 'in' on '{}' has no values; omitted", attribute));
                    return None;
                }
                Expression::InList {
                    column,
                    values: values.iter().map(|v| Value::from_fetchxml(v)).collect(),
                }
            }
            "between" => {
                let [low, high] = values.as_slice() else {
                    self.warn(format!(
                        "Condition 'between' on '{}' needs exactly two values, found {}; omitted",
                        attribute,
                        values.len()
                    ));
                    return None;
                };
                Expression::Between {
                    column,
                    low: Value::from_fetchxml(low),
                    high: Value::from_fetchxml(high),
                }
            }
            "null" => {
                return Some(Expression::Null {
                    column,
                    is_null: !negated,
                });
            }
            _ => {
                self.warn(format!(
                    "Unsupported condition operator '{}' on '{}' omitted",
                    operator, attribute
                ));
                return None;
            }
        };

        Some(if negated { Expression::negated(expr) } else { expr })
    }

    fn link_entity(&mut self, element: &XmlElement, owner: Option<&str>) -> Result<(), FetchXmlError> {
        let required = |attribute: &'static str| {
            element.attr(attribute).ok_or(FetchXmlError::MissingAttribute {
                element: "link-entity",
                attribute,
            })
        };
        let entity_name = required("name")?;
        let from = required("from")?;
        let to = required("to")?;

        let kind = match element.attr("link-type") {
            None | Some("inner") => JoinKind::Inner,
            Some("outer") => JoinKind::Outer,
            Some(other) => {
                self.warn(format!(
                    "link-type '{}' on '{}' approximated as an inner join",
                    other, entity_name
                ));
                JoinKind::Inner
            }
        };

        let join = JoinClause {
            entity_name: entity_name.to_string(),
            from_attribute: to.to_string(),
            to_attribute: from.to_string(),
            alias: element.attr("alias").map(str::to_string),
            kind,
            parent: owner.map(str::to_string),
            columns: Vec::new(),
        };
        let qualifier = join.qualifier().to_string();
        if qualifier == self.statement.from.qualifier() || self.statement.join(&qualifier).is_some() {
            self.warn(format!(
                "Entity name '{}' is used more than once; give each link-entity a distinct alias",
                qualifier
            ));
        }

        tracing::trace!(entity = %entity_name, alias = %qualifier, "translating link-entity");
        let index = self.statement.joins.len();
        self.statement.joins.push(join);

        let columns = self.entity(element, Some(&qualifier), entity_name, kind)?;
        self.statement.joins[index].columns = columns;
        Ok(())
    }

    /// Check an `entityname` qualifier once every link-entity is known.
    /// The root's own name is dropped; anything that is neither the root
    /// nor a link-entity makes the reference unusable.
    fn known_entity(&mut self, column: &mut ColumnRef, what: &str) -> bool {
        let Some(qualifier) = column.qualifier.clone() else {
            return true;
        };
        if self.statement.join(&qualifier).is_some() {
            return true;
        }
        if qualifier.eq_ignore_ascii_case(self.statement.from.qualifier()) {
            column.qualifier = None;
            return true;
        }
        self.warn(format!(
            "{} on '{}' refers to unknown entity '{}'; omitted",
            what, column.name, qualifier
        ));
        false
    }

    /// Drop conditions on unknown entities, keeping the rest of the tree.
    fn retain_known(&mut self, expr: Expression) -> Option<Expression> {
        match expr {
            Expression::Logical { op, left, right } => {
                match (self.retain_known(*left), self.retain_known(*right)) {
                    (Some(left), Some(right)) => Some(Expression::Logical {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    }),
                    (left, right) => left.or(right),
                }
            }
            Expression::Not(inner) => self.retain_known(*inner).map(Expression::negated),
            mut leaf => {
                let known = match leaf.column_mut() {
                    Some(column) => self.known_entity(column, "Condition"),
                    None => true,
                };
                known.then_some(leaf)
            }
        }
    }

    fn finish(mut self) -> (SelectStatement, Vec<Warning>) {
        let filters = std::mem::take(&mut self.filters);
        let where_clause = Expression::chain(LogicalOp::And, filters);
        self.statement.where_clause = where_clause.and_then(|expr| self.retain_known(expr));

        for mut item in std::mem::take(&mut self.statement.order_by) {
            if self.known_entity(&mut item.column, "Order") {
                self.statement.order_by.push(item);
            }
        }

        if self.statement.all_columns().any(SelectColumn::is_aggregate) {
            let stray: Vec<String> = self
                .statement
                .all_columns()
                .filter_map(|c| match &c.expr {
                    ColumnExpr::Column(column) if !self.statement.group_by.contains(column) => {
                        Some(column.to_string())
                    }
                    ColumnExpr::Wildcard(_) => Some("*".to_string()),
                    _ => None,
                })
                .collect();
            for column in stray {
                self.warn(format!(
                    "Attribute '{}' is neither aggregated nor grouped in an aggregate query",
                    column
                ));
            }
        }

        tracing::debug!(
            joins = self.statement.joins.len(),
            warnings = self.warnings.len(),
            "translated FetchXML"
        );
        (self.statement, self.warnings)
    }
}
