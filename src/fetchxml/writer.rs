//! SQL statement → FetchXML markup.

use crate::ast::{
    ColumnExpr, ColumnRef, Expression, JoinClause, LogicalOp, OrderItem, SelectColumn,
    SelectStatement,
};
use crate::fetchxml::FetchXmlError;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

/// Output settings for [`FetchXmlWriter`].
#[derive(Debug, Clone, Copy)]
pub struct FetchXmlOptions {
    /// Spaces per nesting level; 0 writes everything on one line.
    pub indent: usize,
}

impl Default for FetchXmlOptions {
    fn default() -> Self {
        FetchXmlOptions { indent: 2 }
    }
}

/// Renders a [`SelectStatement`] as FetchXML.
///
/// # Examples
///
/// ```
/// use fetchxml_sql::{parse_sql, FetchXmlOptions, FetchXmlWriter};
///
/// let statement = parse_sql("SELECT TOP 5 name FROM account").unwrap();
/// let writer = FetchXmlWriter::new(FetchXmlOptions { indent: 0 });
///
/// assert_eq!(
///     writer.write(&statement),
///     r#"<fetch top="5"><entity name="account"><attribute name="name"/></entity></fetch>"#
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct FetchXmlWriter {
    options: FetchXmlOptions,
}

impl FetchXmlWriter {
    pub fn new(options: FetchXmlOptions) -> Self {
        FetchXmlWriter { options }
    }

    pub fn write(&self, statement: &SelectStatement) -> String {
        let mut xml = if self.options.indent == 0 {
            Writer::new(Vec::new())
        } else {
            Writer::new_with_indent(Vec::new(), b' ', self.options.indent)
        };

        tracing::debug!(
            entity = %statement.from.entity_name,
            joins = statement.joins.len(),
            aggregate = statement.is_aggregate(),
            "writing FetchXML"
        );

        let mut emitter = Emitter {
            xml: &mut xml,
            statement,
            aggregate: statement.is_aggregate(),
        };
        // The sink is an in-memory buffer, so this only fails on a bug.
        if let Err(e) = emitter.fetch() {
            tracing::error!(error = %e, "FetchXML writer failed");
        }

        String::from_utf8_lossy(&xml.into_inner()).into_owned()
    }
}

enum OrderTarget<'a> {
    Attribute { owner: Option<&'a str>, name: &'a str },
    Alias(&'a str),
}

struct PlannedOrder<'a> {
    target: OrderTarget<'a>,
    descending: bool,
}

/// Decide how an ORDER BY item is expressed. Aggregate queries sort by
/// alias; plain queries sort by attribute, looking through select aliases.
fn plan_order<'a>(statement: &'a SelectStatement, item: &'a OrderItem, aggregate: bool) -> PlannedOrder<'a> {
    let column = &item.column;
    let descending = item.direction.is_descending();

    if column.qualifier.is_none() {
        let aliased = statement
            .all_columns()
            .find(|c| c.alias.as_deref() == Some(column.name.as_str()));
        if let Some(selected) = aliased {
            let target = match &selected.expr {
                ColumnExpr::Column(c) if !aggregate => OrderTarget::Attribute {
                    owner: c.qualifier.as_deref(),
                    name: &c.name,
                },
                _ => OrderTarget::Alias(&column.name),
            };
            return PlannedOrder { target, descending };
        }
    }

    if aggregate && statement.group_by.contains(column) {
        let alias = statement
            .all_columns()
            .find(|c| matches!(&c.expr, ColumnExpr::Column(g) if g == column))
            .and_then(|c| c.alias.as_deref())
            .unwrap_or(&column.name);
        return PlannedOrder {
            target: OrderTarget::Alias(alias),
            descending,
        };
    }

    PlannedOrder {
        target: OrderTarget::Attribute {
            owner: column.qualifier.as_deref(),
            name: &column.name,
        },
        descending,
    }
}

/// Filter tree with negations already pushed into the operators.
enum FilterNode<'a> {
    Group {
        op: LogicalOp,
        children: Vec<FilterNode<'a>>,
    },
    Condition {
        column: &'a ColumnRef,
        operator: &'static str,
        values: ConditionValues,
    },
}

enum ConditionValues {
    None,
    Single(String),
    List(Vec<String>),
}

/// Lower a WHERE tree, flattening runs of the same connective and pushing
/// `NOT` down with De Morgan so every negation maps to a FetchXML operator.
fn lower(expr: &Expression, negated: bool) -> FilterNode<'_> {
    match expr {
        Expression::Logical { op, left, right } => {
            let op = if negated { op.dual() } else { *op };
            let mut children = Vec::new();
            for side in [left, right] {
                match lower(side, negated) {
                    FilterNode::Group {
                        op: inner,
                        children: nested,
                    } if inner == op => children.extend(nested),
                    node => children.push(node),
                }
            }
            FilterNode::Group { op, children }
        }
        Expression::Not(inner) => lower(inner, !negated),
        Expression::Comparison { column, op, value } => {
            let op = if negated { op.negate() } else { *op };
            FilterNode::Condition {
                column,
                operator: op.as_fetchxml(),
                values: ConditionValues::Single(value.to_fetchxml()),
            }
        }
        Expression::Null { column, is_null } => FilterNode::Condition {
            column,
            operator: if *is_null != negated { "null" } else { "not-null" },
            values: ConditionValues::None,
        },
        Expression::InList { column, values } => FilterNode::Condition {
            column,
            operator: if negated { "not-in" } else { "in" },
            values: ConditionValues::List(values.iter().map(|v| v.to_fetchxml()).collect()),
        },
        Expression::Between { column, low, high } => FilterNode::Condition {
            column,
            operator: if negated { "not-between" } else { "between" },
            values: ConditionValues::List(vec![low.to_fetchxml(), high.to_fetchxml()]),
        },
        Expression::Like { column, pattern } => FilterNode::Condition {
            column,
            operator: if negated { "not-like" } else { "like" },
            values: ConditionValues::Single(pattern.clone()),
        },
    }
}

/// XML comments may not contain `--`.
fn defuse_comment(comment: &str) -> String {
    let mut body = comment.to_string();
    while body.contains("--") {
        body = body.replace("--", "- -");
    }
    body
}

type WriteResult = Result<(), FetchXmlError>;

struct Emitter<'s, 'w> {
    xml: &'w mut Writer<Vec<u8>>,
    statement: &'s SelectStatement,
    aggregate: bool,
}

impl<'s> Emitter<'s, '_> {
    fn fetch(&mut self) -> WriteResult {
        let statement = self.statement;

        for comment in &statement.leading_comments {
            let body = format!(" {} ", defuse_comment(comment));
            self.xml
                .write_event(Event::Comment(BytesText::from_escaped(body)))?;
        }

        let mut fetch = BytesStart::new("fetch");
        if let Some(top) = statement.top {
            fetch.push_attribute(("top", top.to_string().as_str()));
        }
        if self.aggregate {
            fetch.push_attribute(("aggregate", "true"));
        }
        if statement.distinct {
            fetch.push_attribute(("distinct", "true"));
        }
        self.xml.write_event(Event::Start(fetch))?;

        let mut entity = BytesStart::new("entity");
        entity.push_attribute(("name", statement.from.entity_name.as_str()));
        self.xml.write_event(Event::Start(entity))?;

        let orders: Vec<PlannedOrder<'s>> = statement
            .order_by
            .iter()
            .map(|item| plan_order(statement, item, self.aggregate))
            .collect();

        self.entity_body(None, &statement.columns, &statement.from.entity_name, &orders)?;

        self.xml.write_event(Event::End(BytesEnd::new("entity")))?;
        self.xml.write_event(Event::End(BytesEnd::new("fetch")))?;
        Ok(())
    }

    /// Children of `<entity>` (owner `None`) or of a `<link-entity>`.
    /// Orders are only passed for the root: they all sit there, in source
    /// order, with `entityname` pointing at link-entity columns.
    fn entity_body(
        &mut self,
        owner: Option<&str>,
        columns: &[SelectColumn],
        entity_name: &str,
        orders: &[PlannedOrder<'s>],
    ) -> WriteResult {
        let statement = self.statement;

        for column in columns {
            self.attribute(column, entity_name)?;
        }
        for grouped in self.unselected_group_columns(owner) {
            let mut attribute = BytesStart::new("attribute");
            attribute.push_attribute(("name", grouped.name.as_str()));
            attribute.push_attribute(("alias", grouped.name.as_str()));
            attribute.push_attribute(("groupby", "true"));
            self.xml.write_event(Event::Empty(attribute))?;
        }

        for order in orders {
            self.order(order)?;
        }

        if owner.is_none() {
            if let Some(expr) = &statement.where_clause {
                match lower(expr, false) {
                    group @ FilterNode::Group { .. } => self.filter_node(&group)?,
                    condition => self.filter_node(&FilterNode::Group {
                        op: LogicalOp::And,
                        children: vec![condition],
                    })?,
                }
            }
        }

        for join in statement.joins.iter().filter(|j| j.parent.as_deref() == owner) {
            self.link_entity(join)?;
        }
        Ok(())
    }

    /// GROUP BY columns of this entity that the select list does not
    /// mention; FetchXML can only group by a selected attribute.
    fn unselected_group_columns(&self, owner: Option<&str>) -> Vec<&'s ColumnRef> {
        let statement = self.statement;
        statement
            .group_by
            .iter()
            .filter(|g| g.qualifier.as_deref() == owner)
            .filter(|g| {
                !statement
                    .all_columns()
                    .any(|c| matches!(&c.expr, ColumnExpr::Column(s) if s == *g))
            })
            .collect()
    }

    fn attribute(&mut self, column: &SelectColumn, entity_name: &str) -> WriteResult {
        match &column.expr {
            ColumnExpr::Wildcard(_) => {
                self.xml
                    .write_event(Event::Empty(BytesStart::new("all-attributes")))?;
            }
            ColumnExpr::Column(c) => {
                let mut attribute = BytesStart::new("attribute");
                attribute.push_attribute(("name", c.name.as_str()));
                if self.aggregate && self.statement.group_by.contains(c) {
                    let alias = column.alias.as_deref().unwrap_or(&c.name);
                    attribute.push_attribute(("alias", alias));
                    attribute.push_attribute(("groupby", "true"));
                } else if let Some(alias) = &column.alias {
                    attribute.push_attribute(("alias", alias.as_str()));
                }
                self.xml.write_event(Event::Empty(attribute))?;
            }
            ColumnExpr::Aggregate(call) => {
                let name = call.attribute_name(entity_name);
                let alias = column
                    .alias
                    .clone()
                    .unwrap_or_else(|| call.default_alias(entity_name));
                let mut attribute = BytesStart::new("attribute");
                attribute.push_attribute(("name", name.as_str()));
                attribute.push_attribute(("alias", alias.as_str()));
                attribute.push_attribute(("aggregate", call.function.as_fetchxml()));
                if call.distinct {
                    attribute.push_attribute(("distinct", "true"));
                }
                self.xml.write_event(Event::Empty(attribute))?;
            }
        }
        Ok(())
    }

    fn order(&mut self, order: &PlannedOrder<'_>) -> WriteResult {
        let mut element = BytesStart::new("order");
        match order.target {
            OrderTarget::Attribute { owner, name } => {
                if let Some(qualifier) = owner {
                    element.push_attribute(("entityname", qualifier));
                }
                element.push_attribute(("attribute", name));
            }
            OrderTarget::Alias(alias) => element.push_attribute(("alias", alias)),
        }
        element.push_attribute((
            "descending",
            if order.descending { "true" } else { "false" },
        ));
        self.xml.write_event(Event::Empty(element))?;
        Ok(())
    }

    fn filter_node(&mut self, node: &FilterNode<'_>) -> WriteResult {
        match node {
            FilterNode::Group { op, children } => {
                let mut filter = BytesStart::new("filter");
                filter.push_attribute(("type", op.as_fetchxml()));
                self.xml.write_event(Event::Start(filter))?;
                for child in children {
                    self.filter_node(child)?;
                }
                self.xml.write_event(Event::End(BytesEnd::new("filter")))?;
            }
            FilterNode::Condition {
                column,
                operator,
                values,
            } => {
                let mut condition = BytesStart::new("condition");
                if let Some(qualifier) = &column.qualifier {
                    condition.push_attribute(("entityname", qualifier.as_str()));
                }
                condition.push_attribute(("attribute", column.name.as_str()));
                condition.push_attribute(("operator", *operator));
                match values {
                    ConditionValues::None => {
                        self.xml.write_event(Event::Empty(condition))?;
                    }
                    ConditionValues::Single(value) => {
                        condition.push_attribute(("value", value.as_str()));
                        self.xml.write_event(Event::Empty(condition))?;
                    }
                    ConditionValues::List(values) => {
                        self.xml.write_event(Event::Start(condition))?;
                        for value in values {
                            self.xml
                                .write_event(Event::Start(BytesStart::new("value")))?;
                            self.xml
                                .write_event(Event::Text(BytesText::new(value)))?;
                            self.xml.write_event(Event::End(BytesEnd::new("value")))?;
                        }
                        self.xml
                            .write_event(Event::End(BytesEnd::new("condition")))?;
                    }
                }
            }
        }
        Ok(())
    }

    fn link_entity(&mut self, join: &'s JoinClause) -> WriteResult {
        tracing::trace!(entity = %join.entity_name, parent = ?join.parent, "writing link-entity");

        let mut link = BytesStart::new("link-entity");
        link.push_attribute(("name", join.entity_name.as_str()));
        link.push_attribute(("from", join.to_attribute.as_str()));
        link.push_attribute(("to", join.from_attribute.as_str()));
        link.push_attribute(("link-type", join.kind.as_fetchxml()));
        if let Some(alias) = &join.alias {
            link.push_attribute(("alias", alias.as_str()));
        }

        let qualifier = join.qualifier();
        let statement = self.statement;
        let has_children = !join.columns.is_empty()
            || statement.joins.iter().any(|j| j.parent.as_deref() == Some(qualifier))
            || !self.unselected_group_columns(Some(qualifier)).is_empty();

        if !has_children {
            self.xml.write_event(Event::Empty(link))?;
            return Ok(());
        }

        self.xml.write_event(Event::Start(link))?;
        self.entity_body(Some(qualifier), &join.columns, &join.entity_name, &[])?;
        self.xml
            .write_event(Event::End(BytesEnd::new("link-entity")))?;
        Ok(())
    }
}
