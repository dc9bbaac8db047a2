use crate::ast::{AggregateCall, ColumnRef, Expression, JoinKind, SortDirection};

/// What a select-list item produces.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnExpr {
    /// Plain attribute
    Column(ColumnRef),
    /// Aggregate over an attribute
    Aggregate(AggregateCall),
    /// `*` or `alias.*`
    Wildcard(Option<String>),
}

/// One item of the select list.
///
/// # Examples
/// ```text
/// accountid AS id
/// COUNT(contactid) AS total
/// a.*
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SelectColumn {
    pub expr: ColumnExpr,
    pub alias: Option<String>,
}

impl SelectColumn {
    pub fn column(column: ColumnRef) -> Self {
        SelectColumn {
            expr: ColumnExpr::Column(column),
            alias: None,
        }
    }

    pub fn aliased(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self.expr, ColumnExpr::Aggregate(_))
    }
}

/// The primary queried entity.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub entity_name: String,
    /// SQL-side alias; FetchXML has no place for it.
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(entity_name: impl Into<String>) -> Self {
        TableRef {
            entity_name: entity_name.into(),
            alias: None,
        }
    }

    /// Name other clauses use to refer to this entity.
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.entity_name)
    }
}

/// A joined entity, the SQL face of a FetchXML `<link-entity>`.
///
/// `from_attribute` lives on the parent entity and `to_attribute` on the
/// joined one, so `ON c.parentcustomerid = a.accountid` gives
/// `from_attribute = "parentcustomerid"` and `to_attribute = "accountid"`.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub entity_name: String,
    pub from_attribute: String,
    pub to_attribute: String,
    pub alias: Option<String>,
    pub kind: JoinKind,
    /// Qualifier of the join this one hangs off, `None` for the root entity
    pub parent: Option<String>,
    /// Select-list items that belong to this entity
    pub columns: Vec<SelectColumn>,
}

impl JoinClause {
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.entity_name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub column: ColumnRef,
    pub direction: SortDirection,
}

/// A parsed `SELECT` statement.
///
/// The select list is split by owner: `columns` holds the root entity's
/// items and each join carries its own.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    /// Comments in front of `SELECT`, delimiters stripped
    pub leading_comments: Vec<String>,
    pub distinct: bool,
    pub columns: Vec<SelectColumn>,
    pub from: TableRef,
    pub joins: Vec<JoinClause>,
    pub where_clause: Option<Expression>,
    pub group_by: Vec<ColumnRef>,
    pub order_by: Vec<OrderItem>,
    pub top: Option<u64>,
}

impl Default for TableRef {
    fn default() -> Self {
        TableRef::new("")
    }
}

impl SelectStatement {
    /// Every select-list item, root first then joins in order.
    pub fn all_columns(&self) -> impl Iterator<Item = &SelectColumn> {
        self.columns
            .iter()
            .chain(self.joins.iter().flat_map(|j| j.columns.iter()))
    }

    /// True when the query aggregates (any aggregate call or a GROUP BY).
    pub fn is_aggregate(&self) -> bool {
        !self.group_by.is_empty() || self.all_columns().any(SelectColumn::is_aggregate)
    }

    pub fn join(&self, qualifier: &str) -> Option<&JoinClause> {
        self.joins.iter().find(|j| j.qualifier() == qualifier)
    }
}
