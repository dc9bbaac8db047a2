use crate::ast::{AggregateFunction, ComparisonOp, LogicalOp};
use crate::value::Value;
use std::fmt;

/// Reference to an attribute, optionally qualified by an entity alias.
///
/// After binding, references to the root entity carry no qualifier and
/// references to joined entities carry the join's alias (or its entity
/// name when the join has no alias).
///
/// # Examples
/// ```text
/// fullname
/// a.name
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub qualifier: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        ColumnRef {
            qualifier: None,
            name: name.into(),
        }
    }

    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        ColumnRef {
            qualifier: Some(qualifier.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}.{}", q, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Argument of an aggregate call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateArgument {
    Column(ColumnRef),
    /// `COUNT(*)`
    Star,
}

/// Aggregate function applied to a column.
///
/// # Examples
/// ```text
/// COUNT(contactid)
/// COUNT(DISTINCT a.name)
/// SUM(revenue)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateCall {
    pub function: AggregateFunction,
    pub argument: AggregateArgument,
    pub distinct: bool,
}

impl AggregateCall {
    /// Name of the attribute the aggregate is computed over. `COUNT(*)`
    /// counts the primary key, which by convention is `<entity>id`.
    pub fn attribute_name(&self, entity_name: &str) -> String {
        match &self.argument {
            AggregateArgument::Column(c) => c.name.clone(),
            AggregateArgument::Star => format!("{}id", entity_name),
        }
    }

    /// Alias used when the query does not name the aggregate column.
    pub fn default_alias(&self, entity_name: &str) -> String {
        format!(
            "{}_{}",
            self.function.as_fetchxml(),
            self.attribute_name(entity_name)
        )
    }
}

/// Boolean expression tree of a WHERE clause.
///
/// Every leaf compares a single column against literal values, which is all
/// a FetchXML `<condition>` can express.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// `column op value`
    ///
    /// # Examples
    /// ```text
    /// statecode = 0
    /// revenue >= 1000.50
    /// ```
    Comparison {
        column: ColumnRef,
        op: ComparisonOp,
        value: Value,
    },

    /// `left AND right`, `left OR right`
    Logical {
        op: LogicalOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// `NOT inner`
    ///
    /// `x NOT LIKE p`, `x NOT IN (...)` and `x NOT BETWEEN a AND b` parse to
    /// a `Not` around the positive predicate.
    Not(Box<Expression>),

    /// `column IS NULL` / `column IS NOT NULL`
    Null { column: ColumnRef, is_null: bool },

    /// `column IN (v1, v2, ...)`
    InList { column: ColumnRef, values: Vec<Value> },

    /// `column BETWEEN low AND high`
    Between {
        column: ColumnRef,
        low: Value,
        high: Value,
    },

    /// `column LIKE 'pattern'`
    Like { column: ColumnRef, pattern: String },
}

impl Expression {
    pub fn and(left: Expression, right: Expression) -> Expression {
        Expression::Logical {
            op: LogicalOp::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Expression, right: Expression) -> Expression {
        Expression::Logical {
            op: LogicalOp::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn negated(inner: Expression) -> Expression {
        Expression::Not(Box::new(inner))
    }

    /// Left-associated chain `e1 op e2 op ... en`; `None` for no operands.
    pub fn chain(op: LogicalOp, operands: Vec<Expression>) -> Option<Expression> {
        operands.into_iter().reduce(|left, right| Expression::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// The column of a leaf predicate; `None` for AND/OR/NOT.
    pub fn column_mut(&mut self) -> Option<&mut ColumnRef> {
        match self {
            Expression::Logical { .. } | Expression::Not(_) => None,
            Expression::Comparison { column, .. }
            | Expression::Null { column, .. }
            | Expression::InList { column, .. }
            | Expression::Between { column, .. }
            | Expression::Like { column, .. } => Some(column),
        }
    }

    /// Columns referenced anywhere in the tree, left to right.
    pub fn columns(&self) -> Vec<&ColumnRef> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a ColumnRef>) {
        match self {
            Expression::Logical { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expression::Not(inner) => inner.collect_columns(out),
            Expression::Comparison { column, .. }
            | Expression::Null { column, .. }
            | Expression::InList { column, .. }
            | Expression::Between { column, .. }
            | Expression::Like { column, .. } => out.push(column),
        }
    }
}
