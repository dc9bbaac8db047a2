//! Name binding and aggregate rules.
//!
//! The parser consults a [`Scope`] for every column reference it reads
//! after the FROM clause; select-list items are bound once the joins are
//! known. Errors are plain messages, the parser attaches the position.

use crate::ast::{ColumnExpr, ColumnRef, JoinClause, Position, SelectColumn, TableRef};
use crate::parser::ParseError;
use std::collections::HashSet;

/// Entity a column reference resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Root,
    /// Index into the statement's joins
    Join(usize),
}

#[derive(Debug)]
struct Source {
    qualifier: String,
}

/// Where the two sides of a join condition ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCondition {
    pub parent: Option<String>,
    pub from_attribute: String,
    pub to_attribute: String,
}

/// Entities visible to column references, root first.
#[derive(Debug)]
pub struct Scope {
    sources: Vec<Source>,
    root_entity: String,
    allow_unqualified: bool,
}

fn ambiguous(name: &str) -> String {
    format!(
        "Ambiguous column reference '{}': qualify it with an entity alias when joins are present",
        name
    )
}

impl Scope {
    pub fn new(from: &TableRef, allow_unqualified: bool) -> Self {
        Scope {
            sources: vec![Source {
                qualifier: from.qualifier().to_string(),
            }],
            root_entity: from.entity_name.clone(),
            allow_unqualified,
        }
    }

    fn entity_name<'a>(&'a self, binding: Binding, joins: &'a [JoinClause]) -> &'a str {
        match binding {
            Binding::Root => &self.root_entity,
            Binding::Join(i) => &joins[i].entity_name,
        }
    }

    pub fn has_joins(&self) -> bool {
        self.sources.len() > 1
    }

    /// Register the next join; its qualifier must not collide with one
    /// already in scope.
    pub fn add_join(&mut self, qualifier: &str) -> Result<usize, String> {
        if let Some(existing) = self.find(qualifier) {
            let what = match existing {
                Binding::Root => "the FROM entity",
                Binding::Join(_) => "an earlier join",
            };
            return Err(format!(
                "Ambiguous table name '{}': already used by {}; give the join a distinct alias",
                qualifier, what
            ));
        }
        self.sources.push(Source {
            qualifier: qualifier.to_string(),
        });
        Ok(self.sources.len() - 2)
    }

    fn find(&self, qualifier: &str) -> Option<Binding> {
        self.sources
            .iter()
            .position(|s| s.qualifier.eq_ignore_ascii_case(qualifier))
            .map(|index| match index {
                0 => Binding::Root,
                n => Binding::Join(n - 1),
            })
    }

    fn qualifier_of(&self, binding: Binding) -> &str {
        match binding {
            Binding::Root => &self.sources[0].qualifier,
            Binding::Join(i) => &self.sources[i + 1].qualifier,
        }
    }

    pub fn resolve(&self, qualifier: Option<&str>) -> Result<Binding, String> {
        match qualifier {
            None => Ok(Binding::Root),
            Some(q) => self
                .find(q)
                .ok_or_else(|| format!("Unknown table alias '{}'", q)),
        }
    }

    /// Resolve a reference and normalize its qualifier: root references lose
    /// theirs, join references get the join's declared spelling.
    pub fn bind(&self, column: ColumnRef) -> Result<(ColumnRef, Binding), String> {
        if column.qualifier.is_none() && !self.allow_unqualified && self.has_joins() {
            return Err(ambiguous(&column.name));
        }
        let binding = self.resolve(column.qualifier.as_deref())?;
        let qualifier = match binding {
            Binding::Root => None,
            Binding::Join(_) => Some(self.qualifier_of(binding).to_string()),
        };
        Ok((
            ColumnRef {
                qualifier,
                name: column.name,
            },
            binding,
        ))
    }

    /// Work out which side of `ON left = right` belongs to the join being
    /// added (always the most recent source) and which to its parent.
    pub fn orient_join(&self, left: &ColumnRef, right: &ColumnRef) -> Result<JoinCondition, String> {
        let joined = &self.sources[self.sources.len() - 1].qualifier;
        let is_joined =
            |c: &ColumnRef| c.qualifier.as_deref().is_some_and(|q| q.eq_ignore_ascii_case(joined));

        let (parent_side, joined_side) = match (is_joined(left), is_joined(right)) {
            (true, true) => {
                return Err(format!("JOIN condition compares '{}' with itself", joined));
            }
            (true, false) => (right, left),
            (false, true) => (left, right),
            (false, false) if left.qualifier.is_none() && right.qualifier.is_none() => (left, right),
            (false, false) => {
                return Err(format!("JOIN condition must reference '{}'", joined));
            }
        };
        if parent_side.qualifier.is_none() && !self.allow_unqualified {
            return Err(ambiguous(&parent_side.name));
        }

        let parent = match self.resolve(parent_side.qualifier.as_deref())? {
            Binding::Root => None,
            binding => Some(self.qualifier_of(binding).to_string()),
        };

        Ok(JoinCondition {
            parent,
            from_attribute: parent_side.name.clone(),
            to_attribute: joined_side.name.clone(),
        })
    }
}

/// A select-list item as parsed, before it is handed to its owner.
#[derive(Debug)]
pub struct PendingColumn {
    pub column: SelectColumn,
    pub position: Position,
}

/// Bind select-list items, check aggregate rules and distribute the items
/// between the root entity and the joins.
pub fn bind_select_list(
    scope: &Scope,
    pending: Vec<PendingColumn>,
    group_by: &[ColumnRef],
    joins: &mut [JoinClause],
) -> Result<Vec<SelectColumn>, ParseError> {
    let mut bound = Vec::with_capacity(pending.len());
    for item in pending {
        let PendingColumn { column, position } = item;
        let (expr, binding) = bind_expr(scope, column.expr).map_err(|m| ParseError::new(m, position))?;
        bound.push((
            SelectColumn {
                expr,
                alias: column.alias,
            },
            binding,
            position,
        ));
    }

    check_grouping(&bound, group_by)?;
    check_aliases(scope, &bound, group_by, joins)?;

    let mut root = Vec::new();
    for (column, binding, _) in bound {
        match binding {
            Binding::Root => root.push(column),
            Binding::Join(i) => joins[i].columns.push(column),
        }
    }
    Ok(root)
}

fn bind_expr(scope: &Scope, expr: ColumnExpr) -> Result<(ColumnExpr, Binding), String> {
    use crate::ast::AggregateArgument;

    match expr {
        ColumnExpr::Column(c) => {
            let (c, binding) = scope.bind(c)?;
            Ok((ColumnExpr::Column(c), binding))
        }
        ColumnExpr::Wildcard(None) => Ok((ColumnExpr::Wildcard(None), Binding::Root)),
        ColumnExpr::Wildcard(Some(q)) => match scope.resolve(Some(&q))? {
            Binding::Root => Ok((ColumnExpr::Wildcard(None), Binding::Root)),
            binding => Ok((
                ColumnExpr::Wildcard(Some(scope.qualifier_of(binding).to_string())),
                binding,
            )),
        },
        ColumnExpr::Aggregate(mut call) => {
            let binding = match call.argument {
                AggregateArgument::Column(c) => {
                    let (c, binding) = scope.bind(c)?;
                    call.argument = AggregateArgument::Column(c);
                    binding
                }
                AggregateArgument::Star => Binding::Root,
            };
            Ok((ColumnExpr::Aggregate(call), binding))
        }
    }
}

/// Raw columns may only be mixed with aggregates when they are grouped.
fn check_grouping(
    bound: &[(SelectColumn, Binding, Position)],
    group_by: &[ColumnRef],
) -> Result<(), ParseError> {
    let has_aggregate = bound.iter().any(|(c, _, _)| c.is_aggregate());
    if !has_aggregate && group_by.is_empty() {
        return Ok(());
    }

    for (column, _, position) in bound {
        match &column.expr {
            ColumnExpr::Aggregate(_) => {}
            ColumnExpr::Wildcard(_) => {
                return Err(ParseError::new(
                    "'*' cannot be combined with aggregate functions or GROUP BY",
                    *position,
                ));
            }
            ColumnExpr::Column(c) if !group_by.contains(c) => {
                return Err(ParseError::new(
                    format!(
                        "Column '{}' must appear in GROUP BY or be used in an aggregate function",
                        c
                    ),
                    *position,
                ));
            }
            ColumnExpr::Column(_) => {}
        }
    }
    Ok(())
}

/// FetchXML addresses aggregate and grouped results by alias, so the
/// aliases the statement ends up with have to be distinct.
fn check_aliases(
    scope: &Scope,
    bound: &[(SelectColumn, Binding, Position)],
    group_by: &[ColumnRef],
    joins: &[JoinClause],
) -> Result<(), ParseError> {
    let aggregate = !group_by.is_empty() || bound.iter().any(|(c, _, _)| c.is_aggregate());
    let selected = |g: &ColumnRef| {
        bound
            .iter()
            .any(|(c, _, _)| matches!(&c.expr, ColumnExpr::Column(s) if s == g))
    };

    // Grouped columns missing from the select list are aliased by name
    let mut seen: HashSet<String> = group_by
        .iter()
        .filter(|g| !selected(g))
        .map(|g| g.name.to_ascii_lowercase())
        .collect();

    for (column, binding, position) in bound {
        let alias = match (&column.expr, &column.alias) {
            (_, Some(alias)) => alias.clone(),
            (ColumnExpr::Aggregate(call), None) => {
                call.default_alias(scope.entity_name(*binding, joins))
            }
            (ColumnExpr::Column(c), None) if aggregate => c.name.clone(),
            _ => continue,
        };
        if !seen.insert(alias.to_ascii_lowercase()) {
            return Err(ParseError::new(
                format!(
                    "Duplicate column alias '{}'; give each column a distinct alias",
                    alias
                ),
                *position,
            ));
        }
    }
    Ok(())
}
