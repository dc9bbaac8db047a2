//! # Abstract Syntax Tree
//!
//! The AST is the shared intermediate representation of both translation
//! directions. SQL text is parsed into a [`SelectStatement`] which the
//! FetchXML writer walks; FetchXML is read back into the same tree which is
//! then printed as SQL.
//!
//! ## Layout
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Column references, aggregates and the WHERE tree
//! - **[operators]** - Comparison, logical, aggregate, join and sort operators
//! - **[query]** - The statement root and its clauses
//!
//! ## Example
//!
//! ```text
//! SELECT TOP 10 c.fullname, a.name AS company
//! FROM contact AS c
//! JOIN account AS a ON c.parentcustomerid = a.accountid
//! WHERE c.statecode = 0 AND (a.name LIKE 'A%' OR a.revenue > 1000)
//! ORDER BY c.fullname DESC
//! ```
//!
//! parses to a statement whose root columns are `[fullname]`, with one
//! inner join to `account` (alias `a`, carrying `name AS company`), a WHERE
//! tree `And(Comparison, Or(Like, Comparison))`, one order item and
//! `top = Some(10)`.
//!
//! ## Invariants
//!
//! Nodes are immutable once built and owned by their statement. Column
//! references are bound: root-entity references have no qualifier, join
//! references carry the join's qualifier.
pub mod tokens;
pub mod expressions;
pub mod operators;
pub mod query;

pub use tokens::{Keyword, Position, Token, TokenKind};
pub use expressions::{AggregateArgument, AggregateCall, ColumnRef, Expression};
pub use operators::{AggregateFunction, ComparisonOp, JoinKind, LogicalOp, SortDirection};
pub use query::{ColumnExpr, JoinClause, OrderItem, SelectColumn, SelectStatement, TableRef};
