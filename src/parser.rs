use crate::{
    ast::{
        AggregateArgument, AggregateCall, AggregateFunction, ColumnExpr, ColumnRef, ComparisonOp,
        Expression, JoinClause, JoinKind, Keyword, OrderItem, Position, SelectColumn,
        SelectStatement, SortDirection, TableRef, Token, TokenKind,
    },
    diagnostics::{DEFAULT_CONTEXT_WIDTH, ErrorContext},
    lexer::Lexer,
    semantic::{self, PendingColumn, Scope},
    value::Value,
};
use rust_decimal::Decimal;
use std::mem;
use thiserror::Error;

/// A grammar or binding error, addressed by 1-based line and column.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        ParseError {
            message: message.into(),
            line: position.line,
            column: position.column,
        }
    }

    /// Diagnostic window of [`DEFAULT_CONTEXT_WIDTH`] characters around the
    /// failing position.
    pub fn context(&self, source: &str) -> ErrorContext {
        self.context_with_width(source, DEFAULT_CONTEXT_WIDTH)
    }

    pub fn context_with_width(&self, source: &str, width: usize) -> ErrorContext {
        ErrorContext::new(&self.message, source, self.line, self.column, width)
    }
}

/// Parser settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Bind unqualified column references to the FROM entity while joins
    /// are in scope instead of rejecting them as ambiguous.
    pub allow_unqualified_columns: bool,
}

/// Recursive-descent parser for the SELECT subset.
///
/// Pulls tokens from the lexer one at a time. Comments are skipped, except
/// those in front of `SELECT` which end up in
/// [`SelectStatement::leading_comments`].
pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    options: ParseOptions,
    comments: Vec<String>,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Result<Self, ParseError> {
        Self::with_options(lexer, ParseOptions::default())
    }

    pub fn with_options(lexer: Lexer, options: ParseOptions) -> Result<Self, ParseError> {
        let mut parser = Parser {
            lexer,
            current_token: Token::new(TokenKind::Eof, "", Position::start()),
            options,
            comments: Vec::new(),
        };
        parser.advance()?;
        Ok(parser)
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        loop {
            let token = self.lexer.next_token();
            match token.kind {
                TokenKind::Comment(body) => self.comments.push(body),
                TokenKind::Error(message) => return Err(ParseError::new(message, token.position)),
                _ => {
                    self.current_token = token;
                    return Ok(());
                }
            }
        }
    }

    fn position(&self) -> Position {
        self.current_token.position
    }

    fn check(&self, kind: &TokenKind) -> bool {
        mem::discriminant(&self.current_token.kind) == mem::discriminant(kind)
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.current_token.is_keyword(keyword)
    }

    /// Consume the keyword if it is next.
    fn eat_keyword(&mut self, keyword: Keyword) -> Result<bool, ParseError> {
        if self.check_keyword(keyword) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> Result<bool, ParseError> {
        if self.check(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.position())
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        self.error_here(format!(
            "Expected {}, found {}",
            expected,
            self.current_token.describe()
        ))
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<(), ParseError> {
        if !self.check(&kind) {
            return Err(self.unexpected(expected));
        }
        self.advance()
    }

    fn expect_keyword(&mut self, keyword: Keyword, expected: &str) -> Result<(), ParseError> {
        if !self.check_keyword(keyword) {
            return Err(self.unexpected(expected));
        }
        self.advance()
    }

    fn expect_identifier(&mut self, expected: &str) -> Result<String, ParseError> {
        match mem::replace(&mut self.current_token.kind, TokenKind::Eof) {
            TokenKind::Identifier(name) => {
                self.advance()?;
                Ok(name)
            }
            kind => {
                self.current_token.kind = kind;
                Err(self.unexpected(expected))
            }
        }
    }

    /// Parse a complete statement; trailing tokens are an error.
    pub fn parse_statement(&mut self) -> Result<SelectStatement, ParseError> {
        if self.check_keyword(Keyword::With) {
            return Err(self.error_here("Common table expressions (WITH) are not supported"));
        }
        let leading_comments = mem::take(&mut self.comments);
        self.expect_keyword(Keyword::Select, "SELECT")?;

        let distinct = self.eat_keyword(Keyword::Distinct)?;
        let mut top = if self.eat_keyword(Keyword::Top)? {
            Some(self.parse_row_count("TOP")?)
        } else {
            None
        };

        let pending = self.parse_select_list()?;
        let aliases: Vec<String> = pending
            .iter()
            .filter_map(|p| p.column.alias.clone())
            .collect();

        self.expect_keyword(Keyword::From, "FROM")?;
        let from = self.parse_table_ref()?;
        let mut scope = Scope::new(&from, self.options.allow_unqualified_columns);

        let mut joins = Vec::new();
        while let Some(kind) = self.parse_join_kind()? {
            joins.push(self.parse_join(kind, &mut scope)?);
        }

        let where_clause = if self.eat_keyword(Keyword::Where)? {
            Some(self.parse_expression(&scope)?)
        } else {
            None
        };

        let group_by = if self.eat_keyword(Keyword::Group)? {
            self.expect_keyword(Keyword::By, "BY after GROUP")?;
            self.parse_group_by(&scope)?
        } else {
            Vec::new()
        };
        if self.check_keyword(Keyword::Having) {
            return Err(self.error_here("HAVING is not supported"));
        }

        let order_by = if self.eat_keyword(Keyword::Order)? {
            self.expect_keyword(Keyword::By, "BY after ORDER")?;
            self.parse_order_by(&scope, &aliases)?
        } else {
            Vec::new()
        };

        if self.check_keyword(Keyword::Limit) {
            let position = self.position();
            self.advance()?;
            let limit = self.parse_row_count("LIMIT")?;
            if top.is_some() {
                return Err(ParseError::new("TOP and LIMIT cannot both be specified", position));
            }
            top = Some(limit);
        }

        self.eat(&TokenKind::Semicolon)?;
        match &self.current_token.kind {
            TokenKind::Eof => {}
            TokenKind::Keyword(Keyword::Union) => {
                return Err(self.error_here("Set operations (UNION) are not supported"));
            }
            _ => {
                return Err(self.error_here(format!(
                    "Unexpected {} after end of statement",
                    self.current_token.describe()
                )));
            }
        }

        let columns = semantic::bind_select_list(&scope, pending, &group_by, &mut joins)?;

        let statement = SelectStatement {
            leading_comments,
            distinct,
            columns,
            from,
            joins,
            where_clause,
            group_by,
            order_by,
            top,
        };
        tracing::debug!(
            entity = %statement.from.entity_name,
            joins = statement.joins.len(),
            "parsed SELECT statement"
        );
        Ok(statement)
    }

    fn parse_row_count(&mut self, clause: &str) -> Result<u64, ParseError> {
        let parenthesized = self.eat(&TokenKind::LParen)?;
        let count = match &self.current_token.kind {
            TokenKind::Number(text) => text.parse::<u64>().map_err(|_| {
                self.error_here(format!("{} expects a non-negative integer, found {}", clause, text))
            })?,
            _ => return Err(self.unexpected(&format!("row count after {}", clause))),
        };
        self.advance()?;
        if parenthesized {
            self.expect(TokenKind::RParen, &format!("')' to close {}", clause))?;
        }
        Ok(count)
    }

    fn parse_select_list(&mut self) -> Result<Vec<PendingColumn>, ParseError> {
        if !matches!(
            self.current_token.kind,
            TokenKind::Identifier(_) | TokenKind::Star
        ) {
            return Err(self.unexpected("column list after SELECT"));
        }

        let mut columns = vec![self.parse_select_item()?];
        while self.eat(&TokenKind::Comma)? {
            columns.push(self.parse_select_item()?);
        }
        Ok(columns)
    }

    fn parse_select_item(&mut self) -> Result<PendingColumn, ParseError> {
        let position = self.position();

        let expr = if self.eat(&TokenKind::Star)? {
            ColumnExpr::Wildcard(None)
        } else {
            let name = self.expect_identifier("column name")?;

            if self.check(&TokenKind::LParen) {
                match AggregateFunction::from_name(&name) {
                    Some(function) => ColumnExpr::Aggregate(self.parse_aggregate(function)?),
                    None => {
                        return Err(ParseError::new(
                            format!(
                                "Unsupported function '{}'; only COUNT, SUM, AVG, MIN and MAX are supported",
                                name
                            ),
                            position,
                        ));
                    }
                }
            } else if self.eat(&TokenKind::Dot)? {
                if self.eat(&TokenKind::Star)? {
                    ColumnExpr::Wildcard(Some(name))
                } else {
                    let column = self.expect_identifier("column name after '.'")?;
                    ColumnExpr::Column(ColumnRef::qualified(name, column))
                }
            } else {
                ColumnExpr::Column(ColumnRef::new(name))
            }
        };

        let alias = self.parse_optional_alias()?;
        if alias.is_some() && matches!(expr, ColumnExpr::Wildcard(_)) {
            return Err(ParseError::new("A wildcard cannot have an alias", position));
        }

        Ok(PendingColumn {
            column: SelectColumn { expr, alias },
            position,
        })
    }

    fn parse_aggregate(&mut self, function: AggregateFunction) -> Result<AggregateCall, ParseError> {
        self.advance()?; // (
        let distinct = self.eat_keyword(Keyword::Distinct)?;

        let argument = if self.check(&TokenKind::Star) {
            if function != AggregateFunction::Count || distinct {
                return Err(self.error_here(format!(
                    "'*' is only valid in COUNT(*), not in {}({}*)",
                    function,
                    if distinct { "DISTINCT " } else { "" }
                )));
            }
            self.advance()?;
            AggregateArgument::Star
        } else {
            AggregateArgument::Column(self.parse_column_ref()?)
        };

        self.expect(
            TokenKind::RParen,
            &format!("')' to close {}", function),
        )?;
        Ok(AggregateCall {
            function,
            argument,
            distinct,
        })
    }

    /// `AS name` or a bare identifier directly after the item.
    fn parse_optional_alias(&mut self) -> Result<Option<String>, ParseError> {
        if self.eat_keyword(Keyword::As)? {
            return self.expect_identifier("alias after AS").map(Some);
        }
        if let TokenKind::Identifier(_) = self.current_token.kind {
            return self.expect_identifier("alias").map(Some);
        }
        Ok(None)
    }

    fn parse_column_ref(&mut self) -> Result<ColumnRef, ParseError> {
        let first = self.expect_identifier("column name")?;
        if self.eat(&TokenKind::Dot)? {
            let name = self.expect_identifier("column name after '.'")?;
            Ok(ColumnRef::qualified(first, name))
        } else {
            Ok(ColumnRef::new(first))
        }
    }

    /// Column reference resolved against the scope, errors at its start.
    fn parse_bound_column(&mut self, scope: &Scope) -> Result<ColumnRef, ParseError> {
        let position = self.position();
        let column = self.parse_column_ref()?;
        scope
            .bind(column)
            .map(|(column, _)| column)
            .map_err(|message| ParseError::new(message, position))
    }

    fn parse_table_ref(&mut self) -> Result<TableRef, ParseError> {
        if self.check(&TokenKind::LParen) {
            return Err(self.error_here("Subqueries are not supported"));
        }
        let entity_name = self.expect_identifier("entity name")?;
        if self.check(&TokenKind::Dot) {
            return Err(self.error_here("Schema-qualified entity names are not supported"));
        }
        let alias = self.parse_optional_alias()?;
        Ok(TableRef { entity_name, alias })
    }

    /// Recognise the start of a join clause and consume up to `JOIN`.
    fn parse_join_kind(&mut self) -> Result<Option<JoinKind>, ParseError> {
        let kind = match &self.current_token.kind {
            TokenKind::Keyword(Keyword::Join) => {
                self.advance()?;
                return Ok(Some(JoinKind::Inner));
            }
            TokenKind::Keyword(Keyword::Inner) => JoinKind::Inner,
            TokenKind::Keyword(Keyword::Left) => {
                self.advance()?;
                self.eat_keyword(Keyword::Outer)?;
                self.expect_keyword(Keyword::Join, "JOIN after LEFT")?;
                return Ok(Some(JoinKind::Outer));
            }
            TokenKind::Keyword(kw @ (Keyword::Right | Keyword::Full | Keyword::Cross)) => {
                return Err(self.error_here(format!("{} JOIN is not supported", kw)));
            }
            _ => return Ok(None),
        };
        self.advance()?;
        self.expect_keyword(Keyword::Join, "JOIN after INNER")?;
        Ok(Some(kind))
    }

    fn parse_join(&mut self, kind: JoinKind, scope: &mut Scope) -> Result<JoinClause, ParseError> {
        let entity_position = self.position();
        let entity_name = self.expect_identifier("entity name after JOIN")?;
        let alias = self.parse_optional_alias()?;
        let qualifier = alias.as_deref().unwrap_or(&entity_name);
        scope
            .add_join(qualifier)
            .map_err(|message| ParseError::new(message, entity_position))?;

        self.expect_keyword(Keyword::On, "ON after joined entity")?;
        let condition_position = self.position();
        let left = self.parse_column_ref()?;
        if !self.check(&TokenKind::Eq) {
            return Err(self.unexpected("'=' in JOIN condition"));
        }
        self.advance()?;
        let right = self.parse_column_ref()?;
        if self.check_keyword(Keyword::And) || self.check_keyword(Keyword::Or) {
            return Err(self.error_here("JOIN conditions must be a single column equality"));
        }

        let condition = scope
            .orient_join(&left, &right)
            .map_err(|message| ParseError::new(message, condition_position))?;

        Ok(JoinClause {
            entity_name,
            from_attribute: condition.from_attribute,
            to_attribute: condition.to_attribute,
            alias,
            kind,
            parent: condition.parent,
            columns: Vec::new(),
        })
    }

    fn parse_group_by(&mut self, scope: &Scope) -> Result<Vec<ColumnRef>, ParseError> {
        let mut columns = vec![self.parse_bound_column(scope)?];
        while self.eat(&TokenKind::Comma)? {
            columns.push(self.parse_bound_column(scope)?);
        }
        Ok(columns)
    }

    fn parse_order_by(&mut self, scope: &Scope, aliases: &[String]) -> Result<Vec<OrderItem>, ParseError> {
        let mut items = Vec::new();
        loop {
            let position = self.position();
            let column = self.parse_column_ref()?;
            // ORDER BY may name a select-list alias
            let is_alias = column.qualifier.is_none() && aliases.iter().any(|a| *a == column.name);
            let column = if is_alias {
                column
            } else {
                scope
                    .bind(column)
                    .map(|(column, _)| column)
                    .map_err(|message| ParseError::new(message, position))?
            };

            let direction = if self.eat_keyword(Keyword::Desc)? {
                SortDirection::Desc
            } else {
                self.eat_keyword(Keyword::Asc)?;
                SortDirection::Asc
            };
            items.push(OrderItem { column, direction });

            if !self.eat(&TokenKind::Comma)? {
                break;
            }
        }
        Ok(items)
    }
}

impl Parser {
    /// Parse a WHERE expression.
    ///
    /// Precedence from loosest to tightest: `OR`, `AND`, `NOT`, predicates.
    pub fn parse_expression(&mut self, scope: &Scope) -> Result<Expression, ParseError> {
        self.parse_or(scope)
    }

    fn parse_or(&mut self, scope: &Scope) -> Result<Expression, ParseError> {
        let mut left = self.parse_and(scope)?;
        while self.eat_keyword(Keyword::Or)? {
            let right = self.parse_and(scope)?;
            left = Expression::or(left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self, scope: &Scope) -> Result<Expression, ParseError> {
        let mut left = self.parse_not(scope)?;
        while self.eat_keyword(Keyword::And)? {
            let right = self.parse_not(scope)?;
            left = Expression::and(left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self, scope: &Scope) -> Result<Expression, ParseError> {
        if self.eat_keyword(Keyword::Not)? {
            let inner = self.parse_not(scope)?;
            return Ok(Expression::negated(inner));
        }
        self.parse_predicate(scope)
    }

    fn parse_predicate(&mut self, scope: &Scope) -> Result<Expression, ParseError> {
        if self.eat(&TokenKind::LParen)? {
            if self.check_keyword(Keyword::Select) {
                return Err(self.error_here("Subqueries are not supported"));
            }
            let inner = self.parse_expression(scope)?;
            self.expect(TokenKind::RParen, "')' to close parenthesized expression")?;
            return Ok(inner);
        }

        if self.starts_literal() {
            // `5 < revenue` is `revenue > 5`
            let value = self.parse_value()?;
            let op = match self.comparison_op() {
                Some(op) => op,
                None => return Err(self.unexpected("comparison operator after literal")),
            };
            self.advance()?;
            let column = self.parse_bound_column(scope)?;
            return Ok(Expression::Comparison {
                column,
                op: op.flip(),
                value,
            });
        }

        if !matches!(self.current_token.kind, TokenKind::Identifier(_)) {
            return Err(self.unexpected("condition"));
        }
        let column = self.parse_bound_column(scope)?;

        if let Some(op) = self.comparison_op() {
            self.advance()?;
            if self.check_keyword(Keyword::Null) {
                return Err(self.error_here("Use IS NULL or IS NOT NULL to compare with NULL"));
            }
            if matches!(self.current_token.kind, TokenKind::Identifier(_)) {
                return Err(self.error_here("Comparisons between two columns are not supported"));
            }
            let value = self.parse_value()?;
            return Ok(Expression::Comparison { column, op, value });
        }

        match &self.current_token.kind {
            TokenKind::Keyword(Keyword::Is) => {
                self.advance()?;
                let negated = self.eat_keyword(Keyword::Not)?;
                self.expect_keyword(Keyword::Null, "NULL after IS")?;
                Ok(Expression::Null {
                    column,
                    is_null: !negated,
                })
            }
            TokenKind::Keyword(Keyword::Not) => {
                self.advance()?;
                if !matches!(
                    self.current_token.kind,
                    TokenKind::Keyword(Keyword::Like | Keyword::In | Keyword::Between)
                ) {
                    return Err(self.unexpected("LIKE, IN or BETWEEN after NOT"));
                }
                let inner = self.parse_column_predicate(column)?;
                Ok(Expression::negated(inner))
            }
            TokenKind::Keyword(Keyword::Like | Keyword::In | Keyword::Between) => {
                self.parse_column_predicate(column)
            }
            _ => Err(self.unexpected(&format!("comparison operator after column '{}'", column))),
        }
    }

    /// `LIKE`, `IN` or `BETWEEN` with the column already consumed.
    fn parse_column_predicate(&mut self, column: ColumnRef) -> Result<Expression, ParseError> {
        if self.eat_keyword(Keyword::Like)? {
            let pattern = match mem::replace(&mut self.current_token.kind, TokenKind::Eof) {
                TokenKind::String(s) => s,
                kind => {
                    self.current_token.kind = kind;
                    return Err(self.unexpected("string pattern after LIKE"));
                }
            };
            self.advance()?;
            return Ok(Expression::Like { column, pattern });
        }

        if self.eat_keyword(Keyword::In)? {
            self.expect(TokenKind::LParen, "'(' after IN")?;
            if self.check_keyword(Keyword::Select) {
                return Err(self.error_here("Subqueries are not supported"));
            }
            let mut values = vec![self.parse_value()?];
            while self.eat(&TokenKind::Comma)? {
                values.push(self.parse_value()?);
            }
            self.expect(TokenKind::RParen, "')' to close IN list")?;
            return Ok(Expression::InList { column, values });
        }

        self.expect_keyword(Keyword::Between, "BETWEEN")?;
        let low = self.parse_value()?;
        self.expect_keyword(Keyword::And, "AND between BETWEEN bounds")?;
        let high = self.parse_value()?;
        Ok(Expression::Between { column, low, high })
    }

    fn comparison_op(&self) -> Option<ComparisonOp> {
        match self.current_token.kind {
            TokenKind::Eq => Some(ComparisonOp::Eq),
            TokenKind::NotEq => Some(ComparisonOp::Ne),
            TokenKind::Lt => Some(ComparisonOp::Lt),
            TokenKind::LtEq => Some(ComparisonOp::Le),
            TokenKind::Gt => Some(ComparisonOp::Gt),
            TokenKind::GtEq => Some(ComparisonOp::Ge),
            _ => None,
        }
    }

    fn starts_literal(&self) -> bool {
        matches!(
            self.current_token.kind,
            TokenKind::Number(_)
                | TokenKind::String(_)
                | TokenKind::Minus
                | TokenKind::Keyword(Keyword::True | Keyword::False)
        )
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        let position = self.position();
        let negative = self.eat(&TokenKind::Minus)?;

        let value = match &self.current_token.kind {
            TokenKind::Number(text) => {
                let text = if negative { format!("-{}", text) } else { text.clone() };
                let number = text.parse::<Decimal>().map_err(|_| {
                    ParseError::new(format!("Numeric literal {} is out of range", text), position)
                })?;
                Value::Number(number)
            }
            _ if negative => return Err(self.unexpected("number after '-'")),
            TokenKind::String(s) => Value::String(s.clone()),
            TokenKind::Keyword(Keyword::True) => Value::Boolean(true),
            TokenKind::Keyword(Keyword::False) => Value::Boolean(false),
            TokenKind::Keyword(Keyword::Null) => {
                return Err(self.error_here("NULL is not allowed here; use IS NULL or IS NOT NULL"));
            }
            _ => return Err(self.unexpected("literal value")),
        };
        self.advance()?;
        Ok(value)
    }
}
