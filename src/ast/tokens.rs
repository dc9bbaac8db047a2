use serde::Serialize;
use std::fmt;

/// Location of a token in the source text.
///
/// `line` and `column` are 1-based and count characters, `offset` is the
/// byte offset of the first character of the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn start() -> Self {
        Position {
            line: 1,
            column: 1,
            offset: 0,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::start()
    }
}

/// Reserved words of the SQL subset.
///
/// Matching is case-insensitive. Aggregate function names are *not*
/// keywords: `count` is a perfectly good column name, it only becomes an
/// aggregate when followed by `(`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Keyword {
    Select,
    Distinct,
    Top,
    From,
    As,
    Join,
    Inner,
    Left,
    Right,
    Full,
    Cross,
    Outer,
    On,
    Where,
    And,
    Or,
    Not,
    Is,
    Null,
    In,
    Between,
    Like,
    Order,
    Group,
    By,
    Asc,
    Desc,
    Having,
    Limit,
    True,
    False,
    Union,
    With,
}

impl Keyword {
    pub fn from_word(word: &str) -> Option<Keyword> {
        let keyword = match word.to_ascii_uppercase().as_str() {
            "SELECT" => Keyword::Select,
            "DISTINCT" => Keyword::Distinct,
            "TOP" => Keyword::Top,
            "FROM" => Keyword::From,
            "AS" => Keyword::As,
            "JOIN" => Keyword::Join,
            "INNER" => Keyword::Inner,
            "LEFT" => Keyword::Left,
            "RIGHT" => Keyword::Right,
            "FULL" => Keyword::Full,
            "CROSS" => Keyword::Cross,
            "OUTER" => Keyword::Outer,
            "ON" => Keyword::On,
            "WHERE" => Keyword::Where,
            "AND" => Keyword::And,
            "OR" => Keyword::Or,
            "NOT" => Keyword::Not,
            "IS" => Keyword::Is,
            "NULL" => Keyword::Null,
            "IN" => Keyword::In,
            "BETWEEN" => Keyword::Between,
            "LIKE" => Keyword::Like,
            "ORDER" => Keyword::Order,
            "GROUP" => Keyword::Group,
            "BY" => Keyword::By,
            "ASC" => Keyword::Asc,
            "DESC" => Keyword::Desc,
            "HAVING" => Keyword::Having,
            "LIMIT" => Keyword::Limit,
            "TRUE" => Keyword::True,
            "FALSE" => Keyword::False,
            "UNION" => Keyword::Union,
            "WITH" => Keyword::With,
            _ => return None,
        };
        Some(keyword)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Select => "SELECT",
            Keyword::Distinct => "DISTINCT",
            Keyword::Top => "TOP",
            Keyword::From => "FROM",
            Keyword::As => "AS",
            Keyword::Join => "JOIN",
            Keyword::Inner => "INNER",
            Keyword::Left => "LEFT",
            Keyword::Right => "RIGHT",
            Keyword::Full => "FULL",
            Keyword::Cross => "CROSS",
            Keyword::Outer => "OUTER",
            Keyword::On => "ON",
            Keyword::Where => "WHERE",
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::Not => "NOT",
            Keyword::Is => "IS",
            Keyword::Null => "NULL",
            Keyword::In => "IN",
            Keyword::Between => "BETWEEN",
            Keyword::Like => "LIKE",
            Keyword::Order => "ORDER",
            Keyword::Group => "GROUP",
            Keyword::By => "BY",
            Keyword::Asc => "ASC",
            Keyword::Desc => "DESC",
            Keyword::Having => "HAVING",
            Keyword::Limit => "LIMIT",
            Keyword::True => "TRUE",
            Keyword::False => "FALSE",
            Keyword::Union => "UNION",
            Keyword::With => "WITH",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a lexical token, carrying the decoded payload where there is one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TokenKind {
    /// Reserved word
    ///
    /// # Examples
    /// ```text
    /// SELECT
    /// order
    /// ```
    Keyword(Keyword),

    /// Entity, column or alias name with quoting removed
    ///
    /// # Examples
    /// ```text
    /// accountid
    /// [first name]
    /// "select"
    /// ```
    Identifier(String),

    /// Unsigned numeric literal, kept as written
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 3.50
    /// ```
    Number(String),

    /// Single-quoted string literal with `''` escapes resolved
    String(String),

    // Operators
    /// `=`
    Eq,
    /// `<>` or `!=`
    NotEq,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    LtEq,
    /// `>=`
    GtEq,
    /// `*`, either a wildcard or `COUNT(*)`
    Star,
    /// `-`, only valid in front of a number
    Minus,

    // Punctuation
    Comma,
    Dot,
    LParen,
    RParen,
    Semicolon,

    /// Line (`--`) or block (`/* */`) comment, body without delimiters
    ///
    /// Comments are trivia: the parser keeps the ones in front of `SELECT`
    /// and skips the rest.
    Comment(String),

    /// Something the lexer could not make sense of
    ///
    /// # Examples
    /// ```text
    /// 'unterminated
    /// #
    /// ```
    Error(String),

    /// End of input
    Eof,
}

/// A token together with its raw source text and position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: Position) -> Self {
        Token {
            kind,
            text: text.into(),
            position,
        }
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    /// Human-readable description used in parse error messages.
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Keyword(k) => format!("keyword {}", k),
            TokenKind::Identifier(name) => format!("identifier '{}'", name),
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::String(s) => format!("string '{}'", s),
            TokenKind::Comment(_) => "comment".to_string(),
            TokenKind::Error(message) => message.clone(),
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", self.text),
        }
    }
}
