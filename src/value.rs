use regex::Regex;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::LazyLock;

/// Canonical decimal text: no leading zeros, no exponent, no `+`.
static NUMBER_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?(0|[1-9][0-9]*)(\.[0-9]+)?$").expect("valid regex"));

/// A literal value appearing in a WHERE predicate.
///
/// FetchXML values are untyped text, SQL literals are typed. Numbers are
/// kept as [`Decimal`] so that `10.50` is written back as `10.50` and not
/// as a float approximation.
///
/// # Examples
///
/// ```
/// use fetchxml_sql::Value;
///
/// let price = Value::from_fetchxml("10.50");
/// assert_eq!(price.to_string(), "10.50");
///
/// let name = Value::from_fetchxml("O'Brien");
/// assert_eq!(name.to_string(), "'O''Brien'");
///
/// // Leading zeros are significant text, not a number
/// let zip = Value::from_fetchxml("01234");
/// assert_eq!(zip.to_string(), "'01234'");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Single-quoted text
    String(String),

    /// Exact decimal number
    Number(Decimal),

    /// `TRUE` / `FALSE`
    Boolean(bool),
}

impl Value {
    /// Text placed in a FetchXML `value` attribute or `<value>` element.
    ///
    /// FetchXML values are untyped, so two literals with the same text, such
    /// as `'42'` and `42`, express the same condition.
    pub fn to_fetchxml(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
        }
    }

    /// Best-effort typing of FetchXML value text.
    ///
    /// Canonical decimal text becomes a number, `true`/`false` a boolean and
    /// everything else stays a string. The result always satisfies
    /// `from_fetchxml(text).to_fetchxml() == text`.
    pub fn from_fetchxml(text: &str) -> Value {
        if NUMBER_TEXT.is_match(text) {
            if let Ok(n) = text.parse::<Decimal>() {
                if n.to_string() == text {
                    return Value::Number(n);
                }
            }
        }
        match text {
            "true" => Value::Boolean(true),
            "false" => Value::Boolean(false),
            _ => Value::String(text.to_string()),
        }
    }
}

/// SQL literal syntax.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(true) => f.write_str("TRUE"),
            Value::Boolean(false) => f.write_str("FALSE"),
        }
    }
}
