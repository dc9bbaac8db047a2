//! # FetchXML
//!
//! Both directions of the translation:
//!
//! - **[writer]** - [`SelectStatement`](crate::ast::SelectStatement) to FetchXML markup
//! - **[reader]** - a small element tree read from FetchXML text
//! - **[transpile]** - FetchXML back to a statement, collecting [`Warning`]s
//!   for everything SQL cannot say exactly
//!
//! The wire format is fixed: `fetch > entity > {attribute, all-attributes,
//! order, filter, link-entity}` with the attribute names `top`,
//! `aggregate`, `distinct`, `alias`, `groupby`, `link-type`, `operator`,
//! `entityname` and `descending`.

pub mod reader;
pub mod transpile;
pub mod writer;

pub use transpile::{FetchXmlTranspiler, SqlOptions};
pub use writer::{FetchXmlOptions, FetchXmlWriter};

use serde::Serialize;
use thiserror::Error;

/// Structural problems that stop a FetchXML document from being read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchXmlError {
    /// Not well-formed XML
    #[error("Malformed XML: {0}")]
    Malformed(String),

    /// Input ended with elements still open
    #[error("Malformed XML: element <{0}> is not closed")]
    Unclosed(String),

    /// No root element at all
    #[error("Malformed XML: document is empty")]
    Empty,

    #[error("Expected <fetch> as the root element, found <{0}>")]
    UnexpectedRoot(String),

    #[error("FetchXML has no <entity> element")]
    MissingEntity,

    #[error("<{element}> is missing the required '{attribute}' attribute")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    /// Failure of the XML writer's sink
    #[error("Failed to write FetchXML: {0}")]
    Write(String),
}

impl From<quick_xml::Error> for FetchXmlError {
    fn from(e: quick_xml::Error) -> Self {
        FetchXmlError::Malformed(e.to_string())
    }
}

impl From<std::io::Error> for FetchXmlError {
    fn from(e: std::io::Error) -> Self {
        FetchXmlError::Write(e.to_string())
    }
}

/// A construct that was translated approximately or dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub message: String,
}

impl Warning {
    pub fn new(message: impl Into<String>) -> Self {
        Warning {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of a FetchXML → SQL translation.
///
/// `success` is true whenever SQL text was produced, even if warnings were
/// raised along the way. On failure `error` says why and `sql` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranspileResult {
    pub success: bool,
    pub sql: Option<String>,
    pub error: Option<String>,
    pub warnings: Vec<Warning>,
}

impl TranspileResult {
    pub fn success(sql: String, warnings: Vec<Warning>) -> Self {
        TranspileResult {
            success: true,
            sql: Some(sql),
            error: None,
            warnings,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        TranspileResult {
            success: false,
            sql: None,
            error: Some(error.into()),
            warnings: Vec::new(),
        }
    }
}
