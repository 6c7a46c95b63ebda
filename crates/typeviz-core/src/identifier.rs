//! Stable identifiers for diagram elements.
//!
//! Every node, row and edge of a rendered diagram carries an identifier that
//! is derived only from type and field names. This lets consumers of the SVG
//! map an element back to the schema, and rebuild an edge identifier from its
//! two endpoints without storing any back references.
//!
//! # Format
//!
//! | Element        | Identifier                          |
//! |----------------|-------------------------------------|
//! | Type           | `TYPE::<type>`                      |
//! | Field row      | `FIELD::<type>::<field>`            |
//! | Possible type  | `POSSIBLE_TYPE::<type>::<possible>` |
//! | Derived type   | `DERIVED_TYPE::<type>::<derived>`   |
//! | Edge           | `<from-id> => <to-id>`              |
//!
//! # Examples
//!
//! ```
//! use typeviz_core::identifier::{EdgeId, ElementId};
//!
//! let edge = EdgeId::new(ElementId::field("Query", "user"), ElementId::type_id("User"));
//! assert_eq!(edge.to_string(), "FIELD::Query::user => TYPE::User");
//!
//! let parsed: EdgeId = "FIELD::Query::user => TYPE::User".parse().unwrap();
//! assert_eq!(parsed, edge);
//! ```

use std::{fmt, str::FromStr};

use thiserror::Error;

const SEPARATOR: &str = "::";
const EDGE_ARROW: &str = " => ";

/// Errors produced when parsing identifiers from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    #[error("unknown identifier prefix in `{0}`")]
    UnknownPrefix(String),

    #[error("malformed identifier `{0}`")]
    Malformed(String),

    #[error("edge identifier `{0}` is missing ` => `")]
    MissingArrow(String),
}

/// Identifier of a single diagram element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementId {
    /// A type node.
    Type(String),
    /// A field row inside the node of `owner`.
    Field { owner: String, field: String },
    /// A possible-type row inside a union or interface node.
    PossibleType { owner: String, target: String },
    /// An implementation row inside an interface node.
    DerivedType { owner: String, target: String },
}

impl ElementId {
    /// Identifier of the node for `name`.
    pub fn type_id(name: impl Into<String>) -> Self {
        Self::Type(name.into())
    }

    /// Identifier of the `field` row of type `owner`.
    pub fn field(owner: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Field {
            owner: owner.into(),
            field: field.into(),
        }
    }

    /// Identifier of the `target` possible-type row of type `owner`.
    pub fn possible_type(owner: impl Into<String>, target: impl Into<String>) -> Self {
        Self::PossibleType {
            owner: owner.into(),
            target: target.into(),
        }
    }

    /// Identifier of the `target` implementation row of interface `owner`.
    pub fn derived_type(owner: impl Into<String>, target: impl Into<String>) -> Self {
        Self::DerivedType {
            owner: owner.into(),
            target: target.into(),
        }
    }

    /// Returns the name of the type whose node contains this element.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Type(name) => name,
            Self::Field { owner, .. }
            | Self::PossibleType { owner, .. }
            | Self::DerivedType { owner, .. } => owner,
        }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(name) => write!(f, "TYPE{SEPARATOR}{name}"),
            Self::Field { owner, field } => write!(f, "FIELD{SEPARATOR}{owner}{SEPARATOR}{field}"),
            Self::PossibleType { owner, target } => {
                write!(f, "POSSIBLE_TYPE{SEPARATOR}{owner}{SEPARATOR}{target}")
            }
            Self::DerivedType { owner, target } => {
                write!(f, "DERIVED_TYPE{SEPARATOR}{owner}{SEPARATOR}{target}")
            }
        }
    }
}

impl FromStr for ElementId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(SEPARATOR).collect();
        if parts.iter().skip(1).any(|part| part.is_empty()) {
            return Err(IdParseError::Malformed(s.to_string()));
        }

        match parts.as_slice() {
            ["TYPE", name] => Ok(Self::type_id(*name)),
            ["FIELD", owner, field] => Ok(Self::field(*owner, *field)),
            ["POSSIBLE_TYPE", owner, target] => Ok(Self::possible_type(*owner, *target)),
            ["DERIVED_TYPE", owner, target] => Ok(Self::derived_type(*owner, *target)),
            ["TYPE" | "FIELD" | "POSSIBLE_TYPE" | "DERIVED_TYPE", ..] => {
                Err(IdParseError::Malformed(s.to_string()))
            }
            _ => Err(IdParseError::UnknownPrefix(s.to_string())),
        }
    }
}

/// Identifier of a directed edge, built from the identifiers of both ends.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeId {
    from: ElementId,
    to: ElementId,
}

impl EdgeId {
    /// Create an edge identifier from its tail element and head element.
    pub fn new(from: ElementId, to: ElementId) -> Self {
        Self { from, to }
    }

    /// Returns the element the edge starts from.
    pub fn tail(&self) -> &ElementId {
        &self.from
    }

    /// Returns the element the edge points to.
    pub fn head(&self) -> &ElementId {
        &self.to
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{EDGE_ARROW}{}", self.from, self.to)
    }
}

impl FromStr for EdgeId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = s
            .split_once(EDGE_ARROW)
            .ok_or_else(|| IdParseError::MissingArrow(s.to_string()))?;
        Ok(Self::new(from.parse()?, to.parse()?))
    }
}

/// Extracts the type name from any textual element or edge identifier.
///
/// For edge identifiers this is the type owning the tail element.
///
/// ```
/// use typeviz_core::identifier::extract_type_name;
///
/// assert_eq!(extract_type_name("FIELD::Query::user => TYPE::User"), Some("Query"));
/// assert_eq!(extract_type_name("TYPE::User"), Some("User"));
/// assert_eq!(extract_type_name("User"), None);
/// ```
pub fn extract_type_name(id: &str) -> Option<&str> {
    id.split(SEPARATOR)
        .nth(1)
        .map(|name| name.split(EDGE_ARROW).next().unwrap_or(name))
        .filter(|name| !name.is_empty())
}
