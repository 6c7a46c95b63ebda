//! GraphQL schema model.
//!
//! The model only carries what the diagram needs: named types, their kind,
//! fields with wrapped types, implemented interfaces and union members. It is
//! deserialized from JSON; producing that JSON from SDL or an introspection
//! result is left to other tools.
//!
//! # JSON shape
//!
//! ```json
//! {
//!   "queryType": "Query",
//!   "types": [
//!     { "name": "Query", "kind": "OBJECT",
//!       "fields": [{ "name": "user", "type": "User!" }] },
//!     { "name": "User", "kind": "OBJECT", "interfaces": ["Node"],
//!       "fields": [{ "name": "id", "type": "ID!" }] }
//!   ]
//! }
//! ```

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The kind of a named GraphQL type.
///
/// Serialized with the spelling used by GraphQL introspection. Any other
/// spelling fails deserialization, so the set of kinds is closed once a
/// schema has been loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeKind {
    Interface,
    Object,
    Scalar,
    Union,
    Enum,
    InputObject,
}

impl TypeKind {
    /// Returns `true` for kinds drawn as nodes of a type graph.
    pub fn is_node_kind(&self) -> bool {
        matches!(self, Self::Object | Self::Interface | Self::Union)
    }
}

/// Errors produced when parsing a type reference such as `[User!]!`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeRefParseError {
    #[error("empty type reference")]
    Empty,

    #[error("unbalanced list brackets in `{0}`")]
    UnbalancedBrackets(String),

    #[error("invalid type name `{0}`")]
    InvalidName(String),
}

/// A possibly wrapped reference to a named type.
///
/// The textual form follows GraphQL notation and is used for serialization.
///
/// ```
/// use typeviz_core::schema::TypeRef;
///
/// let ty: TypeRef = "[User!]!".parse().unwrap();
/// assert_eq!(ty.named_type(), "User");
/// assert_eq!(ty.wrappers(), ("[".to_string(), "!]!".to_string()));
/// assert_eq!(ty.to_string(), "[User!]!");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    /// A bare reference to `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Wrap this reference in a list.
    pub fn list(self) -> Self {
        Self::List(Box::new(self))
    }

    /// Wrap this reference in a non-null modifier.
    pub fn non_null(self) -> Self {
        Self::NonNull(Box::new(self))
    }

    /// Returns `true` if the outermost modifier is non-null.
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }

    /// Returns the name of the type with all modifiers removed.
    pub fn named_type(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::List(inner) | Self::NonNull(inner) => inner.named_type(),
        }
    }

    /// Returns the text placed before and after the named type.
    ///
    /// For `[User!]!` this is `("[", "!]!")`.
    pub fn wrappers(&self) -> (String, String) {
        match self {
            Self::Named(_) => (String::new(), String::new()),
            Self::List(inner) => {
                let (prefix, suffix) = inner.wrappers();
                (format!("[{prefix}"), format!("{suffix}]"))
            }
            Self::NonNull(inner) => {
                let (prefix, suffix) = inner.wrappers();
                (prefix, format!("{suffix}!"))
            }
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (prefix, suffix) = self.wrappers();
        write!(f, "{prefix}{}{suffix}", self.named_type())
    }
}

impl FromStr for TypeRef {
    type Err = TypeRefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TypeRefParseError::Empty);
        }

        if let Some(inner) = s.strip_suffix('!') {
            let inner: TypeRef = inner.parse()?;
            if inner.is_non_null() {
                return Err(TypeRefParseError::InvalidName(s.to_string()));
            }
            return Ok(inner.non_null());
        }

        match (s.strip_prefix('['), s.ends_with(']')) {
            (Some(rest), true) => {
                let inner = &rest[..rest.len() - 1];
                Ok(inner.parse::<TypeRef>()?.list())
            }
            (Some(_), false) => Err(TypeRefParseError::UnbalancedBrackets(s.to_string())),
            (None, true) => Err(TypeRefParseError::UnbalancedBrackets(s.to_string())),
            (None, false) if is_valid_name(s) => Ok(Self::named(s)),
            (None, false) => Err(TypeRefParseError::InvalidName(s.to_string())),
        }
    }
}

impl TryFrom<String> for TypeRef {
    type Error = TypeRefParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeRef> for String {
    fn from(value: TypeRef) -> Self {
        value.to_string()
    }
}

/// GraphQL names match `[_A-Za-z][_0-9A-Za-z]*`.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// A field of an object, interface or input object type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    #[serde(rename = "type")]
    ty: TypeRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    deprecation_reason: Option<String>,

    #[serde(default)]
    is_relay_field: bool,
}

impl Field {
    /// Create a field named `name` of type `ty`.
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            deprecation_reason: None,
            is_relay_field: false,
        }
    }

    /// Set the description (builder style).
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the field as deprecated (builder style).
    pub fn with_deprecation(mut self, reason: impl Into<String>) -> Self {
        self.deprecation_reason = Some(reason.into());
        self
    }

    /// Mark the field as a collapsed relay connection (builder style).
    pub fn with_relay(mut self) -> Self {
        self.is_relay_field = true;
        self
    }

    /// Replace the field type (builder style).
    pub fn with_type(mut self, ty: TypeRef) -> Self {
        self.ty = ty;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn deprecation_reason(&self) -> Option<&str> {
        self.deprecation_reason.as_deref()
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecation_reason.is_some()
    }

    pub fn is_relay_field(&self) -> bool {
        self.is_relay_field
    }
}

/// A named type of the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedType {
    name: String,

    kind: TypeKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    fields: Vec<Field>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    interfaces: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    possible_types: Vec<String>,
}

impl NamedType {
    /// Create a type with no fields, interfaces or possible types.
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            fields: Vec::new(),
            interfaces: Vec::new(),
            possible_types: Vec::new(),
        }
    }

    /// Set the description (builder style).
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a field (builder style).
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Append an implemented interface (builder style).
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Append a possible type of a union or interface (builder style).
    pub fn with_possible_type(mut self, possible_type: impl Into<String>) -> Self {
        self.possible_types.push(possible_type.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    pub fn possible_types(&self) -> &[String] {
        &self.possible_types
    }

    /// Returns the field called `name`, if any.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub(crate) fn fields_mut(&mut self) -> &mut Vec<Field> {
        &mut self.fields
    }

    pub(crate) fn sort_members(&mut self) {
        self.fields.sort_by(|a, b| a.name.cmp(&b.name));
        self.interfaces.sort();
        self.possible_types.sort();
    }
}

/// Errors produced when assembling a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("type `{0}` is defined multiple times")]
    DuplicateType(String),
}

/// A GraphQL schema: root operation types and every named type.
///
/// Types keep their declaration order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "SchemaDefinition")]
pub struct Schema {
    query_type: String,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
    types: IndexMap<String, NamedType>,
}

impl Schema {
    /// Create a schema rooted at `query_type`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateType`] if two types share a name.
    pub fn new(
        query_type: impl Into<String>,
        types: impl IntoIterator<Item = NamedType>,
    ) -> Result<Self, SchemaError> {
        let mut by_name = IndexMap::new();
        for ty in types {
            let name = ty.name().to_string();
            if by_name.insert(name.clone(), ty).is_some() {
                return Err(SchemaError::DuplicateType(name));
            }
        }

        Ok(Self {
            query_type: query_type.into(),
            mutation_type: None,
            subscription_type: None,
            types: by_name,
        })
    }

    /// Set the mutation root type (builder style).
    pub fn with_mutation_type(mut self, name: impl Into<String>) -> Self {
        self.mutation_type = Some(name.into());
        self
    }

    /// Set the subscription root type (builder style).
    pub fn with_subscription_type(mut self, name: impl Into<String>) -> Self {
        self.subscription_type = Some(name.into());
        self
    }

    pub fn query_type(&self) -> &str {
        &self.query_type
    }

    pub fn mutation_type(&self) -> Option<&str> {
        self.mutation_type.as_deref()
    }

    pub fn subscription_type(&self) -> Option<&str> {
        self.subscription_type.as_deref()
    }

    /// Returns the type called `name`, if any.
    pub fn get(&self, name: &str) -> Option<&NamedType> {
        self.types.get(name)
    }

    /// Iterates over all types in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &NamedType> {
        self.types.values()
    }
}

/// Wire representation of a [`Schema`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaDefinition {
    query_type: String,
    #[serde(default)]
    mutation_type: Option<String>,
    #[serde(default)]
    subscription_type: Option<String>,
    types: Vec<NamedType>,
}

impl TryFrom<SchemaDefinition> for Schema {
    type Error = SchemaError;

    fn try_from(def: SchemaDefinition) -> Result<Self, Self::Error> {
        let mut schema = Schema::new(def.query_type, def.types)?;
        schema.mutation_type = def.mutation_type;
        schema.subscription_type = def.subscription_type;
        Ok(schema)
    }
}
