//! Type graphs: the part of a schema selected for display.
//!
//! A [`TypeGraph`] holds the named types drawn as nodes, in a stable order,
//! together with the derived-type index used to draw interface
//! implementations. It is built once per schema and [`DisplayOptions`]
//! combination and is immutable afterwards.
//!
//! # Construction
//!
//! [`TypeGraph::from_schema`] walks the schema breadth-first from the root
//! type through field types, possible types, implemented interfaces and
//! implementing types. Only object, interface and union types become nodes;
//! scalars, enums and input objects stay leaves. [`TypeGraph::new`] builds a graph from an explicit
//! list of types instead.

use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};
use serde::Deserialize;
use thiserror::Error;

use crate::schema::{Field, NamedType, Schema, TypeKind, TypeRef};

/// Errors produced while building a [`TypeGraph`] from a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeGraphError {
    #[error("root type `{0}` is not defined in the schema")]
    UnknownRootType(String),

    #[error("type `{name}` referenced by `{referenced_by}` is not defined in the schema")]
    UnknownType { name: String, referenced_by: String },
}

/// Options controlling which parts of a schema are displayed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct DisplayOptions {
    /// Type to start from; the schema's query type when unset.
    pub root_type: Option<String>,
    /// Collapse relay connections into plain lists of their node type.
    pub skip_relay: bool,
    /// Drop deprecated fields.
    pub skip_deprecated: bool,
    /// Sort fields, interfaces and possible types by name.
    pub sort_by_alphabet: bool,
    /// Emit rows for fields whose type is not a node.
    pub show_leaf_fields: bool,
    /// Leave the root type out of the graph.
    pub hide_root: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            root_type: None,
            skip_relay: true,
            skip_deprecated: true,
            sort_by_alphabet: false,
            show_leaf_fields: true,
            hide_root: false,
        }
    }
}

/// The named types selected for display and their relations.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeGraph {
    root_type: String,
    nodes: IndexMap<String, NamedType>,
    derived_types: IndexMap<String, Vec<String>>,
    show_leaf_fields: bool,
}

impl TypeGraph {
    /// Create a type graph from an explicit set of node types.
    ///
    /// Node order follows `types`. The derived-type index is computed from
    /// the interfaces declared by the given types in that same order, so only
    /// implementations present in the graph are recorded.
    pub fn new(
        root_type: impl Into<String>,
        types: impl IntoIterator<Item = NamedType>,
        show_leaf_fields: bool,
    ) -> Self {
        let nodes: IndexMap<String, NamedType> = types
            .into_iter()
            .map(|ty| (ty.name().to_string(), ty))
            .collect();

        let mut derived_types: IndexMap<String, Vec<String>> = IndexMap::new();
        for node in nodes.values() {
            for interface in node.interfaces() {
                if nodes.contains_key(interface) {
                    derived_types
                        .entry(interface.clone())
                        .or_default()
                        .push(node.name().to_string());
                }
            }
        }

        Self {
            root_type: root_type.into(),
            nodes,
            derived_types,
            show_leaf_fields,
        }
    }

    /// Build the type graph reachable from the root type of `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`TypeGraphError::UnknownRootType`] if the root type is not
    /// defined, or [`TypeGraphError::UnknownType`] if a reachable type
    /// references a type that is not defined.
    pub fn from_schema(schema: &Schema, options: &DisplayOptions) -> Result<Self, TypeGraphError> {
        let root = options
            .root_type
            .as_deref()
            .unwrap_or_else(|| schema.query_type());
        if schema.get(root).is_none() {
            return Err(TypeGraphError::UnknownRootType(root.to_string()));
        }

        debug!(
            root,
            skip_relay = options.skip_relay,
            skip_deprecated = options.skip_deprecated;
            "Building type graph"
        );

        let types: IndexMap<&str, NamedType> = schema
            .types()
            .map(|ty| (ty.name(), display_type(schema, ty, options)))
            .collect();

        let mut implementations: IndexMap<&str, Vec<&str>> = IndexMap::new();
        for ty in types.values() {
            for interface in ty.interfaces() {
                implementations
                    .entry(interface.as_str())
                    .or_default()
                    .push(ty.name());
            }
        }

        let mut visited: IndexSet<&str> = IndexSet::new();
        let mut queue = VecDeque::from([root]);
        visited.insert(root);

        while let Some(name) = queue.pop_front() {
            let Some(ty) = types.get(name) else {
                continue;
            };

            let targets = ty
                .fields()
                .iter()
                .map(|field| field.ty().named_type())
                .chain(ty.possible_types().iter().map(String::as_str))
                .chain(ty.interfaces().iter().map(String::as_str))
                .chain(implementations.get(name).into_iter().flatten().copied());

            for target in targets {
                let target_type = types.get(target).ok_or_else(|| TypeGraphError::UnknownType {
                    name: target.to_string(),
                    referenced_by: name.to_string(),
                })?;

                if target_type.kind().is_node_kind() && visited.insert(target) {
                    trace!(from = name, to = target; "Reached type");
                    queue.push_back(target);
                }
            }
        }

        if options.hide_root {
            visited.shift_remove(root);
        }

        // Implementations keep schema declaration order, not visit order.
        let mut derived_types: IndexMap<String, Vec<String>> = IndexMap::new();
        for (interface, implementors) in &implementations {
            if !visited.contains(interface) {
                continue;
            }
            let mut present: Vec<String> = implementors
                .iter()
                .filter(|name| visited.contains(*name))
                .map(|name| name.to_string())
                .collect();
            if options.sort_by_alphabet {
                present.sort();
            }
            if !present.is_empty() {
                derived_types.insert(interface.to_string(), present);
            }
        }

        let nodes: IndexMap<String, NamedType> = visited
            .iter()
            .filter_map(|name| types.get(name).map(|ty| (name.to_string(), ty.clone())))
            .collect();

        debug!(nodes_count = nodes.len(); "Type graph built");

        Ok(Self {
            root_type: root.to_string(),
            nodes,
            derived_types,
            show_leaf_fields: options.show_leaf_fields,
        })
    }

    /// Returns the name of the root type.
    pub fn root_type(&self) -> &str {
        &self.root_type
    }

    /// Returns `true` if `name` is drawn as a node.
    pub fn is_node(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Returns the node type called `name`, if any.
    pub fn node(&self, name: &str) -> Option<&NamedType> {
        self.nodes.get(name)
    }

    /// Iterates over node types in graph order.
    pub fn nodes(&self) -> impl Iterator<Item = &NamedType> {
        self.nodes.values()
    }

    /// Returns the nodes implementing interface `name`, in declaration order.
    pub fn derived_types(&self, name: &str) -> &[String] {
        self.derived_types
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether rows for fields that do not point at a node are emitted.
    pub fn show_leaf_fields(&self) -> bool {
        self.show_leaf_fields
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Apply the field-level display options to a single type.
fn display_type(schema: &Schema, ty: &NamedType, options: &DisplayOptions) -> NamedType {
    let mut ty = ty.clone();

    if options.skip_deprecated {
        ty.fields_mut().retain(|field| !field.is_deprecated());
    }

    if options.skip_relay {
        for field in ty.fields_mut().iter_mut() {
            if let Some(node_type) = relay_node_type(schema, field.ty().named_type()) {
                *field = collapse_relay_field(field, node_type);
            }
        }
    }

    if options.sort_by_alphabet {
        ty.sort_members();
    }

    ty
}

/// Returns the node type of a relay connection type.
///
/// A connection is an object named `*Connection` whose `edges` field points
/// to an object with a `node` field.
fn relay_node_type<'a>(schema: &'a Schema, name: &str) -> Option<&'a str> {
    let connection = schema.get(name)?;
    if connection.kind() != TypeKind::Object || !name.ends_with("Connection") {
        return None;
    }

    let edges = connection.field("edges")?;
    let edge = schema.get(edges.ty().named_type())?;
    let node = edge.field("node")?;
    Some(node.ty().named_type())
}

fn collapse_relay_field(field: &Field, node_type: &str) -> Field {
    let list = TypeRef::named(node_type).list();
    let ty = if field.ty().is_non_null() {
        list.non_null()
    } else {
        list
    };
    field.clone().with_type(ty).with_relay()
}
