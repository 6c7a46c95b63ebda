//! Renderer-neutral graph description.
//!
//! A [`GraphDescription`] is what the compiler produces from a type graph:
//! nodes with an identifier and an HTML-like label, directed edges with an
//! identifier, a tail port and a line style, and the graph-wide attributes a
//! layout engine needs. [`crate::dot`] turns it into DOT text.

use std::fmt;

use typeviz_core::identifier::{EdgeId, ElementId};

/// Line style of an edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EdgeStyle {
    /// Field reference.
    #[default]
    Solid,
    /// Possible type of a union or interface.
    Dashed,
    /// Implementation of an interface.
    Dotted,
}

impl EdgeStyle {
    /// Returns the DOT style keyword, or `None` for the renderer default.
    pub fn as_dot(&self) -> Option<&'static str> {
        match self {
            Self::Solid => None,
            Self::Dashed => Some("dashed"),
            Self::Dotted => Some("dotted"),
        }
    }
}

impl fmt::Display for EdgeStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Solid => write!(f, "solid"),
            Self::Dashed => write!(f, "dashed"),
            Self::Dotted => write!(f, "dotted"),
        }
    }
}

/// A node box for one named type.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    name: String,
    id: ElementId,
    html_label: String,
}

impl Node {
    pub fn new(name: impl Into<String>, id: ElementId, html_label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id,
            html_label: html_label.into(),
        }
    }

    /// Returns the node name, which is the type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> &ElementId {
        &self.id
    }

    /// Returns the HTML-like table used as the node label.
    pub fn html_label(&self) -> &str {
        &self.html_label
    }
}

/// A directed edge between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    tail: String,
    head: String,
    id: EdgeId,
    tail_port: String,
    label: Option<String>,
    style: EdgeStyle,
}

impl Edge {
    pub fn new(
        tail: impl Into<String>,
        head: impl Into<String>,
        id: EdgeId,
        tail_port: impl Into<String>,
    ) -> Self {
        Self {
            tail: tail.into(),
            head: head.into(),
            id,
            tail_port: tail_port.into(),
            label: None,
            style: EdgeStyle::default(),
        }
    }

    /// Set the edge label (builder style).
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the edge style (builder style).
    pub fn with_style(mut self, style: EdgeStyle) -> Self {
        self.style = style;
        self
    }

    pub fn tail(&self) -> &str {
        &self.tail
    }

    pub fn head(&self) -> &str {
        &self.head
    }

    pub fn id(&self) -> &EdgeId {
        &self.id
    }

    /// Returns the port of the tail node row the edge leaves from.
    pub fn tail_port(&self) -> &str {
        &self.tail_port
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn style(&self) -> EdgeStyle {
        self.style
    }
}

/// Graph-wide layout attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphAttributes {
    /// Rank direction; `LR` lays the hierarchy out left to right.
    pub rank_dir: String,
    /// Separation between ranks, in inches.
    pub rank_separation: f32,
}

/// Attributes applied to every node unless overridden.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDefaults {
    pub shape: String,
    pub font_name: String,
    pub font_size: u32,
}

/// The complete description of a directed graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphDescription {
    graph_attributes: GraphAttributes,
    node_defaults: NodeDefaults,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl GraphDescription {
    pub fn new(graph_attributes: GraphAttributes, node_defaults: NodeDefaults) -> Self {
        Self {
            graph_attributes,
            node_defaults,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub(crate) fn push_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub(crate) fn push_edges(&mut self, edges: impl IntoIterator<Item = Edge>) {
        self.edges.extend(edges);
    }

    pub fn graph_attributes(&self) -> &GraphAttributes {
        &self.graph_attributes
    }

    pub fn node_defaults(&self) -> &NodeDefaults {
        &self.node_defaults
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Returns the node called `name`, if any.
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.name == name)
    }

    /// Iterates over the edges going from `tail` to `head`.
    pub fn edges_between<'a>(
        &'a self,
        tail: &'a str,
        head: &'a str,
    ) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges
            .iter()
            .filter(move |edge| edge.tail == tail && edge.head == head)
    }

    /// Returns the edge endpoints that do not name a node.
    ///
    /// Empty for every description produced by the compiler.
    pub fn dangling_endpoints(&self) -> Vec<&str> {
        self.edges
            .iter()
            .flat_map(|edge| [edge.tail.as_str(), edge.head.as_str()])
            .filter(|name| self.node(name).is_none())
            .collect()
    }
}
