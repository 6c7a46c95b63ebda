//! DOT serialization of graph descriptions.
//!
//! The description is translated into a `dot-structures` syntax tree and
//! printed with the graphviz-rust printer. Node and edge identifiers are
//! quoted; node labels are HTML-like tables.

use dot_structures::{
    Attribute, Edge as DotEdge, EdgeTy, Graph, GraphAttributes as DotGraphAttributes, Id,
    Node as DotNode, NodeId, Stmt, Vertex,
};
use graphviz_rust::printer::{DotPrinter, PrinterContext};
use log::debug;

use crate::description::{Edge, GraphDescription, Node};

/// Serialize `description` as a directed DOT graph.
pub fn to_dot(description: &GraphDescription) -> String {
    let graph_attributes = description.graph_attributes();
    let node_defaults = description.node_defaults();

    let mut stmts = vec![
        Stmt::GAttribute(DotGraphAttributes::Graph(vec![
            attribute("rankdir", plain(&graph_attributes.rank_dir)),
            attribute("ranksep", plain(&graph_attributes.rank_separation.to_string())),
        ])),
        Stmt::GAttribute(DotGraphAttributes::Node(vec![
            attribute("fontsize", quoted(&node_defaults.font_size.to_string())),
            attribute("fontname", quoted(&node_defaults.font_name)),
            attribute("shape", plain(&node_defaults.shape)),
        ])),
    ];

    stmts.extend(description.nodes().iter().map(node_stmt));
    stmts.extend(description.edges().iter().map(edge_stmt));

    let graph = Graph::DiGraph {
        id: plain("TypeGraph"),
        strict: false,
        stmts,
    };

    let dot = graph.print(&mut PrinterContext::default());
    debug!(dot_len = dot.len(); "Graph serialized to DOT");
    dot
}

fn node_stmt(node: &Node) -> Stmt {
    Stmt::Node(DotNode {
        id: NodeId(quoted(node.name()), None),
        attributes: vec![
            attribute("id", quoted(&node.id().to_string())),
            attribute("label", Id::Html(format!("<{}>", node.html_label()))),
        ],
    })
}

fn edge_stmt(edge: &Edge) -> Stmt {
    let mut attributes = vec![
        attribute("id", quoted(&edge.id().to_string())),
        attribute("tailport", quoted(edge.tail_port())),
    ];
    if let Some(label) = edge.label() {
        attributes.push(attribute("label", quoted(label)));
    }
    if let Some(style) = edge.style().as_dot() {
        attributes.push(attribute("style", plain(style)));
    }

    Stmt::Edge(DotEdge {
        ty: EdgeTy::Pair(
            Vertex::N(NodeId(quoted(edge.tail()), None)),
            Vertex::N(NodeId(quoted(edge.head()), None)),
        ),
        attributes,
    })
}

fn attribute(key: &str, value: Id) -> Attribute {
    Attribute(plain(key), value)
}

fn plain(value: &str) -> Id {
    Id::Plain(value.to_string())
}

/// A double-quoted DOT string.
fn quoted(value: &str) -> Id {
    Id::Escaped(format!(
        "\"{}\"",
        value.replace('\\', "\\\\").replace('"', "\\\"")
    ))
}
