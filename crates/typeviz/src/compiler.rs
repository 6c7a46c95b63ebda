//! Compiles a [`TypeGraph`] into a [`GraphDescription`].
//!
//! Every node type becomes one node whose label is an HTML-like table: a
//! title row with the type name and kind tag, one row per displayed field,
//! then the possible types and the implementations of the type. Rows that
//! point at another node also produce an edge leaving from the row's port.
//!
//! | Relation       | Edge style | Edge identifier                          |
//! |----------------|------------|------------------------------------------|
//! | Field          | solid      | `FIELD::<type>::<field> => TYPE::<target>` |
//! | Possible type  | dashed     | `POSSIBLE_TYPE::<type>::<target> => TYPE::<target>` |
//! | Implementation | dotted     | `DERIVED_TYPE::<type>::<target> => TYPE::<target>` |

use std::fmt::Write;

use log::{debug, trace};

use typeviz_core::{
    TypeGraph,
    identifier::{EdgeId, ElementId},
    schema::{Field, NamedType, TypeKind},
};

use crate::{
    config::LayoutConfig,
    description::{Edge, EdgeStyle, GraphAttributes, GraphDescription, Node, NodeDefaults},
};

/// Compile `graph` with the default layout settings.
pub fn compile(graph: &TypeGraph) -> GraphDescription {
    Compiler::new(&LayoutConfig::default()).compile(graph)
}

/// Graph compiler parameterized by layout settings.
#[derive(Debug, Clone)]
pub struct Compiler {
    layout: LayoutConfig,
}

impl Compiler {
    /// Create a compiler using the given layout settings.
    pub fn new(layout: &LayoutConfig) -> Self {
        Self {
            layout: layout.clone(),
        }
    }

    /// Compile `graph` into a graph description.
    ///
    /// Nodes follow the order of the type graph; fields, possible types and
    /// implementations follow their declaration order.
    pub fn compile(&self, graph: &TypeGraph) -> GraphDescription {
        let mut description = GraphDescription::new(
            GraphAttributes {
                rank_dir: "LR".to_string(),
                rank_separation: self.layout.rank_separation(),
            },
            NodeDefaults {
                shape: "plaintext".to_string(),
                font_name: self.layout.font_name().to_string(),
                font_size: self.layout.font_size(),
            },
        );

        for ty in graph.nodes() {
            let mut edges = Vec::new();

            let fields = field_rows(graph, ty, &mut edges);

            let possible_types = related_rows(
                graph,
                ty,
                ty.possible_types(),
                |owner, target| ElementId::possible_type(owner, target),
                EdgeStyle::Dashed,
                &mut edges,
            );

            let derived_types = related_rows(
                graph,
                ty,
                graph.derived_types(ty.name()),
                |owner, target| ElementId::derived_type(owner, target),
                EdgeStyle::Dotted,
                &mut edges,
            );

            let mut html = String::from(
                r#"<TABLE ALIGN="LEFT" BORDER="0" CELLBORDER="1" CELLSPACING="0" CELLPADDING="5">"#,
            );
            html.push_str(&title_row(ty));
            html.push_str(&fields);
            if !possible_types.is_empty() {
                html.push_str("<TR><TD>possible types</TD></TR>");
                html.push_str(&possible_types);
            }
            if !derived_types.is_empty() {
                html.push_str("<TR><TD>implementations</TD></TR>");
                html.push_str(&derived_types);
            }
            html.push_str("</TABLE>");

            trace!(node = ty.name(), edges_count = edges.len(); "Compiled node");

            description.push_node(Node::new(ty.name(), ElementId::type_id(ty.name()), html));
            description.push_edges(edges);
        }

        debug!(
            nodes_count = description.nodes().len(),
            edges_count = description.edges().len();
            "Graph compiled"
        );

        description
    }
}

/// Returns the kind shown under the type name, or `None` for objects.
fn kind_tag(kind: TypeKind) -> Option<&'static str> {
    match kind {
        TypeKind::Object => None,
        TypeKind::Interface => Some("interface"),
        TypeKind::Scalar => Some("scalar"),
        TypeKind::Union => Some("union"),
        // Enums share the union tag.
        TypeKind::Enum => Some("union"),
        TypeKind::InputObject => Some("input_object"),
    }
}

fn title_row(ty: &NamedType) -> String {
    let kind_label = kind_tag(ty.kind())
        .map(|tag| format!("&lt;&lt;{tag}&gt;&gt;"))
        .unwrap_or_default();

    format!(
        r#"<TR><TD CELLPADDING="4" {}><FONT POINT-SIZE="18">{}</FONT><BR/>{kind_label}</TD></TR>"#,
        html_id(&format!("TYPE_TITLE::{}", ty.name())),
        ty.name(),
    )
}

fn field_rows(graph: &TypeGraph, ty: &NamedType, edges: &mut Vec<Edge>) -> String {
    let mut rows = String::new();

    for field in ty.fields() {
        let target = field.ty().named_type();
        let id = ElementId::field(ty.name(), field.name());

        if graph.is_node(target) {
            let edge_id = EdgeId::new(id.clone(), ElementId::type_id(target));
            edges.push(
                Edge::new(ty.name(), target, edge_id, field.name())
                    .with_label(format!("{}:{}", ty.name(), field.name())),
            );
        } else if !graph.show_leaf_fields() {
            continue;
        }

        rows.push_str(&field_row(&id, field));
    }

    rows
}

fn field_row(id: &ElementId, field: &Field) -> String {
    let (prefix, suffix) = field.ty().wrappers();

    let mut markers = String::new();
    if field.is_deprecated() {
        markers.push_str(&text("{D}"));
    }
    if field.is_relay_field() {
        markers.push_str(&text("{R}"));
    }

    let mut row = String::new();
    // Writing to a String cannot fail.
    let _ = write!(
        row,
        r#"<TR><TD {} ALIGN="LEFT" PORT="{name}"><TABLE CELLPADDING="0" CELLSPACING="0" BORDER="0"><TR><TD ALIGN="LEFT">{name}<FONT>  </FONT></TD><TD ALIGN="RIGHT">{markers}{}{}{}</TD></TR></TABLE></TD></TR>"#,
        html_id(&id.to_string()),
        text(&prefix),
        field.ty().named_type(),
        text(&suffix),
        name = field.name(),
    );
    row
}

/// Rows and edges for possible types or implementations of `ty`.
///
/// Targets that are not nodes of the graph are skipped.
fn related_rows(
    graph: &TypeGraph,
    ty: &NamedType,
    targets: &[String],
    make_id: fn(&str, &str) -> ElementId,
    style: EdgeStyle,
    edges: &mut Vec<Edge>,
) -> String {
    let mut rows = String::new();

    for target in targets {
        if !graph.is_node(target) {
            trace!(
                node = ty.name(),
                related = target.as_str();
                "Skipping relation to a type outside the graph"
            );
            continue;
        }

        let id = make_id(ty.name(), target);
        let edge_id = EdgeId::new(id.clone(), ElementId::type_id(target.as_str()));
        edges.push(
            Edge::new(ty.name(), target.as_str(), edge_id, target.as_str()).with_style(style),
        );

        let _ = write!(
            rows,
            r#"<TR><TD {} ALIGN="LEFT" PORT="{target}">{target}</TD></TR>"#,
            html_id(&id.to_string()),
        );
    }

    rows
}

/// Anchor attributes that make the renderer emit `id` on the SVG element.
fn html_id(id: &str) -> String {
    format!(r#"HREF="remove_me_url" ID="{id}""#)
}

/// Wrap text in a font element, escaping brackets the label parser rejects.
fn text(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    format!("<FONT>{}</FONT>", s.replace(']', "&#93;"))
}

#[cfg(test)]
mod tests {
    use typeviz_core::{
        DisplayOptions,
        schema::{Schema, TypeRef},
    };

    use super::*;

    fn field(name: &str, ty: &str) -> Field {
        Field::new(name, ty.parse::<TypeRef>().unwrap())
    }

    fn two_node_graph(show_leaf_fields: bool) -> TypeGraph {
        TypeGraph::new(
            "A",
            [
                NamedType::new("A", TypeKind::Object)
                    .with_field(field("b", "B"))
                    .with_field(field("name", "String!")),
                NamedType::new("B", TypeKind::Object).with_field(field("id", "ID!")),
            ],
            show_leaf_fields,
        )
    }

    #[test]
    fn test_single_field_edge() {
        let description = compile(&two_node_graph(true));

        assert!(description.node("A").is_some());
        assert!(description.node("B").is_some());
        assert_eq!(description.edges().len(), 1);
        assert_eq!(description.edges_between("A", "B").count(), 1);

        let edge = &description.edges()[0];
        assert_eq!(edge.id().to_string(), "FIELD::A::b => TYPE::B");
        assert_eq!(edge.tail_port(), "b");
        assert_eq!(edge.label(), Some("A:b"));
        assert_eq!(edge.style(), EdgeStyle::Solid);
        assert!(description.dangling_endpoints().is_empty());
    }

    #[test]
    fn test_leaf_fields_gate_rows_not_edges() {
        let shown = compile(&two_node_graph(true));
        let hidden = compile(&two_node_graph(false));

        let shown_a = shown.node("A").unwrap().html_label();
        let hidden_a = hidden.node("A").unwrap().html_label();

        assert!(shown_a.contains(r#"ID="FIELD::A::name""#));
        assert!(!hidden_a.contains(r#"ID="FIELD::A::name""#));
        assert!(!hidden.node("B").unwrap().html_label().contains("FIELD::B::id"));

        // Node-typed rows stay in both
        assert!(shown_a.contains(r#"PORT="b""#));
        assert!(hidden_a.contains(r#"PORT="b""#));

        assert_eq!(shown.edges(), hidden.edges());
    }

    #[test]
    fn test_field_row_markers_and_wrappers() {
        let graph = TypeGraph::new(
            "Query",
            [
                NamedType::new("Query", TypeKind::Object)
                    .with_field(field("posts", "[Post!]!").with_relay())
                    .with_field(field("old", "Post").with_deprecation("use posts")),
                NamedType::new("Post", TypeKind::Object),
            ],
            true,
        );
        let label = compile(&graph).node("Query").unwrap().html_label().to_string();

        assert!(label.contains("<FONT>{R}</FONT><FONT>[</FONT>Post<FONT>!&#93;!</FONT>"));
        assert!(label.contains("<FONT>{D}</FONT>Post</TD>"));
    }

    #[test]
    fn test_kind_tags() {
        let graph = TypeGraph::new(
            "Query",
            [
                NamedType::new("Query", TypeKind::Object),
                NamedType::new("Node", TypeKind::Interface),
                NamedType::new("Result", TypeKind::Union),
                NamedType::new("Role", TypeKind::Enum),
                NamedType::new("Date", TypeKind::Scalar),
                NamedType::new("Filter", TypeKind::InputObject),
            ],
            true,
        );
        let description = compile(&graph);
        let label = |name: &str| description.node(name).unwrap().html_label().to_string();

        assert!(!label("Query").contains("&lt;&lt;"));
        assert!(label("Node").contains("&lt;&lt;interface&gt;&gt;"));
        assert!(label("Result").contains("&lt;&lt;union&gt;&gt;"));
        assert!(label("Role").contains("&lt;&lt;union&gt;&gt;"));
        assert!(label("Date").contains("&lt;&lt;scalar&gt;&gt;"));
        assert!(label("Filter").contains("&lt;&lt;input_object&gt;&gt;"));
        assert!(label("Query").contains(r#"ID="TYPE_TITLE::Query""#));
    }

    #[test]
    fn test_possible_and_derived_types() {
        let graph = TypeGraph::new(
            "Node",
            [
                NamedType::new("Node", TypeKind::Interface)
                    .with_possible_type("User")
                    .with_possible_type("Post")
                    .with_possible_type("Hidden"),
                NamedType::new("User", TypeKind::Object).with_interface("Node"),
                NamedType::new("Post", TypeKind::Object).with_interface("Node"),
            ],
            true,
        );
        let description = compile(&graph);

        let ids: Vec<_> = description
            .edges()
            .iter()
            .map(|edge| (edge.id().to_string(), edge.style()))
            .collect();
        assert_eq!(
            ids,
            [
                ("POSSIBLE_TYPE::Node::User => TYPE::User".to_string(), EdgeStyle::Dashed),
                ("POSSIBLE_TYPE::Node::Post => TYPE::Post".to_string(), EdgeStyle::Dashed),
                ("DERIVED_TYPE::Node::User => TYPE::User".to_string(), EdgeStyle::Dotted),
                ("DERIVED_TYPE::Node::Post => TYPE::Post".to_string(), EdgeStyle::Dotted),
            ]
        );

        let label = description.node("Node").unwrap().html_label();
        let possible_at = label.find("possible types").unwrap();
        let derived_at = label.find("implementations").unwrap();
        assert!(possible_at < derived_at);
        assert!(!label.contains("Hidden"));
        assert!(description.dangling_endpoints().is_empty());

        // No relation headings for plain objects
        let user = description.node("User").unwrap().html_label();
        assert!(!user.contains("possible types"));
        assert!(!user.contains("implementations"));
    }

    #[test]
    fn test_graph_attributes_follow_layout() {
        let layout = LayoutConfig::new(3.5, "courier", 12);
        let description = Compiler::new(&layout).compile(&two_node_graph(true));

        assert_eq!(description.graph_attributes().rank_dir, "LR");
        assert_eq!(description.graph_attributes().rank_separation, 3.5);
        assert_eq!(description.node_defaults().shape, "plaintext");
        assert_eq!(description.node_defaults().font_name, "courier");
        assert_eq!(description.node_defaults().font_size, 12);
    }

    #[test]
    fn test_node_order_follows_graph() {
        let description = compile(&two_node_graph(true));
        let names: Vec<_> = description.nodes().iter().map(Node::name).collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(description.nodes()[0].id(), &ElementId::type_id("A"));
    }

    #[test]
    fn test_implementations_follow_schema_declaration() {
        let schema = Schema::new(
            "Query",
            [
                NamedType::new("Node", TypeKind::Interface),
                NamedType::new("Post", TypeKind::Object).with_interface("Node"),
                NamedType::new("User", TypeKind::Object).with_interface("Node"),
                NamedType::new("Query", TypeKind::Object)
                    .with_field(field("viewer", "User"))
                    .with_field(field("post", "Post")),
            ],
        )
        .unwrap();
        let graph = TypeGraph::from_schema(&schema, &DisplayOptions::default()).unwrap();

        let description = compile(&graph);

        let derived: Vec<_> = description
            .edges()
            .iter()
            .filter(|edge| edge.style() == EdgeStyle::Dotted)
            .map(Edge::head)
            .collect();
        assert_eq!(derived, ["Post", "User"]);

        let label = description.node("Node").unwrap().html_label();
        assert!(label.find("DERIVED_TYPE::Node::Post") < label.find("DERIVED_TYPE::Node::User"));
    }
}
