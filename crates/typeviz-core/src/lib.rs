//! Typeviz Core Types and Definitions
//!
//! This crate provides the foundational types shared by the typeviz
//! pipeline. It includes:
//!
//! - **Schema**: A GraphQL schema model ([`schema::Schema`], [`schema::NamedType`])
//! - **Type references**: Wrapped field types such as `[User!]!` ([`schema::TypeRef`])
//! - **Type graphs**: The subset of a schema selected for display ([`type_graph::TypeGraph`])
//! - **Identifiers**: Stable element and edge identifiers ([`identifier`] module)

pub mod identifier;
pub mod schema;
pub mod type_graph;

pub use type_graph::{DisplayOptions, TypeGraph, TypeGraphError};
