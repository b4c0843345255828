//! Document model for confmap.
//!
//! A [`Document`](document::Document) is an arena of nodes addressed by
//! [`NodeId`](document::NodeId). Children are owned by their container node
//! (object map or array list) and every node keeps a non-owning link back to
//! its parent, so canonical paths can be computed from any node.

/// A data structure for representing a live JSON document.
pub mod document;

/// Canonical slash-separated document paths.
pub mod path;

/// Conversion between `serde_json::Value` and [`Document`](document::Document).
pub mod json;

pub use document::node::{Node, NodeArray, NodeMap, NodeValue, Reference, ValueKind};
pub use document::{Document, InsertError, InsertErrorKind, NodeId};
pub use path::{DocPath, PathError};

pub(crate) mod prelude_internal {
    #![allow(unused_imports)]
    pub use crate::document::node::{Node, NodeArray, NodeMap, NodeValue, Reference, ValueKind};
    pub use crate::document::{Document, InsertError, InsertErrorKind, NodeId};
    pub use crate::path::{DocPath, PathError};
    pub use serde_json::Value as JsonValue;
    pub use thisisplural::Plural;
}
