//! Core types shared across the runtime.
//!
//! - [`AttrValue`] - attribute values carried by element descriptions
//! - [`Context`] - addressing of render/animation/event targets

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dom::NodeId;

// =============================================================================
// Attribute values
// =============================================================================

/// Value of an attribute entry in an element description.
///
/// `Bool(false)` and `Unset` remove the attribute when applied; every other
/// value is stringified and set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Unset,
}

impl AttrValue {
    /// The string the attribute should be set to, or `None` to remove it.
    pub fn to_attribute(&self) -> Option<String> {
        match self {
            AttrValue::Bool(false) | AttrValue::Unset => None,
            AttrValue::Bool(true) => Some("true".to_string()),
            AttrValue::Number(n) => Some(format_number(*n)),
            AttrValue::Text(s) => Some(s.clone()),
        }
    }
}

/// Format a number the way it reads in markup (`5`, `2.5`, `-3`).
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        "0".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        n.to_string()
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<&String> for AttrValue {
    fn from(value: &String) -> Self {
        AttrValue::Text(value.clone())
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Number(value)
    }
}

macro_rules! attr_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for AttrValue {
                fn from(value: $ty) -> Self {
                    AttrValue::Number(value as f64)
                }
            }
        )*
    };
}

attr_from_integer!(i32, i64, u32, u64, usize);

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(AttrValue::Unset)
    }
}

// =============================================================================
// Context - target addressing
// =============================================================================

/// Anything that can address a set of target elements.
///
/// Selectors are resolved against the document every time the context is
/// resolved, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Context {
    /// A single live element.
    Node(NodeId),
    /// An ordered list of elements, e.g. a previous query result.
    Nodes(Vec<NodeId>),
    /// A CSS selector queried against the whole document.
    Selector(String),
}

impl From<NodeId> for Context {
    fn from(node: NodeId) -> Self {
        Context::Node(node)
    }
}

impl From<Vec<NodeId>> for Context {
    fn from(nodes: Vec<NodeId>) -> Self {
        Context::Nodes(nodes)
    }
}

impl From<&[NodeId]> for Context {
    fn from(nodes: &[NodeId]) -> Self {
        Context::Nodes(nodes.to_vec())
    }
}

impl From<&str> for Context {
    fn from(selector: &str) -> Self {
        Context::Selector(selector.to_string())
    }
}

impl From<String> for Context {
    fn from(selector: String) -> Self {
        Context::Selector(selector)
    }
}

impl From<&String> for Context {
    fn from(selector: &String) -> Self {
        Context::Selector(selector.clone())
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Context::Node(node) => write!(f, "{node:?}"),
            Context::Nodes(nodes) => write!(f, "{} nodes", nodes.len()),
            Context::Selector(selector) => f.write_str(selector),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
