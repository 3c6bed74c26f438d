//! Element descriptions - declarative, serialisable DOM trees and patches.
//!
//! An [`ElementDescription`] is plain data. It does not touch a document until
//! it is materialised ([`materialize`]) or applied onto existing nodes
//! ([`apply_update`]).
//!
//! # Entry points
//!
//! There is no shape sniffing: pick the constructor matching what you have.
//!
//! ```ignore
//! use bistro_ui::element::{element, update, with_attrs, with_children, Attrs};
//!
//! // <div class="slot"><span>3</span></div>
//! let slot = element("div")
//!     .attr("class", "slot")
//!     .child(element("span").text("3"));
//!
//! // Patch: recolour existing nodes, leave everything else alone
//! let recolour = update().style("color", "#D83930");
//!
//! // Patch: replace the children
//! let refill = with_children(None, vec![element("div"), element("div")]);
//!
//! // Explicit attrs object
//! let tagged = with_attrs(Some("img"), Attrs::new().set("alt", "heart"));
//! ```
//!
//! # Update semantics
//!
//! - attrs: `false` / [`AttrValue::Unset`] remove the attribute, anything else
//!   sets its string form
//! - style: `Some(v)` overwrites (an empty `v` clears the property), `None`
//!   leaves the current value untouched
//! - children: `Some(list)` replaces all children (even with an empty list),
//!   `None` keeps them

pub mod materialize;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dom::normalize_property;
use crate::types::AttrValue;

pub use materialize::{
    append_to_content, apply_update, apply_update_to, materialize, materialize_child,
    prepend_to_content, resolve_targets, set_to_content,
};

// =============================================================================
// Attributes
// =============================================================================

/// Attribute entries plus the reserved `style` sub-mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attrs {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub style: BTreeMap<String, Option<String>>,
    #[serde(flatten)]
    pub values: BTreeMap<String, AttrValue>,
}

impl Attrs {
    /// An empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.style.is_empty()
    }

    /// Set an attribute entry. `style` is reserved and ignored here; use
    /// [`Attrs::style`].
    pub fn set(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        if name == "style" {
            warn!("`style` is reserved in attrs, use the style mapping instead");
            return self;
        }
        self.values.insert(name.to_string(), value.into());
        self
    }

    /// Set a style entry (camelCase names are normalised).
    pub fn style(mut self, property: &str, value: impl Into<String>) -> Self {
        self.style
            .insert(normalize_property(property), Some(value.into()));
        self
    }

    /// Mention a style property without changing it.
    pub fn keep_style(mut self, property: &str) -> Self {
        self.style.insert(normalize_property(property), None);
        self
    }
}

// =============================================================================
// Children
// =============================================================================

/// A child entry: a nested description or text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Child {
    Element(ElementDescription),
    Text(String),
}

impl From<ElementDescription> for Child {
    fn from(description: ElementDescription) -> Self {
        Child::Element(description)
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Text(text.to_string())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Text(text)
    }
}

impl From<bool> for Child {
    fn from(value: bool) -> Self {
        Child::Text(value.to_string())
    }
}

macro_rules! child_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Child {
                fn from(value: $ty) -> Self {
                    Child::Text(crate::types::format_number(value as f64))
                }
            }
        )*
    };
}

child_from_number!(i32, i64, u32, u64, usize, f64);

// =============================================================================
// Element description
// =============================================================================

/// Description of an element, or of an update when `tag_name` is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDescription {
    #[serde(default)]
    pub tag_name: Option<String>,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Child>>,
}

impl ElementDescription {
    /// Whether this is an update-only descriptor.
    pub fn is_update(&self) -> bool {
        self.tag_name.is_none()
    }

    pub fn attr(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs = self.attrs.set(name, value);
        self
    }

    pub fn style(mut self, property: &str, value: impl Into<String>) -> Self {
        self.attrs = self.attrs.style(property, value);
        self
    }

    /// Append one child.
    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.children.get_or_insert_with(Vec::new).push(child.into());
        self
    }

    /// Set the children list, replacing any previously given.
    pub fn children<C: Into<Child>>(mut self, children: impl IntoIterator<Item = C>) -> Self {
        self.children = Some(children.into_iter().map(Into::into).collect());
        self
    }

    /// Append a text child.
    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(Child::Text(text.into()))
    }

    /// Declare an empty children list (applying it removes all children).
    pub fn clear_children(mut self) -> Self {
        self.children = Some(Vec::new());
        self
    }
}

/// A new element description with no attributes or children.
pub fn element(tag_name: &str) -> ElementDescription {
    ElementDescription {
        tag_name: Some(tag_name.to_string()),
        ..Default::default()
    }
}

/// An empty update descriptor.
pub fn update() -> ElementDescription {
    ElementDescription::default()
}

/// A description from a prebuilt attribute set. `None` as tag makes it an update.
pub fn with_attrs(tag_name: Option<&str>, attrs: Attrs) -> ElementDescription {
    ElementDescription {
        tag_name: tag_name.map(str::to_string),
        attrs,
        children: None,
    }
}

/// A description that replaces the target's children. `None` as tag makes it an update.
pub fn with_children<C: Into<Child>>(
    tag_name: Option<&str>,
    children: impl IntoIterator<Item = C>,
) -> ElementDescription {
    ElementDescription {
        tag_name: tag_name.map(str::to_string),
        attrs: Attrs::default(),
        children: Some(children.into_iter().map(Into::into).collect()),
    }
}

/// A description carrying both attributes and children.
pub fn with_both<C: Into<Child>>(
    tag_name: Option<&str>,
    attrs: Attrs,
    children: impl IntoIterator<Item = C>,
) -> ElementDescription {
    ElementDescription {
        tag_name: tag_name.map(str::to_string),
        attrs,
        children: Some(children.into_iter().map(Into::into).collect()),
    }
}

// =============================================================================
// Fragment - reusable template
// =============================================================================

/// A reusable list of top-level entries.
///
/// Every insertion materialises fresh nodes, so one fragment can be inserted
/// any number of times into any number of targets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fragment {
    entries: Vec<Child>,
}

impl Fragment {
    /// A fragment of `entries`, in insertion order.
    pub fn new<C: Into<Child>>(entries: impl IntoIterator<Item = C>) -> Self {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    pub fn entries(&self) -> &[Child] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<ElementDescription> for Fragment {
    fn from(description: ElementDescription) -> Self {
        Self {
            entries: vec![Child::Element(description)],
        }
    }
}

impl From<Vec<Child>> for Fragment {
    fn from(entries: Vec<Child>) -> Self {
        Self { entries }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_entry_points() {
        let desc = element("div").attr("class", "a").text("hi");
        assert_eq!(desc.tag_name.as_deref(), Some("div"));
        assert_eq!(desc.attrs.values.get("class"), Some(&AttrValue::from("a")));
        assert_eq!(desc.children, Some(vec![Child::Text("hi".into())]));

        let patch = update().style("backgroundImage", "url(x)");
        assert!(patch.is_update());
        assert!(patch.children.is_none());
        assert_eq!(
            patch.attrs.style.get("background-image"),
            Some(&Some("url(x)".to_string()))
        );

        let refill = with_children(None, vec![element("div"), element("div")]);
        assert_eq!(refill.children.as_ref().map(Vec::len), Some(2));

        let both = with_both(Some("p"), Attrs::new().set("id", 1), ["x", "y"]);
        assert_eq!(both.children.as_ref().map(Vec::len), Some(2));
        assert_eq!(both.attrs.values.get("id"), Some(&AttrValue::Number(1.0)));

        let tagged = with_attrs(None, Attrs::new().set("alt", "heart"));
        assert!(tagged.is_update());
        assert!(tagged.children.is_none());
        assert_eq!(Fragment::new([element("i"), element("b")]).entries().len(), 2);
    }

    #[test]
    fn test_style_key_reserved_in_attrs() {
        let attrs = Attrs::new().set("style", "color: red");
        assert!(attrs.values.is_empty());
    }

    #[test]
    fn test_clear_children_is_some_empty() {
        let desc = update().clear_children();
        assert_eq!(desc.children, Some(Vec::new()));
    }

    #[test]
    fn test_primitive_children_coerced_to_text() {
        let desc = element("span").child(250).child(true).child(-1.5);
        assert_eq!(
            desc.children,
            Some(vec![
                Child::Text("250".into()),
                Child::Text("true".into()),
                Child::Text("-1.5".into()),
            ])
        );
    }

    #[test]
    fn test_description_json_shape() {
        let desc = element("div")
            .attr("data-id", 2)
            .style("color", "#fff")
            .child(element("span").text("x"));
        let json = serde_json::to_value(&desc).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "tagName": "div",
                "attrs": { "data-id": 2.0, "style": { "color": "#fff" } },
                "children": [ { "tagName": "span", "children": ["x"] } ]
            })
        );

        let back: ElementDescription = serde_json::from_value(json).unwrap();
        assert_eq!(back, desc);
    }

    #[test]
    fn test_update_description_from_json() {
        let desc: ElementDescription = serde_json::from_str(
            r#"{ "tagName": null, "attrs": { "hidden": false, "style": { "color": null } } }"#,
        )
        .unwrap();
        assert!(desc.is_update());
        assert_eq!(desc.attrs.values.get("hidden"), Some(&AttrValue::Bool(false)));
        assert_eq!(desc.attrs.style.get("color"), Some(&None));
        assert!(desc.children.is_none());
    }
}
