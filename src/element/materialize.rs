//! Turning descriptions into nodes, and applying patches onto existing ones.

use tracing::{debug, warn};

use crate::dom::{Document, NodeId};
use crate::element::{Child, ElementDescription, Fragment};
use crate::error::{Result, UiError};
use crate::types::Context;

/// Resolve a context into live element ids, in order.
///
/// Selectors are queried at call time. Stale ids are dropped. An empty result
/// is logged, not an error.
pub fn resolve_targets(doc: &Document, context: &Context) -> Result<Vec<NodeId>> {
    let targets = match context {
        Context::Selector(selector) => doc.query_selector_all(selector)?,
        Context::Node(node) => live_nodes(doc, std::slice::from_ref(node)),
        Context::Nodes(nodes) => live_nodes(doc, nodes),
    };
    if targets.is_empty() {
        warn!(context = %context, "no elements found for context");
    }
    Ok(targets)
}

fn live_nodes(doc: &Document, nodes: &[NodeId]) -> Vec<NodeId> {
    nodes
        .iter()
        .copied()
        .filter(|&node| {
            let live = doc.contains(node);
            if !live {
                debug!(?node, "dropping stale node from context");
            }
            live
        })
        .collect()
}

/// Create a detached subtree from an element description.
pub fn materialize(doc: &mut Document, description: &ElementDescription) -> Result<NodeId> {
    let tag_name = description
        .tag_name
        .as_deref()
        .ok_or(UiError::UpdateOnlyDescription)?;
    let node = doc.create_element(tag_name);
    apply_attrs(doc, description, node)?;
    if let Some(children) = &description.children {
        append_children(doc, node, children)?;
    }
    Ok(node)
}

/// Create a detached node for a child entry.
pub fn materialize_child(doc: &mut Document, child: &Child) -> Result<NodeId> {
    match child {
        Child::Element(description) => materialize(doc, description),
        Child::Text(text) => Ok(doc.create_text(text)),
    }
}

fn append_children(doc: &mut Document, parent: NodeId, children: &[Child]) -> Result<()> {
    for child in children {
        let node = materialize_child(doc, child)?;
        doc.append_child(parent, node)?;
    }
    Ok(())
}

fn apply_attrs(doc: &mut Document, description: &ElementDescription, node: NodeId) -> Result<()> {
    for (name, value) in &description.attrs.values {
        match value.to_attribute() {
            Some(value) => doc.set_attribute(node, name, &value)?,
            None => {
                doc.remove_attribute(node, name)?;
            }
        }
    }
    for (property, value) in &description.attrs.style {
        if let Some(value) = value {
            doc.set_style(node, property, value)?;
        }
    }
    Ok(())
}

/// Apply an update descriptor onto one existing element.
pub fn apply_update_to(
    doc: &mut Document,
    description: &ElementDescription,
    node: NodeId,
) -> Result<()> {
    if let Some(tag) = &description.tag_name {
        return Err(UiError::TagInUpdate { tag: tag.clone() });
    }
    apply_attrs(doc, description, node)?;
    if let Some(children) = &description.children {
        doc.clear_children(node)?;
        append_children(doc, node, children)?;
    }
    Ok(())
}

/// Apply an update descriptor onto every element of `context`.
///
/// Returns the number of elements updated.
pub fn apply_update(
    doc: &mut Document,
    description: &ElementDescription,
    context: impl Into<Context>,
) -> Result<usize> {
    if let Some(tag) = &description.tag_name {
        return Err(UiError::TagInUpdate { tag: tag.clone() });
    }
    let targets = resolve_targets(doc, &context.into())?;
    for &node in &targets {
        apply_update_to(doc, description, node)?;
    }
    Ok(targets.len())
}

fn materialize_fragment(doc: &mut Document, fragment: &Fragment) -> Result<Vec<NodeId>> {
    fragment
        .entries()
        .iter()
        .map(|entry| materialize_child(doc, entry))
        .collect()
}

/// Append a fresh copy of `fragment` at the end of each target's content.
pub fn append_to_content(
    doc: &mut Document,
    fragment: &Fragment,
    context: impl Into<Context>,
) -> Result<usize> {
    let targets = resolve_targets(doc, &context.into())?;
    for &target in &targets {
        for node in materialize_fragment(doc, fragment)? {
            doc.append_child(target, node)?;
        }
    }
    Ok(targets.len())
}

/// Insert a fresh copy of `fragment` at the start of each target's content.
pub fn prepend_to_content(
    doc: &mut Document,
    fragment: &Fragment,
    context: impl Into<Context>,
) -> Result<usize> {
    let targets = resolve_targets(doc, &context.into())?;
    for &target in &targets {
        for node in materialize_fragment(doc, fragment)?.into_iter().rev() {
            doc.prepend_child(target, node)?;
        }
    }
    Ok(targets.len())
}

/// Replace each target's content with a fresh copy of `fragment`.
pub fn set_to_content(
    doc: &mut Document,
    fragment: &Fragment,
    context: impl Into<Context>,
) -> Result<usize> {
    let targets = resolve_targets(doc, &context.into())?;
    for &target in &targets {
        doc.clear_children(target)?;
        for node in materialize_fragment(doc, fragment)? {
            doc.append_child(target, node)?;
        }
    }
    Ok(targets.len())
}

// =============================================================================
// Tests
// =============================================================================
