//! Normalisation of sibling nodes before they are composed.

use crate::wikicode::Node;
use regex::Regex;
use std::borrow::Cow;

/// Returns true if the node is a table cell tag.
fn is_cell(node: &Node) -> bool {
    matches!(node, Node::Tag(tag) if matches!(tag.plain_name(), Some("td" | "th")))
}

/// Prepares a list of sibling nodes for composition.
///
/// * Comments are removed.
/// * Text which follows an internal link without a trail donates the leading
///   part which matches `link_trail` to the link.
/// * Adjacent text nodes are merged.
/// * A line break is inserted between adjacent table cells.
///
/// The input nodes are never modified; only the changed nodes are copied.
pub(super) fn fix<'a>(nodes: &'a [Node], link_trail: &Regex) -> Vec<Cow<'a, Node>> {
    let mut fixed = Vec::<Cow<'a, Node>>::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Comment { .. } => {}
            Node::Text { value } => {
                let mut value = value.as_str();

                if let Some(last) = fixed.last_mut()
                    && let Node::Wikilink(link) = &**last
                    && link.trail.is_none()
                    && let Some(trail) = link_trail.find(value)
                    && trail.start() == 0
                    && !trail.is_empty()
                {
                    if let Node::Wikilink(link) = last.to_mut() {
                        link.trail = Some(trail.as_str().to_string());
                    }
                    value = &value[trail.end()..];
                    if value.is_empty() {
                        continue;
                    }
                }

                if let Some(last) = fixed.last_mut()
                    && matches!(**last, Node::Text { .. })
                {
                    if let Node::Text { value: prev } = last.to_mut() {
                        prev.push_str(value);
                    }
                } else if value.len() == node_len(node) {
                    fixed.push(Cow::Borrowed(node));
                } else {
                    fixed.push(Cow::Owned(Node::Text {
                        value: value.to_string(),
                    }));
                }
            }
            node => {
                if is_cell(node) && fixed.last().is_some_and(|last| is_cell(last)) {
                    fixed.push(Cow::Owned(Node::Text { value: "\n".into() }));
                }
                fixed.push(Cow::Borrowed(node));
            }
        }
    }
    fixed
}

/// The length of the value of a text node.
fn node_len(node: &Node) -> usize {
    node.as_text().map_or(0, str::len)
}
