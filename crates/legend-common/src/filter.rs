//! Permission filtering of layer trees.
//!
//! Produces a pruned, borrowed view of a subtree containing only what the
//! caller may see:
//! - a leaf layer is visible iff its name is permitted
//! - a facade group is visible iff its own name is permitted; its children
//!   are never looked at
//! - any other group keeps its permitted children in configured order and
//!   is denied when none remain, whether or not its own name is permitted
//!
//! There is no implicit public visibility: an empty permission set denies
//! everything.

use std::collections::HashSet;

use crate::layer::LayerNode;

/// A visible node in the pruned view.
#[derive(Debug, Clone)]
pub enum FilteredNode<'a> {
    /// A permitted leaf layer.
    Leaf(&'a LayerNode),
    /// A permitted facade group, treated as a single layer.
    Facade(&'a LayerNode),
    /// A group with at least one visible child.
    Group {
        node: &'a LayerNode,
        children: Vec<FilteredNode<'a>>,
    },
}

impl<'a> FilteredNode<'a> {
    pub fn node(&self) -> &'a LayerNode {
        match self {
            FilteredNode::Leaf(node) | FilteredNode::Facade(node) => node,
            FilteredNode::Group { node, .. } => node,
        }
    }

    pub fn name(&self) -> &'a str {
        self.node().name()
    }

    /// Names of the single-image units (leaves and facades) in pre-order.
    pub fn unit_names(&self) -> Vec<&'a str> {
        let mut names = Vec::new();
        self.collect_units(&mut names);
        names
    }

    fn collect_units(&self, out: &mut Vec<&'a str>) {
        match self {
            FilteredNode::Leaf(node) | FilteredNode::Facade(node) => out.push(node.name()),
            FilteredNode::Group { children, .. } => {
                for child in children {
                    child.collect_units(out);
                }
            }
        }
    }
}

/// Result of filtering a node.
#[derive(Debug, Clone)]
pub enum FilterOutcome<'a> {
    Visible(FilteredNode<'a>),
    Denied,
}

impl<'a> FilterOutcome<'a> {
    pub fn is_denied(&self) -> bool {
        matches!(self, FilterOutcome::Denied)
    }

    pub fn into_visible(self) -> Option<FilteredNode<'a>> {
        match self {
            FilterOutcome::Visible(node) => Some(node),
            FilterOutcome::Denied => None,
        }
    }
}

/// Filter a subtree against the caller's permitted layer names.
pub fn filter<'a>(node: &'a LayerNode, permitted: &HashSet<String>) -> FilterOutcome<'a> {
    match node {
        LayerNode::Layer { name, .. } => {
            if permitted.contains(name) {
                FilterOutcome::Visible(FilteredNode::Leaf(node))
            } else {
                FilterOutcome::Denied
            }
        }
        LayerNode::GroupLayer {
            name,
            hide_sublayers: true,
            ..
        } => {
            if permitted.contains(name) {
                FilterOutcome::Visible(FilteredNode::Facade(node))
            } else {
                FilterOutcome::Denied
            }
        }
        LayerNode::GroupLayer { children, .. } => {
            let visible: Vec<FilteredNode<'a>> = children
                .iter()
                .filter_map(|child| filter(child, permitted).into_visible())
                .collect();

            if visible.is_empty() {
                FilterOutcome::Denied
            } else {
                FilterOutcome::Visible(FilteredNode::Group {
                    node,
                    children: visible,
                })
            }
        }
    }
}
