use serde::{Deserialize, Serialize};

use crate::abe_attribute::AbeAttribute;

/// A node of an [`AccessTree`](crate::access_tree::AccessTree).
///
/// Children are referenced by their index in the tree's node list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessTreeNode {
    Leaf {
        attribute: AbeAttribute,
    },
    /// Satisfied when at least `threshold` of `children` are satisfied.
    Gate {
        threshold: usize,
        children: Vec<usize>,
    },
}

impl AccessTreeNode {
    pub fn leaf(attribute: u32) -> AccessTreeNode {
        AccessTreeNode::Leaf {
            attribute: AbeAttribute::new(attribute),
        }
    }

    pub fn gate(threshold: usize, children: Vec<usize>) -> AccessTreeNode {
        AccessTreeNode::Gate {
            threshold,
            children,
        }
    }

    pub fn children(&self) -> &[usize] {
        match self {
            AccessTreeNode::Leaf { .. } => &[],
            AccessTreeNode::Gate { children, .. } => children,
        }
    }
}
