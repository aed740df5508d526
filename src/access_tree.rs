use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::abe_attribute::AbeAttribute;
use crate::access_tree_node::AccessTreeNode;
use crate::errors::abe_error::AbeError;
use crate::parser::AccessTreeParser;

/// Index of the root node.
pub const ROOT: usize = 0;

/// Deepest leaf level a tree may have, the root being level 0. Sharing, recovery and
/// satisfaction checks recurse once per level.
pub const MAX_DEPTH: usize = 64;

/// A monotone threshold access structure, stored as a flat node list.
///
/// Node 0 is the root. Child indices also serve as the evaluation points of the secret
/// sharing polynomials, so they are never 0. The shape is validated once on construction
/// and immutable afterwards; per-operation state lives outside the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<AccessTreeNode>", into = "Vec<AccessTreeNode>")]
pub struct AccessTree {
    nodes: Vec<AccessTreeNode>,
}

impl AccessTree {
    pub fn new(nodes: Vec<AccessTreeNode>) -> Result<AccessTree, AbeError> {
        if nodes.is_empty() {
            return Err(AbeError::configuration("access tree has no nodes"));
        }

        let mut parents: Vec<Option<usize>> = vec![None; nodes.len()];
        let mut attributes = BTreeSet::new();
        for (index, node) in nodes.iter().enumerate() {
            match node {
                AccessTreeNode::Leaf { attribute } => {
                    if !attributes.insert(*attribute) {
                        return Err(AbeError::configuration(format!(
                            "attribute {} appears on more than one leaf",
                            attribute
                        )));
                    }
                }
                AccessTreeNode::Gate {
                    threshold,
                    children,
                } => {
                    if children.is_empty() {
                        return Err(AbeError::configuration(format!(
                            "node {} has no children",
                            index
                        )));
                    }
                    if *threshold == 0 || *threshold > children.len() {
                        return Err(AbeError::configuration(format!(
                            "node {} has threshold {} outside [1, {}]",
                            index,
                            threshold,
                            children.len()
                        )));
                    }
                    for &child in children {
                        if child == ROOT || child >= nodes.len() {
                            return Err(AbeError::configuration(format!(
                                "node {} has invalid child index {}",
                                index, child
                            )));
                        }
                        if let Some(parent) = parents[child] {
                            return Err(AbeError::configuration(format!(
                                "node {} has two parents ({} and {})",
                                child, parent, index
                            )));
                        }
                        parents[child] = Some(index);
                    }
                }
            }
        }

        // every node must hang off the root, which also rules out cycles
        let mut reached = vec![false; nodes.len()];
        let mut stack = vec![(ROOT, 0)];
        while let Some((index, depth)) = stack.pop() {
            if reached[index] {
                continue;
            }
            if depth > MAX_DEPTH {
                return Err(AbeError::configuration(format!(
                    "node {} is nested deeper than {} levels",
                    index, MAX_DEPTH
                )));
            }
            reached[index] = true;
            stack.extend(nodes[index].children().iter().map(|&child| (child, depth + 1)));
        }
        if let Some(index) = reached.iter().position(|r| !r) {
            return Err(AbeError::configuration(format!(
                "node {} is not reachable from the root",
                index
            )));
        }

        Ok(AccessTree { nodes })
    }

    /// Parses a policy expression such as `2 of (1, 2 of (2, 3, 4), 5)`.
    pub fn from_policy(policy: &str) -> Result<AccessTree, AbeError> {
        AccessTreeParser::new(policy).parse()
    }

    /// Reads a tree from its JSON node list.
    pub fn from_json(json: &str) -> Result<AccessTree, AbeError> {
        serde_json::from_str(json)
            .map_err(|e| AbeError::configuration(format!("invalid access tree JSON: {}", e)))
    }

    pub fn to_json(&self) -> Result<String, AbeError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| AbeError::encoding(format!("could not serialize access tree: {}", e)))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[AccessTreeNode] {
        &self.nodes
    }

    /// Leaf node indices with their attributes, in node order.
    pub fn leaves(&self) -> impl Iterator<Item = (usize, AbeAttribute)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| match node {
                AccessTreeNode::Leaf { attribute } => Some((index, *attribute)),
                AccessTreeNode::Gate { .. } => None,
            })
    }
}

impl TryFrom<Vec<AccessTreeNode>> for AccessTree {
    type Error = AbeError;

    fn try_from(nodes: Vec<AccessTreeNode>) -> Result<Self, Self::Error> {
        AccessTree::new(nodes)
    }
}

impl From<AccessTree> for Vec<AccessTreeNode> {
    fn from(tree: AccessTree) -> Self {
        tree.nodes
    }
}

pub trait GetAttributes {
    /// Returns the attributes of all leaves, in node order
    fn get_attributes(&self) -> Vec<AbeAttribute>;
}

impl GetAttributes for AccessTree {
    fn get_attributes(&self) -> Vec<AbeAttribute> {
        self.leaves().map(|(_, attribute)| attribute).collect()
    }
}

pub trait Satisfiable {
    /// Checks if the given set of attributes satisfies the tree, without any cryptography
    fn is_satisfiable(&self, attributes: &BTreeSet<AbeAttribute>) -> bool;
}

impl Satisfiable for AccessTree {
    fn is_satisfiable(&self, attributes: &BTreeSet<AbeAttribute>) -> bool {
        fn satisfied(
            nodes: &[AccessTreeNode],
            index: usize,
            attributes: &BTreeSet<AbeAttribute>,
        ) -> bool {
            match &nodes[index] {
                AccessTreeNode::Leaf { attribute } => attributes.contains(attribute),
                AccessTreeNode::Gate {
                    threshold,
                    children,
                } => {
                    children
                        .iter()
                        .filter(|&&child| satisfied(nodes, child, attributes))
                        .take(*threshold)
                        .count()
                        == *threshold
                }
            }
        }

        satisfied(&self.nodes, ROOT, attributes)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::abe_attribute::AbeAttribute;
    use crate::access_tree::{AccessTree, GetAttributes, Satisfiable, MAX_DEPTH};
    use crate::access_tree_node::AccessTreeNode;
    use crate::errors::abe_error::AbeError;

    fn attributes(ids: &[u32]) -> BTreeSet<AbeAttribute> {
        ids.iter().map(|id| AbeAttribute::new(*id)).collect()
    }

    fn demo_tree() -> AccessTree {
        AccessTree::new(vec![
            AccessTreeNode::gate(2, vec![1, 2, 3]),
            AccessTreeNode::leaf(1),
            AccessTreeNode::gate(2, vec![4, 5, 6]),
            AccessTreeNode::leaf(5),
            AccessTreeNode::leaf(2),
            AccessTreeNode::leaf(3),
            AccessTreeNode::leaf(4),
        ])
        .unwrap()
    }

    fn assert_configuration_error(nodes: Vec<AccessTreeNode>) {
        assert!(matches!(
            AccessTree::new(nodes),
            Err(AbeError::Configuration(_))
        ));
    }

    #[test]
    fn test_access_tree_single_leaf() {
        let tree = AccessTree::new(vec![AccessTreeNode::leaf(3)]).unwrap();

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get_attributes(), vec![AbeAttribute::new(3)]);
        assert!(tree.is_satisfiable(&attributes(&[3])));
        assert!(!tree.is_satisfiable(&attributes(&[1, 2])));
    }

    #[test]
    fn test_access_tree_get_attributes() {
        let tree = demo_tree();

        assert_eq!(
            tree.get_attributes(),
            vec![
                AbeAttribute::new(1),
                AbeAttribute::new(5),
                AbeAttribute::new(2),
                AbeAttribute::new(3),
                AbeAttribute::new(4),
            ]
        );
        assert_eq!(
            tree.leaves().map(|(index, _)| index).collect::<Vec<_>>(),
            vec![1, 3, 4, 5, 6]
        );
    }

    #[test]
    fn test_access_tree_is_satisfiable() {
        let tree = demo_tree();

        assert!(tree.is_satisfiable(&attributes(&[1, 2, 4, 5])));
        assert!(tree.is_satisfiable(&attributes(&[1, 5])));
        assert!(tree.is_satisfiable(&attributes(&[2, 3, 5])));
        assert!(!tree.is_satisfiable(&attributes(&[1])));
        assert!(!tree.is_satisfiable(&attributes(&[1, 2])));
        assert!(!tree.is_satisfiable(&attributes(&[2, 3])));
        assert!(!tree.is_satisfiable(&attributes(&[])));
    }

    #[test]
    fn test_access_tree_rejects_bad_threshold() {
        assert_configuration_error(vec![
            AccessTreeNode::gate(0, vec![1]),
            AccessTreeNode::leaf(1),
        ]);
        assert_configuration_error(vec![
            AccessTreeNode::gate(3, vec![1, 2]),
            AccessTreeNode::leaf(1),
            AccessTreeNode::leaf(2),
        ]);
        assert_configuration_error(vec![AccessTreeNode::gate(1, vec![])]);
    }

    #[test]
    fn test_access_tree_rejects_bad_structure() {
        // empty
        assert_configuration_error(vec![]);
        // child out of range
        assert_configuration_error(vec![
            AccessTreeNode::gate(1, vec![1, 7]),
            AccessTreeNode::leaf(1),
        ]);
        // root as a child
        assert_configuration_error(vec![
            AccessTreeNode::gate(1, vec![1]),
            AccessTreeNode::gate(1, vec![0]),
        ]);
        // two parents
        assert_configuration_error(vec![
            AccessTreeNode::gate(1, vec![1, 2]),
            AccessTreeNode::gate(1, vec![3]),
            AccessTreeNode::gate(1, vec![3]),
            AccessTreeNode::leaf(1),
        ]);
        // unreachable cycle
        assert_configuration_error(vec![
            AccessTreeNode::leaf(1),
            AccessTreeNode::gate(1, vec![2]),
            AccessTreeNode::gate(1, vec![1]),
        ]);
        // orphan leaf
        assert_configuration_error(vec![
            AccessTreeNode::gate(1, vec![1]),
            AccessTreeNode::leaf(1),
            AccessTreeNode::leaf(2),
        ]);
        // duplicate attribute
        assert_configuration_error(vec![
            AccessTreeNode::gate(2, vec![1, 2]),
            AccessTreeNode::leaf(1),
            AccessTreeNode::leaf(1),
        ]);
    }

    fn chain(depth: usize) -> Vec<AccessTreeNode> {
        let mut nodes: Vec<AccessTreeNode> =
            (1..=depth).map(|child| AccessTreeNode::gate(1, vec![child])).collect();
        nodes.push(AccessTreeNode::leaf(1));
        nodes
    }

    #[test]
    fn test_access_tree_depth_limit() {
        let tree = AccessTree::new(chain(MAX_DEPTH)).unwrap();
        assert!(tree.is_satisfiable(&attributes(&[1])));

        assert_configuration_error(chain(MAX_DEPTH + 1));
        assert_configuration_error(chain(5000));
    }

    #[test]
    fn test_access_tree_json() {
        let tree = demo_tree();
        let json = tree.to_json().unwrap();

        assert_eq!(AccessTree::from_json(&json).unwrap(), tree);

        let invalid = r#"[{"gate": {"threshold": 3, "children": [1]}}, {"leaf": {"attribute": 1}}]"#;
        assert!(matches!(
            AccessTree::from_json(invalid),
            Err(AbeError::Configuration(_))
        ));
    }

    #[test]
    fn test_access_tree_from_policy() {
        let tree = AccessTree::from_policy("2 of (1, 2 of (2, 3, 4), 5)").unwrap();

        assert_eq!(tree, demo_tree());
    }
}
