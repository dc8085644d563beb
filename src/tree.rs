//! Arena representation of a configuration tree.
//!
//! Directive processing needs node identity: a section referenced from
//! several places is one node reached through several edges, and must be
//! resolved once. Nodes live in a `Vec` and are addressed by [`NodeId`];
//! an edge is just an id stored in a parent map or sequence, so aliasing a
//! node is copying its id.

use crate::merge;
use indexmap::IndexMap;
use serde_json::{Map, Value};

pub(crate) type NodeId = usize;

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Map(IndexMap<String, NodeId>),
    Seq(Vec<NodeId>),
    /// Any non-container value (string, number, bool or null).
    Scalar(Value),
}

#[derive(Debug, Default)]
pub(crate) struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Copy a value into the arena, returning the id of its root node.
    pub fn insert(&mut self, value: Value) -> NodeId {
        match value {
            Value::Object(map) => {
                let entries = map
                    .into_iter()
                    .map(|(key, child)| (key, self.insert(child)))
                    .collect();
                self.alloc(Node::Map(entries))
            }
            Value::Array(items) => {
                let ids = items.into_iter().map(|item| self.insert(item)).collect();
                self.alloc(Node::Seq(ids))
            }
            scalar => self.alloc(Node::Scalar(scalar)),
        }
    }

    /// Rebuild an owned value from the node at `id`.
    ///
    /// Shared nodes are copied once per edge. The processor never writes an
    /// edge that closes a cycle, so this terminates.
    pub fn to_value(&self, id: NodeId) -> Value {
        match &self.nodes[id] {
            Node::Map(entries) => {
                let mut map = Map::with_capacity(entries.len());
                for (key, child) in entries {
                    map.insert(key.clone(), self.to_value(*child));
                }
                Value::Object(map)
            }
            Node::Seq(items) => Value::Array(items.iter().map(|i| self.to_value(*i)).collect()),
            Node::Scalar(value) => value.clone(),
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn set(&mut self, id: NodeId, node: Node) {
        self.nodes[id] = node;
    }

    /// Map entries of `id`, if it is a map.
    pub fn entries(&self, id: NodeId) -> Option<&IndexMap<String, NodeId>> {
        match &self.nodes[id] {
            Node::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn is_null(&self, id: NodeId) -> bool {
        matches!(self.nodes[id], Node::Scalar(Value::Null))
    }

    /// Zero-value test used by [`Tree::merge`]; mirrors [`merge::is_zero`].
    pub fn is_zero(&self, id: NodeId) -> bool {
        match &self.nodes[id] {
            Node::Map(_) => false,
            Node::Seq(items) => items.is_empty(),
            Node::Scalar(value) => merge::is_zero(value),
        }
    }

    /// Merge two nodes, `b` taking precedence, under the same rules as
    /// [`merge::deep_merge`]. Inputs are left untouched: merged maps are
    /// fresh nodes whose unmerged children are shared with the inputs.
    pub fn merge(&mut self, a: Option<NodeId>, b: Option<NodeId>) -> Option<NodeId> {
        let (a, b) = match (a, b) {
            (None, b) => return b,
            (a, None) => return a,
            (Some(a), Some(b)) => (a, b),
        };
        if self.is_null(a) {
            return Some(b);
        }
        if self.is_null(b) {
            return Some(a);
        }

        let maps = match (&self.nodes[a], &self.nodes[b]) {
            (Node::Map(base), Node::Map(overlay)) => Some((base.clone(), overlay.clone())),
            _ => None,
        };

        match maps {
            Some((mut entries, overlay)) => {
                for (key, child) in overlay {
                    let merged = self.merge(entries.get(&key).copied(), Some(child));
                    if let Some(merged) = merged {
                        entries.insert(key, merged);
                    }
                }
                Some(self.alloc(Node::Map(entries)))
            }
            None if self.is_zero(b) => Some(a),
            None => Some(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_round_trips() {
        let value = json!({"b": [1, {"c": null}], "a": "x"});
        let mut tree = Tree::new();
        let root = tree.insert(value.clone());
        assert_eq!(tree.to_value(root), value);
    }

    #[test]
    fn test_merge_agrees_with_value_merge() {
        let a = json!({"d": {"a": 1, "b": 2}, "x": 1, "s": [1]});
        let b = json!({"d": {"b": 3, "c": 4}, "x": 0, "s": []});

        let mut tree = Tree::new();
        let ia = tree.insert(a.clone());
        let ib = tree.insert(b.clone());
        let merged = tree.merge(Some(ia), Some(ib)).unwrap();

        assert_eq!(tree.to_value(merged), merge::deep_merge(a, b));
    }

    #[test]
    fn test_merge_does_not_mutate_inputs() {
        let mut tree = Tree::new();
        let ia = tree.insert(json!({"k": {"a": 1}}));
        let ib = tree.insert(json!({"k": {"b": 2}}));
        tree.merge(Some(ia), Some(ib));

        assert_eq!(tree.to_value(ia), json!({"k": {"a": 1}}));
        assert_eq!(tree.to_value(ib), json!({"k": {"b": 2}}));
    }

    #[test]
    fn test_merge_shares_untouched_children() {
        let mut tree = Tree::new();
        let ia = tree.insert(json!({"only_a": {"x": 1}}));
        let ib = tree.insert(json!({"only_b": 2}));
        let child = tree.entries(ia).unwrap()["only_a"];

        let merged = tree.merge(Some(ia), Some(ib)).unwrap();
        assert_eq!(tree.entries(merged).unwrap()["only_a"], child);
    }

    #[test]
    fn test_merge_absent_sides() {
        let mut tree = Tree::new();
        let ia = tree.insert(json!(1));
        assert_eq!(tree.merge(Some(ia), None), Some(ia));
        assert_eq!(tree.merge(None, Some(ia)), Some(ia));
        assert_eq!(tree.merge(None, None), None);
    }
}
