//! Validated in-memory catalog tree.
//!
//! Built once per resolution pass from a flat row snapshot. Construction
//! checks every structural guarantee the resolver relies on; a tree that
//! fails any check is rejected whole, no partial index is kept.

use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

use super::models::ContentNode;

/// Structural defect in a catalog row snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// Two rows share the same id.
    #[error("duplicate node id {id}")]
    DuplicateNode { id: Uuid },

    /// A row references a parent id that is not in the snapshot.
    #[error("node {id} references missing parent {parent_id}")]
    DanglingParent { id: Uuid, parent_id: Uuid },

    /// A row is not reachable from the root (its parent chain loops).
    #[error("node {id} is part of a parent cycle")]
    Cycle { id: Uuid },

    /// The snapshot contains no parentless row.
    #[error("snapshot has no root node")]
    NoRoot,

    /// The snapshot contains more than one parentless row.
    #[error("snapshot has a second root node {id}")]
    MultipleRoots { id: Uuid },
}

/// A validated, single-rooted catalog tree.
///
/// Children are pre-sorted ascending by `position`, ties broken by the
/// order rows appeared in the input snapshot.
#[derive(Debug, Clone)]
pub struct ContentTree {
    root: Uuid,
    nodes: HashMap<Uuid, ContentNode>,
    children: HashMap<Uuid, Vec<Uuid>>,
}

impl ContentTree {
    /// Build a tree from a flat row snapshot.
    ///
    /// Validates: at least one row, exactly one root, every `parent_id`
    /// resolves, ids are unique, and every row is reachable from the root.
    pub fn build(rows: Vec<ContentNode>) -> Result<Self, TreeError> {
        if rows.is_empty() {
            return Err(TreeError::NoRoot);
        }

        // Input order breaks position ties, so remember it before indexing.
        let input_order: HashMap<Uuid, usize> =
            rows.iter().enumerate().map(|(i, n)| (n.id, i)).collect();

        let mut root = None;
        let mut nodes = HashMap::with_capacity(rows.len());
        let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();

        for row in rows {
            let id = row.id;
            if nodes.contains_key(&id) {
                return Err(TreeError::DuplicateNode { id });
            }
            match row.parent_id {
                None => {
                    if root.is_some() {
                        return Err(TreeError::MultipleRoots { id });
                    }
                    root = Some(id);
                }
                Some(parent_id) => {
                    children.entry(parent_id).or_default().push(id);
                }
            }
            nodes.insert(id, row);
        }

        let root = root.ok_or(TreeError::NoRoot)?;

        for (id, node) in &nodes {
            if let Some(parent_id) = node.parent_id {
                if !nodes.contains_key(&parent_id) {
                    return Err(TreeError::DanglingParent {
                        id: *id,
                        parent_id,
                    });
                }
            }
        }

        // Siblings: ascending position, input order on ties.
        for siblings in children.values_mut() {
            siblings.sort_by_key(|id| (nodes[id].position, input_order[id]));
        }

        let tree = Self {
            root,
            nodes,
            children,
        };

        // Every row must hang off the root; anything left over sits on a
        // parent cycle disconnected from it.
        let reachable = tree.walk_ids();
        if reachable.len() != tree.nodes.len() {
            let reached: std::collections::HashSet<Uuid> = reachable.into_iter().collect();
            let mut stranded: Vec<Uuid> = tree
                .nodes
                .keys()
                .copied()
                .filter(|id| !reached.contains(id))
                .collect();
            stranded.sort_by_key(|id| input_order[id]);
            return Err(TreeError::Cycle { id: stranded[0] });
        }

        Ok(tree)
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> &ContentNode {
        &self.nodes[&self.root]
    }

    /// Look up a node by id.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&ContentNode> {
        self.nodes.get(&id)
    }

    /// Ordered child ids of a node. Empty for leaves and unknown ids.
    #[must_use]
    pub fn children(&self, id: Uuid) -> &[Uuid] {
        self.children.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A validated tree always holds at least the root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-first preorder walk, parents before children, siblings in
    /// display order.
    #[must_use]
    pub fn walk_ids(&self) -> Vec<Uuid> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            out.push(id);
            for child in self.children(id).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }
}
