//! Branch hierarchy resolver.
//!
//! Builds parent/children adjacency maps from the flat branch table and
//! answers descendant queries via breadth-first traversal. The walk is
//! guarded by a visited set so it terminates even if the stored topology
//! contains a cycle the schema should have prevented.

use crate::db::BranchModel;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet, VecDeque};

/// Branch identifier.
pub type BranchId = i64;

/// Branch attributes the aggregator needs: identity, model, parent link
/// and activation date.
#[derive(Debug, Clone)]
pub struct BranchNode {
    /// Branch identifier.
    pub id: BranchId,
    /// Display name.
    pub name: String,
    /// Business model.
    pub model: BranchModel,
    /// Parent (control) branch.
    pub control_branch_id: Option<BranchId>,
    /// Date the branch went live.
    pub activated_on: NaiveDate,
}

/// In-memory branch tree built from the non-deleted branch set.
#[derive(Debug, Default)]
pub struct BranchHierarchy {
    nodes: HashMap<BranchId, BranchNode>,
    children_of: HashMap<BranchId, Vec<BranchId>>,
}

impl BranchHierarchy {
    /// Builds the adjacency maps in one pass over the branch set.
    ///
    /// Children lists are kept sorted by id so traversal order, and with it
    /// every downstream ranking tie-break, is deterministic.
    #[must_use]
    pub fn build(branches: Vec<BranchNode>) -> Self {
        let mut nodes = HashMap::with_capacity(branches.len());
        let mut children_of: HashMap<BranchId, Vec<BranchId>> = HashMap::new();

        for branch in branches {
            if let Some(parent) = branch.control_branch_id {
                children_of.entry(parent).or_default().push(branch.id);
            }
            nodes.insert(branch.id, branch);
        }

        for children in children_of.values_mut() {
            children.sort_unstable();
        }

        Self { nodes, children_of }
    }

    /// Returns the branch node, if known.
    #[must_use]
    pub fn node(&self, id: BranchId) -> Option<&BranchNode> {
        self.nodes.get(&id)
    }

    /// Returns the parent (control) branch, if any.
    #[must_use]
    pub fn parent(&self, id: BranchId) -> Option<BranchId> {
        self.nodes.get(&id).and_then(|n| n.control_branch_id)
    }

    /// Returns the direct children of a branch.
    #[must_use]
    pub fn direct_children(&self, id: BranchId) -> &[BranchId] {
        self.children_of.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Returns the direct children of franchise model only.
    #[must_use]
    pub fn franchise_children(&self, id: BranchId) -> Vec<BranchId> {
        self.direct_children(id)
            .iter()
            .copied()
            .filter(|child| {
                self.nodes
                    .get(child)
                    .is_some_and(|n| n.model == BranchModel::Franchise)
            })
            .collect()
    }

    /// Returns the full descendant set of a branch, itself included, in
    /// breadth-first order.
    ///
    /// A visited set guards against cycles in the stored topology. When the
    /// hierarchy is empty (topology temporarily unavailable) the result
    /// degrades to the singleton `[id]` so callers aggregate the branch on
    /// its own instead of failing.
    #[must_use]
    pub fn descendants(&self, id: BranchId) -> Vec<BranchId> {
        let mut visited = HashSet::new();
        let mut result = Vec::new();
        let mut queue = VecDeque::new();

        visited.insert(id);
        queue.push_back(id);

        while let Some(current) = queue.pop_front() {
            result.push(current);
            for &child in self.direct_children(current) {
                if visited.insert(child) {
                    queue.push_back(child);
                }
            }
        }

        result
    }

    /// Returns all branch ids, sorted.
    #[must_use]
    pub fn branch_ids(&self) -> Vec<BranchId> {
        let mut ids: Vec<BranchId> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the number of branches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true when the hierarchy holds no branches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: BranchId, parent: Option<BranchId>, model: BranchModel) -> BranchNode {
        BranchNode {
            id,
            name: format!("Branch {}", id),
            model,
            control_branch_id: parent,
            activated_on: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_build_and_direct_children() {
        let hierarchy = BranchHierarchy::build(vec![
            node(1, None, BranchModel::Branch),
            node(3, Some(1), BranchModel::Franchise),
            node(2, Some(1), BranchModel::Branch),
            node(4, Some(2), BranchModel::Referral),
        ]);

        assert_eq!(hierarchy.len(), 4);
        // Sorted regardless of insertion order
        assert_eq!(hierarchy.direct_children(1), &[2, 3]);
        assert_eq!(hierarchy.direct_children(2), &[4]);
        assert!(hierarchy.direct_children(4).is_empty());
        assert_eq!(hierarchy.parent(4), Some(2));
        assert_eq!(hierarchy.parent(1), None);
    }

    #[test]
    fn test_descendants_includes_self_and_subtree() {
        let hierarchy = BranchHierarchy::build(vec![
            node(1, None, BranchModel::Branch),
            node(2, Some(1), BranchModel::Branch),
            node(3, Some(1), BranchModel::Franchise),
            node(4, Some(2), BranchModel::Branch),
            node(5, Some(4), BranchModel::Franchise),
        ]);

        assert_eq!(hierarchy.descendants(1), vec![1, 2, 3, 4, 5]);
        assert_eq!(hierarchy.descendants(2), vec![2, 4, 5]);
        assert_eq!(hierarchy.descendants(5), vec![5]);
    }

    #[test]
    fn test_descendants_empty_hierarchy_is_singleton() {
        let hierarchy = BranchHierarchy::build(vec![]);
        assert!(hierarchy.is_empty());
        assert_eq!(hierarchy.descendants(99), vec![99]);
    }

    #[test]
    fn test_descendants_unknown_branch_is_singleton() {
        let hierarchy = BranchHierarchy::build(vec![node(1, None, BranchModel::Branch)]);
        assert_eq!(hierarchy.descendants(42), vec![42]);
    }

    #[test]
    fn test_descendants_terminates_on_cycle() {
        // 1 -> 2 -> 3 -> 1 violates the schema; the walk must still terminate.
        let hierarchy = BranchHierarchy::build(vec![
            node(1, Some(3), BranchModel::Branch),
            node(2, Some(1), BranchModel::Branch),
            node(3, Some(2), BranchModel::Branch),
        ]);

        let descendants = hierarchy.descendants(1);
        assert_eq!(descendants, vec![1, 2, 3]);
    }

    #[test]
    fn test_franchise_children_filters_model() {
        let hierarchy = BranchHierarchy::build(vec![
            node(1, None, BranchModel::Branch),
            node(2, Some(1), BranchModel::Franchise),
            node(3, Some(1), BranchModel::Branch),
            node(4, Some(1), BranchModel::Franchise),
            node(5, Some(2), BranchModel::Franchise),
        ]);

        // Grandchild 5 is a franchise but not a direct child of 1.
        assert_eq!(hierarchy.franchise_children(1), vec![2, 4]);
        assert_eq!(hierarchy.franchise_children(3), Vec::<BranchId>::new());
    }

    #[test]
    fn test_branch_ids_sorted() {
        let hierarchy = BranchHierarchy::build(vec![
            node(5, None, BranchModel::Branch),
            node(1, Some(5), BranchModel::Branch),
            node(3, Some(5), BranchModel::Branch),
        ]);
        assert_eq!(hierarchy.branch_ids(), vec![1, 3, 5]);
    }
}
