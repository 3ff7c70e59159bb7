//! Tri-state selection read model.
//!
//! A folder's displayed state (checked / unchecked / mixed) is a pure
//! function over the tree and the selection set. It is computed on demand
//! and never stored per node, so it cannot diverge from the set.

use super::model::{NodeKind, SourceNode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Derived check state of a node. `Mixed` is display-only and never
/// directly settable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionState {
    Selected,
    Unselected,
    Mixed,
}

/// Finds a node anywhere in the forest by id.
pub fn find_node<'a>(nodes: &'a [SourceNode], id: &str) -> Option<&'a SourceNode> {
    for node in nodes {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_node(&node.children, id) {
            return Some(found);
        }
    }
    None
}

/// Collects every descendant id of `node`, depth-first, excluding the node
/// itself. Computed per call: the tree can be reloaded between toggles, so
/// nothing is cached.
pub fn descendant_ids(node: &SourceNode) -> Vec<String> {
    let mut out = Vec::new();
    collect_ids(&node.children, &mut out);
    out
}

fn collect_ids(nodes: &[SourceNode], out: &mut Vec<String>) {
    for node in nodes {
        out.push(node.id.clone());
        collect_ids(&node.children, out);
    }
}

/// Collects every id in the forest, used to prune selections that reference
/// nodes dropped by a tree reload.
pub fn all_ids(nodes: &[SourceNode], out: &mut HashSet<String>) {
    for node in nodes {
        out.insert(node.id.clone());
        all_ids(&node.children, out);
    }
}

/// Computes the displayed tri-state of a node.
///
/// Direct membership in the set wins. Otherwise a leaf is unselected, and a
/// folder aggregates its descendants: all selected, some selected (mixed),
/// or none. A childless folder is unselected.
pub fn selection_state(node: &SourceNode, selected: &HashSet<String>) -> SelectionState {
    if selected.contains(&node.id) {
        return SelectionState::Selected;
    }
    if node.kind == NodeKind::File {
        return SelectionState::Unselected;
    }
    let descendants = descendant_ids(node);
    if descendants.is_empty() {
        return SelectionState::Unselected;
    }
    let picked = descendants
        .iter()
        .filter(|id| selected.contains(id.as_str()))
        .count();
    if picked == 0 {
        SelectionState::Unselected
    } else if picked == descendants.len() {
        SelectionState::Selected
    } else {
        SelectionState::Mixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> Vec<SourceNode> {
        vec![
            SourceNode::folder(
                "reports",
                "Reports",
                vec![
                    SourceNode::file("q1", "Q1.pdf"),
                    SourceNode::file("q2", "Q2.pdf"),
                    SourceNode::folder(
                        "archive",
                        "Archive",
                        vec![SourceNode::file("q0", "Q0.pdf")],
                    ),
                ],
            ),
            SourceNode::file("notes", "Notes.txt"),
        ]
    }

    fn set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn leaf_state_follows_membership() {
        let tree = sample_tree();
        let notes = find_node(&tree, "notes").unwrap();
        assert_eq!(selection_state(notes, &set(&[])), SelectionState::Unselected);
        assert_eq!(
            selection_state(notes, &set(&["notes"])),
            SelectionState::Selected
        );
    }

    #[test]
    fn folder_is_mixed_iff_descendants_are_a_proper_nonempty_subset() {
        let tree = sample_tree();
        let reports = find_node(&tree, "reports").unwrap();

        assert_eq!(
            selection_state(reports, &set(&[])),
            SelectionState::Unselected
        );
        assert_eq!(
            selection_state(reports, &set(&["q1"])),
            SelectionState::Mixed
        );
        assert_eq!(
            selection_state(reports, &set(&["q1", "q2", "q0"])),
            SelectionState::Mixed
        );
        assert_eq!(
            selection_state(reports, &set(&["q1", "q2", "archive", "q0"])),
            SelectionState::Selected
        );
    }

    #[test]
    fn direct_membership_short_circuits_aggregation() {
        let tree = sample_tree();
        let reports = find_node(&tree, "reports").unwrap();
        // The folder id itself in the set wins even with unselected children.
        assert_eq!(
            selection_state(reports, &set(&["reports"])),
            SelectionState::Selected
        );
    }

    #[test]
    fn childless_folder_is_unselected() {
        let empty = SourceNode::folder("empty", "Empty", vec![]);
        assert_eq!(
            selection_state(&empty, &set(&[])),
            SelectionState::Unselected
        );
    }

    #[test]
    fn descendant_ids_cover_the_whole_subtree() {
        let tree = sample_tree();
        let reports = find_node(&tree, "reports").unwrap();
        let mut ids = descendant_ids(reports);
        ids.sort();
        assert_eq!(ids, ["archive", "q0", "q1", "q2"]);
    }
}
