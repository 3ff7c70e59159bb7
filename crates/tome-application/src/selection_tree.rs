//! Source tree and selection state container.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tome_core::drive::{NodeKind, SelectionState, SourceNode, selection};
use tome_core::error::{Result, TomeError};
use tome_core::gateway::BackendGateway;

/// Immutable view of the tree and selection, published after every
/// mutation. Folder tri-states are not part of the snapshot; they are
/// derived on demand from (tree, selected).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionSnapshot {
    pub tree: Vec<SourceNode>,
    pub selected: HashSet<String>,
    pub last_error: Option<String>,
}

#[derive(Default)]
struct TreeState {
    tree: Vec<SourceNode>,
    selected: HashSet<String>,
    last_error: Option<String>,
}

/// Owns the source tree and the selection set.
pub struct SelectionTreeEngine {
    gateway: Arc<dyn BackendGateway>,
    state: RwLock<TreeState>,
    snapshot_tx: watch::Sender<SelectionSnapshot>,
}

impl SelectionTreeEngine {
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        let (snapshot_tx, _) = watch::channel(SelectionSnapshot::default());
        Self {
            gateway,
            state: RwLock::new(TreeState::default()),
            snapshot_tx,
        }
    }

    /// Current view of the tree and selection.
    pub fn snapshot(&self) -> SelectionSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Subscribes to selection snapshots.
    pub fn subscribe(&self) -> watch::Receiver<SelectionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    fn publish(&self, state: &TreeState) {
        self.snapshot_tx.send_replace(SelectionSnapshot {
            tree: state.tree.clone(),
            selected: state.selected.clone(),
            last_error: state.last_error.clone(),
        });
    }

    /// Fetches and replaces the source tree wholesale.
    ///
    /// On failure the previous tree is left untouched and the error is
    /// surfaced; the tree is never partially overwritten. On success,
    /// selected ids that no longer exist are pruned — which also retires
    /// the effect of any toggle that raced the reload.
    pub async fn load_tree(&self) -> Result<()> {
        match self.gateway.fetch_drive_tree().await {
            Ok(tree) => {
                let mut state = self.state.write().await;
                let mut known = HashSet::new();
                selection::all_ids(&tree, &mut known);
                state.selected.retain(|id| known.contains(id));
                state.tree = tree;
                state.last_error = None;
                self.publish(&state);
                Ok(())
            }
            Err(err) => {
                let mut state = self.state.write().await;
                state.last_error = Some(err.to_string());
                self.publish(&state);
                Err(err.into())
            }
        }
    }

    /// Toggles a node.
    ///
    /// A leaf flips its own membership. A folder drives every descendant to
    /// the negation of the folder's current aggregate state: a folder that
    /// reads selected clears everything below it, anything else (including
    /// mixed) selects everything below it. Mixed is never directly
    /// settable. The descendant set is computed per call from the current
    /// tree.
    pub async fn toggle(&self, node_id: &str) -> Result<()> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let Some(node) = selection::find_node(&state.tree, node_id) else {
            return Err(TomeError::SourceNotFound(node_id.to_string()));
        };
        match node.kind {
            NodeKind::File => {
                if !state.selected.remove(node_id) {
                    state.selected.insert(node_id.to_string());
                }
            }
            NodeKind::Folder => {
                let descendants = selection::descendant_ids(node);
                let aggregate = selection::selection_state(node, &state.selected);
                if aggregate == SelectionState::Selected {
                    for id in &descendants {
                        state.selected.remove(id);
                    }
                    // An ancestor toggle may have inserted the folder id
                    // itself; clearing must drop that too.
                    state.selected.remove(node_id);
                } else {
                    state.selected.extend(descendants);
                }
            }
        }
        self.publish(state);
        Ok(())
    }

    /// Computes the displayed tri-state of a node against the current
    /// selection. Unknown ids read as unselected.
    pub async fn state_of(&self, node_id: &str) -> SelectionState {
        let state = self.state.read().await;
        selection::find_node(&state.tree, node_id)
            .map(|node| selection::selection_state(node, &state.selected))
            .unwrap_or(SelectionState::Unselected)
    }

    /// Selected source ids in a stable order, for scoping retrieval
    /// requests.
    pub async fn selected_ids(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut ids: Vec<String> = state.selected.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Drops all local state (credential change).
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        *state = TreeState::default();
        self.publish(&state);
    }
}
