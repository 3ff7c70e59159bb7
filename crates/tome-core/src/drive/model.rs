//! Source tree domain model.

use serde::{Deserialize, Serialize};

/// Whether a node is a document or a container of nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    File,
    Folder,
}

/// One node of the company file store's tree.
///
/// The tree is authority-supplied and read-only from the client's
/// perspective: the client only ever replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceNode {
    pub id: String,
    pub kind: NodeKind,
    pub name: String,
    #[serde(default)]
    pub children: Vec<SourceNode>,
}

impl SourceNode {
    /// Builds a leaf document node.
    pub fn file(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::File,
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Builds a folder node over its children.
    pub fn folder(
        id: impl Into<String>,
        name: impl Into<String>,
        children: Vec<SourceNode>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Folder,
            name: name.into(),
            children,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }
}
