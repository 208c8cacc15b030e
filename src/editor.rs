//! Mind map editor state.
//!
//! Holds one graph with its verification records and tracks model requests
//! per node: a node with a request in flight rejects a second request, other
//! nodes proceed independently. Completion goes through the ticket handed
//! out by `begin_request`, so a reply for a node that was removed or
//! re-requested in the meantime is rejected instead of applied.
//!
//! Node lifecycle: UNVERIFIED → (request) → VERIFIED | FLAGGED, and back to
//! UNVERIFIED when the label is edited by hand.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{
    Edge, MindMapDocument, Node, NodeClass, NodeStatus, RequestKind, Source, VerificationRecord,
};

// ═══════════════════════════════════════════════════════════
// Error type
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EditorError {
    #[error("Node not found: {0}")]
    UnknownNode(String),
    #[error("A {kind} request is already pending for node {node_id}")]
    RequestPending { node_id: String, kind: RequestKind },
    #[error("Ticket does not match the pending request for node {0}")]
    StaleTicket(String),
    #[error("No label edit in progress")]
    NotEditing,
    #[error("Label cannot be empty")]
    EmptyLabel,
}

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Handle for one in-flight request, returned by `begin_request`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    node_id: String,
    kind: RequestKind,
    seq: u64,
}

impl RequestTicket {
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }
}

/// Sources backing one node, for the citations page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub node_id: String,
    pub label: String,
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone)]
struct LabelDraft {
    node_id: String,
    original: String,
}

// ═══════════════════════════════════════════════════════════
// MindMapEditor
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct MindMapEditor {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    verifications: BTreeMap<String, VerificationRecord>,
    /// In-flight requests keyed by node id.
    pending: HashMap<String, (RequestKind, u64)>,
    next_seq: u64,
    selected: Option<String>,
    editing: Option<LabelDraft>,
}

impl MindMapEditor {
    /// Load a document, dropping edges and records that name unknown nodes.
    pub fn from_document(document: MindMapDocument) -> Self {
        let ids: HashSet<&str> = document.nodes.iter().map(|n| n.id.as_str()).collect();
        let edges: Vec<Edge> = document
            .edges
            .iter()
            .filter(|e| ids.contains(e.source.as_str()) && ids.contains(e.target.as_str()))
            .cloned()
            .collect();
        let verifications: BTreeMap<String, VerificationRecord> = document
            .verifications
            .iter()
            .filter(|(id, _)| ids.contains(id.as_str()))
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect();

        let dropped_edges = document.edges.len() - edges.len();
        let dropped_records = document.verifications.len() - verifications.len();
        if dropped_edges > 0 || dropped_records > 0 {
            tracing::debug!(dropped_edges, dropped_records, "Dropped dangling references");
        }

        Self {
            nodes: document.nodes,
            edges,
            verifications,
            ..Self::default()
        }
    }

    pub fn to_document(&self) -> MindMapDocument {
        MindMapDocument {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            verifications: self.verifications.clone(),
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    pub fn verification(&self, node_id: &str) -> Option<&VerificationRecord> {
        self.verifications.get(node_id)
    }

    fn node_mut(&mut self, node_id: &str) -> Result<&mut Node, EditorError> {
        self.nodes
            .iter_mut()
            .find(|n| n.id == node_id)
            .ok_or_else(|| EditorError::UnknownNode(node_id.to_string()))
    }

    // ─── Selection ───────────────────────────────────────────

    pub fn select(&mut self, node_id: &str) -> Result<(), EditorError> {
        if self.node(node_id).is_none() {
            return Err(EditorError::UnknownNode(node_id.to_string()));
        }
        self.selected = Some(node_id.to_string());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&Node> {
        self.selected.as_deref().and_then(|id| self.node(id))
    }

    // ─── Label editing ───────────────────────────────────────

    /// Open a label edit; returns the current label. Replaces any open edit.
    pub fn begin_edit(&mut self, node_id: &str) -> Result<&str, EditorError> {
        let original = self
            .node(node_id)
            .ok_or_else(|| EditorError::UnknownNode(node_id.to_string()))?
            .label()
            .to_string();
        self.editing = Some(LabelDraft {
            node_id: node_id.to_string(),
            original,
        });
        Ok(self.editing.as_ref().map(|d| d.original.as_str()).unwrap_or_default())
    }

    /// Node id of the open label edit, if any.
    pub fn editing(&self) -> Option<&str> {
        self.editing.as_ref().map(|d| d.node_id.as_str())
    }

    /// Apply the open edit. A changed label invalidates the node's
    /// verification. Returns whether the label changed.
    pub fn save_edit(&mut self, label: &str) -> Result<bool, EditorError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(EditorError::EmptyLabel);
        }
        let draft = self.editing.take().ok_or(EditorError::NotEditing)?;
        if label == draft.original {
            return Ok(false);
        }

        let node = self.node_mut(&draft.node_id)?;
        node.data.label = label.to_string();
        node.class_name = None;
        self.verifications.remove(&draft.node_id);
        Ok(true)
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    // ─── Structure ───────────────────────────────────────────

    /// Connect two nodes. Returns false when the edge already exists.
    pub fn connect(&mut self, source: &str, target: &str) -> Result<bool, EditorError> {
        for end in [source, target] {
            if self.node(end).is_none() {
                return Err(EditorError::UnknownNode(end.to_string()));
            }
        }
        let id = format!("reactflow__edge-{source}-{target}");
        if self.edges.iter().any(|e| e.id == id) {
            return Ok(false);
        }
        self.edges.push(Edge::new(id, source, target));
        Ok(true)
    }

    /// Remove a node with its edges, record, pending request and any
    /// selection or edit pointing at it.
    pub fn remove_node(&mut self, node_id: &str) -> Result<Node, EditorError> {
        let idx = self
            .nodes
            .iter()
            .position(|n| n.id == node_id)
            .ok_or_else(|| EditorError::UnknownNode(node_id.to_string()))?;
        let node = self.nodes.remove(idx);

        self.edges.retain(|e| !e.touches(node_id));
        self.verifications.remove(node_id);
        self.pending.remove(node_id);
        if self.selected.as_deref() == Some(node_id) {
            self.selected = None;
        }
        if self.editing() == Some(node_id) {
            self.editing = None;
        }
        Ok(node)
    }

    // ─── Requests ────────────────────────────────────────────

    pub fn begin_request(
        &mut self,
        node_id: &str,
        kind: RequestKind,
    ) -> Result<RequestTicket, EditorError> {
        if self.node(node_id).is_none() {
            return Err(EditorError::UnknownNode(node_id.to_string()));
        }
        if let Some((pending_kind, _)) = self.pending.get(node_id) {
            return Err(EditorError::RequestPending {
                node_id: node_id.to_string(),
                kind: *pending_kind,
            });
        }

        self.next_seq += 1;
        self.pending.insert(node_id.to_string(), (kind, self.next_seq));
        Ok(RequestTicket {
            node_id: node_id.to_string(),
            kind,
            seq: self.next_seq,
        })
    }

    /// Kind of the request pending on a node, if any.
    pub fn pending(&self, node_id: &str) -> Option<RequestKind> {
        self.pending.get(node_id).map(|(kind, _)| *kind)
    }

    fn settle(&mut self, ticket: &RequestTicket) -> Result<(), EditorError> {
        match self.pending.get(&ticket.node_id) {
            Some((_, seq)) if *seq == ticket.seq => {
                self.pending.remove(&ticket.node_id);
                Ok(())
            }
            _ => Err(EditorError::StaleTicket(ticket.node_id.clone())),
        }
    }

    pub fn complete_verification(
        &mut self,
        ticket: &RequestTicket,
        record: VerificationRecord,
    ) -> Result<(), EditorError> {
        self.settle(ticket)?;
        let node = self.node_mut(&ticket.node_id)?;
        node.class_name = Some(if record.verified {
            NodeClass::Verified
        } else {
            NodeClass::Unverified
        });
        self.verifications.insert(ticket.node_id.clone(), record);
        Ok(())
    }

    /// Replace the label and record. `className` is left as it was.
    pub fn complete_regeneration(
        &mut self,
        ticket: &RequestTicket,
        content: &str,
        record: VerificationRecord,
    ) -> Result<(), EditorError> {
        self.settle(ticket)?;
        let node = self.node_mut(&ticket.node_id)?;
        node.data.label = content.to_string();
        self.verifications.insert(ticket.node_id.clone(), record);
        Ok(())
    }

    pub fn fail_request(&mut self, ticket: &RequestTicket) -> Result<(), EditorError> {
        self.settle(ticket)
    }

    // ─── Queries ─────────────────────────────────────────────

    pub fn status(&self, node_id: &str) -> Result<NodeStatus, EditorError> {
        if self.node(node_id).is_none() {
            return Err(EditorError::UnknownNode(node_id.to_string()));
        }
        Ok(match self.verifications.get(node_id) {
            None => NodeStatus::Unverified,
            Some(r) if r.verified => NodeStatus::Verified,
            Some(_) => NodeStatus::Flagged,
        })
    }

    /// Nodes with at least one source, in node order.
    pub fn citations(&self) -> Vec<Citation> {
        self.nodes
            .iter()
            .filter_map(|node| {
                let record = self.verifications.get(&node.id)?;
                record.has_sources().then(|| Citation {
                    node_id: node.id.clone(),
                    label: node.label().to_string(),
                    sources: record.sources.clone(),
                })
            })
            .collect()
    }
}
