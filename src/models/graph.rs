use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::{NodeClass, VerificationRecord};

pub const DEFAULT_NODE_TYPE: &str = "default";
pub const DEFAULT_EDGE_TYPE: &str = "smoothstep";

/// Node count the generation prompt asks for.
pub const EXPECTED_NODE_RANGE: std::ops::RangeInclusive<usize> = 8..=15;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(rename = "type", default = "default_node_type")]
    pub kind: String,
    #[serde(default)]
    pub position: Position,
    pub data: NodeData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<NodeClass>,
}

impl Node {
    pub fn new(id: impl Into<String>, label: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            kind: DEFAULT_NODE_TYPE.to_string(),
            position,
            data: NodeData {
                label: label.into(),
            },
            class_name: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.data.label
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type", default = "default_edge_type")]
    pub kind: String,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            kind: DEFAULT_EDGE_TYPE.to_string(),
        }
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

fn default_node_type() -> String {
    DEFAULT_NODE_TYPE.to_string()
}

fn default_edge_type() -> String {
    DEFAULT_EDGE_TYPE.to_string()
}

/// Nodes and edges of one mind map.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MindMap {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl MindMap {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Number of edges touching each node, keyed by node id.
    pub fn degrees(&self) -> HashMap<&str, usize> {
        let mut degrees: HashMap<&str, usize> =
            self.nodes.iter().map(|n| (n.id.as_str(), 0)).collect();
        for edge in &self.edges {
            for end in [edge.source.as_str(), edge.target.as_str()] {
                if let Some(d) = degrees.get_mut(end) {
                    *d += 1;
                }
            }
        }
        degrees
    }

    /// The hub of the radial layout: the node with the most edges,
    /// earliest node on ties.
    pub fn center(&self) -> Option<&Node> {
        let degrees = self.degrees();
        let mut best: Option<(&Node, usize)> = None;
        for node in &self.nodes {
            let d = degrees.get(node.id.as_str()).copied().unwrap_or(0);
            match best {
                Some((_, best_d)) if best_d >= d => {}
                _ => best = Some((node, d)),
            }
        }
        best.map(|(n, _)| n)
    }

    /// Parse and validate a graph returned by the model.
    ///
    /// Both `nodes` and `edges` arrays must be present. Rejects graphs
    /// without nodes, with duplicate ids, or with nodes missing an id or
    /// label. Edges pointing at unknown nodes are
    /// dropped and reported in `GraphRepairs`.
    pub fn from_model_value(value: serde_json::Value) -> Result<(Self, GraphRepairs), GraphError> {
        let raw: RawGraph =
            serde_json::from_value(value).map_err(|e| GraphError::Shape(e.to_string()))?;

        if raw.nodes.is_empty() {
            return Err(GraphError::NoNodes);
        }

        let mut seen = HashSet::new();
        let mut nodes = Vec::with_capacity(raw.nodes.len());
        for (index, raw_node) in raw.nodes.into_iter().enumerate() {
            let id = raw_node
                .id
                .filter(|id| !id.is_empty())
                .ok_or(GraphError::MissingField { index, field: "id" })?;
            let label = raw_node
                .data
                .and_then(|d| d.label)
                .filter(|l| !l.trim().is_empty())
                .ok_or(GraphError::MissingField {
                    index,
                    field: "data.label",
                })?;
            if !seen.insert(id.clone()) {
                return Err(GraphError::DuplicateNodeId(id));
            }
            nodes.push(Node {
                id,
                kind: raw_node.kind.unwrap_or_else(default_node_type),
                position: raw_node.position.unwrap_or_default(),
                data: NodeData { label },
                class_name: None,
            });
        }

        let mut repairs = GraphRepairs::default();
        let mut edges = Vec::with_capacity(raw.edges.len());
        for raw_edge in raw.edges {
            let (Some(source), Some(target)) = (raw_edge.source, raw_edge.target) else {
                repairs.dropped_edges += 1;
                continue;
            };
            if !seen.contains(&source) || !seen.contains(&target) {
                repairs.dropped_edges += 1;
                continue;
            }
            let id = raw_edge
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("e{source}-{target}"));
            edges.push(Edge {
                id,
                source,
                target,
                kind: raw_edge.kind.unwrap_or_else(default_edge_type),
            });
        }

        Ok((Self { nodes, edges }, repairs))
    }
}

/// What `MindMap::from_model_value` had to fix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphRepairs {
    pub dropped_edges: usize,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GraphError {
    #[error("Graph does not match the expected shape: {0}")]
    Shape(String),

    #[error("Graph has no nodes")]
    NoNodes,

    #[error("Node {index} is missing {field}")]
    MissingField { index: usize, field: &'static str },

    #[error("Duplicate node id {0:?}")]
    DuplicateNodeId(String),
}

/// Full editor payload: the graph plus verification records keyed by node id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MindMapDocument {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub verifications: BTreeMap<String, VerificationRecord>,
}

impl From<MindMap> for MindMapDocument {
    fn from(map: MindMap) -> Self {
        Self {
            nodes: map.nodes,
            edges: map.edges,
            verifications: BTreeMap::new(),
        }
    }
}

// Lenient mirror of the graph JSON: the model sometimes emits numeric ids
// or leaves out optional fields.
#[derive(Deserialize)]
struct RawGraph {
    nodes: Vec<RawNode>,
    edges: Vec<RawEdge>,
}

#[derive(Deserialize)]
struct RawNode {
    #[serde(default, deserialize_with = "lenient_id")]
    id: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    position: Option<Position>,
    data: Option<RawNodeData>,
}

#[derive(Deserialize)]
struct RawNodeData {
    label: Option<String>,
}

#[derive(Deserialize)]
struct RawEdge {
    #[serde(default, deserialize_with = "lenient_id")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    source: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    target: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
