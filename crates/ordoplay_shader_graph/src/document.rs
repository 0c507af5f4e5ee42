// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph documents.
//!
//! A document stores each node's literal state under its id plus the flat
//! edge list. Loading re-binds every edge through [`Graph::set_input`], so
//! computed values are always rebuilt rather than read back.

use crate::connection::Connection;
use crate::evaluation::EvaluationError;
use crate::graph::{ConnectionError, Graph};
use crate::node::NodeId;
use crate::nodes::NodeKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current graph document format version
pub const GRAPH_FORMAT_VERSION: u32 = 1;

/// Document errors
#[derive(Debug, Error)]
pub enum DocumentError {
    /// RON serialization failed
    #[error("Failed to serialize: {0}")]
    Serialize(#[from] ron::Error),

    /// RON parsing failed
    #[error("Failed to parse: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Document written by an unknown format version
    #[error("Unsupported graph format version {0} (expected {expected})", expected = GRAPH_FORMAT_VERSION)]
    UnsupportedVersion(u32),

    /// Two nodes share an id
    #[error("Duplicate node id {0}")]
    DuplicateNode(NodeId),

    /// Node id above [`NodeId::MAX`]
    #[error("Node id {0} is out of range (max {max})", max = NodeId::MAX)]
    IdOutOfRange(NodeId),

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Restored state belongs to another node kind
    #[error("Expected {expected} state, found {found}")]
    KindMismatch {
        /// Kind of the node being restored
        expected: &'static str,
        /// Kind found in the document
        found: &'static str,
    },

    /// An edge could not be re-bound
    #[error("Invalid connection: {0}")]
    Connection(#[from] ConnectionError),

    /// Recompute after loading failed
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

/// Saved literal state of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node id, kept across save and load
    pub id: NodeId,
    /// Literal state
    pub state: NodeKind,
}

/// Serializable form of a [`Graph`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Format version
    pub version: u32,
    /// Graph name
    pub name: String,
    /// Nodes in graph order
    pub nodes: Vec<NodeRecord>,
    /// Edges
    #[serde(default)]
    pub connections: Vec<Connection>,
    /// Designated output node
    #[serde(default)]
    pub output: Option<NodeId>,
}

impl GraphDocument {
    /// Capture the literal state and edges of `graph`
    pub fn from_graph(graph: &Graph) -> Self {
        Self {
            version: GRAPH_FORMAT_VERSION,
            name: graph.name.clone(),
            nodes: graph
                .nodes()
                .map(|node| NodeRecord {
                    id: node.id(),
                    state: node.kind().clone(),
                })
                .collect(),
            connections: graph.connections(),
            output: graph.output_node(),
        }
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String, DocumentError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Parse from RON
    pub fn from_ron(s: &str) -> Result<Self, DocumentError> {
        Ok(ron::from_str(s)?)
    }

    /// Rebuild the graph, recomputing every node.
    ///
    /// Node ids are preserved and new ids continue past the highest one.
    pub fn into_graph(self) -> Result<Graph, DocumentError> {
        if self.version != GRAPH_FORMAT_VERSION {
            return Err(DocumentError::UnsupportedVersion(self.version));
        }

        let mut graph = Graph::new(self.name);
        for record in self.nodes {
            graph.insert_node_with_id(record.id, record.state)?;
        }
        graph.recompute_all()?;

        for connection in &self.connections {
            graph.set_input(connection.to_node, connection.to_port, Some(connection.source()))?;
        }
        graph.set_output_node(self.output)?;

        tracing::debug!(
            graph = %graph.name,
            nodes = graph.node_count(),
            connections = self.connections.len(),
            "graph document loaded"
        );
        Ok(graph)
    }
}
